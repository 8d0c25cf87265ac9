//! Native git management using the `git2` crate.
//!
//! Clone, remote management and fetch go through libgit2. Mailbox patch
//! application has no libgit2 equivalent and lives in `kernel::patches`.

use git2::{build::RepoBuilder, AutotagOption, FetchOptions, RemoteCallbacks, Repository};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Clone error: {0}")]
    Clone(String),

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git2 error: {0}")]
    Git2(#[from] git2::Error),
}

/// Result type for git operations
pub type GitResult<T> = Result<T, GitError>;

/// Outcome of [`GitManager::ensure_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Added,
    /// Remote already configured; carries its current URL
    Existing(String),
}

/// True when `path` is the top of a git working tree.
pub fn is_repository(path: &Path) -> bool {
    path.join(".git").exists() && Repository::open(path).is_ok()
}

/// Transfer progress callbacks that log every 10% step.
fn progress_callbacks<'a>(label: &'a str) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut last_step = 0_usize;
    callbacks.transfer_progress(move |progress| {
        let total = progress.total_objects();
        if total > 0 {
            let step = progress.received_objects() * 10 / total;
            if step > last_step {
                last_step = step;
                log::info!(
                    "[git] {}: {}/{} objects ({}%)",
                    label,
                    progress.received_objects(),
                    total,
                    step * 10
                );
            }
        }
        true
    });
    callbacks
}

/// Manages kernel source repository operations using native git bindings
pub struct GitManager {
    repo: Repository,
}

impl GitManager {
    /// Opens an existing repository
    pub fn open(repo_path: impl AsRef<Path>) -> GitResult<Self> {
        let repo_path = repo_path.as_ref().to_path_buf();
        let repo = Repository::open(&repo_path).map_err(|e| {
            GitError::Repository(format!(
                "Failed to open repository at {}: {}",
                repo_path.display(),
                e
            ))
        })?;
        Ok(GitManager { repo })
    }

    /// Full clone of `url` into `target_path`, fetching all tags.
    ///
    /// Backporting needs history, so unlike a one-shot build this never
    /// clones shallow.
    pub fn clone(url: &str, target_path: impl AsRef<Path>) -> GitResult<Self> {
        let target_path = target_path.as_ref();

        if target_path.exists() && std::fs::read_dir(target_path)?.next().is_some() {
            return Err(GitError::Clone(format!(
                "Target directory {} exists and is not empty",
                target_path.display()
            )));
        }

        log::info!("[git] Cloning {} into {}", url, target_path.display());

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(progress_callbacks("clone"));
        fetch_options.download_tags(AutotagOption::All);

        RepoBuilder::new()
            .fetch_options(fetch_options)
            .clone(url, target_path)
            .map_err(|e| {
                GitError::Clone(format!(
                    "Failed to clone {} to {}: {}",
                    url,
                    target_path.display(),
                    e
                ))
            })?;

        log::info!("[git] Clone completed");
        GitManager::open(target_path)
    }

    /// Adds `name` → `url` unless a remote with that name already exists.
    pub fn ensure_remote(&self, name: &str, url: &str) -> GitResult<RemoteStatus> {
        if let Ok(existing) = self.repo.find_remote(name) {
            let current = existing.url().unwrap_or_default().to_string();
            if current != url {
                log::warn!(
                    "[git] Remote '{}' already points to {} (wanted {}), leaving it",
                    name,
                    current,
                    url
                );
            }
            return Ok(RemoteStatus::Existing(current));
        }

        self.repo
            .remote(name, url)
            .map_err(|e| GitError::Remote(format!("Failed to add remote {} ({}): {}", name, url, e)))?;
        log::info!("[git] Added remote {} -> {}", name, url);
        Ok(RemoteStatus::Added)
    }

    /// Fetches branches and tags of a configured remote.
    pub fn fetch(&self, name: &str) -> GitResult<()> {
        let mut remote = self
            .repo
            .find_remote(name)
            .map_err(|e| GitError::Remote(format!("Failed to find remote {}: {}", name, e)))?;

        log::info!("[git] Fetching {}", name);
        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(progress_callbacks(name));
        fetch_options.download_tags(AutotagOption::All);

        remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .map_err(|e| GitError::Fetch(format!("Fetch of {} failed: {}", name, e)))?;
        Ok(())
    }

    /// Names of all configured remotes.
    pub fn remotes(&self) -> GitResult<Vec<String>> {
        let remotes = self.repo.remotes()?;
        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    /// Gets the current HEAD commit hash
    pub fn head_commit(&self) -> GitResult<String> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::Repository(format!("Failed to read HEAD: {}", e)))?;
        let commit_id = head
            .target()
            .ok_or_else(|| GitError::Repository("HEAD is not a direct reference".to_string()))?;
        Ok(commit_id.to_string())
    }
}
