//! Source phases: clone, backport remotes and tag index.

use crate::error::AppError;
use crate::kernel::git::{is_repository, GitManager, RemoteStatus};
use crate::kernel::sources::{BackportRemote, KernelSource, BACKPORT_REMOTES, UPSTREAM_REMOTE};
use crate::models::BuildPlan;
use crate::orchestrator::executor::{Invocation, ToolRunner};
use std::path::Path;

/// What the clone phase did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned { head: String },
    /// Source dir was already a repository
    Skipped,
}

/// Clone origin into the source dir; with a fork also register `upstream`.
pub fn clone_source(plan: &BuildPlan) -> Result<CloneOutcome, AppError> {
    clone_from(&KernelSource::for_plan(plan), &plan.source_dir)
}

/// Clone `source` into `target`, skipping an existing repository.
pub fn clone_from(source: &KernelSource, target: &Path) -> Result<CloneOutcome, AppError> {
    if is_repository(target) {
        log::warn!("{} is already a git repository, skipping clone", target.display());
        return Ok(CloneOutcome::Skipped);
    }

    let manager = GitManager::clone(&source.origin_url, target)?;
    if let Some(upstream) = &source.upstream_url {
        manager.ensure_remote(UPSTREAM_REMOTE, upstream)?;
    }

    let head = manager.head_commit()?;
    log::info!("Cloned {} at {}", source.origin_url, head);
    Ok(CloneOutcome::Cloned { head })
}

/// Add every backport remote (reusing existing ones) and fetch it.
pub fn prepare_backport(plan: &BuildPlan) -> Result<usize, AppError> {
    add_and_fetch_remotes(&plan.source_dir, BACKPORT_REMOTES)
}

/// Register each remote in the repository at `repo_dir` and fetch it.
pub fn add_and_fetch_remotes(
    repo_dir: &Path,
    remotes: &[BackportRemote<'_>],
) -> Result<usize, AppError> {
    let manager = GitManager::open(repo_dir)?;
    for remote in remotes {
        if let RemoteStatus::Existing(url) = manager.ensure_remote(remote.name, remote.url)? {
            log::info!("Reusing remote {} ({})", remote.name, url);
        }
        manager.fetch(remote.name)?;
    }
    Ok(remotes.len())
}

/// `make ARCH=<karch> tags` in the source tree (drives ctags).
pub fn tags_invocation(plan: &BuildPlan) -> Invocation {
    Invocation::new("make", &plan.source_dir)
        .arg(format!("ARCH={}", plan.arch.kernel_arch()))
        .arg("tags")
}

pub async fn generate_tags<R: ToolRunner>(plan: &BuildPlan, runner: &R) -> Result<(), AppError> {
    runner.run_checked(&tags_invocation(plan)).await?;
    Ok(())
}
