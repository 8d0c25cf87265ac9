//! Patch series collection and mailbox application (`git am`).

use crate::error::PatchError;
use crate::orchestrator::executor::{Invocation, ToolRunner};
use std::fs;
use std::path::{Path, PathBuf};

const PATCH_EXTENSIONS: &[&str] = &["patch", "mbox"];

/// Patch files directly inside `dir`, sorted by file name.
pub fn collect_patches(dir: &Path) -> Result<Vec<PathBuf>, PatchError> {
    if !dir.is_dir() {
        return Err(PatchError::DirNotFound(dir.display().to_string()));
    }

    let mut patches: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| PATCH_EXTENSIONS.contains(&ext))
        })
        .collect();

    if patches.is_empty() {
        return Err(PatchError::NoPatches(dir.display().to_string()));
    }

    patches.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(patches)
}

/// `git am --3way <patches...>` in the source tree.
pub fn apply_invocation(source_dir: &Path, patches: &[PathBuf]) -> Invocation {
    Invocation::new("git", source_dir)
        .args(["am", "--3way"])
        .args(patches.iter().map(|p| p.display().to_string()))
}

/// Apply every patch in `dir` to the tree at `source_dir`.
///
/// On failure the half-applied series is aborted so the tree is left clean.
pub async fn apply_patches<R: ToolRunner>(
    runner: &R,
    source_dir: &Path,
    dir: &Path,
) -> Result<usize, PatchError> {
    let patches = collect_patches(dir)?;
    log::info!("Applying {} patches from {}", patches.len(), dir.display());
    for patch in &patches {
        log::debug!("  {}", patch.display());
    }

    let invocation = apply_invocation(source_dir, &patches);
    let outcome = runner
        .run(&invocation)
        .await
        .map_err(|e| PatchError::PatchFailed(e.to_string()))?;

    if outcome.success {
        return Ok(patches.len());
    }

    log::warn!("git am failed, aborting the series");
    let abort = Invocation::new("git", source_dir).args(["am", "--abort"]);
    if let Err(e) = runner.run(&abort).await {
        log::warn!("git am --abort could not run: {}", e);
    }
    Err(PatchError::PatchFailed(format!(
        "git am failed with {} in {}",
        outcome.describe(),
        source_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002-b.patch", "0001-a.patch", "series.mbox", "README", "notes.txt"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("old.patch")).unwrap();

        let names: Vec<String> = collect_patches(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["0001-a.patch", "0002-b.patch", "series.mbox"]);
    }

    #[test]
    fn test_empty_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("README"), "").unwrap();
        assert!(matches!(collect_patches(dir.path()), Err(PatchError::NoPatches(_))));
    }

    #[test]
    fn test_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            collect_patches(&dir.path().join("nope")),
            Err(PatchError::DirNotFound(_))
        ));
    }

    #[test]
    fn test_apply_invocation() {
        let inv = apply_invocation(
            Path::new("/src"),
            &[PathBuf::from("/p/0001-a.patch"), PathBuf::from("/p/0002-b.patch")],
        );
        assert_eq!(inv.to_string(), "git am --3way /p/0001-a.patch /p/0002-b.patch");
        assert_eq!(inv.cwd, PathBuf::from("/src"));
    }
}
