//! Phase 1: Preparation - tool availability and source/build tree checks.
//!
//! Nothing here runs an external tool; a failure leaves the host untouched.

use crate::error::{AppError, BuildError, ConfigError};
use crate::kernel::git::is_repository;
use crate::kernel::patches::collect_patches;
use crate::models::BuildPlan;
use crate::system::preflight::{check_required_tools_with, required_tools};
use std::path::Path;

/// Verifies tools and tree layout for the phases the plan enables.
pub fn prepare_build_environment<F>(plan: &BuildPlan, tool_exists: F) -> Result<(), AppError>
where
    F: Fn(&str) -> bool,
{
    let tools = required_tools(plan);
    check_required_tools_with(&tools, tool_exists)?;
    log::info!(
        "Host tools present: {}",
        tools.iter().map(|t| t.command.as_str()).collect::<Vec<_>>().join(", ")
    );

    if plan.toggles.clone {
        check_clone_target(&plan.source_dir)?;
    } else {
        check_kernel_tree(&plan.source_dir)?;
    }

    // A missing or empty series fails here, before configure touches the tree
    if let Some(dir) = &plan.patches_dir {
        let patches = collect_patches(dir)?;
        log::info!("{} patches queued from {}", patches.len(), dir.display());
    }

    std::fs::create_dir_all(&plan.build_dir).map_err(|e| {
        BuildError::PreparationFailed(format!(
            "Failed to create build directory {}: {}",
            plan.build_dir.display(),
            e
        ))
    })?;

    log::info!("Environment ready");
    Ok(())
}

/// Clone target must be absent, empty, or already a repository (clone is then skipped).
fn check_clone_target(source_dir: &Path) -> Result<(), ConfigError> {
    if !source_dir.exists() || is_repository(source_dir) {
        return Ok(());
    }
    if !source_dir.is_dir() {
        return Err(ConfigError::InvalidPath(format!(
            "Source path exists but is not a directory: {}",
            source_dir.display()
        )));
    }
    let empty = std::fs::read_dir(source_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    if empty {
        Ok(())
    } else {
        Err(ConfigError::InvalidPath(format!(
            "Cannot clone into {}: directory is not empty and not a git repository",
            source_dir.display()
        )))
    }
}

/// Without a clone the source dir must already hold a kernel tree.
fn check_kernel_tree(source_dir: &Path) -> Result<(), ConfigError> {
    if !source_dir.is_dir() {
        return Err(ConfigError::InvalidPath(format!(
            "Kernel source not found at: {} (use --clone to fetch it)",
            source_dir.display()
        )));
    }
    if !source_dir.join("Makefile").exists() {
        return Err(ConfigError::InvalidPath(format!(
            "Valid kernel source not found in {}. Missing Makefile.",
            source_dir.display()
        )));
    }
    log::info!("Kernel source found at: {}", source_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PatchError;
    use crate::models::{Arch, PhaseToggles, RepoChoice, Stream, Variant};
    use std::fs;
    use std::path::PathBuf;

    /// Source at `<root>/src`, build output at `<root>/build`.
    fn plan(root: &Path, toggles: PhaseToggles) -> BuildPlan {
        BuildPlan {
            arch: Arch::X86_64,
            host_arch: Some(Arch::X86_64),
            stream: Stream::Y,
            repo: RepoChoice::Centos,
            fork: None,
            variant: Variant::default(),
            toggles,
            patches_dir: None,
            jobs: 1,
            source_dir: root.join("src"),
            build_dir: root.join("build"),
            log_dir: PathBuf::from("/logs"),
        }
    }

    fn kernel_tree(root: &Path) {
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/Makefile"), "").unwrap();
    }

    fn all_tools(_: &str) -> bool {
        true
    }

    #[test]
    fn test_missing_tool_stops_preparation() {
        let dir = tempfile::tempdir().unwrap();
        let p = plan(dir.path(), PhaseToggles { clone: true, ..Default::default() });
        let err = prepare_build_environment(&p, |cmd| cmd != "ctags").unwrap_err();
        assert!(matches!(err, AppError::Preflight(_)));
        assert!(!p.build_dir.exists());
    }

    #[test]
    fn test_clone_into_missing_or_empty_dir() {
        let toggles = PhaseToggles { clone: true, ..Default::default() };

        let dir = tempfile::tempdir().unwrap();
        assert!(prepare_build_environment(&plan(dir.path(), toggles), all_tools).is_ok());
        assert!(dir.path().join("build").is_dir());

        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        assert!(prepare_build_environment(&plan(dir.path(), toggles), all_tools).is_ok());
    }

    #[test]
    fn test_clone_into_busy_dir_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/stray"), "").unwrap();
        let toggles = PhaseToggles { clone: true, ..Default::default() };
        let err = prepare_build_environment(&plan(dir.path(), toggles), all_tools).unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::InvalidPath(_))));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_build_requires_kernel_tree() {
        let dir = tempfile::tempdir().unwrap();
        let p = plan(dir.path(), PhaseToggles { build: true, ..Default::default() });
        let err = prepare_build_environment(&p, all_tools).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        fs::create_dir(dir.path().join("src")).unwrap();
        assert!(prepare_build_environment(&p, all_tools).is_err());

        kernel_tree(dir.path());
        assert!(prepare_build_environment(&p, all_tools).is_ok());
    }

    #[test]
    fn test_missing_patch_dir_is_patch_error() {
        let dir = tempfile::tempdir().unwrap();
        kernel_tree(dir.path());
        let mut p = plan(dir.path(), PhaseToggles::default());
        p.patches_dir = Some(dir.path().join("patches"));

        let err = prepare_build_environment(&p, all_tools).unwrap_err();
        assert!(matches!(err, AppError::Patch(PatchError::DirNotFound(_))));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_empty_patch_dir_is_patch_error() {
        let dir = tempfile::tempdir().unwrap();
        kernel_tree(dir.path());
        fs::create_dir(dir.path().join("patches")).unwrap();
        fs::write(dir.path().join("patches/README"), "").unwrap();
        let mut p = plan(dir.path(), PhaseToggles::default());
        p.patches_dir = Some(dir.path().join("patches"));

        let err = prepare_build_environment(&p, all_tools).unwrap_err();
        assert!(matches!(err, AppError::Patch(PatchError::NoPatches(_))));
    }
}
