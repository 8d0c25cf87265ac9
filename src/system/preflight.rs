//! Host tool availability checks.
//!
//! Only the tools the requested phases need are checked, and every missing
//! tool is reported in one error before anything runs.

use crate::error::PreflightError;
use crate::models::{Arch, BuildPlan};
use std::path::PathBuf;

/// A host tool the run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredTool {
    pub command: String,
    pub purpose: &'static str,
    pub package: String,
}

impl RequiredTool {
    fn new(command: impl Into<String>, purpose: &'static str, package: impl Into<String>) -> Self {
        RequiredTool {
            command: command.into(),
            purpose,
            package: package.into(),
        }
    }
}

/// Locate a command on PATH.
pub fn find_tool(cmd: &str) -> Option<PathBuf> {
    which::which(cmd).ok()
}

/// Fedora/RHEL package providing the cross toolchain for an arch.
fn cross_gcc_package(arch: Arch) -> String {
    match arch {
        Arch::X86_64 => "gcc-x86_64-linux-gnu".to_string(),
        Arch::Aarch64 => "gcc-aarch64-linux-gnu".to_string(),
        Arch::Ppc64le => "gcc-powerpc64le-linux-gnu".to_string(),
        Arch::S390x => "gcc-s390x-linux-gnu".to_string(),
    }
}

/// Tools needed for the phases enabled in `plan`.
pub fn required_tools(plan: &BuildPlan) -> Vec<RequiredTool> {
    let toggles = &plan.toggles;
    let mut tools = vec![RequiredTool::new(
        "git",
        "source management and patch application",
        "git",
    )];

    if toggles.configure || toggles.build || toggles.tags || toggles.clone {
        tools.push(RequiredTool::new("make", "kernel build system", "make"));
    }
    if toggles.tags || toggles.clone {
        tools.push(RequiredTool::new("ctags", "symbol index generation", "ctags"));
    }
    if toggles.rpm {
        tools.push(RequiredTool::new("rpmbuild", "binary RPM packaging", "rpm-build"));
    }
    if (toggles.configure || toggles.build) && plan.is_cross() {
        tools.push(RequiredTool::new(
            format!("{}gcc", plan.arch.cross_compile_prefix()),
            "cross compilation",
            cross_gcc_package(plan.arch),
        ));
    }

    tools
}

/// Check that every tool is available according to `exists`.
pub fn check_required_tools_with<F>(tools: &[RequiredTool], exists: F) -> Result<(), PreflightError>
where
    F: Fn(&str) -> bool,
{
    let missing: Vec<&RequiredTool> = tools.iter().filter(|t| !exists(&t.command)).collect();

    if missing.is_empty() {
        for tool in tools {
            log::debug!("Found {} ({})", tool.command, tool.purpose);
        }
        return Ok(());
    }

    let msg = missing
        .iter()
        .map(|t| format!("  {} - {} (install: sudo dnf install {})", t.command, t.purpose, t.package))
        .collect::<Vec<_>>()
        .join("\n");
    Err(PreflightError::MissingTools(msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhaseToggles, RepoChoice, Stream, Variant};

    fn plan(toggles: PhaseToggles, arch: Arch) -> BuildPlan {
        BuildPlan {
            arch,
            host_arch: Some(Arch::X86_64),
            stream: Stream::Z,
            repo: RepoChoice::Centos,
            fork: None,
            variant: Variant::default(),
            toggles,
            patches_dir: None,
            jobs: 1,
            source_dir: PathBuf::from("/src"),
            build_dir: PathBuf::from("/build"),
            log_dir: PathBuf::from("/logs"),
        }
    }

    fn names(tools: &[RequiredTool]) -> Vec<&str> {
        tools.iter().map(|t| t.command.as_str()).collect()
    }

    #[test]
    fn test_find_tool() {
        // 'sh' should exist on any Unix system
        assert!(find_tool("sh").is_some());
        assert!(find_tool("definitely_not_a_real_command_12345").is_none());
    }

    #[test]
    fn test_backport_only_needs_git() {
        let toggles = PhaseToggles { backport: true, ..PhaseToggles::default() };
        assert_eq!(names(&required_tools(&plan(toggles, Arch::X86_64))), vec!["git"]);
    }

    #[test]
    fn test_rpm_cross_build_tools() {
        let toggles = PhaseToggles { build: true, rpm: true, ..PhaseToggles::default() };
        let tools = required_tools(&plan(toggles, Arch::Aarch64));
        assert_eq!(names(&tools), vec!["git", "make", "rpmbuild", "aarch64-linux-gnu-gcc"]);
    }

    #[test]
    fn test_missing_tools_listed_together() {
        let tools = vec![
            RequiredTool::new("git", "vcs", "git"),
            RequiredTool::new("make", "build", "make"),
            RequiredTool::new("ctags", "tags", "ctags"),
        ];
        let err = check_required_tools_with(&tools, |cmd| cmd == "git").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("make - build"));
        assert!(msg.contains("ctags - tags"));
        assert!(!msg.contains("git - vcs"));
    }

    #[test]
    fn test_all_tools_present() {
        let tools = vec![RequiredTool::new("sh", "shell", "bash")];
        assert!(check_required_tools_with(&tools, |cmd| find_tool(cmd).is_some()).is_ok());
    }
}
