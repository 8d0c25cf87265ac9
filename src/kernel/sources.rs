//! Kernel source URL management
//!
//! Maps the stream/repository selection to clone URLs and holds the fixed
//! table of upstream trees added as remotes for backporting.

use crate::models::BuildPlan;

/// A remote added to the tree for cherry-picking upstream fixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackportRemote<'a> {
    pub name: &'a str,
    pub url: &'a str,
}

/// Upstream trees fetched by `--backport`.
pub const BACKPORT_REMOTES: &[BackportRemote<'static>] = &[
    BackportRemote {
        name: "linus",
        url: "https://git.kernel.org/pub/scm/linux/kernel/git/torvalds/linux.git",
    },
    BackportRemote {
        name: "stable",
        url: "https://git.kernel.org/pub/scm/linux/kernel/git/stable/linux.git",
    },
    BackportRemote {
        name: "ark",
        url: "https://gitlab.com/cki-project/kernel-ark.git",
    },
];

/// Remote name for the official tree when cloning from a fork.
pub const UPSTREAM_REMOTE: &str = "upstream";

/// Where the tree comes from for a given plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSource {
    /// URL cloned as `origin`
    pub origin_url: String,
    /// Official URL, added as [`UPSTREAM_REMOTE`] when `origin_url` is a fork
    pub upstream_url: Option<String>,
}

impl KernelSource {
    pub fn for_plan(plan: &BuildPlan) -> Self {
        let origin_url = plan.origin_url();
        let upstream = plan.upstream_url();
        KernelSource {
            upstream_url: (origin_url != upstream).then_some(upstream),
            origin_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Arch, PhaseToggles, RepoChoice, Stream, Variant};
    use std::path::PathBuf;

    fn plan(fork: Option<&str>) -> BuildPlan {
        BuildPlan {
            arch: Arch::X86_64,
            host_arch: Some(Arch::X86_64),
            stream: Stream::Z,
            repo: RepoChoice::Rhel,
            fork: fork.map(str::to_string),
            variant: Variant::default(),
            toggles: PhaseToggles::default(),
            patches_dir: None,
            jobs: 1,
            source_dir: PathBuf::from("/src"),
            build_dir: PathBuf::from("/build"),
            log_dir: PathBuf::from("/logs"),
        }
    }

    #[test]
    fn test_official_source_has_no_upstream_remote() {
        let source = KernelSource::for_plan(&plan(None));
        assert_eq!(source.origin_url, "https://gitlab.com/redhat/rhel/src/kernel/rhel-9.git");
        assert_eq!(source.upstream_url, None);
    }

    #[test]
    fn test_fork_source_keeps_official_as_upstream() {
        let source = KernelSource::for_plan(&plan(Some("jdoe")));
        assert_eq!(source.origin_url, "https://gitlab.com/jdoe/rhel-9.git");
        assert_eq!(
            source.upstream_url.as_deref(),
            Some("https://gitlab.com/redhat/rhel/src/kernel/rhel-9.git")
        );
    }

    #[test]
    fn test_backport_remote_names_unique() {
        let mut names: Vec<_> = BACKPORT_REMOTES.iter().map(|r| r.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BACKPORT_REMOTES.len());
        assert!(!names.contains(&UPSTREAM_REMOTE));
    }
}
