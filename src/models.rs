//! Core data types for kstream Builder.
//!
//! The enumerations here carry every static lookup the run depends on:
//! stream → repository and base config, arch → Kbuild `ARCH`, cross prefix
//! and output artifact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// GitLab host serving both the CentOS Stream and RHEL kernel groups.
pub const GITLAB_BASE: &str = "https://gitlab.com";

/// Target architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86_64,
    Aarch64,
    Ppc64le,
    S390x,
}

impl Arch {
    pub const ALL: [Arch; 4] = [Arch::X86_64, Arch::Aarch64, Arch::Ppc64le, Arch::S390x];

    /// Architecture of the machine running the build, if it is one we target.
    pub fn host() -> Option<Self> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::X86_64),
            "aarch64" => Some(Arch::Aarch64),
            "powerpc64" if cfg!(target_endian = "little") => Some(Arch::Ppc64le),
            "s390x" => Some(Arch::S390x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
            Arch::Ppc64le => "ppc64le",
            Arch::S390x => "s390x",
        }
    }

    /// Value passed to Kbuild as `ARCH=`.
    pub fn kernel_arch(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86",
            Arch::Aarch64 => "arm64",
            Arch::Ppc64le => "powerpc",
            Arch::S390x => "s390",
        }
    }

    /// GNU cross toolchain prefix passed as `CROSS_COMPILE=`.
    pub fn cross_compile_prefix(&self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64-linux-gnu-",
            Arch::Aarch64 => "aarch64-linux-gnu-",
            Arch::Ppc64le => "powerpc64le-linux-gnu-",
            Arch::S390x => "s390x-linux-gnu-",
        }
    }

    /// Boot image produced by the default make target, relative to the build dir.
    pub fn image_artifact(&self) -> &'static str {
        match self {
            Arch::X86_64 => "arch/x86/boot/bzImage",
            Arch::Aarch64 => "arch/arm64/boot/Image.gz",
            Arch::Ppc64le => "vmlinux",
            Arch::S390x => "arch/s390/boot/bzImage",
        }
    }

    /// Directory name `binrpm-pkg` uses below `rpmbuild/RPMS/`.
    pub fn rpm_arch(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x86_64" => Ok(Arch::X86_64),
            "aarch64" => Ok(Arch::Aarch64),
            "ppc64le" => Ok(Arch::Ppc64le),
            "s390x" => Ok(Arch::S390x),
            _ => Err(invalid_value("architecture", s, &Arch::ALL.map(|a| a.as_str()))),
        }
    }
}

/// Kernel stream being tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Y-stream: the next major release.
    Y,
    /// Z-stream: the maintained release.
    Z,
}

impl Stream {
    pub const ALL: [Stream; 2] = [Stream::Y, Stream::Z];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stream::Y => "y",
            Stream::Z => "z",
        }
    }

    /// Major release number the stream follows.
    pub fn major(&self) -> u32 {
        match self {
            Stream::Y => 10,
            Stream::Z => 9,
        }
    }

    /// Upstream kernel version the stream is based on.
    pub fn base_version(&self) -> &'static str {
        match self {
            Stream::Y => "6.12.0",
            Stream::Z => "5.14.0",
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stream {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" => Ok(Stream::Y),
            "z" => Ok(Stream::Z),
            _ => Err(invalid_value("stream", s, &Stream::ALL.map(|s| s.as_str()))),
        }
    }
}

/// Which distribution's kernel repository to clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoChoice {
    Centos,
    Rhel,
}

impl RepoChoice {
    pub const ALL: [RepoChoice; 2] = [RepoChoice::Centos, RepoChoice::Rhel];

    pub fn as_str(&self) -> &'static str {
        match self {
            RepoChoice::Centos => "centos",
            RepoChoice::Rhel => "rhel",
        }
    }

    /// GitLab group holding the kernel projects.
    pub fn group(&self) -> &'static str {
        match self {
            RepoChoice::Centos => "redhat/centos-stream/src/kernel",
            RepoChoice::Rhel => "redhat/rhel/src/kernel",
        }
    }

    /// Project name for a stream inside [`RepoChoice::group`].
    pub fn project(&self, stream: Stream) -> String {
        match self {
            RepoChoice::Centos => format!("centos-stream-{}", stream.major()),
            RepoChoice::Rhel => format!("rhel-{}", stream.major()),
        }
    }
}

impl fmt::Display for RepoChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepoChoice {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "centos" => Ok(RepoChoice::Centos),
            "rhel" => Ok(RepoChoice::Rhel),
            _ => Err(invalid_value("repository", s, &RepoChoice::ALL.map(|r| r.as_str()))),
        }
    }
}

fn invalid_value(kind: &'static str, value: &str, expected: &[&str]) -> ConfigError {
    ConfigError::InvalidValue {
        kind,
        value: value.to_string(),
        expected: expected.join(", "),
    }
}

/// Kernel flavour selected by the `--rt` and `--debug` toggles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    pub realtime: bool,
    pub debug: bool,
}

impl Variant {
    /// Suffix appended to the arch in the base config file name.
    pub fn config_suffix(&self) -> String {
        let mut suffix = String::new();
        if self.realtime {
            suffix.push_str("-rt");
        }
        if self.debug {
            suffix.push_str("-debug");
        }
        suffix
    }
}

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseToggles {
    pub clone: bool,
    pub backport: bool,
    pub configure: bool,
    pub menuconfig: bool,
    pub build: bool,
    pub rpm: bool,
    pub tags: bool,
}

/// Fully resolved, read-only description of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildPlan {
    pub arch: Arch,
    pub host_arch: Option<Arch>,
    pub stream: Stream,
    pub repo: RepoChoice,
    pub fork: Option<String>,
    pub variant: Variant,
    pub toggles: PhaseToggles,
    pub patches_dir: Option<PathBuf>,
    pub jobs: usize,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub log_dir: PathBuf,
}

impl BuildPlan {
    /// True when the target arch differs from the host.
    pub fn is_cross(&self) -> bool {
        self.host_arch != Some(self.arch)
    }

    /// Cross prefix to pass to Kbuild, `None` for native builds.
    pub fn cross_compile(&self) -> Option<&'static str> {
        self.is_cross().then(|| self.arch.cross_compile_prefix())
    }

    /// Official clone URL for the selected repository and stream.
    pub fn upstream_url(&self) -> String {
        clone_url(self.repo.group(), &self.repo.project(self.stream))
    }

    /// URL to clone as `origin`: the fork when one is set, otherwise upstream.
    pub fn origin_url(&self) -> String {
        match &self.fork {
            Some(namespace) => clone_url(namespace, &self.repo.project(self.stream)),
            None => self.upstream_url(),
        }
    }

    /// Base config path relative to the source tree.
    pub fn base_config_name(&self) -> String {
        format!(
            "redhat/configs/kernel-{}-{}{}.config",
            self.stream.base_version(),
            self.arch,
            self.variant.config_suffix()
        )
    }

    /// Expected boot image after a successful build.
    pub fn image_path(&self) -> PathBuf {
        self.build_dir.join(self.arch.image_artifact())
    }

    /// Directory `binrpm-pkg` writes binary RPMs to.
    pub fn rpm_dir(&self) -> PathBuf {
        self.build_dir
            .join("rpmbuild/RPMS")
            .join(self.arch.rpm_arch())
    }

    /// Common Kbuild variables: `O=`, `ARCH=` and `CROSS_COMPILE=` when cross.
    pub fn make_vars(&self) -> Vec<String> {
        let mut vars = vec![
            format!("O={}", self.build_dir.display()),
            format!("ARCH={}", self.arch.kernel_arch()),
        ];
        if let Some(prefix) = self.cross_compile() {
            vars.push(format!("CROSS_COMPILE={}", prefix));
        }
        vars
    }
}

/// `https://gitlab.com/<group>/<project>.git`
pub fn clone_url(group: &str, project: &str) -> String {
    format!("{}/{}/{}.git", GITLAB_BASE, group.trim_matches('/'), project)
}

/// Build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildPhase {
    Preparation,
    Clone,
    Backport,
    Tags,
    Configuration,
    Patching,
    Building,
    Packaging,
    Validation,
}

impl BuildPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildPhase::Preparation => "preparation",
            BuildPhase::Clone => "clone",
            BuildPhase::Backport => "backport",
            BuildPhase::Tags => "tags",
            BuildPhase::Configuration => "configuration",
            BuildPhase::Patching => "patching",
            BuildPhase::Building => "building",
            BuildPhase::Packaging => "packaging",
            BuildPhase::Validation => "validation",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(arch: Arch, host: Option<Arch>) -> BuildPlan {
        BuildPlan {
            arch,
            host_arch: host,
            stream: Stream::Y,
            repo: RepoChoice::Centos,
            fork: None,
            variant: Variant::default(),
            toggles: PhaseToggles::default(),
            patches_dir: None,
            jobs: 4,
            source_dir: PathBuf::from("/src/kernel"),
            build_dir: PathBuf::from("/build/kernel"),
            log_dir: PathBuf::from("/logs"),
        }
    }

    #[test]
    fn test_arch_roundtrip_names() {
        for arch in Arch::ALL {
            assert_eq!(arch.as_str().parse::<Arch>().unwrap(), arch);
        }
        assert_eq!(" AARCH64 ".parse::<Arch>().unwrap(), Arch::Aarch64);
    }

    #[test]
    fn test_unknown_values_rejected() {
        assert!("riscv64".parse::<Arch>().is_err());
        assert!("x".parse::<Stream>().is_err());
        assert!("fedora".parse::<RepoChoice>().is_err());
    }

    #[test]
    fn test_native_build_has_no_cross_prefix() {
        let native = plan(Arch::X86_64, Some(Arch::X86_64));
        assert_eq!(native.cross_compile(), None);
        assert_eq!(native.make_vars(), vec!["O=/build/kernel", "ARCH=x86"]);
    }

    #[test]
    fn test_cross_build_adds_prefix() {
        let cross = plan(Arch::Aarch64, Some(Arch::X86_64));
        assert_eq!(cross.cross_compile(), Some("aarch64-linux-gnu-"));
        assert!(cross
            .make_vars()
            .contains(&"CROSS_COMPILE=aarch64-linux-gnu-".to_string()));
    }

    #[test]
    fn test_variant_suffix_order() {
        let v = Variant { realtime: true, debug: true };
        assert_eq!(v.config_suffix(), "-rt-debug");
        assert_eq!(Variant::default().config_suffix(), "");
    }

    #[test]
    fn test_fork_replaces_group_only() {
        let mut p = plan(Arch::X86_64, Some(Arch::X86_64));
        p.fork = Some("jdoe".to_string());
        assert_eq!(p.origin_url(), "https://gitlab.com/jdoe/centos-stream-10.git");
        assert_eq!(
            p.upstream_url(),
            "https://gitlab.com/redhat/centos-stream/src/kernel/centos-stream-10.git"
        );
    }
}
