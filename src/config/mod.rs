//! Run configuration: environment, settings file and flags → [`BuildPlan`].
//!
//! # Precedence
//!
//! 1. Command line flags
//! 2. `~/.config/kstream-builder/settings.json`
//! 3. Built-in defaults (host arch, Y-stream, CentOS repository, all CPUs)
//!
//! The source and build directories come only from the environment
//! (`KERNEL_SRC_DIR`, `KERNEL_BUILD_DIR`) and both are required.

pub mod loader;
pub mod validator;

use crate::error::ConfigError;
use crate::models::{Arch, BuildPlan, PhaseToggles, RepoChoice, Stream, Variant};
use std::io::Write;
use std::path::PathBuf;

pub use loader::Settings;

pub const ENV_SOURCE_DIR: &str = "KERNEL_SRC_DIR";
pub const ENV_BUILD_DIR: &str = "KERNEL_BUILD_DIR";
pub const ENV_LOG_DIR: &str = "KSTREAM_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "KSTREAM_LOG_LEVEL";

/// Raw, unvalidated request as it arrives from the command line.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub arch: Option<String>,
    pub stream: Option<String>,
    pub repo: Option<String>,
    pub fork: Option<String>,
    pub patches: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub clone: bool,
    pub configure: bool,
    pub backport: bool,
    pub build: bool,
    pub rpm: bool,
    pub menuconfig: bool,
    pub realtime: bool,
    pub debug: bool,
    pub tags: bool,
    /// Only print the resolved plan; no action flag is needed
    pub print_config: bool,
}

impl RunRequest {
    fn has_action(&self) -> bool {
        self.clone
            || self.configure
            || self.backport
            || self.build
            || self.rpm
            || self.menuconfig
            || self.tags
            || self.patches.is_some()
    }
}

/// Log directory: `KSTREAM_LOG_DIR`, then settings, then ~/kernel-builds/logs.
pub fn resolve_log_dir<E>(settings: &Settings, env: E) -> Result<PathBuf, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    if let Some(dir) = non_empty(env(ENV_LOG_DIR)) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(dir) = &settings.log_dir {
        return Ok(dir.clone());
    }
    crate::log_collector::get_global_logs_path().map_err(ConfigError::ValidationFailed)
}

/// Resolve a request into a validated plan.
///
/// `env` looks up environment variables; production passes
/// `|k| std::env::var(k).ok()`.
pub fn resolve_plan<E>(
    request: &RunRequest,
    settings: &Settings,
    env: E,
) -> Result<BuildPlan, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let host_arch = Arch::host();
    let arch = match request.arch.as_ref().or(settings.arch.as_ref()) {
        Some(value) => value.parse::<Arch>()?,
        None => host_arch.unwrap_or(Arch::X86_64),
    };
    let stream = match request.stream.as_ref().or(settings.stream.as_ref()) {
        Some(value) => value.parse::<Stream>()?,
        None => Stream::Y,
    };
    let repo = match request.repo.as_ref().or(settings.repo.as_ref()) {
        Some(value) => value.parse::<RepoChoice>()?,
        None => RepoChoice::Centos,
    };

    let fork = request
        .fork
        .clone()
        .or_else(|| settings.fork.clone())
        .map(|f| f.trim().trim_matches('/').to_string());
    if let Some(namespace) = &fork {
        validator::validate_fork_namespace(namespace)?;
    }

    let jobs = request
        .jobs
        .or(settings.jobs)
        .unwrap_or_else(num_cpus::get);
    if jobs == 0 {
        return Err(ConfigError::ValidationFailed(
            "Job count must be at least 1".to_string(),
        ));
    }

    let source_dir = required_dir(&env, ENV_SOURCE_DIR)?;
    let build_dir = required_dir(&env, ENV_BUILD_DIR)?;
    if source_dir == build_dir {
        return Err(ConfigError::ValidationFailed(format!(
            "{} and {} must differ (both are {})",
            ENV_SOURCE_DIR,
            ENV_BUILD_DIR,
            source_dir.display()
        )));
    }

    if !request.has_action() && !request.print_config {
        return Err(ConfigError::ValidationFailed(
            "Nothing to do: request at least one of --clone, --backport, --configure, \
             --menuconfig, --patches, --build, --rpm, --tags"
                .to_string(),
        ));
    }

    let toggles = PhaseToggles {
        clone: request.clone,
        backport: request.backport,
        configure: request.configure || request.menuconfig,
        menuconfig: request.menuconfig,
        build: request.build || request.rpm,
        rpm: request.rpm,
        tags: request.tags,
    };

    Ok(BuildPlan {
        arch,
        host_arch,
        stream,
        repo,
        fork,
        variant: Variant {
            realtime: request.realtime,
            debug: request.debug,
        },
        toggles,
        patches_dir: request.patches.clone(),
        jobs,
        source_dir,
        build_dir,
        log_dir: resolve_log_dir(settings, &env)?,
    })
}

/// Resolve the request into a plan to run.
///
/// With `--print-config` the plan is written to `out` as JSON instead and
/// `None` is returned: nothing is left to run.
pub fn resolve_or_print<E, W>(
    request: &RunRequest,
    settings: &Settings,
    env: E,
    out: &mut W,
) -> Result<Option<BuildPlan>, ConfigError>
where
    E: Fn(&str) -> Option<String>,
    W: Write,
{
    let plan = resolve_plan(request, settings, env)?;
    if request.print_config {
        print_plan(&plan, out)?;
        return Ok(None);
    }
    Ok(Some(plan))
}

/// The resolved plan as pretty JSON.
fn print_plan<W: Write>(plan: &BuildPlan, out: &mut W) -> Result<(), ConfigError> {
    serde_json::to_writer_pretty(&mut *out, plan)?;
    writeln!(out)?;
    Ok(())
}

fn required_dir<E>(env: &E, name: &str) -> Result<PathBuf, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let value = non_empty(env(name)).ok_or_else(|| ConfigError::MissingEnv(name.to_string()))?;
    let path = PathBuf::from(value.trim_end_matches('/'));
    validator::validate_kbuild_path(&path)?;
    Ok(path)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
