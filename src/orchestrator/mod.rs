//! Build Orchestration: sequential phase pipeline
//! (Preparation -> Clone -> Tags -> Backport -> Configuration -> Patching ->
//! Building -> Packaging -> Validation).
//!
//! Only the phases the plan enables are run. The first failure stops the
//! pipeline; the [`RunReport`] records per-phase timings either way.

pub mod executor;
pub mod phases;

use crate::error::AppError;
use crate::kernel::patches::apply_patches;
use crate::models::{BuildPhase, BuildPlan};
use crate::system::preflight::find_tool;
use executor::ToolRunner;
use phases::Artifacts;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use executor::{Invocation, SystemRunner, ToolOutcome};

/// Timing of one finished (or failed) phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTiming {
    pub phase: BuildPhase,
    pub duration: Duration,
    pub ok: bool,
}

/// Outcome of a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    pub phases: Vec<PhaseTiming>,
    pub total: Duration,
    pub log_path: Option<PathBuf>,
    pub artifacts: Artifacts,
    /// First failure; the pipeline stops there
    pub failure: Option<(BuildPhase, AppError)>,
}

impl RunReport {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    /// 0 on success, otherwise the failing error's code.
    pub fn exit_code(&self) -> i32 {
        match &self.failure {
            None => 0,
            Some((_, err)) => err.exit_code(),
        }
    }

    /// Human-readable summary lines.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.phases.len() + 4);
        for timing in &self.phases {
            lines.push(format!(
                "  {:<14} {:>8}  {}",
                timing.phase.as_str(),
                format_duration(timing.duration),
                if timing.ok { "ok" } else { "FAILED" }
            ));
        }
        lines.push(format!("  {:<14} {:>8}", "total", format_duration(self.total)));
        if let Some(image) = &self.artifacts.image {
            lines.push(format!("  image: {}", image.display()));
        }
        if !self.artifacts.rpms.is_empty() {
            lines.push(format!("  rpms:  {} package(s)", self.artifacts.rpms.len()));
        }
        if let Some(path) = &self.log_path {
            lines.push(format!("  log:   {}", path.display()));
        }
        lines
    }

    /// Write the summary through the logger.
    pub fn log(&self) {
        log::info!("Run summary:");
        for line in self.summary_lines() {
            log::info!("{}", line);
        }
        match &self.failure {
            None => crate::log_parsed!("Run succeeded in {}", format_duration(self.total)),
            Some((phase, err)) => {
                log::error!("Run failed in {} phase: {}", phase, err);
                crate::log_parsed!("Run failed (exit code {})", err.exit_code());
            }
        }
    }
}

/// `1.5m` above one minute, otherwise `12.3s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs >= 60.0 {
        format!("{:.1}m", secs / 60.0)
    } else {
        format!("{:.1}s", secs)
    }
}

/// Phases the plan enables, in execution order.
pub fn planned_phases(plan: &BuildPlan) -> Vec<BuildPhase> {
    let t = &plan.toggles;
    let mut phases = vec![BuildPhase::Preparation];
    if t.clone {
        phases.push(BuildPhase::Clone);
    }
    if t.clone || t.tags {
        phases.push(BuildPhase::Tags);
    }
    if t.backport {
        phases.push(BuildPhase::Backport);
    }
    if t.configure {
        phases.push(BuildPhase::Configuration);
    }
    if plan.patches_dir.is_some() {
        phases.push(BuildPhase::Patching);
    }
    if t.build {
        phases.push(BuildPhase::Building);
    }
    if t.rpm {
        phases.push(BuildPhase::Packaging);
    }
    if t.build {
        phases.push(BuildPhase::Validation);
    }
    phases
}

type ToolLookup<'a> = Box<dyn Fn(&str) -> bool + 'a>;

/// Drives one run of the pipeline over a [`ToolRunner`].
pub struct Orchestrator<'a, R: ToolRunner> {
    plan: &'a BuildPlan,
    runner: R,
    tool_exists: ToolLookup<'a>,
    log_path: Option<PathBuf>,
}

impl<'a, R: ToolRunner> Orchestrator<'a, R> {
    pub fn new(plan: &'a BuildPlan, runner: R) -> Self {
        Orchestrator {
            plan,
            runner,
            tool_exists: Box::new(|cmd: &str| find_tool(cmd).is_some()),
            log_path: None,
        }
    }

    /// Replace the `$PATH` lookup used by preflight.
    pub fn with_tool_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> bool + 'a,
    {
        self.tool_exists = Box::new(lookup);
        self
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run every planned phase; stops at the first failure.
    pub async fn run(&self) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport {
            log_path: self.log_path.clone(),
            ..RunReport::default()
        };

        log::info!(
            "Target: {} {}-stream from {} ({} jobs)",
            self.plan.arch,
            self.plan.stream,
            self.plan.origin_url(),
            self.plan.jobs
        );

        for phase in planned_phases(self.plan) {
            crate::log_parsed!("PHASE: {}", phase);
            let phase_started = Instant::now();
            let result = self.execute_phase(phase, &mut report.artifacts).await;
            let duration = phase_started.elapsed();
            log::debug!("{} took {}", phase, format_duration(duration));

            report.phases.push(PhaseTiming {
                phase,
                duration,
                ok: result.is_ok(),
            });
            if let Err(err) = result {
                report.failure = Some((phase, err));
                break;
            }
        }

        report.total = started.elapsed();
        report
    }

    async fn execute_phase(
        &self,
        phase: BuildPhase,
        artifacts: &mut Artifacts,
    ) -> Result<(), AppError> {
        let plan = self.plan;
        match phase {
            BuildPhase::Preparation => {
                phases::prepare_build_environment(plan, |cmd| (self.tool_exists)(cmd))
            }
            BuildPhase::Clone => phases::source::clone_source(plan).map(|_| ()),
            BuildPhase::Tags => phases::source::generate_tags(plan, &self.runner).await,
            BuildPhase::Backport => phases::source::prepare_backport(plan).map(|count| {
                log::info!("{} backport remotes ready", count);
            }),
            BuildPhase::Configuration => phases::configure::configure(plan, &self.runner).await,
            BuildPhase::Patching => match &plan.patches_dir {
                Some(dir) => {
                    let applied = apply_patches(&self.runner, &plan.source_dir, dir).await?;
                    crate::log_parsed!("Applied {} patches", applied);
                    Ok(())
                }
                None => Ok(()),
            },
            BuildPhase::Building => phases::build::compile(plan, &self.runner).await,
            BuildPhase::Packaging => phases::build::package(plan, &self.runner).await,
            BuildPhase::Validation => {
                *artifacts = phases::build::validate(plan)?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use crate::models::{Arch, PhaseToggles, RepoChoice, Stream, Variant};

    fn plan(toggles: PhaseToggles) -> BuildPlan {
        BuildPlan {
            arch: Arch::Aarch64,
            host_arch: Some(Arch::X86_64),
            stream: Stream::Z,
            repo: RepoChoice::Rhel,
            fork: None,
            variant: Variant::default(),
            toggles,
            patches_dir: None,
            jobs: 4,
            source_dir: PathBuf::from("/work/src"),
            build_dir: PathBuf::from("/work/build"),
            log_dir: PathBuf::from("/work/logs"),
        }
    }

    #[test]
    fn test_planned_phases_order() {
        let mut p = plan(PhaseToggles {
            clone: true,
            backport: true,
            configure: true,
            build: true,
            rpm: true,
            ..Default::default()
        });
        p.patches_dir = Some(PathBuf::from("/work/patches"));
        assert_eq!(
            planned_phases(&p),
            vec![
                BuildPhase::Preparation,
                BuildPhase::Clone,
                BuildPhase::Tags,
                BuildPhase::Backport,
                BuildPhase::Configuration,
                BuildPhase::Patching,
                BuildPhase::Building,
                BuildPhase::Packaging,
                BuildPhase::Validation,
            ]
        );
    }

    #[test]
    fn test_planned_phases_tags_only() {
        let p = plan(PhaseToggles {
            tags: true,
            ..Default::default()
        });
        assert_eq!(
            planned_phases(&p),
            vec![BuildPhase::Preparation, BuildPhase::Tags]
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(12_340)), "12.3s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_report_exit_code() {
        let mut report = RunReport::default();
        assert!(report.success());
        assert_eq!(report.exit_code(), 0);

        report.failure = Some((
            BuildPhase::Validation,
            BuildError::ArtifactMissing("bzImage".into()).into(),
        ));
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_summary_lines() {
        let report = RunReport {
            phases: vec![PhaseTiming {
                phase: BuildPhase::Building,
                duration: Duration::from_secs(120),
                ok: false,
            }],
            total: Duration::from_secs(121),
            log_path: Some(PathBuf::from("/logs/kstream.log")),
            ..RunReport::default()
        };
        let lines = report.summary_lines();
        assert!(lines[0].contains("building"));
        assert!(lines[0].contains("2.0m"));
        assert!(lines[0].ends_with("FAILED"));
        assert!(lines.last().unwrap().contains("/logs/kstream.log"));
    }
}
