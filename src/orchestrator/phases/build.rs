//! Phases: Building, Packaging and Validation.

use crate::error::AppError;
use crate::kernel::validator::{verify_image, verify_rpms};
use crate::models::BuildPlan;
use crate::orchestrator::executor::{Invocation, ToolRunner};
use std::path::PathBuf;

/// `make -j<jobs> O=.. ARCH=.. [CROSS_COMPILE=..] [target]`
pub fn make_invocation(plan: &BuildPlan, target: Option<&str>) -> Invocation {
    let inv = Invocation::new("make", &plan.source_dir)
        .arg(format!("-j{}", plan.jobs))
        .args(plan.make_vars());
    match target {
        Some(t) => inv.arg(t),
        None => inv,
    }
}

pub async fn compile<R: ToolRunner>(plan: &BuildPlan, runner: &R) -> Result<(), AppError> {
    runner.run_checked(&make_invocation(plan, None)).await?;
    Ok(())
}

pub async fn package<R: ToolRunner>(plan: &BuildPlan, runner: &R) -> Result<(), AppError> {
    runner
        .run_checked(&make_invocation(plan, Some("binrpm-pkg")))
        .await?;
    Ok(())
}

/// Verified artifacts of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Artifacts {
    pub image: Option<PathBuf>,
    pub rpms: Vec<PathBuf>,
}

/// Image must exist; RPMs too when packaging was requested.
pub fn validate(plan: &BuildPlan) -> Result<Artifacts, AppError> {
    let image = verify_image(plan)?;
    log::info!("Kernel image: {}", image.display());
    let rpms = if plan.toggles.rpm {
        let rpms = verify_rpms(plan)?;
        for rpm in &rpms {
            log::info!("RPM: {}", rpm.display());
        }
        rpms
    } else {
        Vec::new()
    };
    Ok(Artifacts {
        image: Some(image),
        rpms,
    })
}
