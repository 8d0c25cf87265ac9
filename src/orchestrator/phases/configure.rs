//! Phase: Configuration - base config, overrides, olddefconfig, menuconfig.

use crate::error::AppError;
use crate::kernel::kconfig::{apply_overrides_to_file, install_base_config, CONFIG_OVERRIDES};
use crate::models::BuildPlan;
use crate::orchestrator::executor::{Invocation, ToolRunner};

/// `make dist-configs`: generates `redhat/configs/*.config` in the tree.
pub fn dist_configs_invocation(plan: &BuildPlan) -> Invocation {
    Invocation::new("make", &plan.source_dir).arg("dist-configs")
}

/// `make O=.. ARCH=.. [CROSS_COMPILE=..] <target>` for a Kconfig target.
pub fn kconfig_invocation(plan: &BuildPlan, target: &str) -> Invocation {
    Invocation::new("make", &plan.source_dir)
        .args(plan.make_vars())
        .arg(target)
}

pub async fn configure<R: ToolRunner>(plan: &BuildPlan, runner: &R) -> Result<(), AppError> {
    runner.run_checked(&dist_configs_invocation(plan)).await?;

    let config = install_base_config(plan)?;
    apply_overrides_to_file(&config, CONFIG_OVERRIDES)?;

    runner
        .run_checked(&kconfig_invocation(plan, "olddefconfig"))
        .await?;

    if plan.toggles.menuconfig {
        crate::log_parsed!("Starting menuconfig");
        runner
            .run_checked(&kconfig_invocation(plan, "menuconfig").interactive())
            .await?;
    }
    Ok(())
}
