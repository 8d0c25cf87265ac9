//! Orchestrator phases: the individual steps of a run.
//!
//! - **prep**: tool availability, source/build tree checks
//! - **source**: clone, backport remotes, tag index
//! - **configure**: base config, overrides, olddefconfig, menuconfig
//! - **build**: compile, binary RPMs, artifact validation
//!
//! Patch application lives in `kernel::patches`.

pub mod build;
pub mod configure;
pub mod prep;
pub mod source;

pub use build::Artifacts;
pub use prep::prepare_build_environment;
pub use source::CloneOutcome;
