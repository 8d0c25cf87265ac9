//! kstream_builder: CentOS Stream / RHEL kernel build wrapper
//!
//! Clones the CentOS Stream or RHEL kernel tree, optionally wires up
//! backport remotes, configures it from the distribution's own configs,
//! applies local patches and builds the kernel (and binary RPMs) for a
//! native or cross target.
//!
//! The system is organized into functional modules:
//! - **error**: Unified error type hierarchy and exit codes
//! - **models**: Architectures, streams, repositories and the resolved build plan
//! - **config**: Settings file, environment and flag resolution
//! - **system**: Host preflight (required tool lookup)
//! - **kernel**: Git, Kconfig overrides, patches and artifact checks
//! - **orchestrator**: Tool execution and the phase pipeline
//! - **log_collector**: File-backed logger for the whole run

// Core foundational modules
pub mod error;
pub mod models;

// Settings, environment and flags
pub mod config;

// Host checks
pub mod system;

// Robust, decoupled logging system
pub mod log_collector;

// Kernel tree management
pub mod kernel;

// Phase pipeline and tool execution
pub mod orchestrator;

// Re-export the log crate for macro usage
pub use log;

// ============================================================================
// PUBLIC RE-EXPORTS FOR CONVENIENCE
// ============================================================================

pub use error::{AppError, BuildError, ConfigError, PatchError, PreflightError, Result};

pub use models::{Arch, BuildPhase, BuildPlan, PhaseToggles, RepoChoice, Stream, Variant};

pub use config::{resolve_plan, RunRequest, Settings};

pub use log_collector::{LogCollector, LogLine};

pub use orchestrator::{Invocation, Orchestrator, RunReport, SystemRunner, ToolOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
