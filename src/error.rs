//! Unified error type hierarchy for kstream Builder
//!
//! Provides structured error handling with ConfigError, PreflightError,
//! PatchError, BuildError and the umbrella AppError that maps to exit codes.

use std::io;
use thiserror::Error;

use crate::kernel::git::GitError;

/// Run configuration errors: environment, enumeration values, paths, settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Required environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Invalid {kind} '{value}' (expected one of: {expected})")]
    InvalidValue {
        kind: &'static str,
        value: String,
        expected: String,
    },

    #[error("Invalid path for Kbuild: {0}")]
    InvalidPath(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid JSON in settings: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error during config operations: {0}")]
    IoError(#[from] io::Error),
}

/// Host tool availability errors.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error("Missing required host tools:\n{0}")]
    MissingTools(String),
}

/// Patch collection and mailbox apply errors.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("Patch directory not found: {0}")]
    DirNotFound(String),

    #[error("No patches found in {0}")]
    NoPatches(String),

    #[error("Patch application failed: {0}")]
    PatchFailed(String),

    #[error("IO error while reading patches: {0}")]
    IoError(#[from] io::Error),
}

/// Configure/build/package execution errors.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Preparation phase failed: {0}")]
    PreparationFailed(String),

    #[error("Configuration phase failed: {0}")]
    ConfigurationFailed(String),

    #[error("Command '{cmd}' failed: {reason}")]
    CommandFailed { cmd: String, reason: String },

    #[error("Required artifact missing: {0}")]
    ArtifactMissing(String),
}

/// Global error type for a run.
///
/// Every phase error converts into this and carries its exit code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Preflight(#[from] PreflightError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl AppError {
    /// Process exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Build(_) => 1,
            AppError::Config(_) => 2,
            AppError::Preflight(_) => 3,
            AppError::Git(_) | AppError::Patch(_) => 4,
        }
    }
}

/// Top-level result type for run operations.
pub type Result<T> = std::result::Result<T, AppError>;
