//! Kernel Source Management Module
//!
//! Handles interactions with the kernel source tree:
//! - Source URLs and backport remotes (`sources`)
//! - Clone, remotes and fetch through libgit2 (`git`)
//! - Base config selection and `.config` overrides (`kconfig`)
//! - Mailbox patch application (`patches`)
//! - Artifact verification (`validator`)

pub mod git;
pub mod kconfig;
pub mod patches;
pub mod sources;
pub mod validator;
