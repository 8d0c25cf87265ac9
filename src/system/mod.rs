//! System module: host tool checks

pub mod preflight;

pub use preflight::{check_required_tools_with, find_tool, required_tools, RequiredTool};
