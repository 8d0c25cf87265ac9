//! Kernel configuration management (base config selection and .config overrides)
//!
//! The base config comes from the tree's `redhat/configs/` (generated by
//! `make dist-configs`). A fixed override list is then written straight into
//! the `.config` text, replacing existing assignments in place, before
//! `olddefconfig` normalizes the result.

use crate::error::BuildError;
use crate::models::BuildPlan;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

// `CONFIG_FOO=value` or `# CONFIG_FOO is not set`
static CONFIG_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:# )?(CONFIG_[A-Za-z0-9_]+)(?:=.*| is not set)$")
        .expect("Invalid config line regex")
});

/// Value forced onto one Kconfig symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideValue {
    /// `# CONFIG_X is not set`
    Disable,
    /// `CONFIG_X="..."`
    Str(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOverride {
    pub option: &'static str,
    pub value: OverrideValue,
}

impl ConfigOverride {
    /// The `.config` line for this override.
    pub fn render(&self) -> String {
        match self.value {
            OverrideValue::Disable => format!("# {} is not set", self.option),
            OverrideValue::Str(s) => {
                let escaped = s.replace('\\', "\\\\").replace('"', "\\\"");
                format!("{}=\"{}\"", self.option, escaped)
            }
        }
    }
}

/// Applied to every configured tree.
pub const CONFIG_OVERRIDES: &[ConfigOverride] = &[
    ConfigOverride {
        option: "CONFIG_LOCALVERSION",
        value: OverrideValue::Str("-kstream"),
    },
    ConfigOverride {
        option: "CONFIG_LOCALVERSION_AUTO",
        value: OverrideValue::Disable,
    },
    ConfigOverride {
        option: "CONFIG_SYSTEM_TRUSTED_KEYS",
        value: OverrideValue::Str(""),
    },
    ConfigOverride {
        option: "CONFIG_SYSTEM_REVOCATION_KEYS",
        value: OverrideValue::Str(""),
    },
    ConfigOverride {
        option: "CONFIG_MODULE_SIG_KEY",
        value: OverrideValue::Str("certs/signing_key.pem"),
    },
    ConfigOverride {
        option: "CONFIG_DEBUG_INFO_BTF",
        value: OverrideValue::Disable,
    },
];

/// Absolute path of the base config inside the source tree.
pub fn base_config_path(plan: &BuildPlan) -> PathBuf {
    plan.source_dir.join(plan.base_config_name())
}

/// `.config` in the build output directory.
pub fn build_config_path(plan: &BuildPlan) -> PathBuf {
    plan.build_dir.join(".config")
}

/// Copy the stream/arch/variant base config to `<build>/.config`.
pub fn install_base_config(plan: &BuildPlan) -> Result<PathBuf, BuildError> {
    let base = base_config_path(plan);
    if !base.is_file() {
        return Err(BuildError::ConfigurationFailed(format!(
            "Base config not found: {} (did `make dist-configs` run for {}?)",
            base.display(),
            plan.arch
        )));
    }

    fs::create_dir_all(&plan.build_dir).map_err(|e| {
        BuildError::ConfigurationFailed(format!(
            "Failed to create build directory {}: {}",
            plan.build_dir.display(),
            e
        ))
    })?;

    let target = build_config_path(plan);
    fs::copy(&base, &target).map_err(|e| {
        BuildError::ConfigurationFailed(format!(
            "Failed to copy {} to {}: {}",
            base.display(),
            target.display(),
            e
        ))
    })?;
    log::info!("Base config {} -> {}", base.display(), target.display());
    Ok(target)
}

/// Apply overrides to `.config` text.
///
/// Existing assignments (set or `is not set`) are replaced where they stand;
/// symbols not present are appended. Applying twice yields the same text.
pub fn apply_overrides(content: &str, overrides: &[ConfigOverride]) -> String {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = String::with_capacity(content.len() + overrides.len() * 48);

    for line in content.lines() {
        let replacement = CONFIG_LINE_REGEX
            .captures(line)
            .and_then(|caps| caps.get(1))
            .and_then(|symbol| overrides.iter().find(|o| o.option == symbol.as_str()));

        match replacement {
            Some(o) if seen.insert(o.option) => out.push_str(&o.render()),
            // Drop duplicate assignments of an overridden symbol
            Some(_) => continue,
            None => out.push_str(line),
        }
        out.push('\n');
    }

    for o in overrides.iter().filter(|o| !seen.contains(o.option)) {
        out.push_str(&o.render());
        out.push('\n');
    }

    out
}

/// Apply overrides to a `.config` file in place.
pub fn apply_overrides_to_file(path: &Path, overrides: &[ConfigOverride]) -> Result<(), BuildError> {
    let content = fs::read_to_string(path).map_err(|e| {
        BuildError::ConfigurationFailed(format!("Failed to read {}: {}", path.display(), e))
    })?;
    fs::write(path, apply_overrides(&content, overrides)).map_err(|e| {
        BuildError::ConfigurationFailed(format!("Failed to write {}: {}", path.display(), e))
    })?;
    for o in overrides {
        log::debug!("Override {}", o.render());
    }
    log::info!("Applied {} config overrides to {}", overrides.len(), path.display());
    Ok(())
}
