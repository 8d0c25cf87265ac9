//! Path validation for directories handed to Kbuild.

use crate::error::ConfigError;
use std::path::Path;

/// Validate that a path is safe to pass to Kbuild as `O=` or a source tree.
///
/// Kbuild breaks on relative paths, spaces and colons.
pub fn validate_kbuild_path(path: &Path) -> Result<(), ConfigError> {
    let path_str = path.to_str().ok_or_else(|| {
        ConfigError::InvalidPath("Path contains invalid UTF-8 characters".to_string())
    })?;

    if !path.is_absolute() {
        return Err(ConfigError::InvalidPath(format!(
            "Path must be absolute: {}",
            path_str
        )));
    }

    if path_str.contains(' ') {
        return Err(ConfigError::InvalidPath(format!(
            "Path contains spaces: {}",
            path_str
        )));
    }

    if path_str.contains(':') {
        return Err(ConfigError::InvalidPath(format!(
            "Path contains colons: {}",
            path_str
        )));
    }

    Ok(())
}

/// A fork namespace is a GitLab path: segments of [A-Za-z0-9._-] separated by '/'.
pub fn validate_fork_namespace(namespace: &str) -> Result<(), ConfigError> {
    let valid = !namespace.is_empty()
        && namespace.split('/').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        });

    if valid {
        Ok(())
    } else {
        Err(ConfigError::ValidationFailed(format!(
            "Invalid fork namespace: '{}'",
            namespace
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kbuild_path_accepts_plain_absolute() {
        assert!(validate_kbuild_path(Path::new("/home/dev/kernel")).is_ok());
    }

    #[test]
    fn test_kbuild_path_rejects_relative() {
        assert!(validate_kbuild_path(Path::new("kernel/src")).is_err());
    }

    #[test]
    fn test_kbuild_path_rejects_space_and_colon() {
        assert!(validate_kbuild_path(Path::new("/home/dev/my kernel")).is_err());
        assert!(validate_kbuild_path(Path::new("/home/dev/a:b")).is_err());
    }

    #[test]
    fn test_fork_namespace() {
        assert!(validate_fork_namespace("jdoe").is_ok());
        assert!(validate_fork_namespace("group/sub-group").is_ok());
        assert!(validate_fork_namespace("").is_err());
        assert!(validate_fork_namespace("bad name").is_err());
        assert!(validate_fork_namespace("trailing/").is_err());
    }
}
