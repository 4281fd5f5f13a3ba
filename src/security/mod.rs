//! Path safety for configured locations.
//!
//! Configuration supplies folder names and destinations as strings; they must
//! stay inside the workspace root and must never point into the areas the
//! engine itself writes to.

use std::path::{Component, Path, PathBuf};

/// Top-level directory holding archives
pub const BACKUPS_DIR: &str = "backups";

/// Top-level directory holding quarantined files
pub const QUARANTINE_DIR: &str = "quarantine";

/// Security validator for configured paths
pub struct PathValidator;

impl PathValidator {
    /// Validate a root-relative path from configuration.
    ///
    /// Rejects absolute paths, drive prefixes and `..` components; strips `.`
    /// components and trailing separators.
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - The normalized relative path
    /// * `Err(String)` - Reason the path was rejected
    pub fn validate_relative(raw: &str) -> Result<PathBuf, String> {
        let path = Path::new(raw.trim());
        let mut normalized = PathBuf::new();

        for component in path.components() {
            match component {
                Component::Normal(part) => normalized.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(format!("Path traversal not allowed: {}", raw));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(format!("Path must be relative to the workspace root: {}", raw));
                }
            }
        }

        if normalized.as_os_str().is_empty() {
            return Err(format!("Path resolves to the workspace root itself: '{}'", raw));
        }

        Ok(normalized)
    }

    /// True when a root-relative path lies in `backups/` or `quarantine/`
    pub fn is_reserved(relative: &Path) -> bool {
        match relative.components().next() {
            Some(Component::Normal(first)) => first == BACKUPS_DIR || first == QUARANTINE_DIR,
            _ => false,
        }
    }

    /// True when an absolute path lies in a reserved area of `root`
    pub fn is_reserved_under(root: &Path, path: &Path) -> bool {
        path.strip_prefix(root)
            .map(Self::is_reserved)
            .unwrap_or(false)
    }

    /// Component-wise containment check (`a/bc` is not inside `a/b`)
    pub fn is_within(path: &Path, base: &Path) -> bool {
        path.starts_with(base)
    }
}
