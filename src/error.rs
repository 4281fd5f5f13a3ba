//! Error types for the automation engine.
//!
//! Fatal errors (missing root or configuration) abort a run before any
//! mutation. Everything else is reported per item through the event sink and
//! never surfaces from `Automation::run`.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced by the automation engine
#[derive(Error, Debug)]
pub enum AutomationError {
    /// Workspace root does not exist or is not a directory
    #[error("workspace root does not exist: {}", .0.display())]
    RootMissing(PathBuf),

    /// Configuration file does not exist
    #[error("configuration file not found: {}", .0.display())]
    ConfigMissing(PathBuf),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Glob pattern could not be compiled
    #[error("invalid glob pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Filesystem error tied to a path
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Move target exists and the conflict policy is `fail`
    #[error("destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Archive could not be written or read
    #[error("archive error at {}: {message}", path.display())]
    Archive { path: PathBuf, message: String },
}

impl AutomationError {
    /// Wrap an `io::Error` with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        AutomationError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True when the underlying cause is a missing file or directory
    pub fn is_not_found(&self) -> bool {
        matches!(self, AutomationError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AutomationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display_includes_path() {
        let err = AutomationError::io(
            "/tmp/missing.txt",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let message = err.to_string();
        assert!(message.contains("/tmp/missing.txt"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_destination_exists_is_not_not_found() {
        let err = AutomationError::DestinationExists(PathBuf::from("a/b.txt"));
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "destination already exists: a/b.txt");
    }
}
