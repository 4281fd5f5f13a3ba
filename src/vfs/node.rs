//! Snapshot records

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A regular file seen during a scan. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,

    /// Path relative to the workspace root
    pub relative: PathBuf,

    /// Size in bytes
    pub size: u64,

    /// Last modification time, local timezone
    pub modified: DateTime<Local>,

    /// Content digest, filled in by the duplicate pass
    pub digest: Option<String>,
}

impl FileRecord {
    /// Bare file name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Calendar year of the modification time
    pub fn modified_year(&self) -> i32 {
        self.modified.year()
    }

    /// Strictly older than the cutoff
    pub fn is_older_than(&self, cutoff: DateTime<Local>) -> bool {
        self.modified < cutoff
    }
}

/// An entry that could not be read during a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanError {
    pub path: PathBuf,
    pub message: String,
}
