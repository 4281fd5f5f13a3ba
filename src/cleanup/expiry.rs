//! Age-based expiry selection

use chrono::{DateTime, Local};

use crate::vfs::FileRecord;

/// Files last modified strictly before `cutoff`, in snapshot order
pub fn select_expired(files: &[FileRecord], cutoff: DateTime<Local>) -> Vec<&FileRecord> {
    files.iter().filter(|f| f.is_older_than(cutoff)).collect()
}
