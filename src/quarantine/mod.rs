//! Quarantine Module
//!
//! Files removed by cleanup policy are moved into a holding area under the
//! workspace root instead of being deleted:
//!
//! - `quarantine/duplicates/<filename>` - flat, one level
//! - `quarantine/expired/<relative path>` - mirrors the original tree
//!
//! Nothing in the engine ever deletes quarantine contents; an operator
//! reviews them (see `list`) and acts.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AutomationError, Result};
use crate::events::QuarantineReason;
use crate::execution::{move_file, ConflictPolicy, MoveOutcome};
use crate::security::QUARANTINE_DIR;
use crate::vfs::FileRecord;

/// Subdirectory for duplicate files
pub const DUPLICATES_DIR: &str = "duplicates";

/// Subdirectory for expired files
pub const EXPIRED_DIR: &str = "expired";

/// A quarantined file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantinedItem {
    /// Current path in quarantine
    pub path: PathBuf,

    /// Path inside its quarantine area
    pub relative: PathBuf,

    /// Which area holds it
    pub reason: QuarantineReason,

    /// Size in bytes
    pub size: u64,

    /// Modification time (preserved from the original file)
    pub modified: DateTime<Local>,
}

/// Totals per quarantine area
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarantineStats {
    pub duplicates: usize,
    pub expired: usize,
    pub total_bytes: u64,
}

/// Manages the quarantine areas of one workspace
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    /// Base path for quarantine storage (`<root>/quarantine`)
    base_path: PathBuf,
}

impl QuarantineManager {
    /// Quarantine rooted at `<root>/quarantine`
    pub fn for_root(root: &Path) -> Self {
        Self::with_base(root.join(QUARANTINE_DIR))
    }

    /// Quarantine at a custom location
    pub fn with_base(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the base quarantine path
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn duplicates_dir(&self) -> PathBuf {
        self.base_path.join(DUPLICATES_DIR)
    }

    pub fn expired_dir(&self) -> PathBuf {
        self.base_path.join(EXPIRED_DIR)
    }

    /// The area directory for a reason
    pub fn area(&self, reason: QuarantineReason) -> PathBuf {
        match reason {
            QuarantineReason::Duplicate => self.duplicates_dir(),
            QuarantineReason::Expired => self.expired_dir(),
        }
    }

    /// True for the two area directories themselves
    pub fn is_area_dir(&self, path: &Path) -> bool {
        path == self.duplicates_dir() || path == self.expired_dir()
    }

    /// Ensure both quarantine areas exist
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [self.duplicates_dir(), self.expired_dir()] {
            if !dir.exists() {
                fs::create_dir_all(&dir).map_err(|e| AutomationError::io(&dir, e))?;
            }
        }
        Ok(())
    }

    /// Where a file goes when quarantined for `reason`
    pub fn target_path(&self, record: &FileRecord, reason: QuarantineReason) -> PathBuf {
        match reason {
            QuarantineReason::Duplicate => self.duplicates_dir().join(record.file_name()),
            QuarantineReason::Expired => self.expired_dir().join(&record.relative),
        }
    }

    /// Move a file into quarantine
    ///
    /// # Returns
    /// * `Ok(MoveOutcome)` - Where the file went, or why it stayed
    /// * `Err(AutomationError)` - The move failed
    pub fn quarantine(
        &self,
        record: &FileRecord,
        reason: QuarantineReason,
        policy: ConflictPolicy,
    ) -> Result<MoveOutcome> {
        let target = self.target_path(record, reason);
        let outcome = move_file(&record.path, &target, policy)?;

        if let Some(final_path) = outcome.final_path() {
            tracing::debug!(
                "[Quarantine] Moved {} to {}",
                record.path.display(),
                final_path.display()
            );
        }

        Ok(outcome)
    }

    /// List all quarantined files, newest first
    pub fn list(&self) -> Result<Vec<QuarantinedItem>> {
        let mut items = Vec::new();

        for reason in [QuarantineReason::Duplicate, QuarantineReason::Expired] {
            let area = self.area(reason);
            if !area.exists() {
                continue;
            }

            for entry in walkdir::WalkDir::new(&area).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| area.clone());
                    AutomationError::io(&path, e.into())
                })?;

                if !entry.file_type().is_file() {
                    continue;
                }

                let metadata = entry
                    .metadata()
                    .map_err(|e| AutomationError::io(entry.path(), e.into()))?;
                let modified = metadata
                    .modified()
                    .map(DateTime::<Local>::from)
                    .map_err(|e| AutomationError::io(entry.path(), e))?;

                items.push(QuarantinedItem {
                    path: entry.path().to_path_buf(),
                    relative: entry
                        .path()
                        .strip_prefix(&area)
                        .unwrap_or(entry.path())
                        .to_path_buf(),
                    reason,
                    size: metadata.len(),
                    modified,
                });
            }
        }

        // Sort by modification date, newest first
        items.sort_by(|a, b| b.modified.cmp(&a.modified));

        Ok(items)
    }

    /// Count quarantined files per area
    pub fn stats(&self) -> Result<QuarantineStats> {
        let mut stats = QuarantineStats::default();
        for item in self.list()? {
            match item.reason {
                QuarantineReason::Duplicate => stats.duplicates += 1,
                QuarantineReason::Expired => stats.expired += 1,
            }
            stats.total_bytes += item.size;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_manager() -> (QuarantineManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let manager = QuarantineManager::for_root(temp_dir.path());
        (manager, temp_dir)
    }

    fn record_for(root: &Path, relative: &str, content: &[u8]) -> FileRecord {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        FileRecord {
            path,
            relative: PathBuf::from(relative),
            size: content.len() as u64,
            modified: Local::now(),
            digest: None,
        }
    }

    #[test]
    fn test_ensure_layout() {
        let (manager, temp_dir) = create_test_manager();
        manager.ensure_layout().unwrap();
        assert!(temp_dir.path().join("quarantine/duplicates").is_dir());
        assert!(temp_dir.path().join("quarantine/expired").is_dir());
        assert!(manager.is_area_dir(&temp_dir.path().join("quarantine/expired")));
        assert!(!manager.is_area_dir(&temp_dir.path().join("quarantine")));
    }

    #[test]
    fn test_duplicates_are_flat() {
        let (manager, temp_dir) = create_test_manager();
        let record = record_for(temp_dir.path(), "deep/nested/b.txt", b"Hello");

        let outcome = manager
            .quarantine(&record, QuarantineReason::Duplicate, ConflictPolicy::Overwrite)
            .unwrap();

        let expected = temp_dir.path().join("quarantine/duplicates/b.txt");
        assert_eq!(outcome, MoveOutcome::Moved(expected.clone()));
        assert!(!record.path.exists());
        assert!(expected.exists());
    }

    #[test]
    fn test_expired_preserves_structure() {
        let (manager, temp_dir) = create_test_manager();
        let record = record_for(temp_dir.path(), "old/reports/q1.csv", b"a,b");

        manager
            .quarantine(&record, QuarantineReason::Expired, ConflictPolicy::Overwrite)
            .unwrap();

        assert!(temp_dir
            .path()
            .join("quarantine/expired/old/reports/q1.csv")
            .exists());
    }

    #[test]
    fn test_same_name_duplicates_overwrite_under_overwrite_policy() {
        let (manager, temp_dir) = create_test_manager();
        let first = record_for(temp_dir.path(), "x/b.txt", b"first");
        let second = record_for(temp_dir.path(), "y/b.txt", b"second");

        manager
            .quarantine(&first, QuarantineReason::Duplicate, ConflictPolicy::Overwrite)
            .unwrap();
        manager
            .quarantine(&second, QuarantineReason::Duplicate, ConflictPolicy::Overwrite)
            .unwrap();

        let target = temp_dir.path().join("quarantine/duplicates/b.txt");
        assert_eq!(fs::read_to_string(&target).unwrap(), "second");
        assert_eq!(manager.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_and_stats() {
        let (manager, temp_dir) = create_test_manager();

        for i in 0..3 {
            let record = record_for(temp_dir.path(), &format!("list_test_{}.txt", i), b"1234");
            manager
                .quarantine(&record, QuarantineReason::Duplicate, ConflictPolicy::AutoRename)
                .unwrap();
        }
        let record = record_for(temp_dir.path(), "a/old.txt", b"xy");
        manager
            .quarantine(&record, QuarantineReason::Expired, ConflictPolicy::AutoRename)
            .unwrap();

        let items = manager.list().unwrap();
        assert_eq!(items.len(), 4);
        assert!(items
            .iter()
            .any(|i| i.reason == QuarantineReason::Expired && i.relative == PathBuf::from("a/old.txt")));

        let stats = manager.stats().unwrap();
        assert_eq!(stats.duplicates, 3);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.total_bytes, 14);
    }

    #[test]
    fn test_list_empty_quarantine() {
        let (manager, _temp_dir) = create_test_manager();
        assert!(manager.list().unwrap().is_empty());
    }
}
