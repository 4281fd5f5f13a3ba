//! Tree Scanner
//!
//! Walks a workspace with walkdir and collects regular files and directories
//! into a `TreeSnapshot`. Reserved areas (`backups/`, `quarantine/`) are pruned
//! from the walk entirely.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

use super::node::{FileRecord, ScanError};
use crate::security::PathValidator;

/// Configuration for a scan
#[derive(Debug, Clone)]
pub struct TreeScanner {
    /// Workspace root, base of every relative path
    root: PathBuf,

    /// Where the walk starts (root or a folder below it)
    start: PathBuf,
}

/// Statistics from a scan operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total_files: usize,
    pub total_dirs: usize,
    pub total_size_bytes: u64,
    pub scan_duration_ms: u64,
    pub errors: usize,
}

/// Result of a scan
#[derive(Debug, Clone, Default)]
pub struct TreeSnapshot {
    /// Regular files in traversal order
    pub files: Vec<FileRecord>,

    /// Directories below the start (absolute paths), in traversal order
    pub dirs: Vec<PathBuf>,

    /// Entries that could not be read
    pub errors: Vec<ScanError>,

    pub stats: ScanStats,
}

impl TreeScanner {
    /// Scan the whole workspace, skipping reserved areas
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            start: root.to_path_buf(),
        }
    }

    /// Start the walk at a folder below the root; relative paths stay root-based
    pub fn within(mut self, relative: &Path) -> Self {
        self.start = self.root.join(relative);
        self
    }

    /// Walk the tree and build a snapshot
    pub fn scan(&self) -> TreeSnapshot {
        let start_time = Instant::now();
        let mut snapshot = TreeSnapshot::default();

        let root = self.root.clone();

        let walker = WalkDir::new(&self.start)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e| !PathValidator::is_reserved_under(&root, e.path()));

        for entry_result in walker {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.start.clone());
                    tracing::debug!("Walk error at {}: {}", path.display(), e);
                    snapshot.errors.push(ScanError {
                        path,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            // Skip the start directory itself
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                snapshot.dirs.push(entry.path().to_path_buf());
                snapshot.stats.total_dirs += 1;
                continue;
            }

            // Symlinks and special files are never touched
            if !file_type.is_file() {
                continue;
            }

            match self.create_record(&entry) {
                Ok(record) => {
                    snapshot.stats.total_files += 1;
                    snapshot.stats.total_size_bytes += record.size;
                    snapshot.files.push(record);
                }
                Err(message) => {
                    snapshot.errors.push(ScanError {
                        path: entry.path().to_path_buf(),
                        message,
                    });
                }
            }
        }

        snapshot.stats.errors = snapshot.errors.len();
        snapshot.stats.scan_duration_ms = start_time.elapsed().as_millis() as u64;

        tracing::debug!(
            "[Scanner] Scanned {} files, {} dirs under {} in {}ms",
            snapshot.stats.total_files,
            snapshot.stats.total_dirs,
            self.start.display(),
            snapshot.stats.scan_duration_ms
        );

        snapshot
    }

    /// Build a FileRecord from a walkdir entry
    fn create_record(&self, entry: &walkdir::DirEntry) -> Result<FileRecord, String> {
        let path = entry.path();
        let metadata = entry
            .metadata()
            .map_err(|e| format!("Failed to get metadata: {}", e))?;

        let modified = metadata
            .modified()
            .map_err(|e| format!("Modification time unavailable: {}", e))?;

        let relative = path
            .strip_prefix(&self.root)
            .map_err(|_| format!("Path escapes workspace root: {}", path.display()))?
            .to_path_buf();

        Ok(FileRecord {
            path: path.to_path_buf(),
            relative,
            size: metadata.len(),
            modified: DateTime::<Local>::from(modified),
            digest: None,
        })
    }
}
