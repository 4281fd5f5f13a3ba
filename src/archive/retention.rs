//! Archive retention and inventory

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::writer::ARCHIVE_EXTENSION;
use crate::error::{AutomationError, Result};
use crate::events::{AutomationEvent, EventSink, Stage};
use crate::orchestrator::age_cutoff;
use crate::pattern::normalize_relative;
use crate::security::BACKUPS_DIR;
use walkdir::WalkDir;

/// Statistics from a pruning pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneStats {
    /// Archives deleted
    pub removed: usize,
    /// Archives inside the retention window
    pub kept: usize,
    /// Archives that could not be deleted
    pub errors: usize,
}

/// An archive found on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInfo {
    /// Backup folder the archive belongs to
    pub folder: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
}

fn has_archive_extension(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(&format!(".{}", ARCHIVE_EXTENSION)))
        .unwrap_or(false)
}

fn is_archive_file(path: &Path) -> bool {
    path.is_file() && has_archive_extension(path)
}

/// Delete archives in `dir` last modified strictly before `now - retention_days`.
///
/// `retention_days == 0` disables pruning. An archive that disappears before
/// it can be deleted counts as removed, not as an error.
pub fn prune_old_archives(
    dir: &Path,
    retention_days: u32,
    now: DateTime<Local>,
    sink: &mut dyn EventSink,
) -> PruneStats {
    let mut stats = PruneStats::default();

    if retention_days == 0 || !dir.is_dir() {
        return stats;
    }

    let Some(threshold) = age_cutoff(now, f64::from(retention_days)) else {
        return stats;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            sink.emit(AutomationEvent::ItemFailed {
                stage: Stage::Archive,
                path: dir.to_path_buf(),
                error: format!("failed to read archive directory: {}", e),
            });
            stats.errors += 1;
            return stats;
        }
    };

    // Sorted so events come out in a stable order
    let mut archives: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_archive_file(p))
        .collect();
    archives.sort();

    for path in archives {
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => DateTime::<Local>::from(t),
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => {
                sink.emit(AutomationEvent::ItemFailed {
                    stage: Stage::Archive,
                    path: path.clone(),
                    error: e.to_string(),
                });
                stats.errors += 1;
                continue;
            }
        };

        if modified >= threshold {
            stats.kept += 1;
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {}
            // Already gone - same end state
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                sink.emit(AutomationEvent::ItemFailed {
                    stage: Stage::Archive,
                    path: path.clone(),
                    error: format!("failed to delete old backup: {}", e),
                });
                stats.errors += 1;
                continue;
            }
        }

        stats.removed += 1;
        sink.emit(AutomationEvent::ArchivePruned { path });
    }

    stats
}

/// List every archive under `<root>/backups`, grouped by folder, oldest first.
///
/// Nested backup folders (`work/reports`) are found at any depth; `folder` is
/// the archive's directory relative to `backups/`.
pub fn list_archives(root: &Path) -> Result<Vec<ArchiveInfo>> {
    let backups = root.join(BACKUPS_DIR);
    let mut archives = Vec::new();

    if !backups.is_dir() {
        return Ok(archives);
    }

    for entry in WalkDir::new(&backups).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| backups.clone());
            AutomationError::io(&path, e.into())
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() || !has_archive_extension(path) {
            continue;
        }

        let folder = path
            .parent()
            .and_then(|parent| parent.strip_prefix(&backups).ok())
            .map(normalize_relative)
            .unwrap_or_default();
        // Archives sit inside a folder directory, never directly in backups/
        if folder.is_empty() {
            continue;
        }

        let metadata = entry
            .metadata()
            .map_err(|e| AutomationError::io(path, e.into()))?;
        let modified = metadata
            .modified()
            .map(DateTime::<Local>::from)
            .map_err(|e| AutomationError::io(path, e))?;

        archives.push(ArchiveInfo {
            folder,
            path: path.to_path_buf(),
            size: metadata.len(),
            modified,
        });
    }

    archives.sort_by(|a, b| a.folder.cmp(&b.folder).then(a.modified.cmp(&b.modified)));
    Ok(archives)
}
