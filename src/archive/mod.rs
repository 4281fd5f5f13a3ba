//! Archive Engine
//!
//! Packages each configured backup folder into
//! `backups/<folder>/<folder>_<YYYYMMDD_HHMMSS>.tar.gz`, honoring exclusion
//! patterns, then prunes that folder's archives older than the retention
//! window. A problem with one folder never stops the others.

mod retention;
mod writer;

pub use retention::*;
pub use writer::{list_archive_entries, write_archive, ARCHIVE_EXTENSION};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::BackupRule;
use crate::events::{AutomationEvent, EventSink, Stage};
use crate::orchestrator::RunContext;
use crate::pattern::PatternSet;
use crate::security::BACKUPS_DIR;
use crate::vfs::{FileRecord, TreeScanner};

/// An archive produced by this run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub folder: String,
    pub path: PathBuf,
    pub created_at: DateTime<Local>,
    pub entries: usize,
    pub excluded: usize,
}

/// Outcome of the archive stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReport {
    pub created: Vec<ArchiveRecord>,
    pub pruned: usize,
    pub missing_folders: usize,
    pub failures: usize,
    pub cancelled: bool,
}

/// `<folder>_<YYYYMMDD_HHMMSS>`, with path separators flattened to `_`
pub fn archive_base_name(folder: &Path, timestamp: DateTime<Local>) -> String {
    let flat = folder
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("_");
    format!("{}_{}", flat, timestamp.format("%Y%m%d_%H%M%S"))
}

/// Pick a free archive path; same-second runs get `_1`, `_2`, ... suffixes
fn unique_archive_path(dir: &Path, base_name: &str) -> PathBuf {
    let first = dir.join(format!("{}.{}", base_name, ARCHIVE_EXTENSION));
    if !first.exists() {
        return first;
    }

    let mut counter = 1;
    loop {
        let candidate = dir.join(format!("{}_{}.{}", base_name, counter, ARCHIVE_EXTENSION));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Directory holding a folder's archives
pub fn archive_dir(root: &Path, folder: &Path) -> PathBuf {
    root.join(BACKUPS_DIR).join(folder)
}

/// Archive every folder of the rule, then prune each folder's old archives
pub fn archive(
    root: &Path,
    rule: &BackupRule,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
) -> ArchiveReport {
    let mut report = ArchiveReport::default();

    if rule.folder_names.is_empty() {
        return report;
    }

    sink.emit(AutomationEvent::StageStarted {
        stage: Stage::Archive,
        detail: format!("targets: {}", rule.folder_names.join(", ")),
    });

    let exclusions = match PatternSet::new(&rule.exclude_patterns) {
        Ok(set) => set,
        Err(e) => {
            sink.emit(AutomationEvent::RuleInvalid {
                stage: Stage::Archive,
                rule: format!("exclude_patterns {:?}", rule.exclude_patterns),
                reason: e.to_string(),
            });
            report.failures += 1;
            return report;
        }
    };

    for folder_name in &rule.folder_names {
        if ctx.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let relative = match BackupRule::validate_folder(folder_name) {
            Ok(relative) => relative,
            Err(reason) => {
                sink.emit(AutomationEvent::RuleInvalid {
                    stage: Stage::Archive,
                    rule: format!("folder '{}'", folder_name),
                    reason,
                });
                report.failures += 1;
                continue;
            }
        };

        let target_dir = root.join(&relative);
        if !target_dir.is_dir() {
            sink.emit(AutomationEvent::FolderMissing {
                folder: folder_name.clone(),
                path: target_dir,
            });
            report.missing_folders += 1;
            continue;
        }

        match archive_folder(root, &relative, folder_name, &exclusions, ctx.now, sink) {
            Some(record) => report.created.push(record),
            None => report.failures += 1,
        }

        let stats = prune_old_archives(
            &archive_dir(root, &relative),
            rule.retention_days,
            ctx.now,
            sink,
        );
        report.pruned += stats.removed;
        report.failures += stats.errors;
    }

    tracing::info!(
        "[Archive] {} archive(s) created, {} pruned",
        report.created.len(),
        report.pruned
    );

    report
}

/// Build one folder's archive. Failures are reported to the sink.
fn archive_folder(
    root: &Path,
    relative: &Path,
    folder_name: &str,
    exclusions: &PatternSet,
    now: DateTime<Local>,
    sink: &mut dyn EventSink,
) -> Option<ArchiveRecord> {
    let snapshot = TreeScanner::new(root).within(relative).scan();
    for error in &snapshot.errors {
        sink.emit(AutomationEvent::ItemFailed {
            stage: Stage::Archive,
            path: error.path.clone(),
            error: error.message.clone(),
        });
    }

    let mut included: Vec<&FileRecord> = Vec::with_capacity(snapshot.files.len());
    let mut excluded = 0;
    for record in &snapshot.files {
        if let Some(pattern) = exclusions.first_match(&record.relative) {
            sink.emit(AutomationEvent::ExclusionApplied {
                path: record.relative.clone(),
                pattern: pattern.to_string(),
            });
            excluded += 1;
            continue;
        }
        included.push(record);
    }

    let dir = archive_dir(root, relative);
    if let Err(e) = fs::create_dir_all(&dir) {
        sink.emit(AutomationEvent::ItemFailed {
            stage: Stage::Archive,
            path: dir,
            error: format!("failed to create backup directory: {}", e),
        });
        return None;
    }

    let destination = unique_archive_path(&dir, &archive_base_name(relative, now));
    match write_archive(&destination, &included) {
        Ok(entries) => {
            sink.emit(AutomationEvent::ArchiveCreated {
                folder: folder_name.to_string(),
                path: destination.clone(),
                entries,
            });
            Some(ArchiveRecord {
                folder: folder_name.to_string(),
                path: destination,
                created_at: now,
                entries,
                excluded,
            })
        }
        Err(e) => {
            sink.emit(AutomationEvent::ItemFailed {
                stage: Stage::Archive,
                path: destination,
                error: e.to_string(),
            });
            None
        }
    }
}
