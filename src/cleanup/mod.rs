//! Cleanup Engine
//!
//! Three independently enabled passes, always in this order:
//!
//! 1. duplicates: later copies of identical content go to `quarantine/duplicates/`
//! 2. expiry: files older than the age limit go to `quarantine/expired/`
//! 3. empty folders: directories with no entries are removed, deepest first
//!
//! Each pass works from a fresh scan, so it sees what the previous one did.
//! Nothing is ever deleted outright except empty directories.

mod duplicates;
mod empty_dirs;
mod expiry;

pub use duplicates::*;
pub use empty_dirs::*;
pub use expiry::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::checksum::compute_digest;
use crate::config::CleanupPolicy;
use crate::events::{AutomationEvent, EventSink, QuarantineReason, Stage};
use crate::execution::MoveOutcome;
use crate::orchestrator::RunContext;
use crate::quarantine::QuarantineManager;
use crate::vfs::{FileRecord, TreeScanner, TreeSnapshot};

/// Outcome of the cleanup stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub duplicates_quarantined: usize,
    pub expired_quarantined: usize,
    pub folders_deleted: usize,
    pub skipped: usize,
    pub failures: usize,
    /// Pass that was about to start when cancellation was noticed
    pub cancelled_at: Option<Stage>,
}

/// Run the passes enabled by `policy`
pub fn cleanup(
    root: &Path,
    policy: &CleanupPolicy,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
) -> CleanupReport {
    let mut report = CleanupReport::default();

    if !policy.any_enabled() {
        return report;
    }

    let quarantine = QuarantineManager::for_root(root);
    if let Err(e) = quarantine.ensure_layout() {
        sink.emit(AutomationEvent::ItemFailed {
            stage: Stage::Duplicates,
            path: quarantine.base_path().to_path_buf(),
            error: e.to_string(),
        });
        report.failures += 1;
        return report;
    }

    if policy.remove_duplicates {
        if ctx.is_cancelled() {
            report.cancelled_at = Some(Stage::Duplicates);
            return report;
        }
        remove_duplicates(root, &quarantine, ctx, sink, &mut report);
    }

    if let Some(days) = policy.expiry_days() {
        if ctx.is_cancelled() {
            report.cancelled_at = Some(Stage::Expiry);
            return report;
        }
        quarantine_expired(root, &quarantine, days, ctx, sink, &mut report);
    }

    if policy.delete_empty_folders {
        if ctx.is_cancelled() {
            report.cancelled_at = Some(Stage::EmptyFolders);
            return report;
        }
        delete_empty_folders(root, &quarantine, sink, &mut report);
    }

    tracing::info!(
        "[Cleanup] {} duplicate(s), {} expired file(s) quarantined; {} folder(s) removed",
        report.duplicates_quarantined,
        report.expired_quarantined,
        report.folders_deleted
    );

    report
}

fn fresh_scan(root: &Path, stage: Stage, sink: &mut dyn EventSink, report: &mut CleanupReport) -> TreeSnapshot {
    let snapshot = TreeScanner::new(root).scan();
    for error in &snapshot.errors {
        sink.emit(AutomationEvent::ItemFailed {
            stage,
            path: error.path.clone(),
            error: error.message.clone(),
        });
        report.failures += 1;
    }
    snapshot
}

fn remove_duplicates(
    root: &Path,
    quarantine: &QuarantineManager,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
    report: &mut CleanupReport,
) {
    sink.emit(AutomationEvent::StageStarted {
        stage: Stage::Duplicates,
        detail: "scanning for duplicate content".to_string(),
    });

    let snapshot = fresh_scan(root, Stage::Duplicates, sink, report);
    let scan = find_duplicates(&snapshot.files, compute_digest);

    for failure in scan.failures {
        sink.emit(AutomationEvent::ItemFailed {
            stage: Stage::Duplicates,
            path: failure.path,
            error: failure.message,
        });
        report.failures += 1;
    }

    tracing::debug!(
        "[Cleanup] Hashed {} file(s), {} duplicate(s)",
        scan.hashed,
        scan.duplicates.len()
    );

    for duplicate in &scan.duplicates {
        tracing::debug!(
            "[Cleanup] {} duplicates {} ({})",
            duplicate.record.path.display(),
            duplicate.original.display(),
            duplicate.digest
        );
        if quarantine_one(
            quarantine,
            &duplicate.record,
            QuarantineReason::Duplicate,
            Stage::Duplicates,
            ctx,
            sink,
            report,
        ) {
            report.duplicates_quarantined += 1;
        }
    }
}

fn quarantine_expired(
    root: &Path,
    quarantine: &QuarantineManager,
    days: f64,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
    report: &mut CleanupReport,
) {
    sink.emit(AutomationEvent::StageStarted {
        stage: Stage::Expiry,
        detail: format!("older than {} day(s)", days),
    });

    let Some(cutoff) = ctx.cutoff(days) else {
        tracing::debug!("[Cleanup] Expiry age of {} day(s) reaches past any file, nothing to do", days);
        return;
    };
    let snapshot = fresh_scan(root, Stage::Expiry, sink, report);

    for record in select_expired(&snapshot.files, cutoff) {
        if quarantine_one(
            quarantine,
            record,
            QuarantineReason::Expired,
            Stage::Expiry,
            ctx,
            sink,
            report,
        ) {
            report.expired_quarantined += 1;
        }
    }
}

/// Returns true when the file actually moved
fn quarantine_one(
    quarantine: &QuarantineManager,
    record: &FileRecord,
    reason: QuarantineReason,
    stage: Stage,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
    report: &mut CleanupReport,
) -> bool {
    match quarantine.quarantine(record, reason, ctx.on_conflict) {
        Ok(MoveOutcome::Skipped(why)) => {
            sink.emit(AutomationEvent::FileSkipped {
                path: record.path.clone(),
                reason: why,
            });
            report.skipped += 1;
            false
        }
        Ok(outcome) => {
            let to = outcome
                .final_path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| quarantine.target_path(record, reason));
            sink.emit(AutomationEvent::FileQuarantined {
                from: record.path.clone(),
                to,
                reason,
            });
            true
        }
        Err(e) => {
            sink.emit(AutomationEvent::ItemFailed {
                stage,
                path: record.path.clone(),
                error: e.to_string(),
            });
            report.failures += 1;
            false
        }
    }
}

fn delete_empty_folders(
    root: &Path,
    quarantine: &QuarantineManager,
    sink: &mut dyn EventSink,
    report: &mut CleanupReport,
) {
    sink.emit(AutomationEvent::StageStarted {
        stage: Stage::EmptyFolders,
        detail: "removing empty folders".to_string(),
    });

    let snapshot = fresh_scan(root, Stage::EmptyFolders, sink, report);

    for dir in order_deepest_first(snapshot.dirs) {
        if quarantine.is_area_dir(&dir) {
            continue;
        }
        match remove_if_empty(&dir) {
            Ok(RemoveOutcome::Removed) => {
                tracing::debug!("[Cleanup] Removed empty folder {}", dir.display());
                sink.emit(AutomationEvent::FolderDeleted { path: dir });
                report.folders_deleted += 1;
            }
            Ok(RemoveOutcome::Untouched) => {}
            Err(e) => {
                sink.emit(AutomationEvent::ItemFailed {
                    stage: Stage::EmptyFolders,
                    path: dir,
                    error: e.to_string(),
                });
                report.failures += 1;
            }
        }
    }
}
