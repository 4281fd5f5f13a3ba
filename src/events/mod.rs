//! Structured events emitted by the automation engines.
//!
//! Every engine takes an explicit `&mut dyn EventSink` instead of logging to
//! ambient global state, so callers decide where events go and tests can
//! assert on exactly what was reported.

mod sinks;

pub use sinks::*;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity attached to each event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Pipeline stage, used for stage and failure events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Archive,
    Organize,
    Duplicates,
    Expiry,
    EmptyFolders,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Archive => "archive",
            Stage::Organize => "organize",
            Stage::Duplicates => "duplicates",
            Stage::Expiry => "expiry",
            Stage::EmptyFolders => "empty folders",
        };
        f.write_str(name)
    }
}

/// Why a file was quarantined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineReason {
    Duplicate,
    Expired,
}

/// A significant action taken (or refused) during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutomationEvent {
    RunStarted {
        root: PathBuf,
    },
    RunFinished {
        root: PathBuf,
        failures: usize,
    },
    RunCancelled {
        stage: Stage,
    },
    StageStarted {
        stage: Stage,
        detail: String,
    },
    ArchiveCreated {
        folder: String,
        path: PathBuf,
        entries: usize,
    },
    ArchivePruned {
        path: PathBuf,
    },
    FolderMissing {
        folder: String,
        path: PathBuf,
    },
    ExclusionApplied {
        path: PathBuf,
        pattern: String,
    },
    RuleInvalid {
        stage: Stage,
        rule: String,
        reason: String,
    },
    FileMoved {
        from: PathBuf,
        to: PathBuf,
    },
    FileSkipped {
        path: PathBuf,
        reason: String,
    },
    FileQuarantined {
        from: PathBuf,
        to: PathBuf,
        reason: QuarantineReason,
    },
    FolderDeleted {
        path: PathBuf,
    },
    ItemFailed {
        stage: Stage,
        path: PathBuf,
        error: String,
    },
}

impl AutomationEvent {
    pub fn severity(&self) -> Severity {
        match self {
            AutomationEvent::FolderMissing { .. }
            | AutomationEvent::RuleInvalid { .. }
            | AutomationEvent::FileSkipped { .. }
            | AutomationEvent::RunCancelled { .. } => Severity::Warning,
            AutomationEvent::ItemFailed { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }

    /// Short machine-friendly name, matches the serde tag
    pub fn kind(&self) -> &'static str {
        match self {
            AutomationEvent::RunStarted { .. } => "run_started",
            AutomationEvent::RunFinished { .. } => "run_finished",
            AutomationEvent::RunCancelled { .. } => "run_cancelled",
            AutomationEvent::StageStarted { .. } => "stage_started",
            AutomationEvent::ArchiveCreated { .. } => "archive_created",
            AutomationEvent::ArchivePruned { .. } => "archive_pruned",
            AutomationEvent::FolderMissing { .. } => "folder_missing",
            AutomationEvent::ExclusionApplied { .. } => "exclusion_applied",
            AutomationEvent::RuleInvalid { .. } => "rule_invalid",
            AutomationEvent::FileMoved { .. } => "file_moved",
            AutomationEvent::FileSkipped { .. } => "file_skipped",
            AutomationEvent::FileQuarantined { .. } => "file_quarantined",
            AutomationEvent::FolderDeleted { .. } => "folder_deleted",
            AutomationEvent::ItemFailed { .. } => "item_failed",
        }
    }

    /// Human-readable message with the relevant paths
    pub fn message(&self) -> String {
        match self {
            AutomationEvent::RunStarted { root } => {
                format!("Automation started - root: {}", root.display())
            }
            AutomationEvent::RunFinished { root, failures } => {
                if *failures == 0 {
                    format!("Automation finished - root: {}", root.display())
                } else {
                    format!(
                        "Automation finished with {} failed item(s) - root: {}",
                        failures,
                        root.display()
                    )
                }
            }
            AutomationEvent::RunCancelled { stage } => {
                format!("Automation cancelled during {} stage", stage)
            }
            AutomationEvent::StageStarted { stage, detail } => {
                if detail.is_empty() {
                    format!("Starting {} stage", stage)
                } else {
                    format!("Starting {} stage ({})", stage, detail)
                }
            }
            AutomationEvent::ArchiveCreated {
                folder,
                path,
                entries,
            } => format!(
                "Backup created for {}: {} ({} entries)",
                folder,
                path.display(),
                entries
            ),
            AutomationEvent::ArchivePruned { path } => {
                format!("Old backup deleted: {}", path.display())
            }
            AutomationEvent::FolderMissing { folder, path } => {
                format!("Backup folder '{}' not found: {}", folder, path.display())
            }
            AutomationEvent::ExclusionApplied { path, pattern } => {
                format!("Excluded from backup: {} (pattern '{}')", path.display(), pattern)
            }
            AutomationEvent::RuleInvalid {
                stage,
                rule,
                reason,
            } => format!("Invalid {} rule {}: {}", stage, rule, reason),
            AutomationEvent::FileMoved { from, to } => {
                format!("File moved: {} -> {}", from.display(), to.display())
            }
            AutomationEvent::FileSkipped { path, reason } => {
                format!("File skipped: {} ({})", path.display(), reason)
            }
            AutomationEvent::FileQuarantined { from, to, reason } => {
                let label = match reason {
                    QuarantineReason::Duplicate => "duplicate",
                    QuarantineReason::Expired => "expired",
                };
                format!(
                    "Quarantined {} file: {} -> {}",
                    label,
                    from.display(),
                    to.display()
                )
            }
            AutomationEvent::FolderDeleted { path } => {
                format!("Empty folder deleted: {}", path.display())
            }
            AutomationEvent::ItemFailed { stage, path, error } => {
                format!("{} failed for {}: {}", stage, path.display(), error)
            }
        }
    }
}

impl fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity(), self.message())
    }
}

/// Destination for automation events
pub trait EventSink {
    fn emit(&mut self, event: AutomationEvent);
}

impl<S: EventSink + ?Sized> EventSink for Box<S> {
    fn emit(&mut self, event: AutomationEvent) {
        (**self).emit(event)
    }
}
