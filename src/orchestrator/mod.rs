//! Automation Orchestrator
//!
//! Runs Archive, Organize and Cleanup strictly in that order against one
//! workspace root. A stage whose configuration section is absent is skipped.
//! Per-item problems never abort the run; they arrive at the sink as events
//! and are tallied in the `RunReport`.

mod context;

pub use context::*;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::archive::{archive, ArchiveReport};
use crate::cleanup::{cleanup, CleanupReport};
use crate::config::{load_config, AutomationConfig};
use crate::error::{AutomationError, Result};
use crate::events::{AutomationEvent, EventSink, Stage};
use crate::organizer::{organize, OrganizeReport};

/// Summary of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub archive: Option<ArchiveReport>,
    pub organize: Option<OrganizeReport>,
    pub cleanup: Option<CleanupReport>,
    /// Stage during which cancellation was noticed
    pub cancelled_at: Option<Stage>,
}

impl RunReport {
    pub fn cancelled(&self) -> bool {
        self.cancelled_at.is_some()
    }

    /// Item-level failures across all stages
    pub fn failures(&self) -> usize {
        self.archive.as_ref().map_or(0, |r| r.failures)
            + self
                .organize
                .as_ref()
                .map_or(0, |r| r.failures + r.invalid_rules)
            + self.cleanup.as_ref().map_or(0, |r| r.failures)
    }
}

/// One workspace plus its configuration
#[derive(Debug, Clone)]
pub struct Automation {
    root: PathBuf,
    config: AutomationConfig,
}

impl Automation {
    pub fn new(root: impl Into<PathBuf>, config: AutomationConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    /// Check the root and load the configuration file.
    ///
    /// Every error here is fatal and happens before anything is touched.
    pub fn load(root: &Path, config_path: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(AutomationError::RootMissing(root.to_path_buf()));
        }
        let config = load_config(config_path)?;
        Ok(Self::new(root, config))
    }

    pub fn config(&self) -> &AutomationConfig {
        &self.config
    }

    /// Context for a run starting now, using the configured conflict policy
    pub fn context(&self) -> RunContext {
        RunContext::starting_now().with_conflict_policy(self.config.on_conflict)
    }

    /// Run every configured stage in order
    pub fn run(&self, ctx: &RunContext, sink: &mut dyn EventSink) -> RunReport {
        let mut report = RunReport::default();
        let root = self.root.as_path();

        sink.emit(AutomationEvent::RunStarted {
            root: self.root.clone(),
        });
        tracing::debug!(
            "[Automation] Run at {} with conflict policy {}",
            ctx.now.format("%Y-%m-%d %H:%M:%S"),
            ctx.on_conflict
        );

        if let Some(rule) = &self.config.backup_rules {
            if ctx.is_cancelled() {
                return self.cancel(report, Stage::Archive, sink);
            }
            let stage = archive(root, rule, ctx, sink);
            let cancelled = stage.cancelled;
            report.archive = Some(stage);
            if cancelled {
                return self.cancel(report, Stage::Archive, sink);
            }
        }

        let rules = self.config.organization_rules();
        if !rules.is_empty() {
            if ctx.is_cancelled() {
                return self.cancel(report, Stage::Organize, sink);
            }
            let stage = organize(root, rules, ctx, sink);
            let cancelled = stage.cancelled;
            report.organize = Some(stage);
            if cancelled {
                return self.cancel(report, Stage::Organize, sink);
            }
        }

        if let Some(policy) = &self.config.cleanup {
            let stage = cleanup(root, policy, ctx, sink);
            let cancelled_at = stage.cancelled_at;
            report.cleanup = Some(stage);
            if let Some(at) = cancelled_at {
                return self.cancel(report, at, sink);
            }
        }

        sink.emit(AutomationEvent::RunFinished {
            root: self.root.clone(),
            failures: report.failures(),
        });
        report
    }

    fn cancel(&self, mut report: RunReport, stage: Stage, sink: &mut dyn EventSink) -> RunReport {
        tracing::info!("[Automation] Cancelled at {} stage", stage);
        sink.emit(AutomationEvent::RunCancelled { stage });
        report.cancelled_at = Some(stage);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::compute_digest;
    use crate::config::{BackupRule, CleanupPolicy, FileOrganization, OrganizationRule};
    use crate::events::RecordingSink;
    use crate::execution::ConflictPolicy;
    use crate::vfs::TreeScanner;
    use chrono::{Datelike, Duration, Local};
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn full_config() -> AutomationConfig {
        AutomationConfig {
            backup_rules: Some(BackupRule {
                folder_names: vec!["docs".to_string()],
                exclude_patterns: vec!["*.tmp".to_string()],
                retention_days: 30,
            }),
            file_organization: Some(FileOrganization {
                rules: vec![OrganizationRule {
                    pattern: Some("*.log".to_string()),
                    destination: Some("archive_logs".to_string()),
                    older_than_days: Some(30.0),
                    bucket_by_year: true,
                }],
            }),
            cleanup: Some(CleanupPolicy {
                remove_duplicates: true,
                max_file_age_days: None,
                delete_empty_folders: true,
            }),
            on_conflict: ConflictPolicy::AutoRename,
        }
    }

    #[test]
    fn test_full_run() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();

        write(root, "docs/readme.md", "readme");
        write(root, "docs/draft.tmp", "scratch");
        let log = write(root, "logs/app.log", "log line");
        let then = now - Duration::days(40);
        set_file_mtime(&log, FileTime::from_unix_time(then.timestamp(), 0)).unwrap();
        let a = write(root, "a.txt", "identical");
        write(root, "b.txt", "identical");

        let automation = Automation::new(root, full_config());
        let ctx = RunContext::new(now);
        let mut sink = RecordingSink::new();
        let report = automation.run(&ctx, &mut sink);

        assert!(!report.cancelled());
        assert_eq!(report.failures(), 0);

        // Archive
        let archive = report.archive.as_ref().unwrap();
        assert_eq!(archive.created.len(), 1);
        assert_eq!(archive.created[0].entries, 1);

        // Organize, then the emptied logs/ folder is cleaned up
        let moved = root.join(format!("archive_logs/{}/app.log", then.year()));
        assert!(moved.exists());
        assert!(!root.join("logs").exists());

        // Duplicates
        let quarantined = root.join("quarantine/duplicates/b.txt");
        assert!(a.exists());
        assert!(quarantined.exists());
        assert_eq!(compute_digest(&a).unwrap(), compute_digest(&quarantined).unwrap());

        let events = sink.events();
        assert_eq!(events.first().unwrap().kind(), "run_started");
        assert_eq!(events.last().unwrap().kind(), "run_finished");
    }

    #[test]
    fn test_backups_survive_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "docs/one.txt", "same");
        write(root, "docs/two.txt", "same");

        let automation = Automation::new(root, full_config());
        let ctx = RunContext::new(Local::now());
        let first = automation.run(&ctx, &mut RecordingSink::new());
        let archive_path = first.archive.unwrap().created[0].path.clone();

        // The archive contains both copies; dedup happened afterwards
        let entries = crate::archive::list_archive_entries(&archive_path).unwrap();
        assert_eq!(entries, vec!["docs/one.txt", "docs/two.txt"]);
        assert!(archive_path.exists());
        assert!(root.join("quarantine/duplicates/two.txt").exists());

        let remaining = TreeScanner::new(root).scan();
        assert_eq!(remaining.files.len(), 1);
    }

    #[test]
    fn test_absent_sections_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "x.log", "x");
        fs::create_dir_all(root.join("empty")).unwrap();

        let automation = Automation::new(root, AutomationConfig::default());
        let mut sink = RecordingSink::new();
        let report = automation.run(&RunContext::new(Local::now()), &mut sink);

        assert!(report.archive.is_none());
        assert!(report.organize.is_none());
        assert!(report.cleanup.is_none());
        assert!(root.join("empty").exists());
        assert!(!root.join("backups").exists());
        assert!(!root.join("quarantine").exists());
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_cancellation_stops_before_any_stage() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        write(root, "docs/readme.md", "readme");

        let automation = Automation::new(root, full_config());
        let ctx = RunContext::new(Local::now());
        ctx.cancel.cancel();
        let mut sink = RecordingSink::new();
        let report = automation.run(&ctx, &mut sink);

        assert_eq!(report.cancelled_at, Some(Stage::Archive));
        assert!(report.archive.is_none());
        assert!(!root.join("backups").exists());
        assert_eq!(sink.events().last().unwrap().kind(), "run_cancelled");
    }

    #[test]
    fn test_huge_ages_touch_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        let log = write(root, "logs/app.log", "log line");
        set_file_mtime(&log, FileTime::from_unix_time(0, 0)).unwrap();
        write(root, "docs/readme.md", "readme");

        let mut config = full_config();
        if let Some(rule) = config.backup_rules.as_mut() {
            rule.retention_days = 100_000_000;
        }
        if let Some(organization) = config.file_organization.as_mut() {
            organization.rules[0].older_than_days = Some(1e9);
        }
        config.cleanup = Some(CleanupPolicy {
            remove_duplicates: false,
            max_file_age_days: Some(1e9),
            delete_empty_folders: false,
        });

        // An old archive that a representable cutoff would have pruned
        let stale = write(root, "backups/docs/docs_19700101_000000.tar.gz", "stale");
        set_file_mtime(&stale, FileTime::from_unix_time(0, 0)).unwrap();

        let automation = Automation::new(root, config);
        let mut sink = RecordingSink::new();
        let report = automation.run(&RunContext::new(now), &mut sink);

        assert!(!report.cancelled());
        assert_eq!(report.failures(), 0);
        assert_eq!(report.archive.as_ref().unwrap().pruned, 0);
        assert_eq!(report.organize.as_ref().unwrap().moved, 0);
        assert_eq!(report.cleanup.as_ref().unwrap().expired_quarantined, 0);
        assert!(stale.exists());
        assert!(log.exists());
        assert_eq!(sink.events().last().unwrap().kind(), "run_finished");
    }

    #[test]
    fn test_load_rejects_missing_root_and_config() {
        let temp_dir = TempDir::new().unwrap();
        let missing_root = temp_dir.path().join("nope");
        let config = temp_dir.path().join("automation_config.json");

        let err = Automation::load(&missing_root, &config).unwrap_err();
        assert!(matches!(err, AutomationError::RootMissing(_)));

        let err = Automation::load(temp_dir.path(), &config).unwrap_err();
        assert!(matches!(err, AutomationError::ConfigMissing(_)));

        fs::write(&config, r#"{"cleanup": {"delete_empty_folders": true}}"#).unwrap();
        let automation = Automation::load(temp_dir.path(), &config).unwrap();
        assert!(automation.config().cleanup.is_some());
    }
}
