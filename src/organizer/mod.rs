//! Organizer
//!
//! Relocates files matching a rule's pattern into the rule's destination,
//! optionally only when older than a threshold and optionally bucketed into
//! a per-year subfolder. Files already under the destination are left alone,
//! which makes a second run over an unchanged tree a no-op.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{OrganizationRule, ValidRule};
use crate::events::{AutomationEvent, EventSink, Stage};
use crate::execution::{move_file, MoveOutcome};
use crate::orchestrator::{age_cutoff, RunContext};
use crate::security::PathValidator;
use crate::vfs::{FileRecord, TreeScanner};

/// One move the organizer intends to make
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedMove {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Source path relative to the workspace root
    pub relative: PathBuf,
}

/// Outcome of the organize stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizeReport {
    pub moved: usize,
    pub skipped: usize,
    pub failures: usize,
    pub invalid_rules: usize,
    pub cancelled: bool,
}

/// Compute the moves one rule implies for a snapshot.
///
/// Nothing touches the filesystem here.
pub fn plan_moves(
    files: &[FileRecord],
    rule: &ValidRule,
    root: &Path,
    now: DateTime<Local>,
) -> Vec<PlannedMove> {
    // Outer None: no age filter. Inner None: cutoff predates the calendar, nothing qualifies
    let cutoff = rule.older_than_days.map(|days| age_cutoff(now, days));
    let dest_root = root.join(&rule.destination);

    files
        .iter()
        .filter(|record| rule.pattern.matches(&record.relative))
        .filter(|record| !PathValidator::is_within(&record.relative, &rule.destination))
        .filter(|record| match cutoff {
            None => true,
            Some(Some(cutoff)) => record.is_older_than(cutoff),
            Some(None) => false,
        })
        .map(|record| {
            let mut destination = dest_root.clone();
            if rule.bucket_by_year {
                destination.push(record.modified_year().to_string());
            }
            destination.push(record.file_name());

            PlannedMove {
                source: record.path.clone(),
                destination,
                relative: record.relative.clone(),
            }
        })
        .collect()
}

/// Apply every organization rule in order
pub fn organize(
    root: &Path,
    rules: &[OrganizationRule],
    ctx: &RunContext,
    sink: &mut dyn EventSink,
) -> OrganizeReport {
    let mut report = OrganizeReport::default();

    if rules.is_empty() {
        return report;
    }

    sink.emit(AutomationEvent::StageStarted {
        stage: Stage::Organize,
        detail: format!("{} rule(s)", rules.len()),
    });

    for rule in rules {
        if ctx.is_cancelled() {
            report.cancelled = true;
            break;
        }

        let valid = match rule.validate() {
            Ok(valid) => valid,
            Err(reason) => {
                sink.emit(AutomationEvent::RuleInvalid {
                    stage: Stage::Organize,
                    rule: rule.describe(),
                    reason,
                });
                report.invalid_rules += 1;
                continue;
            }
        };

        // Earlier rules may have moved files, so each rule sees a fresh tree
        let snapshot = TreeScanner::new(root).scan();
        for error in &snapshot.errors {
            sink.emit(AutomationEvent::ItemFailed {
                stage: Stage::Organize,
                path: error.path.clone(),
                error: error.message.clone(),
            });
            report.failures += 1;
        }

        let plan = plan_moves(&snapshot.files, &valid, root, ctx.now);
        tracing::debug!(
            "[Organizer] Rule '{}' -> {}: {} candidate(s)",
            valid.pattern.as_str(),
            valid.destination.display(),
            plan.len()
        );

        for planned in plan {
            apply_move(&planned, ctx, sink, &mut report);
        }
    }

    tracing::info!(
        "[Organizer] {} moved, {} skipped, {} failed",
        report.moved,
        report.skipped,
        report.failures
    );

    report
}

fn apply_move(
    planned: &PlannedMove,
    ctx: &RunContext,
    sink: &mut dyn EventSink,
    report: &mut OrganizeReport,
) {
    match move_file(&planned.source, &planned.destination, ctx.on_conflict) {
        Ok(MoveOutcome::Skipped(reason)) => {
            sink.emit(AutomationEvent::FileSkipped {
                path: planned.source.clone(),
                reason,
            });
            report.skipped += 1;
        }
        Ok(outcome) => {
            let to = outcome
                .final_path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| planned.destination.clone());
            sink.emit(AutomationEvent::FileMoved {
                from: planned.source.clone(),
                to,
            });
            report.moved += 1;
        }
        Err(e) => {
            sink.emit(AutomationEvent::ItemFailed {
                stage: Stage::Organize,
                path: planned.source.clone(),
                error: e.to_string(),
            });
            report.failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingSink;
    use crate::execution::ConflictPolicy;
    use chrono::{Datelike, Duration, TimeZone};
    use filetime::{set_file_mtime, FileTime};
    use std::fs;
    use tempfile::TempDir;

    fn write_aged(root: &Path, relative: &str, age: Duration, now: DateTime<Local>) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, relative).unwrap();
        let when = now - age;
        set_file_mtime(&path, FileTime::from_unix_time(when.timestamp(), 0)).unwrap();
        path
    }

    fn rule(pattern: &str, destination: &str, older_than_days: Option<f64>, by_year: bool) -> OrganizationRule {
        OrganizationRule {
            pattern: Some(pattern.to_string()),
            destination: Some(destination.to_string()),
            older_than_days,
            bucket_by_year: by_year,
        }
    }

    fn record(relative: &str, modified: DateTime<Local>) -> FileRecord {
        FileRecord {
            path: PathBuf::from("/ws").join(relative),
            relative: PathBuf::from(relative),
            size: 1,
            modified,
            digest: None,
        }
    }

    #[test]
    fn test_plan_applies_pattern_age_and_year() {
        let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let files = vec![
            record("logs/old.log", Local.with_ymd_and_hms(2023, 1, 5, 9, 0, 0).unwrap()),
            record("logs/new.log", now - Duration::days(2)),
            record("notes.txt", Local.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            record("archive_logs/2022/kept.log", Local.with_ymd_and_hms(2022, 3, 1, 0, 0, 0).unwrap()),
        ];
        let valid = rule("*.log", "archive_logs", Some(30.0), true).validate().unwrap();

        let plan = plan_moves(&files, &valid, Path::new("/ws"), now);

        assert_eq!(
            plan,
            vec![PlannedMove {
                source: PathBuf::from("/ws/logs/old.log"),
                destination: PathBuf::from("/ws/archive_logs/2023/old.log"),
                relative: PathBuf::from("logs/old.log"),
            }]
        );
    }

    #[test]
    fn test_age_filter_is_strict() {
        let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let files = vec![record("a.log", now - Duration::days(30))];
        let valid = rule("*.log", "out", Some(30.0), false).validate().unwrap();
        assert!(plan_moves(&files, &valid, Path::new("/ws"), now).is_empty());

        let files = vec![record("a.log", now - Duration::days(30) - Duration::seconds(1))];
        let plan = plan_moves(&files, &valid, Path::new("/ws"), now);
        assert_eq!(plan[0].destination, PathBuf::from("/ws/out/a.log"));
    }

    #[test]
    fn test_age_beyond_calendar_plans_nothing() {
        let now = Local.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let files = vec![record("old.log", Local.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap())];

        let valid = rule("*.log", "out", Some(1e9), false).validate().unwrap();
        assert!(plan_moves(&files, &valid, Path::new("/ws"), now).is_empty());

        let valid = rule("*.log", "out", Some(f64::MAX), false).validate().unwrap();
        assert!(plan_moves(&files, &valid, Path::new("/ws"), now).is_empty());
    }

    #[test]
    fn test_organize_logs_into_year_folders() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        let source = write_aged(root, "logs/app.log", Duration::days(40), now);
        let year = (now - Duration::days(40)).year();

        let ctx = RunContext::new(now);
        let mut sink = RecordingSink::new();
        let report = organize(
            root,
            &[rule("*.log", "archive_logs", Some(30.0), true)],
            &ctx,
            &mut sink,
        );

        let expected = root.join(format!("archive_logs/{}/app.log", year));
        assert_eq!(report.moved, 1);
        assert!(!source.exists());
        assert!(expected.exists());
        assert_eq!(
            sink.of_kind("file_moved"),
            vec![&AutomationEvent::FileMoved { from: source, to: expected }]
        );
    }

    #[test]
    fn test_second_run_moves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        write_aged(root, "inbox/report.pdf", Duration::days(1), now);
        write_aged(root, "inbox/deep/scan.pdf", Duration::days(1), now);
        let rules = [rule("*.pdf", "documents", None, false)];

        let ctx = RunContext::new(now);
        let first = organize(root, &rules, &ctx, &mut RecordingSink::new());
        let second = organize(root, &rules, &ctx, &mut RecordingSink::new());

        assert_eq!(first.moved, 2);
        assert_eq!(second.moved, 0);
        assert!(root.join("documents/report.pdf").exists());
        assert!(root.join("documents/scan.pdf").exists());
    }

    #[test]
    fn test_invalid_rule_does_not_stop_others() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        write_aged(root, "a.csv", Duration::days(1), now);

        let broken = OrganizationRule {
            pattern: None,
            destination: Some("x".to_string()),
            older_than_days: None,
            bucket_by_year: false,
        };
        let ctx = RunContext::new(now);
        let mut sink = RecordingSink::new();
        let report = organize(
            root,
            &[broken, rule("*.csv", "../outside", None, false), rule("*.csv", "data", None, false)],
            &ctx,
            &mut sink,
        );

        assert_eq!(report.invalid_rules, 2);
        assert_eq!(report.moved, 1);
        assert_eq!(sink.of_kind("rule_invalid").len(), 2);
        assert!(root.join("data/a.csv").exists());
    }

    #[test]
    fn test_name_clash_follows_conflict_policy() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        write_aged(root, "one/notes.txt", Duration::days(1), now);
        write_aged(root, "two/notes.txt", Duration::days(1), now);
        let rules = [rule("*.txt", "text", None, false)];

        let ctx = RunContext::new(now).with_conflict_policy(ConflictPolicy::Skip);
        let mut sink = RecordingSink::new();
        let report = organize(root, &rules, &ctx, &mut sink);

        assert_eq!(report.moved, 1);
        assert_eq!(report.skipped, 1);
        assert!(root.join("two/notes.txt").exists());

        let ctx = RunContext::new(now);
        let report = organize(root, &rules, &ctx, &mut RecordingSink::new());
        assert_eq!(report.moved, 1);
        assert!(root.join("text/notes_1.txt").exists());
    }

    #[test]
    fn test_reserved_areas_are_never_organized() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let now = Local::now();
        write_aged(root, "quarantine/expired/old.log", Duration::days(100), now);

        let ctx = RunContext::new(now);
        let report = organize(root, &[rule("*.log", "logs", None, false)], &ctx, &mut RecordingSink::new());

        assert_eq!(report.moved, 0);
        assert!(root.join("quarantine/expired/old.log").exists());
    }
}
