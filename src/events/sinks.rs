//! Event sink implementations

use super::{AutomationEvent, EventSink, Severity};
use crate::error::{AutomationError, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Forwards events to `tracing` at their severity
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&mut self, event: AutomationEvent) {
        let kind = event.kind();
        match event.severity() {
            Severity::Info => tracing::info!(kind = kind, "{}", event.message()),
            Severity::Warning => tracing::warn!(kind = kind, "{}", event.message()),
            Severity::Error => tracing::error!(kind = kind, "{}", event.message()),
        }
    }
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Vec<AutomationEvent>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    /// Events with the given serde kind tag
    pub fn of_kind(&self, kind: &str) -> Vec<&AutomationEvent> {
        self.events.iter().filter(|e| e.kind() == kind).collect()
    }

    pub fn count_at(&self, severity: Severity) -> usize {
        self.events
            .iter()
            .filter(|e| e.severity() == severity)
            .count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: AutomationEvent) {
        self.events.push(event);
    }
}

/// Appends `YYYY-MM-DD HH:MM:SS [LEVEL] message` lines to a daily log file
pub struct LogFileSink {
    path: PathBuf,
    writer: BufWriter<File>,
    write_failed: bool,
}

impl LogFileSink {
    /// Open (or create) `<log_dir>/automation_<YYYYMMDD>.log` for the given day
    pub fn open(log_dir: &Path, today: DateTime<Local>) -> Result<Self> {
        fs::create_dir_all(log_dir).map_err(|e| AutomationError::io(log_dir, e))?;

        let path = log_dir.join(format!("automation_{}.log", today.format("%Y%m%d")));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AutomationError::io(&path, e))?;

        Ok(Self {
            path,
            writer: BufWriter::new(file),
            write_failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for LogFileSink {
    fn emit(&mut self, event: AutomationEvent) {
        let line = format!(
            "{} [{}] {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            event.severity(),
            event.message()
        );

        let result = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|_| self.writer.flush());

        // Report the first failure only, the log would otherwise flood
        if let Err(e) = result {
            if !self.write_failed {
                tracing::warn!("Failed to write log file {}: {}", self.path.display(), e);
                self.write_failed = true;
            }
        }
    }
}

/// Sends each event to several sinks
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn push(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl EventSink for FanoutSink {
    fn emit(&mut self, event: AutomationEvent) {
        if let Some((last, rest)) = self.sinks.split_last_mut() {
            for sink in rest {
                sink.emit(event.clone());
            }
            last.emit(event);
        }
    }
}
