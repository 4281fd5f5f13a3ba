//! Per-run context shared by every stage

use chrono::{DateTime, Local, TimeDelta};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::execution::ConflictPolicy;

/// Cooperative cancellation flag.
///
/// Clones share the flag, so a signal handler or another thread can hold one
/// copy while the run checks another between items.
#[derive(Debug, Clone)]
pub struct CancellationToken(pub Arc<AtomicBool>);

impl Default for CancellationToken {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the run stop at the next check
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear a previous request so the token can be reused
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Values fixed for the duration of one run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Captured once; every timestamp and age cutoff in the run derives from it
    pub now: DateTime<Local>,

    /// How moves treat an occupied destination
    pub on_conflict: ConflictPolicy,

    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now,
            on_conflict: ConflictPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Context for a run starting right now
    pub fn starting_now() -> Self {
        Self::new(Local::now())
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.on_conflict = policy;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `now` minus a possibly fractional number of days, see [`age_cutoff`]
    pub fn cutoff(&self, days: f64) -> Option<DateTime<Local>> {
        age_cutoff(self.now, days)
    }
}

/// `now` minus `days`, or `None` when that instant is not representable.
///
/// `None` means no file can be older than the cutoff, so age-based passes
/// select nothing.
pub fn age_cutoff(now: DateTime<Local>, days: f64) -> Option<DateTime<Local>> {
    let seconds = (days * 86_400.0).round();
    if !seconds.is_finite() || seconds.abs() >= i64::MAX as f64 {
        return None;
    }
    TimeDelta::try_seconds(seconds as i64).and_then(|delta| now.checked_sub_signed(delta))
}
