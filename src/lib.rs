//! Rule-driven workspace automation.
//!
//! Given a workspace root and a JSON configuration, a run archives configured
//! folders, relocates files by pattern and age, and cleans up duplicates,
//! expired files and empty folders, in that order. See [`Automation`].

pub mod archive;
pub mod checksum;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod events;
pub mod execution;
pub mod orchestrator;
pub mod organizer;
pub mod pattern;
pub mod quarantine;
pub mod security;
pub mod vfs;

pub use config::{load_config, AutomationConfig};
pub use error::{AutomationError, Result};
pub use events::{AutomationEvent, EventSink, Severity};
pub use execution::ConflictPolicy;
pub use orchestrator::{Automation, CancellationToken, RunContext, RunReport};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Filtering follows `RUST_LOG`; without it, `info` and above are shown.
/// Use `RUST_LOG=debug` for per-file detail.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}
