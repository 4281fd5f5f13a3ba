//! Move execution
//!
//! Renames within a filesystem, falls back to copy + delete across devices
//! (keeping the modification time, which later age-based passes depend on).

use crate::error::{AutomationError, Result};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Policy for handling destination conflicts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Replace the existing file (last write wins)
    Overwrite,
    /// Generate unique name (_1, _2, etc.) and proceed
    #[default]
    AutoRename,
    /// Leave the source where it is
    Skip,
    /// Report an error for this item
    Fail,
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::AutoRename => "auto_rename",
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Outcome of a single move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved to the requested destination
    Moved(PathBuf),
    /// Destination was taken; moved to the included path instead
    MovedWithRename(PathBuf),
    /// Destination was taken and has been replaced
    Replaced(PathBuf),
    /// Not moved (includes reason)
    Skipped(String),
}

impl MoveOutcome {
    /// Where the file ended up, if it moved
    pub fn final_path(&self) -> Option<&Path> {
        match self {
            MoveOutcome::Moved(p) | MoveOutcome::MovedWithRename(p) | MoveOutcome::Replaced(p) => {
                Some(p)
            }
            MoveOutcome::Skipped(_) => None,
        }
    }
}

/// Move a regular file, creating intermediate directories as needed
pub fn move_file(source: &Path, destination: &Path, policy: ConflictPolicy) -> Result<MoveOutcome> {
    if source == destination {
        return Ok(MoveOutcome::Skipped("already in place".to_string()));
    }

    let metadata = fs::symlink_metadata(source).map_err(|e| AutomationError::io(source, e))?;
    if !metadata.is_file() {
        return Ok(MoveOutcome::Skipped("not a regular file".to_string()));
    }

    // Destination exists - apply conflict policy
    if destination.exists() {
        match policy {
            ConflictPolicy::Skip => {
                return Ok(MoveOutcome::Skipped(format!(
                    "destination exists: {}",
                    destination.display()
                )));
            }
            ConflictPolicy::Fail => {
                return Err(AutomationError::DestinationExists(destination.to_path_buf()));
            }
            ConflictPolicy::AutoRename => {
                let new_dest = generate_unique_path(destination);
                perform_move(source, &new_dest)?;
                return Ok(MoveOutcome::MovedWithRename(new_dest));
            }
            ConflictPolicy::Overwrite => {
                if destination.is_dir() {
                    return Err(AutomationError::io(
                        destination,
                        std::io::Error::new(
                            std::io::ErrorKind::AlreadyExists,
                            "a directory occupies the destination",
                        ),
                    ));
                }
                perform_move(source, destination)?;
                return Ok(MoveOutcome::Replaced(destination.to_path_buf()));
            }
        }
    }

    perform_move(source, destination)?;
    Ok(MoveOutcome::Moved(destination.to_path_buf()))
}

/// Generate a unique path by appending a counter suffix
pub fn generate_unique_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
        if counter > 1000 {
            // Safety limit - use UUID suffix
            return parent.join(format!("{}_{}{}", stem, uuid::Uuid::new_v4(), ext));
        }
    }
}

/// Rename, or copy + delete when rename is not possible
fn perform_move(source: &Path, destination: &Path) -> Result<()> {
    // Ensure destination parent exists
    if let Some(parent) = destination.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| AutomationError::io(parent, e))?;
        }
    }

    // Try rename first (same filesystem), fall back to copy+delete
    if let Err(rename_err) = fs::rename(source, destination) {
        tracing::debug!(
            "Rename {} -> {} failed ({}), copying instead",
            source.display(),
            destination.display(),
            rename_err
        );

        let metadata = fs::metadata(source).map_err(|e| AutomationError::io(source, e))?;
        fs::copy(source, destination).map_err(|e| AutomationError::io(destination, e))?;

        let mtime = FileTime::from_last_modification_time(&metadata);
        if let Err(e) = filetime::set_file_mtime(destination, mtime) {
            tracing::warn!(
                "Could not preserve modification time on {}: {}",
                destination.display(),
                e
            );
        }

        if let Err(e) = fs::remove_file(source) {
            // Undo the copy so the file is not left in two places
            let _ = fs::remove_file(destination);
            return Err(AutomationError::io(source, e));
        }
    }

    Ok(())
}
