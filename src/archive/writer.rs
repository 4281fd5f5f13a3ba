//! tar.gz writing and reading

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use tar::{Archive, Builder};

use crate::error::{AutomationError, Result};
use crate::pattern::normalize_relative;
use crate::vfs::FileRecord;

/// Suffix of a finished archive
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Suffix used while an archive is being written
const PARTIAL_SUFFIX: &str = "partial";

fn archive_error(path: &Path, message: impl std::fmt::Display) -> AutomationError {
    AutomationError::Archive {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

/// Write `files` into a gzip-compressed tar at `destination`.
///
/// Entry names are the files' root-relative paths with forward slashes. The
/// data goes to `<destination>.partial` first and is renamed into place only
/// once the archive is complete; on any error the partial file is removed.
///
/// Returns the number of entries written.
pub fn write_archive(destination: &Path, files: &[&FileRecord]) -> Result<usize> {
    let partial = partial_path(destination);

    match write_entries(&partial, files) {
        Ok(count) => {
            fs::rename(&partial, destination).map_err(|e| {
                let _ = fs::remove_file(&partial);
                AutomationError::io(destination, e)
            })?;
            Ok(count)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

fn write_entries(path: &Path, files: &[&FileRecord]) -> Result<usize> {
    let file = File::create(path).map_err(|e| AutomationError::io(path, e))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);
    builder.follow_symlinks(false);

    for record in files {
        let name = normalize_relative(&record.relative);
        builder
            .append_path_with_name(&record.path, &name)
            .map_err(|e| archive_error(&record.path, format!("failed to add entry {}: {}", name, e)))?;
    }

    let encoder = builder
        .into_inner()
        .map_err(|e| archive_error(path, format!("failed to finish tar stream: {}", e)))?;
    let mut writer = encoder
        .finish()
        .map_err(|e| archive_error(path, format!("failed to finish gzip stream: {}", e)))?;
    writer.flush().map_err(|e| AutomationError::io(path, e))?;

    Ok(files.len())
}

/// Enumerate entry names of an archive
pub fn list_archive_entries(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| AutomationError::io(path, e))?;
    let mut archive = Archive::new(GzDecoder::new(BufReader::new(file)));

    let mut names = Vec::new();
    let entries = archive
        .entries()
        .map_err(|e| archive_error(path, format!("failed to read entries: {}", e)))?;

    for entry in entries {
        let entry = entry.map_err(|e| archive_error(path, format!("corrupt entry: {}", e)))?;
        let entry_path = entry
            .path()
            .map_err(|e| archive_error(path, format!("invalid entry name: {}", e)))?;
        names.push(entry_path.to_string_lossy().replace('\\', "/"));
    }

    Ok(names)
}
