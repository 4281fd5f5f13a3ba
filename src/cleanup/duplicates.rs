//! Duplicate detection by content digest

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::vfs::{FileRecord, ScanError};

/// A file whose content matches an earlier file in traversal order
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicate {
    /// The later copy, which gets quarantined (digest filled in)
    pub record: FileRecord,
    /// The first-seen file with the same digest, which stays put
    pub original: PathBuf,
    pub digest: String,
}

#[derive(Debug, Clone, Default)]
pub struct DuplicateScan {
    pub duplicates: Vec<Duplicate>,
    /// Files that could not be hashed; they are neither originals nor copies
    pub failures: Vec<ScanError>,
    /// Number of files hashed successfully
    pub hashed: usize,
}

/// Group `files` by digest, keeping the first of each group in place.
///
/// `digest_fn` is injected so the grouping can be exercised without I/O.
pub fn find_duplicates<F>(files: &[FileRecord], mut digest_fn: F) -> DuplicateScan
where
    F: FnMut(&Path) -> Result<String>,
{
    let mut scan = DuplicateScan::default();
    let mut first_seen: HashMap<String, PathBuf> = HashMap::new();

    for record in files {
        let digest = match digest_fn(&record.path) {
            Ok(digest) => digest,
            Err(e) => {
                scan.failures.push(ScanError {
                    path: record.path.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };
        scan.hashed += 1;

        match first_seen.get(&digest) {
            Some(original) => {
                let mut record = record.clone();
                record.digest = Some(digest.clone());
                scan.duplicates.push(Duplicate {
                    record,
                    original: original.clone(),
                    digest,
                });
            }
            None => {
                first_seen.insert(digest, record.path.clone());
            }
        }
    }

    scan
}
