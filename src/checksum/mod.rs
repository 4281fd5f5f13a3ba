//! SHA-256 content digests for duplicate detection.

use crate::error::{AutomationError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Buffer size for reading files (8KB)
const BUFFER_SIZE: usize = 8192;

/// Digest of a file's full byte content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Lowercase hex SHA-256
    pub sha256: String,
    /// Bytes hashed
    pub size: u64,
}

/// Compute the SHA-256 digest of a file, streaming it in fixed-size chunks.
///
/// The digest depends only on content, never on path or metadata.
pub fn compute_file_digest(path: &Path) -> Result<FileDigest> {
    let file = File::open(path).map_err(|e| AutomationError::io(path, e))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; BUFFER_SIZE];
    let mut size: u64 = 0;

    // Read and hash in chunks
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .map_err(|e| AutomationError::io(path, e))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
        size += bytes_read as u64;
    }

    Ok(FileDigest {
        sha256: hex::encode(hasher.finalize()),
        size,
    })
}

/// Hex digest only
pub fn compute_digest(path: &Path) -> Result<String> {
    compute_file_digest(path).map(|d| d.sha256)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_compute_file_digest() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = temp_dir.path().join("test.txt");

        // Write known content
        let mut file = File::create(&file_path).unwrap();
        file.write_all(b"Hello, World!").unwrap();

        let digest = compute_file_digest(&file_path).unwrap();

        assert_eq!(
            digest.sha256,
            "dffd6021bb2bd5b0af676290809ec3a53191dd81c7f70a4b28688a362182986f"
        );
        assert_eq!(digest.size, 13);
    }

    #[test]
    fn test_digest_ignores_path_and_name() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        let a = temp_dir.path().join("a.txt");
        let b = temp_dir.path().join("nested/other-name.bin");
        fs::write(&a, b"same bytes").unwrap();
        fs::write(&b, b"same bytes").unwrap();

        assert_eq!(compute_digest(&a).unwrap(), compute_digest(&b).unwrap());
    }

    #[test]
    fn test_digest_spans_multiple_chunks() {
        let temp_dir = TempDir::new().unwrap();
        let big = temp_dir.path().join("big.dat");
        let content: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        fs::write(&big, &content).unwrap();

        let digest = compute_file_digest(&big).unwrap();
        assert_eq!(digest.size, content.len() as u64);
        assert_eq!(digest.sha256, hex::encode(Sha256::digest(&content)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = compute_digest(&temp_dir.path().join("nope")).unwrap_err();
        assert!(err.is_not_found());
    }
}
