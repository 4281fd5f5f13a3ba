//! Empty directory removal

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Deepest directories first so a parent emptied by its children's removal
/// is seen after them. Equal depths go in reverse path order.
pub fn order_deepest_first(mut dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    dirs.sort_by(|a, b| {
        b.components()
            .count()
            .cmp(&a.components().count())
            .then_with(|| b.cmp(a))
    });
    dirs
}

/// What happened to one candidate directory
#[derive(Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Not empty, or already gone
    Untouched,
}

/// Remove `dir` if it holds no entries right now
pub fn remove_if_empty(dir: &Path) -> io::Result<RemoveOutcome> {
    let mut entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RemoveOutcome::Untouched),
        Err(e) => return Err(e),
    };
    if entries.next().is_some() {
        return Ok(RemoveOutcome::Untouched);
    }

    match fs::remove_dir(dir) {
        Ok(()) => Ok(RemoveOutcome::Removed),
        Err(e) => {
            // Lost a race: something appeared in it or removed it first
            if !dir.exists() || dir_has_entries(dir) {
                Ok(RemoveOutcome::Untouched)
            } else {
                Err(e)
            }
        }
    }
}

fn dir_has_entries(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_order_deepest_first() {
        let dirs = vec![
            PathBuf::from("/w/a"),
            PathBuf::from("/w/a/b/c"),
            PathBuf::from("/w/z"),
            PathBuf::from("/w/a/b"),
            PathBuf::from("/w/m/n"),
        ];
        assert_eq!(
            order_deepest_first(dirs),
            vec![
                PathBuf::from("/w/a/b/c"),
                PathBuf::from("/w/m/n"),
                PathBuf::from("/w/a/b"),
                PathBuf::from("/w/z"),
                PathBuf::from("/w/a"),
            ]
        );
    }

    #[test]
    fn test_remove_if_empty() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        let full = temp_dir.path().join("full");
        fs::create_dir_all(&empty).unwrap();
        fs::create_dir_all(&full).unwrap();
        fs::write(full.join("f.txt"), "x").unwrap();

        assert_eq!(remove_if_empty(&empty).unwrap(), RemoveOutcome::Removed);
        assert!(!empty.exists());
        assert_eq!(remove_if_empty(&full).unwrap(), RemoveOutcome::Untouched);
        assert!(full.exists());
        assert_eq!(remove_if_empty(&empty).unwrap(), RemoveOutcome::Untouched);
    }
}
