//! Project snapshots and snapshot differencing.
//!
//! A snapshot records the size and modification time of every tracked file.
//! Comparing two snapshots tells the scanner which files need their content
//! and facts re-derived; file contents are never read here.

use std::fs;
use std::path::{Path, PathBuf};

use ctxkit_cache::{FileSnapshot, ProjectSnapshot, SourceStamp};
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::ignore::IgnoreFilter;
use crate::{ScanConfig, ScanError};

/// Paths that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotDiff {
    /// Paths that are new or whose size/modification time changed.
    pub changed: Vec<String>,
    /// Paths present before and missing now.
    pub deleted: Vec<String>,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.deleted.is_empty()
    }
}

/// Compares `previous` against `current`. Both lists come out sorted.
pub fn diff_snapshots(previous: &ProjectSnapshot, current: &ProjectSnapshot) -> SnapshotDiff {
    let changed = current
        .files
        .iter()
        .filter(|(path, file)| {
            previous
                .files
                .get(*path)
                .is_none_or(|prev| prev.hash != file.hash)
        })
        .map(|(path, _)| path.clone())
        .collect();

    let deleted = previous
        .files
        .keys()
        .filter(|path| !current.files.contains_key(*path))
        .cloned()
        .collect();

    SnapshotDiff { changed, deleted }
}

/// Path of `path` relative to `root`, `/`-separated. Empty for the root itself.
pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Walks `root` once and records every tracked file.
///
/// Ignored directories are pruned, ignored files and files over
/// `config.max_file_size` are skipped. A walk error at the root fails the
/// snapshot; errors below it skip the affected entry.
pub fn take_snapshot(
    root: &Path,
    filter: &dyn IgnoreFilter,
    config: &ScanConfig,
) -> Result<ProjectSnapshot, ScanError> {
    let excluded: Vec<PathBuf> = config
        .exclude_dirs
        .iter()
        .filter_map(|dir| fs::canonicalize(dir).ok())
        .collect();

    let mut snapshot = ProjectSnapshot::new(root.to_string_lossy());
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !should_prune(root, entry, filter, &excluded));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(ScanError::Walk {
                    path: root.to_path_buf(),
                    source: err,
                });
            }
            Err(err) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!("Skipping {}: {}", entry.path().display(), err);
                continue;
            }
        };
        if metadata.len() > config.max_file_size {
            debug!("Skipping large file {}", entry.path().display());
            continue;
        }

        let stamp = SourceStamp::from_metadata(entry.path(), &metadata)?;
        snapshot.insert(FileSnapshot::new(
            relative_path(root, entry.path()),
            stamp.modified_ns,
            stamp.size,
        ));
    }

    debug!("Snapshot of {}: {} files", root.display(), snapshot.len());
    Ok(snapshot)
}

fn should_prune(
    root: &Path,
    entry: &DirEntry,
    filter: &dyn IgnoreFilter,
    excluded: &[PathBuf],
) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    if entry.file_type().is_dir()
        && !excluded.is_empty()
        && fs::canonicalize(entry.path()).is_ok_and(|dir| excluded.contains(&dir))
    {
        return true;
    }
    filter.is_ignored(&relative_path(root, entry.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore::DefaultIgnore;
    use pretty_assertions::assert_eq;

    fn snapshot_of(files: &[(&str, u64, u64)]) -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::new("/proj");
        for (path, modified_ns, size) in files {
            snapshot.insert(FileSnapshot::new(*path, *modified_ns, *size));
        }
        snapshot
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let prev = snapshot_of(&[("a.go", 1, 10), ("b.go", 2, 20)]);
        let curr = snapshot_of(&[("a.go", 1, 10), ("b.go", 2, 20)]);
        assert!(diff_snapshots(&prev, &curr).is_empty());
    }

    #[test]
    fn test_diff_added_changed_deleted() {
        let prev = snapshot_of(&[("a.go", 1, 10), ("b.go", 2, 20), ("c.go", 3, 30)]);
        let curr = snapshot_of(&[("a.go", 1, 10), ("b.go", 5, 20), ("d.go", 4, 40)]);

        let diff = diff_snapshots(&prev, &curr);
        assert_eq!(diff.changed, vec!["b.go".to_string(), "d.go".to_string()]);
        assert_eq!(diff.deleted, vec!["c.go".to_string()]);
    }

    #[test]
    fn test_diff_size_only_change() {
        let prev = snapshot_of(&[("a.go", 1, 10)]);
        let curr = snapshot_of(&[("a.go", 1, 11)]);
        assert_eq!(diff_snapshots(&prev, &curr).changed, vec!["a.go".to_string()]);
    }

    #[test]
    fn test_rename_is_delete_plus_add() {
        let prev = snapshot_of(&[("old.go", 1, 10)]);
        let curr = snapshot_of(&[("new.go", 1, 10)]);

        let diff = diff_snapshots(&prev, &curr);
        assert_eq!(diff.changed, vec!["new.go".to_string()]);
        assert_eq!(diff.deleted, vec!["old.go".to_string()]);
    }

    #[test]
    fn test_take_snapshot_filters() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        fs::write(root.join("src/main.rs"), "fn main() {}").unwrap();
        fs::write(root.join("README.md"), "# readme").unwrap();
        fs::write(root.join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(root.join("debug.log"), "log").unwrap();
        fs::write(root.join("big.txt"), vec![b'x'; 100 * 1024 + 1]).unwrap();
        fs::write(root.join("limit.txt"), vec![b'x'; 100 * 1024]).unwrap();

        let snapshot = take_snapshot(root, &DefaultIgnore::new(), &ScanConfig::new()).unwrap();

        let paths: Vec<&str> = snapshot.files.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["README.md", "limit.txt", "src/main.rs"]);

        let main = &snapshot.files["src/main.rs"];
        assert_eq!(main.size, 12);
        assert_eq!(main.hash, format!("{}_{}", main.modified_ns, 12));
    }

    #[test]
    fn test_take_snapshot_excludes_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("store")).unwrap();
        fs::write(root.join("store/entry.bin"), "x").unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let config = ScanConfig::new().exclude_dir(root.join("store"));
        let snapshot = take_snapshot(root, &|_: &str| false, &config).unwrap();

        assert_eq!(snapshot.files.keys().collect::<Vec<_>>(), vec!["a.txt"]);
    }

    #[test]
    fn test_take_snapshot_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = take_snapshot(
            &dir.path().join("missing"),
            &DefaultIgnore::new(),
            &ScanConfig::new(),
        );
        assert!(matches!(result, Err(ScanError::Walk { .. })));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/proj"), Path::new("/proj/src/a.rs")),
            "src/a.rs"
        );
        assert_eq!(relative_path(Path::new("/proj"), Path::new("/proj")), "");
    }
}
