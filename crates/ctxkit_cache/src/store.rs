//! On-disk entry store.
//!
//! One file per entry, named `<key>.cache`, directly under the store root.
//! There is no separate index: listing the directory enumerates the entries.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::CacheError;
use crate::entry::{CacheEntry, CacheValue, EntryKind, SourceStamp};
use crate::key::{CacheKey, Identity};
use crate::util::{atomic_write, now_millis, remove_if_exists, system_time_millis};

/// File extension of entry files.
pub const ENTRY_EXTENSION: &str = "cache";

/// An entry file found while enumerating the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub path: PathBuf,
    pub file_name: String,
    pub size_bytes: u64,
    /// Logical write time, or the file's mtime when the entry can't be decoded.
    pub cached_at_ms: u64,
    /// `None` when the entry can't be decoded.
    pub kind: Option<EntryKind>,
}

/// Key/value layer over a single cache directory.
///
/// Mutations take the directory lock exclusively; reads and enumeration take
/// it shared.
#[derive(Debug)]
pub struct EntryStore {
    dir: PathBuf,
    pub(crate) lock: RwLock<()>,
}

impl EntryStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| CacheError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        debug!("Opened cache store at {}", dir.display());
        Ok(Self {
            dir,
            lock: RwLock::new(()),
        })
    }

    /// Directory where entry files live.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Looks up the value stored for `identity`.
    ///
    /// Any read or decode failure is a miss. For file-backed identities the
    /// source is re-stat'd; if its size or modification time no longer match,
    /// or it can't be stat'd, the entry is deleted and `None` is returned.
    pub fn get(&self, identity: &Identity) -> Option<CacheValue> {
        let _guard = self.lock.read();
        let key = identity.key();
        let path = self.entry_path(&key);

        let entry = match read_entry(&path) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                debug!("Unreadable cache entry for {}: {}", identity.name(), err);
                return None;
            }
        };

        if entry.key != key.as_str() {
            debug!("Cache key mismatch for {}", identity.name());
            return None;
        }

        if let Some(source) = identity.source() {
            let current = SourceStamp::of(source).ok();
            if !entry.is_fresh(current.as_ref()) {
                debug!("Invalidating stale cache entry for {}", identity.name());
                // Whole-file removal; concurrent readers see the old file or nothing.
                if let Err(err) = remove_if_exists(&path) {
                    debug!("Failed to remove stale entry {}: {}", path.display(), err);
                }
                return None;
            }
        }

        Some(entry.value)
    }

    /// Stores `value` under `identity`, replacing any previous entry.
    ///
    /// File-backed identities record the source's current size and
    /// modification time; failure to stat the source is an error.
    pub fn set(&self, identity: &Identity, value: CacheValue) -> Result<(), CacheError> {
        let source = identity.source().map(SourceStamp::of).transpose()?;
        let key = identity.key();
        let entry = CacheEntry::new(key.as_str(), value, source);
        let bytes = entry.encode()?;

        let _guard = self.lock.write();
        atomic_write(&self.entry_path(&key), &bytes)
    }

    /// Removes the entry for `identity`. A missing entry is not an error.
    pub fn delete(&self, identity: &Identity) -> Result<(), CacheError> {
        let _guard = self.lock.write();
        let path = self.entry_path(&identity.key());
        remove_if_exists(&path).map_err(|e| CacheError::io(&path, e))?;
        Ok(())
    }

    /// Returns whether an entry file exists for `identity`, without validating it.
    pub fn contains(&self, identity: &Identity) -> bool {
        let _guard = self.lock.read();
        self.entry_path(&identity.key()).is_file()
    }

    /// Removes every entry under the store root and returns how many were removed.
    pub fn clear_all(&self) -> Result<usize, CacheError> {
        let _guard = self.lock.write();
        let mut removed = 0;
        for path in self.entry_files()? {
            if remove_if_exists(&path).map_err(|e| CacheError::io(&path, e))? {
                removed += 1;
            }
        }
        info!("Cleared {} cache entries from {}", removed, self.dir.display());
        Ok(removed)
    }

    /// Removes entries written more than `max_age_ms` ago.
    pub fn remove_expired(&self, max_age_ms: u64) -> Result<usize, CacheError> {
        let _guard = self.lock.write();
        let cutoff = now_millis().saturating_sub(max_age_ms);
        let mut removed = 0;
        for entry in self.scan_entries()? {
            if entry.kind.is_none() || entry.cached_at_ms >= cutoff {
                continue;
            }
            match remove_if_exists(&entry.path) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(err) => debug!("Failed to remove {}: {}", entry.path.display(), err),
            }
        }
        Ok(removed)
    }

    /// Enumerates every entry file with its decoded metadata.
    pub fn list(&self) -> Result<Vec<StoredEntry>, CacheError> {
        let _guard = self.lock.read();
        self.scan_entries()
    }

    /// Enumeration without locking; callers hold the lock.
    pub(crate) fn scan_entries(&self) -> Result<Vec<StoredEntry>, CacheError> {
        let mut entries = Vec::new();
        for path in self.entry_files()? {
            // Entries can race with deletion outside this process.
            let Ok(metadata) = fs::metadata(&path) else {
                continue;
            };
            let file_mtime_ms = metadata.modified().map(system_time_millis).unwrap_or(0);

            let decoded = fs::read(&path)
                .ok()
                .and_then(|bytes| CacheEntry::decode(&bytes).ok());
            let (cached_at_ms, kind) = match decoded {
                Some(entry) => (entry.cached_at_ms, Some(entry.value.kind())),
                None => (file_mtime_ms, None),
            };

            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            entries.push(StoredEntry {
                path,
                file_name,
                size_bytes: metadata.len(),
                cached_at_ms,
                kind,
            });
        }
        Ok(entries)
    }

    fn entry_files(&self) -> Result<Vec<PathBuf>, CacheError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(CacheError::io(&self.dir, err)),
        };

        let mut files = Vec::new();
        for dir_entry in read_dir {
            let Ok(dir_entry) = dir_entry else {
                continue;
            };
            let path = dir_entry.path();
            let is_entry = path
                .extension()
                .is_some_and(|ext| ext == ENTRY_EXTENSION);
            if is_entry && dir_entry.file_type().is_ok_and(|t| t.is_file()) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Reads and decodes an entry file. `Ok(None)` when the file doesn't exist.
fn read_entry(path: &Path) -> Result<Option<CacheEntry>, CacheError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(CacheError::io(path, err)),
    };
    CacheEntry::decode(&bytes).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn open_store() -> (TempDir, EntryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = EntryStore::open(dir.path().join("cache")).unwrap();
        (dir, store)
    }

    fn touch(path: &Path, modified: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(modified).unwrap();
    }

    #[test]
    fn test_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested/cache");
        let store = EntryStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.dir(), root.as_path());
    }

    #[test]
    fn test_open_fails_when_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let result = EntryStore::open(blocker.join("cache"));
        assert!(matches!(result, Err(CacheError::CreateDir { .. })));
    }

    #[test]
    fn test_set_get_file_identity() {
        let (dir, store) = open_store();
        let file = dir.path().join("a.go");
        fs::write(&file, "package a").unwrap();
        let identity = Identity::file(&file);

        store
            .set(&identity, CacheValue::FileContent(b"package a".to_vec()))
            .unwrap();

        assert_eq!(
            store.get(&identity),
            Some(CacheValue::FileContent(b"package a".to_vec()))
        );
    }

    #[test]
    fn test_get_missing_is_none() {
        let (_dir, store) = open_store();
        assert_eq!(store.get(&Identity::logical("nothing")), None);
    }

    #[test]
    fn test_size_change_invalidates_and_deletes() {
        let (dir, store) = open_store();
        let file = dir.path().join("a.go");
        fs::write(&file, "package a").unwrap();
        let identity = Identity::file(&file);
        store
            .set(&identity, CacheValue::FileContent(b"package a".to_vec()))
            .unwrap();

        fs::write(&file, "package a // changed").unwrap();

        assert_eq!(store.get(&identity), None);
        assert!(!store.contains(&identity));
    }

    #[test]
    fn test_mtime_change_invalidates() {
        let (dir, store) = open_store();
        let file = dir.path().join("a.go");
        fs::write(&file, "package a").unwrap();
        touch(&file, SystemTime::UNIX_EPOCH + Duration::from_secs(1_000));
        let identity = Identity::file(&file);
        store
            .set(&identity, CacheValue::FileContent(b"package a".to_vec()))
            .unwrap();

        // Same size, different modification time.
        fs::write(&file, "package b").unwrap();
        touch(&file, SystemTime::UNIX_EPOCH + Duration::from_secs(2_000));

        assert_eq!(store.get(&identity), None);
    }

    #[test]
    fn test_removed_source_invalidates() {
        let (dir, store) = open_store();
        let file = dir.path().join("a.go");
        fs::write(&file, "package a").unwrap();
        let identity = Identity::file(&file);
        store
            .set(&identity, CacheValue::FileContent(b"package a".to_vec()))
            .unwrap();

        fs::remove_file(&file).unwrap();

        assert_eq!(store.get(&identity), None);
        assert!(!store.contains(&identity));
    }

    #[test]
    fn test_set_fails_when_source_missing() {
        let (dir, store) = open_store();
        let identity = Identity::file(dir.path().join("missing.go"));

        let result = store.set(&identity, CacheValue::FileContent(vec![]));
        assert!(matches!(result, Err(CacheError::Stat { .. })));
    }

    #[test]
    fn test_logical_identity_skips_staleness() {
        let (_dir, store) = open_store();
        let identity = Identity::logical("/proj_project_scan");
        store
            .set(&identity, CacheValue::DerivedFacts(vec!["x".into()]))
            .unwrap();

        assert_eq!(
            store.get(&identity),
            Some(CacheValue::DerivedFacts(vec!["x".into()]))
        );
    }

    #[test]
    fn test_set_overwrites() {
        let (_dir, store) = open_store();
        let identity = Identity::logical("k");
        store
            .set(&identity, CacheValue::DerivedFacts(vec!["old".into()]))
            .unwrap();
        store
            .set(&identity, CacheValue::DerivedFacts(vec!["new".into()]))
            .unwrap();

        assert_eq!(
            store.get(&identity),
            Some(CacheValue::DerivedFacts(vec!["new".into()]))
        );
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupted_entry_is_miss() {
        let (_dir, store) = open_store();
        let identity = Identity::logical("k");
        fs::write(store.entry_path(&identity.key()), b"garbage").unwrap();

        assert_eq!(store.get(&identity), None);
    }

    #[test]
    fn test_delete_absent_is_ok() {
        let (_dir, store) = open_store();
        let identity = Identity::logical("k");
        store.delete(&identity).unwrap();

        store.set(&identity, CacheValue::FileContent(vec![1])).unwrap();
        store.delete(&identity).unwrap();
        assert_eq!(store.get(&identity), None);
    }

    #[test]
    fn test_clear_all_keeps_directory_and_foreign_files() {
        let (_dir, store) = open_store();
        for i in 0..3 {
            store
                .set(
                    &Identity::logical(format!("k{}", i)),
                    CacheValue::FileContent(vec![i]),
                )
                .unwrap();
        }
        fs::write(store.dir().join("notes.txt"), b"keep me").unwrap();

        assert_eq!(store.clear_all().unwrap(), 3);
        assert!(store.dir().is_dir());
        assert!(store.dir().join("notes.txt").exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_reports_kind_and_falls_back_for_corrupt() {
        let (_dir, store) = open_store();
        store
            .set(&Identity::logical("k"), CacheValue::FileContent(vec![1, 2, 3]))
            .unwrap();
        fs::write(store.dir().join("broken.cache"), b"garbage").unwrap();

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 2);

        let broken = entries
            .iter()
            .find(|e| e.file_name == "broken.cache")
            .unwrap();
        assert_eq!(broken.kind, None);
        assert!(broken.cached_at_ms > 0);

        let good = entries
            .iter()
            .find(|e| e.file_name != "broken.cache")
            .unwrap();
        assert_eq!(good.kind, Some(EntryKind::FileContent));
    }

    #[test]
    fn test_remove_expired() {
        let (_dir, store) = open_store();
        store
            .set(&Identity::logical("fresh"), CacheValue::FileContent(vec![]))
            .unwrap();

        assert_eq!(store.remove_expired(60_000).unwrap(), 0);
        assert_eq!(store.list().unwrap().len(), 1);

        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.remove_expired(0).unwrap(), 1);
        assert!(store.list().unwrap().is_empty());
    }
}
