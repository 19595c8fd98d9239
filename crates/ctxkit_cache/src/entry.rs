//! Cache entry types.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::path::Path;

use rkyv::util::AlignedVec;
use serde::{Deserialize, Serialize};

use crate::CacheError;
use crate::util::{now_millis, system_time_nanos};

/// Size and modification time of an entry's source file at write time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize,
)]
pub struct SourceStamp {
    /// File size in bytes.
    pub size: u64,
    /// Modification time in nanoseconds since the unix epoch.
    pub modified_ns: u64,
}

impl SourceStamp {
    /// Stats `path` and records its current size and modification time.
    pub fn of(path: &Path) -> Result<Self, CacheError> {
        let metadata = std::fs::metadata(path).map_err(|e| CacheError::stat(path, e))?;
        Self::from_metadata(path, &metadata)
    }

    pub fn from_metadata(path: &Path, metadata: &Metadata) -> Result<Self, CacheError> {
        let modified = metadata.modified().map_err(|e| CacheError::stat(path, e))?;
        Ok(Self {
            size: metadata.len(),
            modified_ns: system_time_nanos(modified),
        })
    }
}

/// What kind of payload an entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    FileContent,
    DerivedFacts,
    Bundle,
    Snapshot,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::FileContent => "file_content",
            EntryKind::DerivedFacts => "derived_facts",
            EntryKind::Bundle => "bundle",
            EntryKind::Snapshot => "snapshot",
        }
    }
}

/// One file inside a [`ContextBundle`].
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct FileData {
    /// Path relative to the project root, `/`-separated.
    pub relative_path: String,
    /// Raw file content.
    pub code: String,
    /// Derived facts joined by newlines.
    pub facts: String,
}

/// Whole-project context: per-file content and facts plus the rendered text
/// blocks handed to the model.
#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct ContextBundle {
    pub files: Vec<FileData>,
    pub raw_codes: Vec<String>,
}

impl ContextBundle {
    /// Appends a file and its rendered block.
    pub fn push(&mut self, relative_path: &str, content: &[u8], facts: &[String]) {
        let facts = facts.join("\n");
        self.raw_codes
            .push(format!("**File: {}**\n\n{}", relative_path, facts));
        self.files.push(FileData {
            relative_path: relative_path.to_string(),
            code: String::from_utf8_lossy(content).into_owned(),
            facts,
        });
    }

    /// Concatenated text of every file block.
    pub fn text(&self) -> String {
        self.raw_codes.join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// State of a single tracked file at scan time.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct FileSnapshot {
    pub relative_path: String,
    pub modified_ns: u64,
    pub size: u64,
    /// `"<modified_ns>_<size>"`; two snapshots of a file compare equal iff
    /// their hashes do.
    pub hash: String,
}

impl FileSnapshot {
    pub fn new(relative_path: impl Into<String>, modified_ns: u64, size: u64) -> Self {
        Self {
            relative_path: relative_path.into(),
            modified_ns,
            size,
            hash: format!("{}_{}", modified_ns, size),
        }
    }
}

/// Manifest of every tracked file under a root.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct ProjectSnapshot {
    pub root_dir: String,
    pub taken_at_ms: u64,
    pub files: BTreeMap<String, FileSnapshot>,
}

impl ProjectSnapshot {
    pub fn new(root_dir: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            taken_at_ms: now_millis(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, file: FileSnapshot) {
        self.files.insert(file.relative_path.clone(), file);
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Payload of a cache entry.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub enum CacheValue {
    FileContent(Vec<u8>),
    DerivedFacts(Vec<String>),
    Bundle(ContextBundle),
    Snapshot(ProjectSnapshot),
}

impl CacheValue {
    pub fn kind(&self) -> EntryKind {
        match self {
            CacheValue::FileContent(_) => EntryKind::FileContent,
            CacheValue::DerivedFacts(_) => EntryKind::DerivedFacts,
            CacheValue::Bundle(_) => EntryKind::Bundle,
            CacheValue::Snapshot(_) => EntryKind::Snapshot,
        }
    }
}

/// A cache entry as stored on disk: the value plus its provenance.
#[derive(Debug, Clone, PartialEq, rkyv::Archive, rkyv::Serialize, rkyv::Deserialize)]
pub struct CacheEntry {
    /// Hex key the entry was written under.
    pub key: String,

    pub value: CacheValue,

    /// Timestamp when this entry was written.
    pub cached_at_ms: u64,

    /// Source file state at write time; `None` for logical identities.
    pub source: Option<SourceStamp>,
}

impl CacheEntry {
    /// Creates a new cache entry stamped with the current time.
    pub fn new(key: impl Into<String>, value: CacheValue, source: Option<SourceStamp>) -> Self {
        Self {
            key: key.into(),
            value,
            cached_at_ms: now_millis(),
            source,
        }
    }

    /// Checks if this entry still matches the current state of its source.
    pub fn is_fresh(&self, current: Option<&SourceStamp>) -> bool {
        self.source.as_ref() == current
    }

    pub fn encode(&self) -> Result<Vec<u8>, CacheError> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|bytes| bytes.to_vec())
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CacheError> {
        // Archives must be read from an aligned buffer.
        let mut aligned = AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(bytes);
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| CacheError::corrupted(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_snapshot() -> ProjectSnapshot {
        let mut snapshot = ProjectSnapshot::new("/proj");
        snapshot.insert(FileSnapshot::new("src/main.rs", 1_700_000_000_000_000_000, 42));
        snapshot.insert(FileSnapshot::new("README.md", 1_700_000_000_500_000_000, 7));
        snapshot
    }

    #[test]
    fn test_file_snapshot_hash() {
        let file = FileSnapshot::new("a.go", 123, 9);
        assert_eq!(file.hash, "123_9");
    }

    #[test]
    fn test_snapshot_entry_survives_encoding() {
        let entry = CacheEntry::new("k", CacheValue::Snapshot(sample_snapshot()), None);
        let bytes = entry.encode().unwrap();
        let decoded = CacheEntry::decode(&bytes).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_bundle_entry_survives_encoding() {
        let mut bundle = ContextBundle::default();
        bundle.push("a.go", b"package a", &["a.go".to_string(), "func A()".to_string()]);
        let stamp = SourceStamp {
            size: 9,
            modified_ns: 55,
        };
        let entry = CacheEntry::new("k", CacheValue::Bundle(bundle), Some(stamp));

        let decoded = CacheEntry::decode(&entry.encode().unwrap()).unwrap();
        assert_eq!(decoded.source, Some(stamp));
        assert_eq!(decoded.value.kind(), EntryKind::Bundle);
    }

    #[test]
    fn test_decode_garbage_is_corrupted() {
        let result = CacheEntry::decode(b"definitely not an archive");
        assert!(matches!(result, Err(CacheError::Corrupted(_))));
    }

    #[test]
    fn test_decode_empty_is_corrupted() {
        assert!(CacheEntry::decode(&[]).is_err());
    }

    #[test]
    fn test_is_fresh() {
        let stamp = SourceStamp {
            size: 10,
            modified_ns: 20,
        };
        let entry = CacheEntry::new("k", CacheValue::FileContent(vec![1]), Some(stamp));

        assert!(entry.is_fresh(Some(&stamp)));
        assert!(!entry.is_fresh(Some(&SourceStamp {
            size: 11,
            modified_ns: 20
        })));
        assert!(!entry.is_fresh(Some(&SourceStamp {
            size: 10,
            modified_ns: 21
        })));
        assert!(!entry.is_fresh(None));
    }

    #[test]
    fn test_bundle_push_renders_block() {
        let mut bundle = ContextBundle::default();
        bundle.push("src/lib.rs", b"pub fn a() {}", &["src/lib.rs".into(), "pub fn a()".into()]);

        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.files[0].code, "pub fn a() {}");
        assert_eq!(bundle.files[0].facts, "src/lib.rs\npub fn a()");
        assert_eq!(bundle.raw_codes[0], "**File: src/lib.rs**\n\nsrc/lib.rs\npub fn a()");
    }

    #[test]
    fn test_bundle_text_joins_blocks() {
        let mut bundle = ContextBundle::default();
        bundle.push("a", b"", &["x".into()]);
        bundle.push("b", b"", &["y".into()]);
        assert_eq!(bundle.text(), "**File: a**\n\nx\n\n**File: b**\n\ny");
    }
}
