//! Ignore filtering for project scans.
//!
//! Paths are always relative to the scan root and `/`-separated.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::ScanError;

/// Decides whether a path is left out of a scan.
///
/// Returning true for a directory prunes the whole subtree.
pub trait IgnoreFilter {
    fn is_ignored(&self, relative_path: &str) -> bool;
}

impl<F> IgnoreFilter for F
where
    F: Fn(&str) -> bool,
{
    fn is_ignored(&self, relative_path: &str) -> bool {
        self(relative_path)
    }
}

/// Path components that are never scanned.
const IGNORED_NAMES: &[&str] = &[
    ".ctxkit.json",
    ".ctxkit-ignore",
    ".git",
    ".svn",
    ".idea",
    ".vscode",
    ".cache",
    "bin",
    "obj",
    "dist",
    "out",
    "node_modules",
    "target",
];

/// File name suffixes that are never scanned (binaries, media, scratch files).
const IGNORED_SUFFIXES: &[&str] = &[
    ".sum",
    ".tmp",
    ".tmpl",
    ".exe",
    ".dll",
    ".log",
    ".bak",
    ".bkp",
    ".mp3",
    ".wav",
    ".aac",
    ".flac",
    ".ogg",
    ".jpg",
    ".jpeg",
    ".png",
    ".gif",
    ".mkv",
    ".mp4",
    ".avi",
    ".mov",
    ".wmv",
    ".drawio",
    ".excalidraw",
];

/// Built-in ignore list plus patterns from a project ignore file.
#[derive(Debug, Clone, Default)]
pub struct DefaultIgnore {
    patterns: Option<GlobSet>,
    /// `dir/` patterns, matched as path prefixes.
    dir_prefixes: Vec<String>,
}

impl DefaultIgnore {
    /// Built-in list only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in list plus the patterns in `root/<ignore_file>`, if it exists.
    pub fn load(root: &Path, ignore_file: &str) -> Result<Self, ScanError> {
        let path = root.join(ignore_file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(err) => return Err(ScanError::io(path, err)),
        };
        let filter = Self::from_patterns(parse_ignore_file(&content))?;
        debug!(
            "Loaded {} ignore patterns from {}",
            filter.dir_prefixes.len() + filter.patterns.as_ref().map_or(0, |p| p.len()),
            path.display()
        );
        Ok(filter)
    }

    /// Built-in list plus the given glob patterns.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut dir_prefixes = Vec::new();
        let mut has_globs = false;

        for pattern in patterns {
            let pattern = pattern.as_ref();
            // Patterns naming a built-in entry are already covered.
            if is_default_ignored(pattern) {
                continue;
            }
            if pattern.ends_with('/') {
                dir_prefixes.push(pattern.to_string());
                continue;
            }
            let glob = Glob::new(pattern)
                .map_err(|e| ScanError::Pattern(format!("{}: {}", pattern, e)))?;
            builder.add(glob);
            has_globs = true;
        }

        let patterns = if has_globs {
            Some(
                builder
                    .build()
                    .map_err(|e| ScanError::Pattern(format!("Failed to build globset: {}", e)))?,
            )
        } else {
            None
        };

        Ok(Self {
            patterns,
            dir_prefixes,
        })
    }
}

impl IgnoreFilter for DefaultIgnore {
    fn is_ignored(&self, relative_path: &str) -> bool {
        if is_default_ignored(relative_path) {
            return true;
        }

        if self.dir_prefixes.iter().any(|prefix| {
            relative_path.starts_with(prefix.as_str())
                || relative_path == prefix.trim_end_matches('/')
        }) {
            return true;
        }

        self.patterns.as_ref().is_some_and(|set| {
            let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
            set.is_match(relative_path) || set.is_match(file_name)
        })
    }
}

/// Checks every component of `relative_path` against the built-in list.
pub fn is_default_ignored(relative_path: &str) -> bool {
    relative_path
        .split('/')
        .filter(|part| !part.is_empty())
        .any(|part| {
            let part = part.to_lowercase();
            IGNORED_NAMES.contains(&part.as_str())
                || IGNORED_SUFFIXES.iter().any(|suffix| part.ends_with(suffix))
        })
}

/// Non-empty, non-comment lines of an ignore file.
fn parse_ignore_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(".git", true)]
    #[case(".git/HEAD", true)]
    #[case("web/node_modules/react/index.js", true)]
    #[case("assets/logo.PNG", true)]
    #[case("logs/today.log", true)]
    #[case("go.sum", true)]
    #[case("src/main.rs", false)]
    #[case("src/binary.rs", false)]
    #[case("output/report.md", false)]
    #[case("README.md", false)]
    fn test_default_ignore(#[case] path: &str, #[case] expected: bool) {
        assert_eq!(DefaultIgnore::new().is_ignored(path), expected, "{}", path);
    }

    #[test]
    fn test_glob_patterns() {
        let filter = DefaultIgnore::from_patterns(["*.generated.go", "docs/*.md"]).unwrap();

        assert!(filter.is_ignored("api/types.generated.go"));
        assert!(filter.is_ignored("docs/guide.md"));
        assert!(!filter.is_ignored("api/types.go"));
        assert!(!filter.is_ignored("README.md"));
    }

    #[test]
    fn test_directory_patterns() {
        let filter = DefaultIgnore::from_patterns(["vendor/"]).unwrap();

        assert!(filter.is_ignored("vendor"));
        assert!(filter.is_ignored("vendor/lib/a.go"));
        assert!(!filter.is_ignored("src/vendor.go"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = DefaultIgnore::from_patterns(["src/[unclosed"]);
        assert!(matches!(result, Err(ScanError::Pattern(_))));
    }

    #[test]
    fn test_load_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(".ctxkit-ignore"),
            "# generated code\n\n*.pb.go\nfixtures/\n",
        )
        .unwrap();

        let filter = DefaultIgnore::load(dir.path(), ".ctxkit-ignore").unwrap();
        assert!(filter.is_ignored("api/service.pb.go"));
        assert!(filter.is_ignored("fixtures/big.json"));
        assert!(!filter.is_ignored("api/service.go"));
    }

    #[test]
    fn test_load_missing_ignore_file() {
        let dir = tempfile::tempdir().unwrap();
        let filter = DefaultIgnore::load(dir.path(), ".ctxkit-ignore").unwrap();
        assert!(!filter.is_ignored("src/main.rs"));
    }

    #[test]
    fn test_closure_filter() {
        let filter = |path: &str| path.starts_with("skip");
        assert!(filter.is_ignored("skip/me.txt"));
        assert!(!filter.is_ignored("keep/me.txt"));
    }

    #[test]
    fn test_parse_ignore_file() {
        assert_eq!(
            parse_ignore_file("  a  \n# c\n\nb/\n"),
            vec!["a".to_string(), "b/".to_string()]
        );
    }
}
