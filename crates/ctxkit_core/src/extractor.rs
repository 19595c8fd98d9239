//! Facts extraction seam.
//!
//! A facts extractor turns a file's raw bytes into an ordered list of short
//! strings summarizing its structure. Structural parsers plug in here; the
//! crate ships a keyword-based outline as the default.

/// Derives the structural facts of one file.
pub trait FactsExtractor {
    fn derive_facts(&self, relative_path: &str, content: &[u8]) -> Vec<String>;
}

impl<T: FactsExtractor + ?Sized> FactsExtractor for &T {
    fn derive_facts(&self, relative_path: &str, content: &[u8]) -> Vec<String> {
        (**self).derive_facts(relative_path, content)
    }
}

impl<T: FactsExtractor + ?Sized> FactsExtractor for Box<T> {
    fn derive_facts(&self, relative_path: &str, content: &[u8]) -> Vec<String> {
        (**self).derive_facts(relative_path, content)
    }
}

const VISIBILITY_PREFIXES: &[&str] = &[
    "pub(crate) ",
    "pub ",
    "export default ",
    "export ",
    "public ",
    "private ",
    "protected ",
    "internal ",
    "static ",
    "async ",
    "abstract ",
];

const DECLARATION_KEYWORDS: &[&str] = &[
    "fn ",
    "struct ",
    "enum ",
    "trait ",
    "impl ",
    "impl<",
    "mod ",
    "type ",
    "class ",
    "interface ",
    "def ",
    "func ",
    "function ",
    "package ",
    "namespace ",
];

/// Outline of declaration-looking lines.
///
/// The first fact is the file's relative path, followed by every line whose
/// first token (after visibility modifiers) is a declaration keyword.
#[derive(Debug, Clone)]
pub struct OutlineExtractor {
    /// Maximum number of declaration lines kept per file.
    pub max_lines: usize,
}

impl Default for OutlineExtractor {
    fn default() -> Self {
        Self { max_lines: 200 }
    }
}

impl OutlineExtractor {
    fn is_declaration(line: &str) -> bool {
        let mut rest = line;
        while let Some(prefix) = VISIBILITY_PREFIXES.iter().find(|p| rest.starts_with(**p)) {
            rest = &rest[prefix.len()..];
        }
        DECLARATION_KEYWORDS.iter().any(|kw| rest.starts_with(kw))
    }
}

impl FactsExtractor for OutlineExtractor {
    fn derive_facts(&self, relative_path: &str, content: &[u8]) -> Vec<String> {
        let text = String::from_utf8_lossy(content);
        let mut facts = vec![relative_path.to_string()];
        facts.extend(
            text.lines()
                .map(str::trim)
                .filter(|line| Self::is_declaration(line))
                .map(|line| line.trim_end_matches('{').trim_end().to_string())
                .take(self.max_lines),
        );
        facts
    }
}
