//! The static knowledge catalog.
//!
//! A catalog is loaded once at startup from a TOML or JSON file (or from the
//! built-in catalog) and never mutated afterwards. Reloading means building a
//! new `KnowledgeCatalog` and swapping the `Arc` held by the selector.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::entry::KnowledgeEntry;
use crate::error::{CatalogError, Result};
use crate::pattern::PatternSet;
use crate::scoring::KeywordSet;

const BUILTIN_CATALOG: &str = include_str!("../catalog/default.toml");

/// On-disk catalog layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    version: Option<String>,

    #[serde(default, alias = "entries")]
    entry: Vec<KnowledgeEntry>,
}

/// A knowledge entry with its patterns and keywords prepared for matching.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    entry: KnowledgeEntry,
    patterns: PatternSet,
    keywords: KeywordSet,
}

impl CatalogEntry {
    /// The source entry.
    pub fn entry(&self) -> &KnowledgeEntry {
        &self.entry
    }

    /// Compiled question patterns.
    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Prepared keywords.
    pub fn keywords(&self) -> &KeywordSet {
        &self.keywords
    }
}

/// An immutable, ordered list of knowledge entries.
///
/// Order is significant: the pattern phase stops at the first entry with a
/// matching pattern and fuzzy ties go to the earlier entry, so overrides must
/// come before generic entries.
#[derive(Debug, Default)]
pub struct KnowledgeCatalog {
    version: Option<String>,
    entries: Vec<CatalogEntry>,
    skipped_patterns: Vec<CatalogError>,
}

impl KnowledgeCatalog {
    /// Validate and compile entries in the given order.
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Result<Self> {
        Self::build(None, entries)
    }

    /// Parse a TOML catalog (`[[entry]]` tables).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::build(file.version, file.entry)
    }

    /// Parse a JSON catalog (`{"version": .., "entries": [..]}`).
    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(content)?;
        Self::build(file.version, file.entry)
    }

    /// Load a catalog file, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let catalog = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.display().to_string())),
        };

        info!(
            "Loaded knowledge catalog from {} ({} entries)",
            path.display(),
            catalog.len()
        );
        Ok(catalog)
    }

    /// The catalog bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    fn build(version: Option<String>, entries: Vec<KnowledgeEntry>) -> Result<Self> {
        let mut ids = HashSet::with_capacity(entries.len());
        let mut compiled = Vec::with_capacity(entries.len());
        let mut skipped_patterns = Vec::new();

        for entry in entries {
            if !ids.insert(entry.id.clone()) {
                return Err(CatalogError::DuplicateId(entry.id));
            }
            if entry.answer.trim().is_empty() {
                return Err(CatalogError::EmptyAnswer(entry.id));
            }
            if entry.question_patterns.is_empty() && entry.keywords.is_empty() {
                return Err(CatalogError::Unreachable(entry.id));
            }
            if entry.priority == 0 {
                return Err(CatalogError::InvalidPriority(entry.id));
            }

            let (patterns, skipped) = PatternSet::compile(&entry.id, &entry.question_patterns);
            let keywords = KeywordSet::new(&entry.keywords);

            if patterns.is_empty() && keywords.is_empty() {
                warn!("Entry {} is unreachable after skipping its invalid patterns", entry.id);
            }
            skipped_patterns.extend(skipped);

            compiled.push(CatalogEntry {
                entry,
                patterns,
                keywords,
            });
        }

        debug!(
            "Compiled {} catalog entries ({} patterns skipped)",
            compiled.len(),
            skipped_patterns.len()
        );

        Ok(Self {
            version,
            entries: compiled,
            skipped_patterns,
        })
    }

    /// Catalog version string, if the file declares one.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Entries in catalog order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    /// Look up an entry by id.
    pub fn get(&self, id: &str) -> Option<&KnowledgeEntry> {
        self.entries
            .iter()
            .map(CatalogEntry::entry)
            .find(|e| e.id == id)
    }

    /// Patterns that failed to compile and were skipped.
    pub fn skipped_patterns(&self) -> &[CatalogError] {
        &self.skipped_patterns
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
