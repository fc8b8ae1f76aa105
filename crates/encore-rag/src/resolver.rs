//! Entity recognition by name/alias matching.
//!
//! The `EntityIndex` is built once from a list of known entities and never
//! mutated; rebuilding it is an explicit operation outside the request path.
//! Matching runs on normalized text (lowercase, diacritics stripped) and
//! keeps the longest non-overlapping matches, scanning left to right.

use std::collections::HashSet;
use std::sync::Arc;

use aho_corasick::{AhoCorasick, MatchKind};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use encore_core::{EntityRef, EntityType};
use encore_graph::IndexRecord;

use crate::error::{Result, RetrievalError};

/// A known entity: canonical name, aliases, and the node it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub id: Option<String>,
    pub entity_type: EntityType,
}

impl IndexEntry {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            id: None,
            entity_type,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    fn to_entity_ref(&self) -> EntityRef {
        EntityRef {
            name: self.name.clone(),
            id: self.id.clone(),
            entity_type: self.entity_type,
        }
    }
}

impl From<IndexRecord> for IndexEntry {
    fn from(record: IndexRecord) -> Self {
        Self {
            name: record.name,
            aliases: record.aliases,
            id: Some(record.id).filter(|id| !id.is_empty()),
            entity_type: EntityType::from_labels(record.labels.iter().map(String::as_str)),
        }
    }
}

/// Immutable name/alias lookup structure.
pub struct EntityIndex {
    entries: Vec<IndexEntry>,
    /// Pattern id -> entry position.
    pattern_entries: Vec<usize>,
    matcher: AhoCorasick,
}

impl EntityIndex {
    /// Build the index. Entries whose name normalizes to nothing are skipped;
    /// when two entries share a name or alias, the first one keeps it.
    pub fn new(entries: Vec<IndexEntry>) -> Result<Self> {
        let mut kept = Vec::with_capacity(entries.len());
        let mut patterns = Vec::new();
        let mut pattern_entries = Vec::new();
        let mut seen = HashSet::new();

        for entry in entries {
            if normalize(&entry.name).is_empty() {
                tracing::warn!(id = ?entry.id, "Skipping index entry with empty name");
                continue;
            }

            let position = kept.len();
            for surface in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                let pattern = normalize(surface);
                if pattern.is_empty() || !seen.insert(pattern.clone()) {
                    continue;
                }
                patterns.push(pattern);
                pattern_entries.push(position);
            }
            kept.push(entry);
        }

        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| RetrievalError::Index(e.to_string()))?;

        tracing::debug!(entries = kept.len(), patterns = patterns.len(), "Entity index built");

        Ok(Self {
            entries: kept,
            pattern_entries,
            matcher,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Longest non-overlapping word-bounded matches in `text`, left to right.
    /// `text` must already be normalized.
    fn find(&self, text: &str) -> Vec<&IndexEntry> {
        let mut candidates: Vec<(usize, usize, usize)> = self
            .matcher
            .find_overlapping_iter(text)
            .filter(|m| on_word_boundary(text, m.start(), m.end()))
            .map(|m| (m.start(), m.end(), self.pattern_entries[m.pattern().as_usize()]))
            .collect();

        // Earliest start first; among equal starts, longest first.
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut cursor = 0;
        let mut found = Vec::new();
        for (start, end, entry) in candidates {
            if start < cursor {
                continue;
            }
            cursor = end;
            found.push(&self.entries[entry]);
        }
        found
    }
}

/// Maps question substrings to known graph entities.
#[derive(Clone)]
pub struct EntityResolver {
    index: Arc<EntityIndex>,
}

impl EntityResolver {
    pub fn new(index: Arc<EntityIndex>) -> Self {
        Self { index }
    }

    /// Entities in order of first appearance, deduplicated by normalized name.
    /// No match is a valid, empty result.
    pub fn resolve(&self, question: &str) -> Vec<EntityRef> {
        let text = normalize(question);
        let mut seen = HashSet::new();

        let entities: Vec<EntityRef> = self
            .index
            .find(&text)
            .into_iter()
            .filter(|entry| seen.insert(normalize(&entry.name)))
            .map(IndexEntry::to_entity_ref)
            .collect();

        tracing::debug!(count = entities.len(), "Resolved entities");
        entities
    }
}

/// Lowercase, strip diacritics (NFD, then drop combining marks) and collapse
/// whitespace runs to single spaces. Index patterns, questions and cache keys
/// all go through this, so they agree on what counts as the same text.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '\u{2019}' { '\'' } else { c })
        .flat_map(char::to_lowercase)
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn on_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
