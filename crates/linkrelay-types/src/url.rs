use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Where inside a message a URL was found.
///
/// Variant order is the deduplication priority: earlier sources win.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    Text,
    Entity,
    Button,
    Preview,
}

impl SourceType {
    pub const PRIORITY: [SourceType; 4] = [
        SourceType::Text,
        SourceType::Entity,
        SourceType::Button,
        SourceType::Preview,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Text => "TEXT",
            SourceType::Entity => "ENTITY",
            SourceType::Button => "BUTTON",
            SourceType::Preview => "PREVIEW",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row/column of an inline keyboard button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonPosition {
    pub row: usize,
    pub col: usize,
}

/// A link found in a message, before deduplication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlCandidate {
    pub source_type: SourceType,
    pub raw_url: String,
    pub normalized_url: String,
    pub associated_text: Option<String>,
    pub position: Option<ButtonPosition>,
}

/// Candidates of one message, unique by normalized URL, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedUrlSet {
    candidates: Vec<UrlCandidate>,
    #[serde(skip)]
    seen: HashSet<String>,
}

impl ExtractedUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate unless its normalized URL is already present.
    ///
    /// Returns `true` if the candidate was kept.
    pub fn insert(&mut self, candidate: UrlCandidate) -> bool {
        if self.seen.contains(&candidate.normalized_url) {
            return false;
        }
        self.seen.insert(candidate.normalized_url.clone());
        self.candidates.push(candidate);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UrlCandidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[UrlCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl<'a> IntoIterator for &'a ExtractedUrlSet {
    type Item = &'a UrlCandidate;
    type IntoIter = std::slice::Iter<'a, UrlCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(source_type: SourceType, url: &str) -> UrlCandidate {
        UrlCandidate {
            source_type,
            raw_url: url.to_string(),
            normalized_url: url.to_string(),
            associated_text: None,
            position: None,
        }
    }

    #[test]
    fn test_insert_rejects_duplicate_normalized_url() {
        let mut set = ExtractedUrlSet::new();
        assert!(set.insert(candidate(SourceType::Text, "https://a.io")));
        assert!(!set.insert(candidate(SourceType::Entity, "https://a.io")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].source_type, SourceType::Text);
    }

    #[test]
    fn test_priority_matches_variant_order() {
        let mut sorted = SourceType::PRIORITY;
        sorted.sort();
        assert_eq!(sorted, SourceType::PRIORITY);
    }

    #[test]
    fn test_source_type_serializes_uppercase() {
        let json = serde_json::to_string(&SourceType::Button).unwrap();
        assert_eq!(json, "\"BUTTON\"");
        assert_eq!(SourceType::Preview.to_string(), "PREVIEW");
    }
}
