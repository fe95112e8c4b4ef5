use linkrelay_types::{ExtractedUrlSet, UrlCandidate};
use tracing::trace;

/// Collapse candidates sharing a normalized URL.
///
/// The first occurrence wins, so the input order decides source priority.
pub fn dedupe(candidates: impl IntoIterator<Item = UrlCandidate>) -> ExtractedUrlSet {
    let mut set = ExtractedUrlSet::new();
    for candidate in candidates {
        let (source, url) = (candidate.source_type, candidate.normalized_url.clone());
        if !set.insert(candidate) {
            trace!("Dropped duplicate {} url {}", source, url);
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkrelay_types::SourceType;

    fn candidate(source_type: SourceType, raw: &str, normalized: &str) -> UrlCandidate {
        UrlCandidate {
            source_type,
            raw_url: raw.to_string(),
            normalized_url: normalized.to_string(),
            associated_text: None,
            position: None,
        }
    }

    #[test]
    fn test_keeps_first_occurrence_order() {
        let set = dedupe(vec![
            candidate(SourceType::Text, "b.io", "b.io"),
            candidate(SourceType::Text, "a.io", "a.io"),
            candidate(SourceType::Entity, "b.io.", "b.io"),
            candidate(SourceType::Button, "c.io", "c.io"),
            candidate(SourceType::Preview, "a.io", "a.io"),
        ]);
        let order: Vec<(&str, SourceType)> = set
            .iter()
            .map(|c| (c.normalized_url.as_str(), c.source_type))
            .collect();
        assert_eq!(
            order,
            vec![
                ("b.io", SourceType::Text),
                ("a.io", SourceType::Text),
                ("c.io", SourceType::Button),
            ]
        );
    }

    #[test]
    fn test_text_source_wins_over_entity() {
        let set = dedupe(vec![
            candidate(SourceType::Text, "www.foo.com", "https://www.foo.com"),
            candidate(SourceType::Entity, "www.foo.com", "https://www.foo.com"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].source_type, SourceType::Text);
    }

    #[test]
    fn test_raw_spelling_does_not_matter() {
        let set = dedupe(vec![
            candidate(SourceType::Text, "https://x.io/a,", "https://x.io/a"),
            candidate(SourceType::Entity, "https://x.io/a", "https://x.io/a"),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].raw_url, "https://x.io/a,");
    }

    #[test]
    fn test_empty_input() {
        assert!(dedupe(Vec::new()).is_empty());
    }
}
