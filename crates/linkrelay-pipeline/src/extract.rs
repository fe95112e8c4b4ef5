//! URL extraction from the four link sources of a message

use crate::dedupe::dedupe;
use anyhow::{anyhow, Result};
use linkrelay_types::{
    ButtonPosition, EntityKind, ExtractedUrlSet, RawMessage, SourceType, UrlCandidate,
};
use regex::Regex;

/// Domain-like tokens: optional scheme or well-known prefix, two or more labels,
/// optional port, optional path up to whitespace, brackets or quotes.
///
/// Every label needs at least two characters, so hosts like `x.com`, `t.co` and
/// `t.me/<name>` never match here. Telegram marks those with a `url` entity and
/// they arrive as ENTITY candidates instead.
const URL_PATTERN: &str = r#"(?ix)
    \b(
        (?:https?://|www\.|t\.me/|telegram\.me/)?
        [a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9])
        (?:\.[a-z0-9](?:[a-z0-9\-]{0,61}[a-z0-9]))+
        (?::\d+)?
        (?:/[^\s<>()\[\]{}"'、。】』」]*)?
    )
"#;

/// Characters stripped from the end of a URL
const TRAILING_CHARS: &[char] = &['.', ',', '、', '。', ')', '］', '】', '>', '」'];

/// Normalize a URL for comparison.
///
/// Trims whitespace, strips trailing punctuation and closing brackets, and adds
/// `https://` to bare `www.` hosts. Applying it twice gives the same result.
pub fn normalize_url(url: &str) -> String {
    let trimmed = url
        .trim()
        .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_CHARS.contains(&c));

    if trimmed.starts_with("www.") {
        format!("https://{}", trimmed)
    } else {
        trimmed.to_string()
    }
}

/// Pulls link candidates out of a message
pub struct UrlExtractor {
    pattern: Regex,
}

impl UrlExtractor {
    pub fn new() -> Result<Self> {
        let pattern =
            Regex::new(URL_PATTERN).map_err(|e| anyhow!("Failed to compile URL regex: {}", e))?;
        Ok(Self { pattern })
    }

    /// All links of a message, deduplicated in TEXT, ENTITY, BUTTON, PREVIEW priority
    pub fn extract_all(&self, message: &RawMessage) -> ExtractedUrlSet {
        dedupe(self.candidates(message))
    }

    /// Raw candidates of every source, concatenated in priority order
    pub fn candidates(&self, message: &RawMessage) -> Vec<UrlCandidate> {
        SourceType::PRIORITY
            .iter()
            .flat_map(|source| match source {
                SourceType::Text => self.text_urls(&message.text),
                SourceType::Entity => entity_urls(message),
                SourceType::Button => button_urls(message),
                SourceType::Preview => preview_urls(message),
            })
            .collect()
    }

    /// Regex matches in the plain text
    pub fn text_urls(&self, text: &str) -> Vec<UrlCandidate> {
        self.pattern
            .find_iter(text)
            .filter_map(|m| candidate(SourceType::Text, m.as_str(), None, None))
            .collect()
    }
}

fn entity_urls(message: &RawMessage) -> Vec<UrlCandidate> {
    message
        .entities
        .iter()
        .filter_map(|entity| match &entity.kind {
            EntityKind::TextLink { url } => {
                candidate(SourceType::Entity, url, message.entity_text(entity), None)
            }
            EntityKind::Url => {
                let fragment = message.entity_text(entity)?;
                candidate(SourceType::Entity, &fragment, Some(fragment.clone()), None)
            }
            EntityKind::Other => None,
        })
        .collect()
}

fn button_urls(message: &RawMessage) -> Vec<UrlCandidate> {
    let Some(rows) = &message.keyboard else {
        return Vec::new();
    };

    let mut urls = Vec::new();
    for (row, buttons) in rows.iter().enumerate() {
        for (col, button) in buttons.iter().enumerate() {
            if let Some(url) = &button.url {
                urls.extend(candidate(
                    SourceType::Button,
                    url,
                    Some(button.text.clone()),
                    Some(ButtonPosition { row, col }),
                ));
            }
        }
    }
    urls
}

fn preview_urls(message: &RawMessage) -> Vec<UrlCandidate> {
    message
        .preview
        .as_ref()
        .and_then(|preview| {
            let url = preview.url.as_deref()?;
            candidate(SourceType::Preview, url, preview.title.clone(), None)
        })
        .into_iter()
        .collect()
}

/// Build a candidate, skipping URLs that normalize to nothing
fn candidate(
    source_type: SourceType,
    raw_url: &str,
    associated_text: Option<String>,
    position: Option<ButtonPosition>,
) -> Option<UrlCandidate> {
    let normalized_url = normalize_url(raw_url);
    if normalized_url.is_empty() {
        return None;
    }
    Some(UrlCandidate {
        source_type,
        raw_url: raw_url.to_string(),
        normalized_url,
        associated_text,
        position,
    })
}
