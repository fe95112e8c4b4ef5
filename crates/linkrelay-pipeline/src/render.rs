//! Rendering of enriched messages into Telegram HTML units

use chrono::FixedOffset;
use linkrelay_types::{ContextMessage, EnrichedMessage, ExtractedUrlSet};

/// Opening and closing marker of every forwarded message
pub const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

pub const BEFORE_TITLE: &str = "📜 Earlier:";
pub const AFTER_TITLE: &str = "📝 Later:";

/// Context lines are cut to this many characters
const CONTEXT_PREVIEW_CHARS: usize = 100;

/// One sink call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedUnit {
    Text(String),
    /// A single link, sent alone so the destination renders its preview
    Url(String),
}

impl RenderedUnit {
    pub fn as_str(&self) -> &str {
        match self {
            RenderedUnit::Text(text) | RenderedUnit::Url(text) => text,
        }
    }
}

/// Escape text for Telegram's HTML parse mode
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Remove every extracted URL (raw and normalized spelling) from the body text
pub fn strip_urls(text: &str, urls: &ExtractedUrlSet) -> String {
    let mut needles: Vec<&str> = urls
        .iter()
        .flat_map(|c| [c.raw_url.as_str(), c.normalized_url.as_str()])
        .filter(|n| !n.is_empty())
        .collect();
    // Longest first so a URL that prefixes another does not leave a tail behind
    needles.sort_by_key(|n| std::cmp::Reverse(n.len()));
    needles.dedup();

    let mut body = text.to_string();
    for needle in needles {
        body = body.replace(needle, "");
    }

    body.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Code block listing context messages, `None` when there are none
pub fn context_block(
    title: &str,
    messages: &[ContextMessage],
    offset: &FixedOffset,
) -> Option<String> {
    if messages.is_empty() {
        return None;
    }

    let mut block = format!("<pre>{}\n", title);
    for message in messages {
        let time = message.timestamp.with_timezone(offset).format("%H:%M");
        let preview: String = message
            .text
            .chars()
            .take(CONTEXT_PREVIEW_CHARS)
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        block.push_str(&format!(
            "[{}] {}: {}\n",
            time,
            escape_html(&message.sender_name),
            escape_html(&preview)
        ));
    }
    block.push_str("</pre>");
    Some(block)
}

/// Timestamp line followed by the sender and the body without its links
pub fn header(message: &EnrichedMessage, offset: &FixedOffset) -> String {
    let date = message.timestamp.with_timezone(offset).format("%m-%d %H:%M");
    let body = strip_urls(&message.text, &message.urls);
    let sender = escape_html(&message.sender_name);

    if body.is_empty() {
        format!("<b>🐾 ── {} ──</b>\n<b>{}</b>", date, sender)
    } else {
        format!(
            "<b>🐾 ── {} ──</b>\n<b>{}</b>: {}",
            date,
            sender,
            escape_html(&body)
        )
    }
}

/// Every sink call for one message, in delivery order
pub fn render(message: &EnrichedMessage, offset: &FixedOffset) -> Vec<RenderedUnit> {
    let mut units = vec![RenderedUnit::Text(DIVIDER.to_string())];

    if let Some(block) = context_block(BEFORE_TITLE, &message.context.before, offset) {
        units.push(RenderedUnit::Text(block));
    }

    units.push(RenderedUnit::Text(header(message, offset)));

    units.extend(
        message
            .urls
            .iter()
            .map(|c| RenderedUnit::Url(escape_html(&c.normalized_url))),
    );

    if let Some(block) = context_block(AFTER_TITLE, &message.context.after, offset) {
        units.push(RenderedUnit::Text(block));
    }

    units.push(RenderedUnit::Text(DIVIDER.to_string()));
    units
}
