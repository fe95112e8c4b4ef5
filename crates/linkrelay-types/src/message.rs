use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Message ID type (Telegram message ID, monotonically increasing per chat)
pub type MessageId = i64;

/// Chat ID type (Telegram chat ID)
pub type ChatId = i64;

/// A message as fetched from the source chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub timestamp: DateTime<Utc>,
    pub sender_id: Option<i64>,
    pub text: String,
    #[serde(default)]
    pub entities: Vec<TextEntity>,
    /// Inline keyboard rows, if the message carries one
    #[serde(default)]
    pub keyboard: Option<Vec<Vec<KeyboardButton>>>,
    #[serde(default)]
    pub preview: Option<LinkPreview>,
}

/// A typed span of the message text.
///
/// `offset` and `length` are counted in UTF-16 code units, as Telegram reports them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEntity {
    pub kind: EntityKind,
    pub offset: usize,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Text covering an explicit hyperlink target
    TextLink { url: String },
    /// Text that is itself a URL
    Url,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyboardButton {
    pub text: String,
    /// Target of a URL or login-URL button; `None` for callback and other buttons
    pub url: Option<String>,
}

impl KeyboardButton {
    pub fn url(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: Some(url.into()),
        }
    }

    pub fn callback(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: Option<String>,
    pub title: Option<String>,
}

impl RawMessage {
    pub fn new(
        id: MessageId,
        chat_id: ChatId,
        timestamp: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            chat_id,
            timestamp,
            sender_id: None,
            text: text.into(),
            entities: Vec::new(),
            keyboard: None,
            preview: None,
        }
    }

    pub fn with_sender(mut self, sender_id: i64) -> Self {
        self.sender_id = Some(sender_id);
        self
    }

    pub fn with_entity(mut self, kind: EntityKind, offset: usize, length: usize) -> Self {
        self.entities.push(TextEntity {
            kind,
            offset,
            length,
        });
        self
    }

    pub fn with_keyboard(mut self, rows: Vec<Vec<KeyboardButton>>) -> Self {
        self.keyboard = Some(rows);
        self
    }

    pub fn with_preview(mut self, url: Option<String>, title: Option<String>) -> Self {
        self.preview = Some(LinkPreview { url, title });
        self
    }

    /// Text covered by an entity, sliced by UTF-16 code units.
    ///
    /// Returns `None` if the span falls outside the message text.
    pub fn entity_text(&self, entity: &TextEntity) -> Option<String> {
        let units: Vec<u16> = self.text.encode_utf16().collect();
        let end = entity.offset.checked_add(entity.length)?;
        let span = units.get(entity.offset..end)?;
        Some(String::from_utf16_lossy(span))
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Handle to a resolved source chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatHandle {
    pub id: ChatId,
    pub username: Option<String>,
    pub title: Option<String>,
}

impl ChatHandle {
    pub fn new(id: ChatId) -> Self {
        Self {
            id,
            username: None,
            title: None,
        }
    }
}

/// Parameters of a message listing call.
///
/// `min_id` and `offset_id` are exclusive bounds. Without `reverse` results are
/// newest-first; with `reverse` they are in ascending id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: usize,
    pub min_id: Option<MessageId>,
    pub offset_id: Option<MessageId>,
    pub reverse: bool,
}

impl MessageQuery {
    /// The most recent `limit` messages, newest first
    pub fn latest(limit: usize) -> Self {
        Self {
            limit,
            min_id: None,
            offset_id: None,
            reverse: false,
        }
    }

    pub fn min_id(mut self, min_id: MessageId) -> Self {
        self.min_id = Some(min_id);
        self
    }

    pub fn offset_id(mut self, offset_id: MessageId) -> Self {
        self.offset_id = Some(offset_id);
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(text: &str) -> RawMessage {
        RawMessage::new(1, -100, Utc::now(), text)
    }

    #[test]
    fn test_entity_text_ascii() {
        let msg = message("see here for more");
        let entity = TextEntity {
            kind: EntityKind::Url,
            offset: 4,
            length: 4,
        };
        assert_eq!(msg.entity_text(&entity).as_deref(), Some("here"));
    }

    #[test]
    fn test_entity_text_counts_utf16_units() {
        // The emoji occupies two UTF-16 code units
        let msg = message("🔥 deal: example.com");
        let entity = TextEntity {
            kind: EntityKind::Url,
            offset: 9,
            length: 11,
        };
        assert_eq!(msg.entity_text(&entity).as_deref(), Some("example.com"));
    }

    #[test]
    fn test_entity_text_out_of_range() {
        let msg = message("short");
        let entity = TextEntity {
            kind: EntityKind::Url,
            offset: 3,
            length: 10,
        };
        assert!(msg.entity_text(&entity).is_none());
    }

    #[test]
    fn test_char_len_counts_characters() {
        assert_eq!(message("こんにちは").char_len(), 5);
        assert_eq!(message("hello").char_len(), 5);
    }

    #[test]
    fn test_query_builder() {
        let query = MessageQuery::latest(10).min_id(99).reverse();
        assert_eq!(query.limit, 10);
        assert_eq!(query.min_id, Some(99));
        assert_eq!(query.offset_id, None);
        assert!(query.reverse);
    }

    #[test]
    fn test_raw_message_json_round_trip_keeps_entities() {
        let msg = message("here")
            .with_entity(
                EntityKind::TextLink {
                    url: "www.foo.com".into(),
                },
                0,
                4,
            )
            .with_keyboard(vec![vec![KeyboardButton::url("Open", "https://a.io")]]);
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"text_link\""));
        let back: RawMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
