use crate::{ChatId, ExtractedUrlSet, MessageId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A neighbouring message shown around a pivot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextMessage {
    pub id: MessageId,
    pub timestamp: DateTime<Utc>,
    pub sender_name: String,
    pub text: String,
}

/// Messages surrounding a pivot.
///
/// `before` runs oldest to pivot-adjacent, `after` runs pivot-adjacent to newest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContextWindow {
    pub before: Vec<ContextMessage>,
    pub after: Vec<ContextMessage>,
}

impl ContextWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }

    pub fn contains(&self, id: MessageId) -> bool {
        self.before.iter().chain(&self.after).any(|m| m.id == id)
    }
}

/// A link-bearing message ready to forward
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub timestamp: DateTime<Utc>,
    pub sender_name: String,
    pub text: String,
    pub urls: ExtractedUrlSet,
    pub context: ContextWindow,
}
