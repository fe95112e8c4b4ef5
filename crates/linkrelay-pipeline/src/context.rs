//! Conversation context around a pivot message

use crate::source::MessageSource;
use linkrelay_types::{
    display_name, ChatHandle, ContextMessage, ContextWindow, MessageId, MessageQuery, RawMessage,
    RelayError, Result, MIN_CONTEXT_TEXT_CHARS, UNKNOWN_SENDER,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fetches the filtered neighbours of a pivot message
pub struct ContextFetcher {
    source: Arc<dyn MessageSource>,
    min_chars: usize,
}

impl ContextFetcher {
    pub fn new(source: Arc<dyn MessageSource>) -> Self {
        Self {
            source,
            min_chars: MIN_CONTEXT_TEXT_CHARS,
        }
    }

    /// Up to `before_count` messages preceding and `after_count` following `pivot`.
    ///
    /// Twice the requested amount is fetched on each side since short messages are
    /// filtered out. Missing neighbours shorten the window; they are not an error.
    pub async fn get_context(
        &self,
        chat: &ChatHandle,
        pivot: MessageId,
        before_count: usize,
        after_count: usize,
    ) -> Result<ContextWindow> {
        let mut window = ContextWindow::empty();

        if before_count > 0 {
            let query = MessageQuery::latest(before_count * 2).offset_id(pivot);
            let newest_first = self.fetch(chat, pivot, query).await?;
            window.before = self.select(newest_first, pivot, before_count).await;
            window.before.reverse();
        }

        if after_count > 0 {
            let query = MessageQuery::latest(after_count * 2 + 1)
                .min_id(pivot.saturating_sub(1))
                .reverse();
            let oldest_first = self.fetch(chat, pivot, query).await?;
            window.after = self.select(oldest_first, pivot, after_count).await;
        }

        debug!(
            "Context for message {}: {} before, {} after",
            pivot,
            window.before.len(),
            window.after.len()
        );
        Ok(window)
    }

    /// Display name of a message author, `unknown` if the lookup fails
    pub async fn sender_name(&self, message: &RawMessage) -> String {
        match self.source.resolve_sender(message).await {
            Ok(sender) => display_name(sender.as_ref()),
            Err(e) => {
                warn!("Sender lookup for message {} failed: {}", message.id, e);
                UNKNOWN_SENDER.to_string()
            }
        }
    }

    async fn fetch(
        &self,
        chat: &ChatHandle,
        pivot: MessageId,
        query: MessageQuery,
    ) -> Result<Vec<RawMessage>> {
        self.source
            .list_messages(chat, query)
            .await
            .map_err(|e| RelayError::ContextFetch {
                pivot,
                reason: e.to_string(),
            })
    }

    /// First `count` long-enough messages other than the pivot, in input order.
    /// Senders are only looked up for messages that make the cut.
    async fn select(
        &self,
        messages: Vec<RawMessage>,
        pivot: MessageId,
        count: usize,
    ) -> Vec<ContextMessage> {
        let mut selected = Vec::with_capacity(count);
        for message in messages {
            if selected.len() >= count {
                break;
            }
            if message.id == pivot || message.char_len() <= self.min_chars {
                continue;
            }
            let sender_name = self.sender_name(&message).await;
            selected.push(ContextMessage {
                id: message.id,
                timestamp: message.timestamp,
                sender_name,
                text: message.text,
            });
        }
        selected
    }
}
