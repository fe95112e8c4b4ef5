use crate::utils::{numbered_chunks, MAX_MESSAGE_LENGTH};
use async_trait::async_trait;
use linkrelay_pipeline::DeliverySink;
use linkrelay_types::{RelayError, Result};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::debug;

/// Posts relay output into the destination chat using HTML parse mode
pub struct TelegramSink {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSink {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn send(&self, text: &str) -> Result<()> {
        for chunk in numbered_chunks(text, MAX_MESSAGE_LENGTH) {
            self.bot
                .send_message(self.chat_id, chunk)
                .parse_mode(ParseMode::Html)
                .await
                .map_err(|e| RelayError::Delivery(e.to_string()))?;
        }
        debug!("Sent {} chars to chat {}", text.len(), self.chat_id);
        Ok(())
    }
}
