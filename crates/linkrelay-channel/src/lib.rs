//! Telegram side of LinkRelay: the recorder that mirrors the source chat into
//! the message store, and the sink that posts into the destination chat.

pub mod recorder;
pub mod sink;
pub mod utils;

pub use recorder::Recorder;
pub use sink::TelegramSink;

use anyhow::{anyhow, Result};
use teloxide::prelude::*;
use tracing::info;

/// Validate the bot token by making a test API call
pub async fn validate_token(bot: &Bot) -> Result<()> {
    info!("Validating Telegram bot token...");

    match bot.get_me().await {
        Ok(me) => {
            info!("Telegram bot token is valid (@{})", me.username());
            Ok(())
        }
        Err(teloxide::RequestError::Api(teloxide::ApiError::InvalidToken)) => Err(anyhow!(
            "Invalid Telegram bot token. Please check TELEGRAM_BOT_TOKEN environment variable \
            or edit ~/.linkrelay/linkrelay.toml"
        )),
        Err(e) => Err(anyhow!("Failed to validate Telegram bot token: {}", e)),
    }
}
