//! Records source-chat traffic into the message store.
//!
//! The Bot API has no history endpoint, so the relay reads from a local copy
//! of the chat that this dispatcher keeps up to date.

use crate::validate_token;
use anyhow::Result;
use chrono::{Duration, Utc};
use linkrelay_persistence::MessageStore;
use linkrelay_types::{ChatHandle, EntityKind, KeyboardButton, LinkPreview, RawMessage, Sender};
use std::sync::Arc;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{
    Chat, InlineKeyboardButtonKind, MediaKind, MediaText, MessageCommon, MessageEntityKind,
    MessageKind,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Long-polling dispatcher writing every seen message to the store
pub struct Recorder {
    bot: Bot,
    store: Arc<MessageStore>,
    retention: Option<Duration>,
}

struct RecorderState {
    store: Arc<MessageStore>,
    retention: Option<Duration>,
}

impl Recorder {
    pub fn new(bot: Bot, store: Arc<MessageStore>) -> Self {
        Self {
            bot,
            store,
            retention: None,
        }
    }

    /// Drop stored messages older than `days`; 0 keeps everything
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention = (days > 0).then(|| Duration::days(i64::from(days)));
        self
    }

    /// Dispatch updates until `shutdown` is cancelled
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        validate_token(&self.bot).await?;

        info!("Starting message recorder...");

        let state = Arc::new(RecorderState {
            store: self.store,
            retention: self.retention,
        });

        let mut dispatcher = Dispatcher::builder(self.bot, schema())
            .dependencies(dptree::deps![state])
            .error_handler(LoggingErrorHandler::with_custom_text(
                "An error has occurred while recording",
            ))
            .build();

        let token = dispatcher.shutdown_token();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            match token.shutdown() {
                Ok(done) => done.await,
                Err(e) => warn!("Recorder was not running at shutdown: {}", e),
            }
        });

        dispatcher.dispatch().await;

        info!("Message recorder stopped");
        Ok(())
    }
}

fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(Update::filter_message().endpoint(record))
        .branch(Update::filter_edited_message().endpoint(record))
        .branch(Update::filter_channel_post().endpoint(record))
        .branch(Update::filter_edited_channel_post().endpoint(record))
}

async fn record(msg: Message, state: Arc<RecorderState>) -> Result<()> {
    state.store.save_chat(&chat_handle(&msg.chat)).await?;
    if let Some(sender) = sender_of(&msg) {
        state.store.save_sender(&sender).await?;
    }
    state.store.save_message(&raw_message(&msg)).await?;

    if let Some(retention) = state.retention {
        state.store.prune_older_than(Utc::now() - retention).await?;
    }

    debug!("Recorded message {} from chat {}", msg.id.0, msg.chat.id.0);
    Ok(())
}

pub fn chat_handle(chat: &Chat) -> ChatHandle {
    ChatHandle {
        id: chat.id.0,
        username: chat.username().map(String::from),
        title: chat.title().map(String::from),
    }
}

/// Author of a message: the chat posting on its own behalf, or the user.
///
/// Anonymous admins and channel posts carry a placeholder `from`, so
/// `sender_chat` takes precedence whenever it is set.
pub fn sender_of(msg: &Message) -> Option<Sender> {
    if let Some(chat) = msg.sender_chat.as_ref() {
        return Some(Sender::with_profile(
            chat.id.0,
            chat.username().map(String::from),
            chat.title().map(String::from),
        ));
    }

    msg.from.as_ref().map(|user| {
        Sender::with_profile(
            user.id.0 as i64,
            user.username.clone(),
            Some(user.first_name.clone()),
        )
    })
}

/// Convert a Bot API message into the relay's source representation.
///
/// Captions stand in for text on media messages.
pub fn raw_message(msg: &Message) -> RawMessage {
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
    let mut raw = RawMessage::new(i64::from(msg.id.0), msg.chat.id.0, msg.date, text);
    raw.sender_id = sender_of(msg).map(|s| s.id);

    let entities = msg
        .entities()
        .or_else(|| msg.caption_entities())
        .unwrap_or_default();
    for entity in entities {
        let kind = match &entity.kind {
            MessageEntityKind::TextLink { url } => EntityKind::TextLink {
                url: url.to_string(),
            },
            MessageEntityKind::Url => EntityKind::Url,
            _ => EntityKind::Other,
        };
        raw = raw.with_entity(kind, entity.offset, entity.length);
    }

    if let Some(markup) = msg.reply_markup() {
        let rows = markup
            .inline_keyboard
            .iter()
            .map(|row| {
                row.iter()
                    .map(|button| KeyboardButton {
                        text: button.text.clone(),
                        url: match &button.kind {
                            InlineKeyboardButtonKind::Url(url) => Some(url.to_string()),
                            InlineKeyboardButtonKind::LoginUrl(login) => {
                                Some(login.url.to_string())
                            }
                            _ => None,
                        },
                    })
                    .collect()
            })
            .collect();
        raw = raw.with_keyboard(rows);
    }

    raw.preview = link_preview(msg);
    raw
}

/// The Bot API reports the previewed URL but not the page title
fn link_preview(msg: &Message) -> Option<LinkPreview> {
    let MessageKind::Common(MessageCommon {
        media_kind: MediaKind::Text(MediaText {
            link_preview_options: Some(options),
            ..
        }),
        ..
    }) = &msg.kind
    else {
        return None;
    };

    options.url.as_ref().map(|url| LinkPreview {
        url: Some(url.clone()),
        title: None,
    })
}
