//! LinkRelay Types - Core types for the LinkRelay pipeline
//!
//! This module defines the data model shared by the store, the pipeline and the
//! Telegram channel: raw source messages, URL candidates, context windows and the
//! enriched records handed to the forwarder.

mod error;
mod message;
mod relay;
mod sender;
mod url;

pub use error::{RelayError, Result};
pub use message::{
    ChatHandle, ChatId, EntityKind, KeyboardButton, LinkPreview, MessageId, MessageQuery,
    RawMessage, TextEntity,
};
pub use relay::{ContextMessage, ContextWindow, EnrichedMessage};
pub use sender::{display_name, Sender, UNKNOWN_SENDER};
pub use url::{ButtonPosition, ExtractedUrlSet, SourceType, UrlCandidate};

/// Minimum number of characters a context message must exceed to be kept
pub const MIN_CONTEXT_TEXT_CHARS: usize = 6;
