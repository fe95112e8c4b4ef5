//! Error types for the relay pipeline

use crate::MessageId;
use thiserror::Error;

/// Relay pipeline errors
#[derive(Debug, Error)]
pub enum RelayError {
    /// Listing messages from the source failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Fetching the context around a pivot failed
    #[error("Context fetch for message {pivot} failed: {reason}")]
    ContextFetch {
        /// Pivot message id
        pivot: MessageId,
        /// Failure reason
        reason: String,
    },

    /// Sender of a message could not be resolved
    #[error("Sender lookup for message {message} failed: {reason}")]
    SenderLookup {
        /// Message id
        message: MessageId,
        /// Failure reason
        reason: String,
    },

    /// Chat identifier did not match any known chat
    #[error("Chat '{0}' not found")]
    ChatNotFound(String),

    /// Sending to the destination failed
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Message store error
    #[error("Store error: {0}")]
    Store(String),
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, RelayError>;
