//! Collaborator seams: where messages come from and where they go

use async_trait::async_trait;
use linkrelay_types::{ChatHandle, MessageQuery, RawMessage, Result, Sender};

/// Read access to the source chat history
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// List messages of `chat` according to `query`.
    ///
    /// Results are newest-first unless `query.reverse` is set.
    async fn list_messages(
        &self,
        chat: &ChatHandle,
        query: MessageQuery,
    ) -> Result<Vec<RawMessage>>;

    /// Author of a message, `None` for anonymous posts
    async fn resolve_sender(&self, message: &RawMessage) -> Result<Option<Sender>>;

    /// Resolve a `@username`, `t.me` link or numeric id into a chat handle
    async fn resolve_chat(&self, identifier: &str) -> Result<ChatHandle>;
}

/// Destination channel
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send(&self, text: &str) -> Result<()>;
}
