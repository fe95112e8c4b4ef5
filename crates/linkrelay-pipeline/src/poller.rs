//! Tick loop: fetch, enrich, sort, deliver, advance

use crate::context::ContextFetcher;
use crate::cursor::SyncCursor;
use crate::extract::UrlExtractor;
use crate::forwarder::{DeliveryReport, Forwarder};
use crate::source::MessageSource;
use linkrelay_types::{ChatHandle, ContextWindow, EnrichedMessage, RawMessage};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Messages fetched per tick
    pub fetch_limit: usize,
    /// Pause between the end of one tick and the start of the next
    pub poll_interval: Duration,
    pub context_before: usize,
    pub context_after: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 200,
            poll_interval: Duration::from_secs(60),
            context_before: 2,
            context_after: 5,
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub fetched: usize,
    pub enriched: usize,
    pub report: DeliveryReport,
    pub cursor: SyncCursor,
}

/// Owns the sync cursor and runs ticks sequentially
pub struct Poller {
    source: Arc<dyn MessageSource>,
    chat: ChatHandle,
    extractor: UrlExtractor,
    context: ContextFetcher,
    forwarder: Forwarder,
    cursor: SyncCursor,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        source: Arc<dyn MessageSource>,
        chat: ChatHandle,
        extractor: UrlExtractor,
        forwarder: Forwarder,
        config: PollerConfig,
    ) -> Self {
        Self {
            context: ContextFetcher::new(source.clone()),
            source,
            chat,
            extractor,
            forwarder,
            cursor: SyncCursor::Unset,
            config,
        }
    }

    /// Resume from a known cursor instead of the latest messages
    pub fn with_cursor(mut self, cursor: SyncCursor) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn cursor(&self) -> SyncCursor {
        self.cursor
    }

    /// Run ticks until `shutdown` is cancelled.
    ///
    /// The token is only observed between ticks, so a batch is never cut short.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(
            "Polling chat {} every {:?} (limit {}, context {}/{})",
            self.chat.id,
            self.config.poll_interval,
            self.config.fetch_limit,
            self.config.context_before,
            self.config.context_after
        );
        if self.cursor.is_unset() {
            info!(
                "No cursor yet, first tick reads the latest {} messages",
                self.config.fetch_limit
            );
        } else {
            info!("Resuming from cursor {:?}", self.cursor);
        }

        while !shutdown.is_cancelled() {
            self.tick().await;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }

        info!("Poller stopped at cursor {:?}", self.cursor);
    }

    /// One fetch-process-deliver cycle.
    ///
    /// A failed fetch counts as zero messages and leaves the cursor alone.
    pub async fn tick(&mut self) -> TickSummary {
        let query = self.cursor.next_query(self.config.fetch_limit);
        debug!("Fetching with {:?}", query);

        let messages = match self.source.list_messages(&self.chat, query).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Failed to fetch messages: {}", e);
                Vec::new()
            }
        };
        info!("Fetched {} messages", messages.len());

        let batch = self.collect(&messages).await;
        info!("{} messages carry links", batch.len());

        let report = self.forwarder.deliver(&batch).await;

        let observed_max = messages.iter().map(|m| m.id).max();
        if self.cursor.advance(observed_max) {
            info!("Cursor advanced to {:?}", self.cursor.position());
        }

        TickSummary {
            fetched: messages.len(),
            enriched: batch.len(),
            report,
            cursor: self.cursor,
        }
    }

    /// Enrich every link-bearing message, oldest first by timestamp
    pub async fn collect(&self, messages: &[RawMessage]) -> Vec<EnrichedMessage> {
        let mut batch = Vec::new();
        for message in messages {
            if let Some(enriched) = self.enrich(message).await {
                batch.push(enriched);
            }
        }
        // Stable: equal timestamps keep fetch order
        batch.sort_by_key(|m| m.timestamp);
        batch
    }

    async fn enrich(&self, message: &RawMessage) -> Option<EnrichedMessage> {
        let urls = self.extractor.extract_all(message);
        debug!("Message {} has {} urls", message.id, urls.len());
        if urls.is_empty() {
            return None;
        }

        let sender_name = self.context.sender_name(message).await;
        let context = match self
            .context
            .get_context(
                &self.chat,
                message.id,
                self.config.context_before,
                self.config.context_after,
            )
            .await
        {
            Ok(window) => window,
            Err(e) => {
                warn!("Forwarding message {} without context: {}", message.id, e);
                ContextWindow::empty()
            }
        };

        Some(EnrichedMessage {
            id: message.id,
            chat_id: message.chat_id,
            timestamp: message.timestamp,
            sender_name,
            text: message.text.clone(),
            urls,
            context,
        })
    }
}
