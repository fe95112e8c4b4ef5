//! Paced delivery of enriched messages to the destination sink

use crate::render::{render, RenderedUnit};
use crate::source::DeliverySink;
use chrono::{FixedOffset, Offset, Utc};
use linkrelay_types::{EnrichedMessage, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct ForwarderConfig {
    /// Pause after each URL unit
    pub url_delay: Duration,
    /// Pause after each whole message
    pub message_delay: Duration,
    /// Offset used when rendering timestamps
    pub display_offset: FixedOffset,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            url_delay: Duration::from_millis(300),
            message_delay: Duration::from_millis(500),
            display_offset: Utc.fix(),
        }
    }
}

/// Outcome of one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Renders and sends batches one message at a time
pub struct Forwarder {
    sink: Arc<dyn DeliverySink>,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(sink: Arc<dyn DeliverySink>, config: ForwarderConfig) -> Self {
        Self { sink, config }
    }

    /// Deliver a batch in order.
    ///
    /// A failed send abandons the rest of that message and moves on to the next;
    /// failures are logged, never retried.
    pub async fn deliver(&self, batch: &[EnrichedMessage]) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for message in batch {
            match self.deliver_one(message).await {
                Ok(()) => {
                    info!("Forwarded message {} ({} urls)", message.id, message.urls.len());
                    report.delivered += 1;
                }
                Err(e) => {
                    error!("Failed to forward message {}: {}", message.id, e);
                    report.failed += 1;
                }
            }
            tokio::time::sleep(self.config.message_delay).await;
        }

        report
    }

    /// Send a standalone notice
    pub async fn announce(&self, text: &str) -> Result<()> {
        self.sink.send(text).await
    }

    async fn deliver_one(&self, message: &EnrichedMessage) -> Result<()> {
        for unit in render(message, &self.config.display_offset) {
            self.sink.send(unit.as_str()).await?;
            if let RenderedUnit::Url(_) = unit {
                tokio::time::sleep(self.config.url_delay).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::dedupe::dedupe;
    use crate::render::DIVIDER;
    use crate::testing::{base_time, RecordingSink};
    use linkrelay_types::{ContextWindow, SourceType, UrlCandidate};

    fn quick() -> ForwarderConfig {
        ForwarderConfig {
            url_delay: Duration::ZERO,
            message_delay: Duration::ZERO,
            ..ForwarderConfig::default()
        }
    }

    fn enriched(id: i64, url: &str) -> EnrichedMessage {
        EnrichedMessage {
            id,
            chat_id: -100,
            timestamp: base_time(),
            sender_name: format!("user{}", id),
            text: format!("message {} {}", id, url),
            urls: dedupe(vec![UrlCandidate {
                source_type: SourceType::Text,
                raw_url: url.to_string(),
                normalized_url: url.to_string(),
                associated_text: None,
                position: None,
            }]),
            context: ContextWindow::empty(),
        }
    }

    #[tokio::test]
    async fn test_delivers_in_order() {
        let sink = RecordingSink::new();
        let forwarder = Forwarder::new(sink.clone(), quick());

        let report = forwarder
            .deliver(&[enriched(1, "ab.io"), enriched(2, "cd.io")])
            .await;

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        let sent = sink.sent();
        assert_eq!(sent.len(), 8);
        assert_eq!(sent[0], DIVIDER);
        assert!(sent[1].contains("user1"));
        assert_eq!(sent[2], "ab.io");
        assert_eq!(sent[4], DIVIDER);
        assert!(sent[5].contains("user2"));
        assert_eq!(sent[6], "cd.io");
    }

    #[tokio::test]
    async fn test_failure_skips_rest_of_message_only() {
        let sink = RecordingSink::new();
        sink.fail_on("user1");
        let forwarder = Forwarder::new(sink.clone(), quick());

        let report = forwarder
            .deliver(&[enriched(1, "ab.io"), enriched(2, "cd.io")])
            .await;

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 1 });
        let sent = sink.sent();
        // Opening divider of message 1, then the whole of message 2
        assert_eq!(sent.len(), 5);
        assert!(!sent.iter().any(|s| s == "ab.io"));
        assert!(sent.iter().any(|s| s == "cd.io"));
    }

    #[tokio::test]
    async fn test_empty_batch_sends_nothing() {
        let sink = RecordingSink::new();
        let forwarder = Forwarder::new(sink.clone(), quick());

        let report = forwarder.deliver(&[]).await;

        assert_eq!(report, DeliveryReport::default());
        assert!(sink.sent().is_empty());
    }

    #[tokio::test]
    async fn test_announce_goes_straight_to_sink() {
        let sink = RecordingSink::new();
        let forwarder = Forwarder::new(sink.clone(), quick());

        forwarder.announce("online").await.unwrap();

        assert_eq!(sink.sent(), vec!["online".to_string()]);
    }
}
