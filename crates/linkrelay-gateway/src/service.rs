use crate::config::Config;
use anyhow::Result;
use linkrelay_channel::{Recorder, TelegramSink};
use linkrelay_logging::LogFormat;
use linkrelay_persistence::MessageStore;
use linkrelay_pipeline::{Forwarder, MessageSource, Poller, UrlExtractor};
use linkrelay_types::{ChatHandle, RelayError};
use std::sync::Arc;
use teloxide::Bot;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Gateway service - main orchestrator
pub struct GatewayService {
    config: Config,
}

impl GatewayService {
    /// Create a new gateway service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the gateway service until Ctrl+C or until the recorder stops
    pub async fn run(self) -> Result<()> {
        let format = LogFormat::parse(&self.config.logging.format)?;
        linkrelay_logging::init_logging(&self.config.logging.level, format)?;
        info!("Starting LinkRelay Gateway Service");

        self.config.validate()?;
        info!(
            "Relay config: source={}, destination={}, fetch_limit={}, interval={}s, context={}/{}",
            self.config.source.chat,
            self.config.destination.chat_id,
            self.config.relay.fetch_limit,
            self.config.relay.poll_interval_secs,
            self.config.relay.context_before,
            self.config.relay.context_after
        );

        let store = Arc::new(MessageStore::new(&self.config.database.path).await?);
        info!("Message store initialized");

        let bot = Bot::new(&self.config.telegram.bot_token);
        let shutdown = CancellationToken::new();

        // Setup signal handler for graceful shutdown
        let signal_token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
            }
            info!("Received shutdown signal");
            signal_token.cancel();
        });

        let recorder = Recorder::new(bot.clone(), store.clone())
            .with_retention_days(self.config.source.retention_days);
        let mut recorder_task = tokio::spawn(recorder.run(shutdown.clone()));

        tokio::select! {
            result = &mut recorder_task => {
                match result {
                    Ok(Ok(())) => info!("Recorder finished"),
                    Ok(Err(e)) => error!("Recorder error: {}", e),
                    Err(e) => error!("Recorder task failed: {}", e),
                }
            }
            result = self.relay(store, bot, shutdown.clone()) => {
                if let Err(e) = result {
                    error!("Relay error: {}", e);
                }
            }
        }

        info!("Shutting down gracefully...");
        shutdown.cancel();
        if !recorder_task.is_finished() {
            if let Err(e) = recorder_task.await {
                error!("Recorder task failed: {}", e);
            }
        }

        info!("Gateway service stopped");
        Ok(())
    }

    /// Resolve the source chat, then poll and forward until shutdown
    async fn relay(
        &self,
        store: Arc<MessageStore>,
        bot: Bot,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let Some(chat) = self.wait_for_chat(store.as_ref(), &shutdown).await else {
            return Ok(());
        };
        info!(
            "Relaying links from chat {} ({})",
            chat.id,
            chat.title.as_deref().unwrap_or("untitled")
        );
        match store.message_count(chat.id).await {
            Ok(count) => info!("{} messages of chat {} already recorded", count, chat.id),
            Err(e) => warn!("Failed to count recorded messages: {}", e),
        }

        let sink = Arc::new(TelegramSink::new(bot, self.config.destination.chat_id));
        let forwarder = Forwarder::new(sink, self.config.relay.forwarder_config()?);

        if self.config.destination.announce_startup {
            let notice = format!(
                "🤖 LinkRelay is online (checking every {} s)",
                self.config.relay.poll_interval_secs
            );
            if let Err(e) = forwarder.announce(&notice).await {
                warn!("Failed to send startup announcement: {}", e);
            }
        }

        let poller = Poller::new(
            store,
            chat,
            UrlExtractor::new()?,
            forwarder,
            self.config.relay.poller_config(),
        )
        .with_cursor(self.config.relay.start_cursor());

        poller.run(shutdown).await;
        Ok(())
    }

    /// A username only resolves once the recorder has seen the chat, so keep
    /// retrying every poll interval. `None` means shutdown came first.
    async fn wait_for_chat(
        &self,
        store: &MessageStore,
        shutdown: &CancellationToken,
    ) -> Option<ChatHandle> {
        let identifier = &self.config.source.chat;
        loop {
            match store.resolve_chat(identifier).await {
                Ok(chat) => return Some(chat),
                Err(RelayError::ChatNotFound(_)) => warn!(
                    "Source chat {} not recorded yet, make sure the bot is a member",
                    identifier
                ),
                Err(e) => error!("Failed to resolve source chat {}: {}", identifier, e),
            }

            tokio::select! {
                _ = shutdown.cancelled() => return None,
                _ = tokio::time::sleep(self.config.relay.poll_interval()) => {}
            }
        }
    }
}
