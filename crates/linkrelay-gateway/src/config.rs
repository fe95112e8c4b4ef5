use anyhow::{anyhow, bail, Context};
use chrono::FixedOffset;
use linkrelay_pipeline::{ForwarderConfig, PollerConfig, SyncCursor};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound for `context_before` and `context_after`
const MAX_CONTEXT_MESSAGES: usize = 50;

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[telegram]
bot_token = ""  # Set via TELEGRAM_BOT_TOKEN env var

[source]
chat = ""  # @username, t.me link or numeric id. Set via LINKRELAY_SOURCE_CHAT env var
retention_days = 0  # prune recorded messages older than this, 0 keeps everything

[destination]
chat_id = 0  # Set via LINKRELAY_DESTINATION_CHAT_ID env var
announce_startup = true

[relay]
fetch_limit = 200
poll_interval_secs = 60
context_before = 2
context_after = 5
url_delay_ms = 300
message_delay_ms = 500
display_utc_offset_minutes = 0

[database]
path = "linkrelay.db"

[logging]
level = "info"  # trace, debug, info, warn, error
format = "pretty"  # pretty or json
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub chat: String,
    #[serde(default)]
    pub retention_days: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DestinationConfig {
    pub chat_id: i64,
    #[serde(default = "default_announce_startup")]
    pub announce_startup: bool,
}

fn default_announce_startup() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub fetch_limit: usize,
    pub poll_interval_secs: u64,
    pub context_before: usize,
    pub context_after: usize,
    pub url_delay_ms: u64,
    pub message_delay_ms: u64,
    pub display_utc_offset_minutes: i32,
    /// Resume after this message id instead of the latest messages
    pub start_after_id: Option<i64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            fetch_limit: 200,
            poll_interval_secs: 60,
            context_before: 2,
            context_after: 5,
            url_delay_ms: 300,
            message_delay_ms: 500,
            display_utc_offset_minutes: 0,
            start_after_id: None,
        }
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn display_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.display_utc_offset_minutes.saturating_mul(60)).ok_or_else(
            || {
                anyhow!(
                    "display_utc_offset_minutes out of range: {}",
                    self.display_utc_offset_minutes
                )
            },
        )
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            fetch_limit: self.fetch_limit,
            poll_interval: self.poll_interval(),
            context_before: self.context_before,
            context_after: self.context_after,
        }
    }

    pub fn forwarder_config(&self) -> anyhow::Result<ForwarderConfig> {
        Ok(ForwarderConfig {
            url_delay: Duration::from_millis(self.url_delay_ms),
            message_delay: Duration::from_millis(self.message_delay_ms),
            display_offset: self.display_offset()?,
        })
    }

    pub fn start_cursor(&self) -> SyncCursor {
        SyncCursor::starting_after(self.start_after_id)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "linkrelay.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub source: SourceConfig,
    pub destination: DestinationConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.linkrelay/linkrelay.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".linkrelay").join("linkrelay.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.linkrelay/linkrelay.toml (auto-created if missing)
    /// 2. Local override: ./linkrelay.toml (workspace, optional)
    /// 3. Environment variables (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;

        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(global_config_path))
            .add_source(config::File::with_name("linkrelay").required(false))
            .add_source(config::Environment::with_prefix("LINKRELAY").separator("__"));

        // Convenience env var overrides
        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            config_builder = config_builder.set_override("telegram.bot_token", token)?;
        }

        if let Ok(chat) = env::var("LINKRELAY_SOURCE_CHAT") {
            config_builder = config_builder.set_override("source.chat", chat)?;
        }

        if let Ok(raw) = env::var("LINKRELAY_DESTINATION_CHAT_ID") {
            let chat_id: i64 = raw
                .trim()
                .parse()
                .with_context(|| format!("LINKRELAY_DESTINATION_CHAT_ID is not a chat id: {}", raw))?;
            config_builder = config_builder.set_override("destination.chat_id", chat_id)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Reject settings the relay cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("Telegram bot token is empty. Set TELEGRAM_BOT_TOKEN or edit ~/.linkrelay/linkrelay.toml");
        }
        if self.source.chat.trim().is_empty() {
            bail!("Source chat is empty. Set LINKRELAY_SOURCE_CHAT or [source] chat");
        }
        if self.destination.chat_id == 0 {
            bail!("Destination chat id is not set. Set LINKRELAY_DESTINATION_CHAT_ID or [destination] chat_id");
        }
        if self.relay.fetch_limit == 0 {
            bail!("relay.fetch_limit must be greater than 0");
        }
        if self.relay.poll_interval_secs == 0 {
            bail!("relay.poll_interval_secs must be greater than 0");
        }
        if self.relay.context_before > MAX_CONTEXT_MESSAGES
            || self.relay.context_after > MAX_CONTEXT_MESSAGES
        {
            bail!(
                "relay.context_before and relay.context_after must be at most {}",
                MAX_CONTEXT_MESSAGES
            );
        }
        self.relay.display_offset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [telegram]
        bot_token = "123:abc"

        [source]
        chat = "@rustnews"

        [destination]
        chat_id = -100777
    "#;

    fn parse(text: &str) -> Config {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn test_defaults_fill_missing_sections() {
        let config = parse(MINIMAL);

        assert!(config.destination.announce_startup);
        assert_eq!(config.source.retention_days, 0);
        assert_eq!(config.relay.fetch_limit, 200);
        assert_eq!(config.relay.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.relay.context_before, 2);
        assert_eq!(config.relay.context_after, 5);
        assert_eq!(config.database.path, "linkrelay.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.relay.start_cursor(), SyncCursor::Unset);
        config.validate().unwrap();
    }

    #[test]
    fn test_default_template_parses() {
        let config = parse(DEFAULT_CONFIG);

        assert_eq!(config.relay.url_delay_ms, 300);
        assert_eq!(config.relay.message_delay_ms, 500);
        assert_eq!(config.logging.format, "pretty");
        // Template ships without credentials
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relay_overrides() {
        let config = parse(&format!(
            "{}\n[relay]\nfetch_limit = 50\npoll_interval_secs = 5\nurl_delay_ms = 0\n\
             display_utc_offset_minutes = 540\nstart_after_id = 1200\n",
            MINIMAL
        ));

        let poller = config.relay.poller_config();
        assert_eq!(poller.fetch_limit, 50);
        assert_eq!(poller.poll_interval, Duration::from_secs(5));

        let forwarder = config.relay.forwarder_config().unwrap();
        assert_eq!(forwarder.url_delay, Duration::ZERO);
        assert_eq!(forwarder.message_delay, Duration::from_millis(500));
        assert_eq!(forwarder.display_offset.local_minus_utc(), 9 * 3600);

        assert_eq!(config.relay.start_cursor(), SyncCursor::Active(1200));
    }

    #[test]
    fn test_validation_rejects_missing_values() {
        let mut config = parse(MINIMAL);
        config.telegram.bot_token = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.source.chat = String::new();
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.destination.chat_id = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        let mut config = parse(MINIMAL);
        config.relay.fetch_limit = 0;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.relay.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_bounds_context_counts() {
        let mut config = parse(MINIMAL);
        config.relay.context_before = MAX_CONTEXT_MESSAGES;
        config.relay.context_after = 0;
        assert!(config.validate().is_ok());

        config.relay.context_after = MAX_CONTEXT_MESSAGES + 1;
        assert!(config.validate().is_err());

        let mut config = parse(MINIMAL);
        config.relay.context_before = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_impossible_offset() {
        let mut config = parse(MINIMAL);
        config.relay.display_utc_offset_minutes = 24 * 60;
        assert!(config.validate().is_err());
    }
}
