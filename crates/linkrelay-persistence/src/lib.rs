use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linkrelay_pipeline::MessageSource;
use linkrelay_types::{ChatHandle, ChatId, MessageQuery, RawMessage, RelayError, Sender};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::{debug, info};

/// SQLite store of recorded chat messages
pub struct MessageStore {
    pool: SqlitePool,
}

impl MessageStore {
    /// Open (or create) the database file at `database_path`
    pub async fn new(database_path: &str) -> Result<Self> {
        let database_url = format!("sqlite:{}?mode=rwc", database_path);
        let pool = SqlitePool::connect(&database_url).await?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("Message store initialized with database: {}", database_path);
        Ok(store)
    }

    /// Private in-memory database, mostly for tests
    pub async fn in_memory() -> Result<Self> {
        // Every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY,
                username TEXT,
                title TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS senders (
                id INTEGER PRIMARY KEY,
                username TEXT,
                first_name TEXT,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS messages (
                chat_id INTEGER NOT NULL,
                id INTEGER NOT NULL,
                sender_id INTEGER,
                sent_at INTEGER NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (chat_id, id)
            );

            CREATE INDEX IF NOT EXISTS idx_chats_username ON chats(username COLLATE NOCASE);
            CREATE INDEX IF NOT EXISTS idx_messages_sent_at ON messages(sent_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Database migrations completed");
        Ok(())
    }

    /// Insert or refresh a chat's username and title
    pub async fn save_chat(&self, chat: &ChatHandle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO chats (id, username, title, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(chat.id)
        .bind(&chat.username)
        .bind(&chat.title)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or refresh a sender profile
    pub async fn save_sender(&self, sender: &Sender) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO senders (id, username, first_name, updated_at)
            VALUES (?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(sender.id)
        .bind(&sender.username)
        .bind(&sender.first_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Store a message. An edited message replaces the earlier version.
    pub async fn save_message(&self, message: &RawMessage) -> Result<()> {
        let payload = serde_json::to_string(message)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO messages (chat_id, id, sender_id, sent_at, payload)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.chat_id)
        .bind(message.id)
        .bind(message.sender_id)
        .bind(message.timestamp.timestamp())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        debug!("Stored message {} of chat {}", message.id, message.chat_id);
        Ok(())
    }

    /// Delete messages sent before `cutoff`, returning how many were removed
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE sent_at < ?")
            .bind(cutoff.timestamp())
            .execute(&self.pool)
            .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            info!("Pruned {} messages older than {}", removed, cutoff);
        }
        Ok(removed)
    }

    /// Number of stored messages for a chat
    pub async fn message_count(&self, chat_id: ChatId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn query_messages(
        &self,
        chat_id: ChatId,
        query: MessageQuery,
    ) -> Result<Vec<RawMessage>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new("SELECT payload FROM messages WHERE chat_id = ");
        builder.push_bind(chat_id);
        if let Some(min_id) = query.min_id {
            builder.push(" AND id > ").push_bind(min_id);
        }
        if let Some(offset_id) = query.offset_id {
            builder.push(" AND id < ").push_bind(offset_id);
        }
        builder.push(if query.reverse {
            " ORDER BY id ASC"
        } else {
            " ORDER BY id DESC"
        });
        builder
            .push(" LIMIT ")
            .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<RawMessage> {
                let payload: String = row.get("payload");
                Ok(serde_json::from_str(&payload)?)
            })
            .collect()
    }

    async fn find_sender(&self, sender_id: i64) -> Result<Option<Sender>> {
        let row = sqlx::query("SELECT id, username, first_name FROM senders WHERE id = ?")
            .bind(sender_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| {
            Sender::with_profile(row.get("id"), row.get("username"), row.get("first_name"))
        }))
    }

    async fn find_chat(&self, reference: &ChatReference) -> Result<Option<ChatHandle>> {
        let row = match reference {
            ChatReference::Id(id) => {
                sqlx::query("SELECT id, username, title FROM chats WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            ChatReference::Username(username) => {
                sqlx::query(
                    "SELECT id, username, title FROM chats WHERE username = ? COLLATE NOCASE",
                )
                .bind(username)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.map(|row| ChatHandle {
            id: row.get("id"),
            username: row.get("username"),
            title: row.get("title"),
        }))
    }
}

#[async_trait]
impl MessageSource for MessageStore {
    async fn list_messages(
        &self,
        chat: &ChatHandle,
        query: MessageQuery,
    ) -> linkrelay_types::Result<Vec<RawMessage>> {
        self.query_messages(chat.id, query)
            .await
            .map_err(|e| RelayError::Fetch(e.to_string()))
    }

    async fn resolve_sender(
        &self,
        message: &RawMessage,
    ) -> linkrelay_types::Result<Option<Sender>> {
        let Some(sender_id) = message.sender_id else {
            return Ok(None);
        };
        self.find_sender(sender_id)
            .await
            .map_err(|e| RelayError::SenderLookup {
                message: message.id,
                reason: e.to_string(),
            })
    }

    /// A numeric id resolves even before the chat has been recorded;
    /// a username must belong to a recorded chat.
    async fn resolve_chat(&self, identifier: &str) -> linkrelay_types::Result<ChatHandle> {
        let reference = ChatReference::parse(identifier)
            .ok_or_else(|| RelayError::ChatNotFound(identifier.to_string()))?;

        let found = self
            .find_chat(&reference)
            .await
            .map_err(|e| RelayError::Store(e.to_string()))?;

        match (found, reference) {
            (Some(chat), _) => Ok(chat),
            (None, ChatReference::Id(id)) => Ok(ChatHandle::new(id)),
            (None, ChatReference::Username(_)) => {
                Err(RelayError::ChatNotFound(identifier.to_string()))
            }
        }
    }
}

/// A chat identifier as a user would type it
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatReference {
    Id(ChatId),
    Username(String),
}

impl ChatReference {
    /// Accepts `-100123`, `@name`, `name` and `t.me/name` links
    fn parse(identifier: &str) -> Option<Self> {
        let trimmed = identifier.trim();
        if let Ok(id) = trimmed.parse::<ChatId>() {
            return Some(Self::Id(id));
        }

        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let without_host = without_scheme
            .strip_prefix("t.me/")
            .or_else(|| without_scheme.strip_prefix("telegram.me/"))
            .unwrap_or(without_scheme);
        let username = without_host.trim_start_matches('@').trim_end_matches('/');

        let valid = username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if username.is_empty() || !valid {
            return None;
        }
        Some(Self::Username(username.to_string()))
    }
}
