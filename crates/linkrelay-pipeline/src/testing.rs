//! In-memory collaborators for unit tests

#![allow(clippy::unwrap_used)]

use crate::source::{DeliverySink, MessageSource};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use linkrelay_types::{
    ChatHandle, MessageId, MessageQuery, RawMessage, RelayError, Result, Sender,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) const CHAT_ID: i64 = -100;

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 14, 9, 0, 0).unwrap()
}

/// Message `id` sent `id` minutes after [`base_time`]
pub(crate) fn msg(id: MessageId, text: &str) -> RawMessage {
    RawMessage::new(id, CHAT_ID, base_time() + Duration::minutes(id), text)
}

/// Message store with listing semantics of the Telegram history API
#[derive(Default)]
pub(crate) struct FakeSource {
    messages: Mutex<Vec<RawMessage>>,
    senders: Mutex<HashMap<i64, Sender>>,
    queries: Mutex<Vec<MessageQuery>>,
    fail_listing: AtomicBool,
    fail_context: AtomicBool,
    sender_lookups: AtomicUsize,
}

impl FakeSource {
    pub(crate) fn with_messages(messages: Vec<RawMessage>) -> Arc<Self> {
        let source = Self::default();
        *source.messages.lock().unwrap() = messages;
        Arc::new(source)
    }

    pub(crate) fn push(&self, message: RawMessage) {
        self.messages.lock().unwrap().push(message);
    }

    pub(crate) fn add_sender(&self, id: i64, username: Option<&str>, first_name: Option<&str>) {
        self.senders.lock().unwrap().insert(
            id,
            Sender::with_profile(id, username.map(String::from), first_name.map(String::from)),
        );
    }

    /// Fail every listing call
    pub(crate) fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Fail only the bounded listings used for context windows
    pub(crate) fn fail_context(&self, fail: bool) {
        self.fail_context.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn queries(&self) -> Vec<MessageQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub(crate) fn sender_lookups(&self) -> usize {
        self.sender_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageSource for FakeSource {
    async fn list_messages(
        &self,
        _chat: &ChatHandle,
        query: MessageQuery,
    ) -> Result<Vec<RawMessage>> {
        self.queries.lock().unwrap().push(query);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(RelayError::Fetch("source unavailable".into()));
        }
        let is_context = query.offset_id.is_some() || query.reverse;
        if is_context && self.fail_context.load(Ordering::SeqCst) {
            return Err(RelayError::Fetch("context unavailable".into()));
        }

        let mut found: Vec<RawMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| query.min_id.map_or(true, |min| m.id > min))
            .filter(|m| query.offset_id.map_or(true, |offset| m.id < offset))
            .cloned()
            .collect();
        if query.reverse {
            found.sort_by_key(|m| m.id);
        } else {
            found.sort_by_key(|m| std::cmp::Reverse(m.id));
        }
        found.truncate(query.limit);
        Ok(found)
    }

    async fn resolve_sender(&self, message: &RawMessage) -> Result<Option<Sender>> {
        self.sender_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(message
            .sender_id
            .and_then(|id| self.senders.lock().unwrap().get(&id).cloned()))
    }

    async fn resolve_chat(&self, identifier: &str) -> Result<ChatHandle> {
        identifier
            .parse()
            .map(ChatHandle::new)
            .map_err(|_| RelayError::ChatNotFound(identifier.to_string()))
    }
}

/// Sink that records every text and can fail on demand
#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<String>>,
    fail_containing: Mutex<Option<String>>,
}

impl RecordingSink {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject any text containing `needle`
    pub(crate) fn fail_on(&self, needle: &str) {
        *self.fail_containing.lock().unwrap() = Some(needle.to_string());
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send(&self, text: &str) -> Result<()> {
        if let Some(needle) = self.fail_containing.lock().unwrap().as_deref() {
            if text.contains(needle) {
                return Err(RelayError::Delivery(format!("rejected: {}", needle)));
            }
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
