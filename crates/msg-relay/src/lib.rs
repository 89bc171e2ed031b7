//! Message Relay Library
//!
//! Mailbox store behind the relay service. Frames are queued per
//! (session, recipient) and handed out in arrival order. Undelivered frames
//! expire after a TTL.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub mod api;

/// Relay error types
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid message format: {0}")]
    InvalidFormat(String),
    #[error("Mailbox full: {0}")]
    MailboxFull(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

/// Upper bound on queued frames per mailbox
pub const MAX_MAILBOX_LEN: usize = 64;

/// TTL used by [`MessageStore::default`]
pub const DEFAULT_TTL_SECS: i64 = 3600;

/// Mailbox address: one recipient within one session
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct MailboxId {
    /// Session identifier (hex)
    pub session_id: String,
    /// Recipient party ID
    pub to: usize,
}

impl MailboxId {
    /// Create a new mailbox ID
    pub fn new(session_id: &str, to: usize) -> Self {
        Self {
            session_id: session_id.to_string(),
            to,
        }
    }

    /// Compute hash for lookup
    pub fn hash(&self) -> String {
        let data = format!("{}:{}", self.session_id, self.to);
        hex::encode(blake3::hash(data.as_bytes()).as_bytes())
    }
}

/// Stored message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Unique message ID
    pub id: Uuid,
    /// Sender party ID
    pub from: usize,
    /// Message payload
    pub payload: Vec<u8>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
}

/// Mailbox store
#[derive(Clone)]
pub struct MessageStore {
    /// FIFO queues keyed by [`MailboxId::hash`]
    mailboxes: Arc<DashMap<String, VecDeque<StoredMessage>>>,
    ttl: chrono::Duration,
}

impl MessageStore {
    /// Store whose frames live `ttl_secs` seconds
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            mailboxes: Arc::new(DashMap::new()),
            ttl: chrono::Duration::seconds(ttl_secs),
        }
    }

    /// Queue a frame for the mailbox owner
    pub fn push(&self, mailbox: &MailboxId, from: usize, payload: Vec<u8>) -> Result<Uuid> {
        if from == mailbox.to {
            return Err(RelayError::InvalidFormat(format!(
                "party {from} cannot message itself"
            )));
        }

        let now = Utc::now();
        let message = StoredMessage {
            id: Uuid::new_v4(),
            from,
            payload,
            created_at: now,
            expires_at: now + self.ttl,
        };
        let id = message.id;

        let mut queue = self.mailboxes.entry(mailbox.hash()).or_default();
        if queue.len() >= MAX_MAILBOX_LEN {
            return Err(RelayError::MailboxFull(mailbox.hash()));
        }
        queue.push_back(message);

        Ok(id)
    }

    /// Take the oldest unexpired frame, if any
    pub fn pop(&self, mailbox: &MailboxId) -> Option<StoredMessage> {
        let now = Utc::now();
        let mut queue = self.mailboxes.get_mut(&mailbox.hash())?;
        while let Some(message) = queue.pop_front() {
            if message.expires_at > now {
                return Some(message);
            }
        }
        None
    }

    /// Number of frames waiting in a mailbox
    pub fn pending(&self, mailbox: &MailboxId) -> usize {
        self.mailboxes
            .get(&mailbox.hash())
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    /// Remove expired messages and empty mailboxes
    pub fn cleanup(&self) {
        let now = Utc::now();
        self.mailboxes.retain(|_, queue| {
            queue.retain(|m| m.expires_at > now);
            !queue.is_empty()
        });
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}
