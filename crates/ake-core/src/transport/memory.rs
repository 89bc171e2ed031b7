//! In-memory transport implementation

use super::{async_trait, Frame, Transport};
use crate::{Error, PartyId, Result, SessionId};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// In-memory mailbox transport for local runs
#[derive(Clone)]
pub struct MemoryTransport {
    /// Pending frames: (session_id, recipient) -> queue of serialized frames
    mailboxes: Arc<DashMap<(SessionId, PartyId), VecDeque<Vec<u8>>>>,
    /// Notification channel
    notify: broadcast::Sender<()>,
}

impl MemoryTransport {
    /// Create a new in-memory transport
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(100);
        Self {
            mailboxes: Arc::new(DashMap::new()),
            notify,
        }
    }

    /// Number of frames waiting for `party`
    pub fn pending(&self, session_id: &SessionId, party: PartyId) -> usize {
        self.mailboxes
            .get(&(*session_id, party))
            .map(|queue| queue.len())
            .unwrap_or(0)
    }

    fn pop(&self, session_id: &SessionId, party: PartyId) -> Option<Vec<u8>> {
        self.mailboxes
            .get_mut(&(*session_id, party))
            .and_then(|mut queue| queue.pop_front())
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize(frame: &Frame) -> Result<Vec<u8>> {
    serde_json::to_vec(frame).map_err(|e| Error::Serialization(e.to_string()))
}

fn deserialize(bytes: &[u8]) -> Result<Frame> {
    serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, session_id: &SessionId, to: PartyId, frame: &Frame) -> Result<()> {
        let bytes = serialize(frame)?;

        self.mailboxes
            .entry((*session_id, to))
            .or_default()
            .push_back(bytes);

        let _ = self.notify.send(());
        Ok(())
    }

    async fn receive(
        &self,
        session_id: &SessionId,
        me: PartyId,
        timeout: Duration,
    ) -> Result<Frame> {
        let mut rx = self.notify.subscribe();

        let wait = async {
            loop {
                if let Some(bytes) = self.pop(session_id, me) {
                    return deserialize(&bytes);
                }

                // Wait for notification, re-polling in case one was missed
                tokio::select! {
                    _ = rx.recv() => continue,
                    _ = tokio::time::sleep(Duration::from_millis(50)) => continue,
                }
            }
        };

        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| Error::Timeout(format!("frame for party {me} after {timeout:?}")))?
    }
}
