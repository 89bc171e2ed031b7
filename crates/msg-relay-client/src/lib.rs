//! Message Relay Client
//!
//! [`Transport`] implementation that carries session frames through the
//! relay service. Receiving polls the party's mailbox until a frame arrives
//! or the deadline passes.

use ake_core::transport::{async_trait, Frame, Transport};
use ake_core::{Error, PartyId, Result, SessionId};
use msg_relay::api::{NextRequest, NextResponse, PushRequest, PushResponse, NEXT_PATH, PUSH_PATH};
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, trace};

/// Delay between polls of an empty mailbox
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Relay-backed transport for one party
pub struct RelayTransport {
    http: Client,
    base_url: String,
    party_id: PartyId,
    /// Bound on each HTTP round trip
    request_timeout: Duration,
}

impl RelayTransport {
    pub fn new(base_url: &str, party_id: PartyId) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            party_id,
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `path` and parse the JSON reply
    async fn call<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport(format!("{url} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Deserialization(e.to_string()))
    }

    async fn poll_once(&self, session_id: &SessionId, me: PartyId) -> Result<Option<Frame>> {
        let reply: NextResponse = self
            .call(
                NEXT_PATH,
                &NextRequest {
                    session_id: hex::encode(session_id),
                    to: me,
                },
            )
            .await?;
        reply_to_frame(&reply)
    }
}

fn reply_to_frame(reply: &NextResponse) -> Result<Option<Frame>> {
    let Some(bytes) = reply
        .decode_payload()
        .map_err(|e| Error::Deserialization(e.to_string()))?
    else {
        return Ok(None);
    };
    let line = String::from_utf8(bytes).map_err(|e| Error::Deserialization(e.to_string()))?;
    Ok(Some(Frame::from_wire(&line)))
}

#[async_trait]
impl Transport for RelayTransport {
    #[instrument(skip(self, session_id, frame), fields(from = self.party_id))]
    async fn send(&self, session_id: &SessionId, to: PartyId, frame: &Frame) -> Result<()> {
        let body = PushRequest::new(
            hex::encode(session_id),
            self.party_id,
            to,
            frame.to_wire().as_bytes(),
        );
        let reply: PushResponse = self.call(PUSH_PATH, &body).await?;
        debug!(id = %reply.id, "Frame queued at relay");
        Ok(())
    }

    async fn receive(
        &self,
        session_id: &SessionId,
        me: PartyId,
        timeout: Duration,
    ) -> Result<Frame> {
        let poll = async {
            loop {
                if let Some(frame) = self.poll_once(session_id, me).await? {
                    return Ok::<_, Error>(frame);
                }
                trace!(me, "Mailbox empty, polling again");
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| Error::Timeout(format!("no frame for party {me} within {timeout:?}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let transport = RelayTransport::new("http://localhost:8080/", 0);
        assert_eq!(transport.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_integer_frame_from_reply() {
        let reply = NextResponse::delivered(0, b"1234,7359,5,10007");
        let frame = reply_to_frame(&reply).unwrap().unwrap();
        assert_eq!(frame.into_integers(4, "hello").unwrap().len(), 4);
    }

    #[test]
    fn test_text_frame_from_reply() {
        let reply = NextResponse::delivered(1, b"Signature verification failed for Alice.");
        assert!(matches!(
            reply_to_frame(&reply).unwrap(),
            Some(Frame::Text(_))
        ));
    }

    #[test]
    fn test_empty_reply() {
        assert!(reply_to_frame(&NextResponse::default()).unwrap().is_none());
    }

    #[test]
    fn test_garbled_reply() {
        let reply = NextResponse {
            from: Some(0),
            payload: Some("%%%".into()),
        };
        assert!(matches!(
            reply_to_frame(&reply),
            Err(Error::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_stalled_relay_times_out() {
        // Accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let transport = RelayTransport::new(&format!("http://{addr}"), 0);
        let started = std::time::Instant::now();
        let err = transport
            .receive(&[0u8; 32], 0, Duration::from_millis(100))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout(_)), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_relay() {
        let transport = RelayTransport::new("http://127.0.0.1:1", 0)
            .with_request_timeout(Duration::from_millis(200));
        let err = transport
            .receive(&[0u8; 32], 0, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }
}
