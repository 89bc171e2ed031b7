//! HTTP bodies exchanged between the relay service and its clients

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// Path for queueing a frame
pub const PUSH_PATH: &str = "/v1/msg";

/// Path for taking the next frame of a mailbox
pub const NEXT_PATH: &str = "/v1/msg/next";

/// Body of `POST /v1/msg`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushRequest {
    pub session_id: String,
    pub from: usize,
    pub to: usize,
    /// Base64 of the raw frame bytes
    pub payload: String,
}

impl PushRequest {
    pub fn new(session_id: String, from: usize, to: usize, payload: &[u8]) -> Self {
        Self {
            session_id,
            from,
            to,
            payload: STANDARD.encode(payload),
        }
    }

    pub fn decode_payload(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.payload)
    }
}

/// Reply to `POST /v1/msg`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    pub id: uuid::Uuid,
}

/// Body of `POST /v1/msg/next`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextRequest {
    pub session_id: String,
    pub to: usize,
}

/// Reply to `POST /v1/msg/next`; `payload` is absent when the mailbox is empty
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NextResponse {
    pub from: Option<usize>,
    pub payload: Option<String>,
}

impl NextResponse {
    pub fn delivered(from: usize, payload: &[u8]) -> Self {
        Self {
            from: Some(from),
            payload: Some(STANDARD.encode(payload)),
        }
    }

    /// Raw frame bytes, if a frame was delivered
    pub fn decode_payload(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        self.payload
            .as_deref()
            .map(|p| STANDARD.decode(p))
            .transpose()
    }
}
