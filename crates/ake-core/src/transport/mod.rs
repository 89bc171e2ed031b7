//! Transport collaborator interface

use crate::{Error, PartyId, Result, SessionId};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use ::async_trait::async_trait;

/// One message on the wire: a tuple of integers or a text line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    Integers(#[serde(with = "decimal_vec")] Vec<BigUint>),
    Text(String),
}

impl Frame {
    /// Decimal integers joined by commas, or the text as-is
    pub fn to_wire(&self) -> String {
        match self {
            Frame::Integers(values) => values
                .iter()
                .map(|v| v.to_str_radix(10))
                .collect::<Vec<_>>()
                .join(","),
            Frame::Text(text) => text.clone(),
        }
    }

    /// Parse a wire line. A non-empty comma list of decimals is a tuple,
    /// anything else is text.
    pub fn from_wire(line: &str) -> Frame {
        let parsed: Option<Vec<BigUint>> = line
            .split(',')
            .map(|field| {
                let field = field.trim();
                if field.is_empty() || !field.bytes().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                BigUint::parse_bytes(field.as_bytes(), 10)
            })
            .collect();

        match parsed {
            Some(values) => Frame::Integers(values),
            None => Frame::Text(line.to_string()),
        }
    }

    /// Integers of a tuple frame with exactly `expected` fields.
    ///
    /// A text frame where a tuple was expected is surfaced as `PeerAborted`.
    pub fn into_integers(self, expected: usize, step: &str) -> Result<Vec<BigUint>> {
        match self {
            Frame::Integers(values) if values.len() == expected => Ok(values),
            Frame::Integers(values) => Err(Error::UnexpectedMessage(format!(
                "{step}: expected {expected} integers, got {}",
                values.len()
            ))),
            Frame::Text(text) => Err(Error::PeerAborted(text)),
        }
    }
}

mod decimal_vec {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[BigUint], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(values.iter().map(|v| v.to_str_radix(10)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<BigUint>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let texts: Vec<String> = Vec::deserialize(deserializer)?;
        texts
            .iter()
            .map(|t| {
                BigUint::parse_bytes(t.as_bytes(), 10)
                    .ok_or_else(|| serde::de::Error::custom(format!("Invalid decimal integer: {t}")))
            })
            .collect()
    }
}

/// Point-to-point message transport used by the session orchestrator
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a frame to `to`
    async fn send(&self, session_id: &SessionId, to: PartyId, frame: &Frame) -> Result<()>;

    /// Wait for the next frame addressed to `me`, failing with `Timeout`
    /// once `timeout` elapses
    async fn receive(&self, session_id: &SessionId, me: PartyId, timeout: Duration)
        -> Result<Frame>;
}

/// In-memory transport for local runs and tests
pub mod memory;

pub use memory::MemoryTransport;
