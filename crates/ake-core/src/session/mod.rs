//! Session orchestration
//!
//! Drives one party through generate → analyze → sign → exchange → verify →
//! derive session key → encrypt/decrypt a single integer.

mod cipher;
mod messages;
mod orchestrator;
mod state;

pub use cipher::{confirmation_tag, decrypt, derive_session_key, encrypt};
pub use messages::*;
pub use orchestrator::{run_session, simulate, SimulationConfig, SimulationReport};
pub use state::SessionState;

use crate::{Error, PartyId, Role, SessionId, SessionKey};
use num_bigint::BigUint;
use std::time::Duration;

/// Default time to wait for a peer frame
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for one party's session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session identifier, shared by both parties
    pub session_id: SessionId,
    /// This party's ID
    pub party_id: PartyId,
    /// The peer's ID
    pub peer_id: PartyId,
    pub role: Role,
    /// Bound on each transport receive
    pub receive_timeout: Duration,
    /// Message the initiator encrypts; drawn at random in `[0, N-1]` when absent
    pub plaintext: Option<BigUint>,
}

impl SessionConfig {
    /// Create a new session configuration with a random session ID
    pub fn new(role: Role, party_id: PartyId, peer_id: PartyId) -> Self {
        Self {
            session_id: rand::random(),
            party_id,
            peer_id,
            role,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            plaintext: None,
        }
    }

    pub fn with_session_id(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn with_plaintext(mut self, plaintext: BigUint) -> Self {
        self.plaintext = Some(plaintext);
        self
    }
}

/// What a successful session produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_key: SessionKey,
    /// Plaintext sent (initiator) or recovered (responder)
    pub plaintext: BigUint,
    /// This party's public value for the session
    pub public_value: BigUint,
    pub peer_value: BigUint,
}

/// Terminal result of a session
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(SessionSummary),
    Failed(Error),
}

/// Full account of one session run
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub party_id: PartyId,
    pub role: Role,
    /// Every state visited, starting at `Idle`
    pub history: Vec<SessionState>,
    pub outcome: Outcome,
}

impl SessionReport {
    /// Final state
    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or(SessionState::Idle)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Success(_))
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        match &self.outcome {
            Outcome::Success(summary) => Some(summary),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Success(_) => None,
            Outcome::Failed(e) => Some(e),
        }
    }

    /// Error kind of a failed session, e.g. `"Timeout"`
    pub fn failure_reason(&self) -> Option<&'static str> {
        self.error().map(Error::kind)
    }
}
