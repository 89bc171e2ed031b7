//! Per-party session state machine

use crate::Role;
use serde::Serialize;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    Idle,
    KeysGenerated,
    ValueSent,
    ValueReceived,
    Verified,
    SessionKeyDerived,
    MessageExchanged,
    Success,
    Failed,
}

const INITIATOR_PATH: [SessionState; 8] = [
    SessionState::Idle,
    SessionState::KeysGenerated,
    SessionState::ValueSent,
    SessionState::ValueReceived,
    SessionState::Verified,
    SessionState::SessionKeyDerived,
    SessionState::MessageExchanged,
    SessionState::Success,
];

// The responder verifies the peer value before sending its own
const RESPONDER_PATH: [SessionState; 8] = [
    SessionState::Idle,
    SessionState::KeysGenerated,
    SessionState::ValueReceived,
    SessionState::Verified,
    SessionState::ValueSent,
    SessionState::SessionKeyDerived,
    SessionState::MessageExchanged,
    SessionState::Success,
];

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Success | SessionState::Failed)
    }

    /// Successor on the happy path for `role`
    pub fn next(self, role: Role) -> Option<SessionState> {
        let path = match role {
            Role::Initiator => &INITIATOR_PATH,
            Role::Responder => &RESPONDER_PATH,
        };
        path.iter()
            .position(|s| *s == self)
            .and_then(|i| path.get(i + 1))
            .copied()
    }

    /// Any non-terminal state may fail; otherwise only the happy-path step is allowed
    pub fn can_advance(self, to: SessionState, role: Role) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == SessionState::Failed || self.next(role) == Some(to)
    }
}
