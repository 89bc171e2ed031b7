//! Error types for key-agreement operations

use num_bigint::BigUint;
use thiserror::Error;

/// Result type alias for key-agreement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating keys or running a session
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Invalid caller-supplied configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Value is not coprime with the modulus
    #[error("{value} has no inverse mod {modulus}")]
    NoInverse { value: BigUint, modulus: BigUint },

    /// Draw budget spent without a tuple passing every safety predicate
    #[error("Key generation exhausted after {draws} draws (N = {modulus})")]
    KeyGenerationExhausted { draws: usize, modulus: BigUint },

    /// A key pair failed one of the safety predicates
    #[error("Safety violation: {label} (N = {n}, M = {m}, a = {a}, b = {b}, r = {r})")]
    SafetyViolation {
        label: &'static str,
        n: BigUint,
        m: BigUint,
        a: BigUint,
        b: BigUint,
        r: BigUint,
    },

    /// Peer signature did not match the recomputed one
    #[error("Invalid signature for value {value}")]
    InvalidSignature { value: BigUint },

    /// Peer announced parameters that differ from the local credential
    #[error("Parameter mismatch: {0}")]
    ParameterMismatch(String),

    /// The two independently derived session keys differ
    #[error("Session key mismatch")]
    SessionKeyMismatch,

    /// Recovered plaintext differs from the one sent
    #[error("Decryption mismatch: expected {expected}, got {actual}")]
    DecryptionMismatch { expected: BigUint, actual: BigUint },

    /// Frame of the wrong shape for the current protocol step
    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),

    /// Peer sent a text abort instead of the expected frame
    #[error("Peer aborted: {0}")]
    PeerAborted(String),

    /// Opaque transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Timeout waiting for a peer message
    #[error("Timeout waiting for {0}")]
    Timeout(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl Error {
    /// Short, stable name of the error kind, used as the failure reason in reports
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidConfig(_) => "InvalidConfig",
            Error::NoInverse { .. } => "NoInverseError",
            Error::KeyGenerationExhausted { .. } => "KeyGenerationExhausted",
            Error::SafetyViolation { .. } => "SafetyViolation",
            Error::InvalidSignature { .. } => "InvalidSignature",
            Error::ParameterMismatch(_) => "ParameterMismatch",
            Error::SessionKeyMismatch => "SessionKeyMismatch",
            Error::DecryptionMismatch { .. } => "DecryptionMismatch",
            Error::UnexpectedMessage(_) => "UnexpectedMessage",
            Error::PeerAborted(_) => "PeerAborted",
            Error::Transport(_) => "TransportError",
            Error::Timeout(_) => "Timeout",
            Error::Serialization(_) => "Serialization",
            Error::Deserialization(_) => "Deserialization",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
