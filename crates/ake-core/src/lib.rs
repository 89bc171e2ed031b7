//! # AKE Core
//!
//! Core primitives for a toy authenticated key-agreement scheme.
//!
//! This crate provides:
//! - Modular arithmetic (extended Euclidean inverse, gcd checks)
//! - Key generation with safety validation
//! - Signing and verification
//! - Safety analysis (factoring, replay, invertibility, bounded randomness)
//! - Session orchestration over a pluggable transport
//!
//! ## Scheme Overview
//!
//! Both parties hold the same private tuple `(a, b, r)` over a modulus `N` and
//! draw their own exponent `p`. Each sends `A = aᵖ mod N` with a signature
//! `K = a⁻²·b·A·(a + a²·b⁻¹·r) mod N`, checks the peer's signature by
//! recomputing it, and derives `(peer_valueᵖ + a) mod N` as the session key.
//!
//! This is NOT vetted cryptography. Verification needs the signer's private
//! tuple, and the signature reduces to `A·M mod N`.
//!
//! ## Example
//!
//! ```rust
//! use ake_core::keygen::generate_keys;
//! use ake_core::random::RngSource;
//! use ake_core::sign::{sign, verify};
//! use ake_core::KeyGenConfig;
//! use num_bigint::BigUint;
//! use rand_chacha::rand_core::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//!
//! let mut rng = RngSource::new(ChaCha20Rng::seed_from_u64(1));
//! let keys = generate_keys(&KeyGenConfig::with_modulus(BigUint::from(10007u32)), &mut rng)?;
//!
//! let n = keys.modulus();
//! let signature = sign(&keys.public_value, &keys.private_key, n)?;
//! assert!(verify(&keys.public_value, &signature, &keys.private_key, n));
//! # Ok::<(), ake_core::Error>(())
//! ```

pub mod analysis;
pub mod arith;
pub mod error;
pub mod keygen;
pub mod random;
pub mod session;
pub mod sign;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use keygen::KeyGenConfig;
pub use session::{SessionConfig, SessionReport, SessionState};
pub use types::{KeyPair, PartyId, PrivateKey, PublicKey, Role, SessionId, SessionKey, Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Party ID conventionally used by the initiator
pub const INITIATOR_ID: PartyId = 0;

/// Party ID conventionally used by the responder
pub const RESPONDER_ID: PartyId = 1;
