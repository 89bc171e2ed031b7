//! Signing and verification
//!
//! `S = A·(a + a²·b⁻¹·r)` and `K = a⁻²·b·S mod N`. Verification recomputes
//! `K` from the same private tuple; the public key alone cannot verify.

mod signer;

pub use signer::{sign, verify};
