//! Core types for the key-agreement scheme

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a party in a session
pub type PartyId = usize;

/// Unique identifier for a session
pub type SessionId = [u8; 32];

/// Private tuple `(a, b, r, p)`.
///
/// `a` and `b` must be invertible mod N for signing to work; `p` is the
/// exponent used to form the public value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKey {
    #[serde(with = "decimal")]
    pub a: BigUint,
    #[serde(with = "decimal")]
    pub b: BigUint,
    #[serde(with = "decimal")]
    pub r: BigUint,
    #[serde(with = "decimal")]
    pub p: BigUint,
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").finish_non_exhaustive()
    }
}

/// Public tuple `(M, N)` with `M = (a⁻¹·b + r) mod N`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    #[serde(with = "decimal")]
    pub m: BigUint,
    #[serde(with = "decimal")]
    pub n: BigUint,
}

/// Everything a party holds for one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
    /// `A = aᵖ mod N`
    #[serde(with = "decimal")]
    pub public_value: BigUint,
}

impl KeyPair {
    /// The shared modulus
    pub fn modulus(&self) -> &BigUint {
        &self.public_key.n
    }
}

/// Signature `K` over a public value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "decimal")] pub BigUint);

impl Signature {
    /// Fixed-width big-endian encoding, padded to the byte length of `n`
    pub fn to_padded_bytes(&self, n: &BigUint) -> Vec<u8> {
        pad_be(&self.0, n)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session key derived after mutual verification
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKey(#[serde(with = "decimal")] pub BigUint);

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Which side of the exchange a party plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Sends the first frame ("Alice")
    Initiator,
    /// Answers the first frame ("Bob")
    Responder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => f.write_str("initiator"),
            Role::Responder => f.write_str("responder"),
        }
    }
}

pub(crate) fn pad_be(value: &BigUint, n: &BigUint) -> Vec<u8> {
    let width = ((n.bits() + 7) / 8) as usize;
    let bytes = value.to_bytes_be();
    if bytes.len() >= width {
        return bytes;
    }
    let mut padded = vec![0u8; width - bytes.len()];
    padded.extend_from_slice(&bytes);
    padded
}

/// Serde adapter storing a `BigUint` as a decimal string
pub mod decimal {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigUint, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.trim().as_bytes(), 10)
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid decimal integer: {text}")))
    }
}
