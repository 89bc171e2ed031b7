//! Exponent refresh

use super::{public_value, validate_modulus};
use crate::random::RandomSource;
use crate::{KeyPair, Result};
use num_bigint::BigUint;
use num_traits::One;
use tracing::{debug, instrument};

/// Draw a fresh exponent `p ∈ [1, N-1]` for an existing key pair.
///
/// `(a, b, r)` and the public key are kept; only `p` and `A = aᵖ mod N`
/// change. Called once per session so a public value is never sent twice.
#[instrument(skip_all)]
pub fn refresh_exponent<R: RandomSource + ?Sized>(keys: &KeyPair, rng: &mut R) -> Result<KeyPair> {
    let n = keys.modulus();
    validate_modulus(n)?;

    let mut refreshed = keys.clone();
    refreshed.private_key.p = rng.next_in_range(&BigUint::one(), &(n - BigUint::one()));
    refreshed.public_value = public_value(&refreshed.private_key, n);

    debug!(modulus_bits = n.bits(), "Exponent refreshed");

    Ok(refreshed)
}
