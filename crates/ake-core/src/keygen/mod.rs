//! Key generation module
//!
//! Rejection-samples private tuples until the safety analyzer accepts them.

mod generator;
mod refresh;

pub use generator::{derive_public_key, generate_keys, public_value};
pub use refresh::refresh_exponent;

use crate::{Error, Result};
use num_bigint::BigUint;

/// Default number of candidate draws before giving up
pub const DEFAULT_MAX_DRAWS: usize = 10_000;

/// Default bit length of a randomly sampled modulus
pub const DEFAULT_MODULUS_BITS: u64 = 128;

/// Where the modulus comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModulusChoice {
    /// Caller-supplied N
    Fixed(BigUint),
    /// Sample N with exactly this many bits
    RandomBits(u64),
}

/// Configuration for key generation
#[derive(Debug, Clone)]
pub struct KeyGenConfig {
    pub modulus: ModulusChoice,
    /// Draw budget; exhaustion fails with `KeyGenerationExhausted`
    pub max_draws: usize,
}

impl KeyGenConfig {
    /// Generate against a fixed modulus
    pub fn with_modulus(n: BigUint) -> Self {
        Self {
            modulus: ModulusChoice::Fixed(n),
            max_draws: DEFAULT_MAX_DRAWS,
        }
    }

    /// Generate against a random modulus of `bits` bits
    pub fn with_random_modulus(bits: u64) -> Self {
        Self {
            modulus: ModulusChoice::RandomBits(bits),
            max_draws: DEFAULT_MAX_DRAWS,
        }
    }

    pub fn max_draws(mut self, max_draws: usize) -> Self {
        self.max_draws = max_draws;
        self
    }
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self::with_random_modulus(DEFAULT_MODULUS_BITS)
    }
}

pub(crate) fn validate_modulus(n: &BigUint) -> Result<()> {
    if *n < BigUint::from(4u32) {
        return Err(Error::InvalidConfig(format!(
            "Modulus must be at least 4, got {n}"
        )));
    }
    Ok(())
}
