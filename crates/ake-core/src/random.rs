//! Injected randomness

use crate::{Error, Result};
use num_bigint::{BigUint, RandBigInt};
use num_traits::One;
use rand_core::RngCore;
use std::sync::{Arc, Mutex};

/// Source of uniformly distributed integers.
///
/// Injected into the key generator and the session orchestrator so tests can
/// run against a seeded generator.
pub trait RandomSource {
    /// Uniform integer in `[low, high]` (both ends inclusive)
    fn next_in_range(&mut self, low: &BigUint, high: &BigUint) -> BigUint;
}

/// [`RandomSource`] backed by any `rand` generator
pub struct RngSource<R>(pub R);

impl<R: RngCore> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self(rng)
    }
}

impl<R: RngCore> RandomSource for RngSource<R> {
    fn next_in_range(&mut self, low: &BigUint, high: &BigUint) -> BigUint {
        if low >= high {
            return low.clone();
        }
        let upper = high + BigUint::one();
        self.0.gen_biguint_range(low, &upper)
    }
}

/// Lock-guarded source that several sessions in one process may clone and share
pub struct SharedRandom {
    inner: Arc<Mutex<dyn RandomSource + Send>>,
}

impl SharedRandom {
    pub fn new<S: RandomSource + Send + 'static>(source: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(source)),
        }
    }
}

impl Clone for SharedRandom {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl RandomSource for SharedRandom {
    fn next_in_range(&mut self, low: &BigUint, high: &BigUint) -> BigUint {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.next_in_range(low, high)
    }
}

/// Sample a modulus with exactly `bits` bits
pub fn random_modulus<R: RandomSource + ?Sized>(rng: &mut R, bits: u64) -> Result<BigUint> {
    if bits < 3 {
        return Err(Error::InvalidConfig(format!(
            "Modulus needs at least 3 bits to reach N >= 4, got {bits}"
        )));
    }
    let low = BigUint::one() << (bits - 1);
    let high = (BigUint::one() << bits) - BigUint::one();
    Ok(rng.next_in_range(&low, &high))
}
