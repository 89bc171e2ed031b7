//! Key generator implementation

use super::{validate_modulus, KeyGenConfig, ModulusChoice};
use crate::analysis::analyze;
use crate::arith::{is_coprime, mod_inverse};
use crate::random::{random_modulus, RandomSource};
use crate::{Error, KeyPair, PrivateKey, PublicKey, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::{debug, info, instrument, trace};

/// Run the key generator.
///
/// Draws `a, b ∈ [2, N-1]` and `r ∈ [2, N]` until the tuple passes every
/// safety predicate and `b` is invertible (otherwise the tuple could not sign),
/// then draws the exponent `p ∈ [1, N-1]` and forms `A = aᵖ mod N`.
///
/// # Arguments
/// * `config` - Modulus choice and draw budget
/// * `rng` - Injected randomness
#[instrument(skip(rng))]
pub fn generate_keys<R: RandomSource + ?Sized>(
    config: &KeyGenConfig,
    rng: &mut R,
) -> Result<KeyPair> {
    if config.max_draws == 0 {
        return Err(Error::InvalidConfig("max_draws must be positive".into()));
    }

    let n = match &config.modulus {
        ModulusChoice::Fixed(n) => n.clone(),
        ModulusChoice::RandomBits(bits) => random_modulus(rng, *bits)?,
    };
    validate_modulus(&n)?;

    let two = BigUint::from(2u32);
    let n_minus_one = &n - BigUint::one();

    for draw in 1..=config.max_draws {
        let a = rng.next_in_range(&two, &n_minus_one);
        let b = rng.next_in_range(&two, &n_minus_one);
        let r = rng.next_in_range(&two, &n);

        // No inverse of `a` means M cannot even be formed
        let public_key = match derive_public_key(&n, &a, &b, &r) {
            Ok(public_key) => public_key,
            Err(_) => {
                trace!(draw, "Rejected draw: a has no inverse");
                continue;
            }
        };

        let mut private_key = PrivateKey {
            a,
            b,
            r,
            p: BigUint::zero(),
        };

        let report = analyze(&public_key, &private_key);
        if !report.all_ok() {
            trace!(draw, failures = ?report.failures(), "Rejected draw");
            continue;
        }

        if !is_coprime(&private_key.b, &n) {
            trace!(draw, "Rejected draw: b has no inverse");
            continue;
        }

        private_key.p = rng.next_in_range(&BigUint::one(), &n_minus_one);
        let value = public_value(&private_key, &n);

        info!(draws = draw, modulus_bits = n.bits(), "Key pair generated");

        return Ok(KeyPair {
            public_key,
            private_key,
            public_value: value,
        });
    }

    debug!(draws = config.max_draws, modulus = %n, "Draw budget exhausted");

    Err(Error::KeyGenerationExhausted {
        draws: config.max_draws,
        modulus: n,
    })
}

/// `M = (a⁻¹·b + r) mod N`
pub fn derive_public_key(n: &BigUint, a: &BigUint, b: &BigUint, r: &BigUint) -> Result<PublicKey> {
    let a_inv = mod_inverse(a, n)?;
    let m = (a_inv * b + r) % n;
    Ok(PublicKey { m, n: n.clone() })
}

/// `A = aᵖ mod N`
pub fn public_value(private_key: &PrivateKey, n: &BigUint) -> BigUint {
    private_key.a.modpow(&private_key.p, n)
}
