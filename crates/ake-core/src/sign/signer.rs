//! Signer implementation

use crate::arith::mod_inverse;
use crate::{PrivateKey, Result, Signature};
use num_bigint::BigUint;
use subtle::ConstantTimeEq;
use tracing::warn;

/// Sign `value` with a private tuple.
///
/// Fails with `NoInverse` when `b` or `a²` is not invertible mod `n`.
pub fn sign(value: &BigUint, private_key: &PrivateKey, n: &BigUint) -> Result<Signature> {
    let PrivateKey { a, b, r, .. } = private_key;

    let b_inv = mod_inverse(b, n)?;
    let a_squared = (a * a) % n;
    let a_squared_inv = mod_inverse(&a_squared, n)?;

    // S = A·(a + a²·b⁻¹·r), reduced mod n at each step
    let inner = (a + &a_squared * &b_inv * r) % n;
    let s = ((value % n) * inner) % n;

    let k = (a_squared_inv * b % n) * s % n;
    Ok(Signature(k))
}

/// Recompute the signature over `value` and compare it with `signature`.
///
/// Requires the signer's own private tuple. A tuple that cannot sign verifies
/// nothing.
pub fn verify(
    value: &BigUint,
    signature: &Signature,
    private_key: &PrivateKey,
    n: &BigUint,
) -> bool {
    match sign(value, private_key, n) {
        Ok(expected) => expected
            .to_padded_bytes(n)
            .ct_eq(&signature.to_padded_bytes(n))
            .into(),
        Err(e) => {
            warn!(error = %e, "Verification key cannot sign");
            false
        }
    }
}
