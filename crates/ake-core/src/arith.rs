//! Modular arithmetic helpers

use crate::{Error, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};

/// Compute `x` such that `a * x ≡ 1 (mod n)` with the extended Euclidean algorithm.
///
/// The result is always in `[0, n-1]`. Fails with [`Error::NoInverse`] when
/// `gcd(a, n) != 1` (including `n == 0`).
pub fn mod_inverse(a: &BigUint, n: &BigUint) -> Result<BigUint> {
    let no_inverse = || Error::NoInverse {
        value: a.clone(),
        modulus: n.clone(),
    };

    if n.is_zero() {
        return Err(no_inverse());
    }

    let modulus = BigInt::from_biguint(Sign::Plus, n.clone());
    let (mut t, mut new_t) = (BigInt::zero(), BigInt::one());
    let (mut r, mut new_r) = (modulus.clone(), BigInt::from_biguint(Sign::Plus, a % n));

    while !new_r.is_zero() {
        let quotient = &r / &new_r;

        let next_t = &t - &quotient * &new_t;
        t = std::mem::replace(&mut new_t, next_t);

        let next_r = &r - &quotient * &new_r;
        r = std::mem::replace(&mut new_r, next_r);
    }

    if r > BigInt::one() {
        return Err(no_inverse());
    }

    if t.is_negative() {
        t += &modulus;
    }

    t.to_biguint().ok_or_else(no_inverse)
}

/// Greatest common divisor. Inputs are borrowed and left untouched.
pub fn gcd(x: &BigUint, y: &BigUint) -> BigUint {
    x.gcd(y)
}

/// `gcd(x, n) == 1`
pub fn is_coprime(x: &BigUint, n: &BigUint) -> bool {
    gcd(x, n).is_one()
}

/// `(x - y) mod n`, normalized into `[0, n-1]`
pub fn mod_sub(x: &BigUint, y: &BigUint, n: &BigUint) -> BigUint {
    let x = x % n;
    let y = y % n;
    if x >= y {
        x - y
    } else {
        n - (y - x)
    }
}
