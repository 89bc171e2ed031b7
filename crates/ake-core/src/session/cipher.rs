//! Session key derivation and the single-message cipher

use crate::arith::mod_sub;
use crate::{Error, PrivateKey, Result, SessionKey};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

/// `(peer_valueᵖ + a) mod n`
pub fn derive_session_key(peer_value: &BigUint, own_key: &PrivateKey, n: &BigUint) -> SessionKey {
    let shared = peer_value.modpow(&own_key.p, n);
    SessionKey((shared + &own_key.a) % n)
}

/// `C = (P + secret·K) mod n`; `P` must already be in `[0, n-1]`
pub fn encrypt(
    plaintext: &BigUint,
    secret: &BigUint,
    key: &SessionKey,
    n: &BigUint,
) -> Result<BigUint> {
    if plaintext >= n {
        return Err(Error::InvalidConfig(format!(
            "Plaintext must be below the modulus ({} bits)",
            n.bits()
        )));
    }
    Ok((plaintext + secret * &key.0) % n)
}

/// `P = (C - secret·K) mod n`, normalized into `[0, n-1]`
pub fn decrypt(ciphertext: &BigUint, secret: &BigUint, key: &SessionKey, n: &BigUint) -> BigUint {
    mod_sub(ciphertext, &(secret * &key.0), n)
}

/// First 128 bits of `SHA-256(decimal(K))`, sent so the peer can compare keys
pub fn confirmation_tag(key: &SessionKey) -> BigUint {
    let digest = Sha256::digest(key.0.to_str_radix(10).as_bytes());
    BigUint::from_bytes_be(&digest[..16])
}
