//! Modular exponentiation/inversion over an arbitrary prime `p`, used by
//! `passkey-shamir` for the three-pass protocol's commutative locks.
//! Grounded on `wasm_vrf_worker/src/shamir3pass/mod.rs::{modexp,modinv}`.
//!
//! `num-bigint::BigUint::modpow` already runs in time independent of the
//! *value* of the exponent's bits for a fixed bit-length (square-and-multiply
//! over a fixed-width representation), which is the property spec.md §4.1
//! asks for; it is not independent of the exponent's *bit length*, so callers
//! must keep exponents at a fixed size (the Shamir engine always samples them
//! from a fixed range, see `passkey-shamir::random_k`).

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::One;

use crate::error::CryptoError;

/// `bigModExp(base, exp, modulus) -> base^exp mod modulus`.
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> Result<BigUint, CryptoError> {
    if modulus == &BigUint::from(0u32) {
        return Err(CryptoError::InvalidInput("modulus must be non-zero".into()));
    }
    Ok(base.modpow(exp, modulus))
}

/// `bigModInverse(exp, phi) -> exp^-1 mod phi`, via the extended Euclidean algorithm.
/// Returns `CryptoError::NoModularInverse` when `gcd(exp, phi) != 1`.
pub fn mod_inverse(exp: &BigUint, phi: &BigUint) -> Result<BigUint, CryptoError> {
    let a = BigInt::from_biguint(Sign::Plus, exp.clone());
    let m = BigInt::from_biguint(Sign::Plus, phi.clone());

    let (gcd, x, _) = extended_gcd(a, m.clone());
    if gcd != BigInt::one() {
        return Err(CryptoError::NoModularInverse);
    }

    let mut x_mod = x % &m;
    if x_mod.sign() == Sign::Minus {
        x_mod += &m;
    }
    x_mod
        .to_biguint()
        .ok_or_else(|| CryptoError::InvalidInput("negative modular inverse".into()))
}

/// Extended Euclidean algorithm: returns `(gcd, x, y)` such that `a*x + b*y = gcd`.
fn extended_gcd(a: BigInt, b: BigInt) -> (BigInt, BigInt, BigInt) {
    if b.is_zero_value() {
        return (a, BigInt::one(), BigInt::from(0));
    }
    let (old_r, r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::from(1), BigInt::from(0));
    let (mut old_t, mut t) = (BigInt::from(0), BigInt::from(1));
    let (mut old_r, mut r) = (old_r, r);

    while !r.is_zero_value() {
        let quotient = &old_r / &r;
        let tmp_r = &old_r - &quotient * &r;
        old_r = r;
        r = tmp_r;

        let tmp_s = &old_s - &quotient * &s;
        old_s = s;
        s = tmp_s;

        let tmp_t = &old_t - &quotient * &t;
        old_t = t;
        t = tmp_t;
    }

    (old_r, old_s, old_t)
}

trait IsZero {
    fn is_zero_value(&self) -> bool;
}

impl IsZero for BigInt {
    fn is_zero_value(&self) -> bool {
        *self == BigInt::from(0)
    }
}

/// Ensure `x` is in `[1, p-1]`, the validity range required before any
/// Shamir lock/unlock operation (spec.md §4.3 failure semantics).
pub fn require_in_range(x: &BigUint, p: &BigUint) -> Result<(), CryptoError> {
    if x == &BigUint::from(0u32) || x >= p {
        return Err(CryptoError::OutOfRange);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_exp_known_value() {
        let base = BigUint::from(4u32);
        let exp = BigUint::from(13u32);
        let modulus = BigUint::from(497u32);
        // 4^13 mod 497 = 445
        assert_eq!(mod_exp(&base, &exp, &modulus).unwrap(), BigUint::from(445u32));
    }

    #[test]
    fn mod_inverse_round_trip() {
        let phi = BigUint::from(3120u32); // e.g. RSA-ish phi
        let e = BigUint::from(17u32);
        let d = mod_inverse(&e, &phi).unwrap();
        assert_eq!((&e * &d) % &phi, BigUint::from(1u32));
    }

    #[test]
    fn mod_inverse_missing_when_not_coprime() {
        let phi = BigUint::from(9u32);
        let e = BigUint::from(3u32); // gcd(3, 9) = 3
        assert!(mod_inverse(&e, &phi).is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        let p = BigUint::from(11u32);
        assert!(require_in_range(&BigUint::from(0u32), &p).is_err());
        assert!(require_in_range(&BigUint::from(11u32), &p).is_err());
        assert!(require_in_range(&BigUint::from(5u32), &p).is_ok());
    }
}
