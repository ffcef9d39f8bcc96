//! The Shamir three-pass commutative-encryption engine itself. Grounded on
//! `wasm_vrf_worker/src/shamir3pass/mod.rs`: the teacher's `Shamir3Pass`
//! struct and its `client_lock`/`server_lock`/`client_unlock`/`server_unlock`
//! methods map onto spec.md §4.3's four operations one-to-one. The teacher
//! fuses this engine into the VRF worker crate; it is lifted out to its own
//! crate here because spec.md lists it as its own component (SE).

use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use passkey_crypto::bigint::{mod_exp, mod_inverse, require_in_range};

use crate::config::{MAX_EXPONENT_SAMPLE_ATTEMPTS, MIN_PRIME_BITS};
use crate::error::ShamirError;

/// One side's exponent pair for a single three-pass run: `e` (the locking
/// exponent) and `d` (its inverse mod `p - 1`, used to unlock). Zeroized on
/// drop since both values are secret — recovering `d` from a locked value
/// and its original plaintext is the entire attack this protocol defends
/// against if an exponent pair is ever reused.
#[derive(Clone)]
pub struct ExponentPair {
    pub e: BigUint,
    pub d: BigUint,
}

impl Drop for ExponentPair {
    fn drop(&mut self) {
        zeroize_biguint(&mut self.e);
        zeroize_biguint(&mut self.d);
    }
}

impl ZeroizeOnDrop for ExponentPair {}

fn zeroize_biguint(value: &mut BigUint) {
    let mut bytes = std::mem::replace(value, BigUint::from(0u32)).to_bytes_le();
    bytes.zeroize();
}

/// The three-pass protocol engine, parameterized by a prime modulus `p`.
/// Holds no secret state itself; `client_lock`/`server_lock`/`*_unlock`
/// each take an `ExponentPair` explicitly so callers control its lifetime.
#[derive(Clone)]
pub struct Shamir3Pass {
    p: BigUint,
    p_minus_1: BigUint,
}

impl Shamir3Pass {
    /// Construct an engine from an arbitrary prime modulus. Rejects moduli
    /// under `MIN_PRIME_BITS` bits (spec.md §4.3 failure semantics); does
    /// not itself verify primality, matching the teacher (which treats its
    /// compiled-in prime as trusted configuration, not user input).
    pub fn new(p: BigUint) -> Result<Self, ShamirError> {
        let bits = p.bits();
        if bits < MIN_PRIME_BITS as u64 {
            return Err(ShamirError::PrimeTooSmall {
                bits,
                min_bits: MIN_PRIME_BITS,
            });
        }
        let p_minus_1 = &p - BigUint::one();
        Ok(Self { p, p_minus_1 })
    }

    /// Construct an engine using this crate's built-in default prime.
    pub fn with_default_prime() -> Result<Self, ShamirError> {
        let p = BigUint::parse_bytes(crate::config::DEFAULT_SHAMIR_P_HEX.as_bytes(), 16)
            .ok_or_else(|| ShamirError::InvalidPrime("default prime constant is not valid hex".into()))?;
        Self::new(p)
    }

    pub fn prime(&self) -> &BigUint {
        &self.p
    }

    /// Sample a random exponent `e` in `[2, p-2]` coprime to `p - 1`, and
    /// return it paired with its modular inverse `d = e^-1 mod (p-1)`.
    /// Grounded on the teacher's `generate_exponent_pair`.
    pub fn generate_exponent_pair(&self) -> Result<ExponentPair, ShamirError> {
        let mut rng = rand::rngs::OsRng;
        for _ in 0..MAX_EXPONENT_SAMPLE_ATTEMPTS {
            let e = sample_in_range(&mut rng, &self.p_minus_1);
            if let Ok(d) = mod_inverse(&e, &self.p_minus_1) {
                return Ok(ExponentPair { e, d });
            }
        }
        Err(ShamirError::RandomGenerationFailed)
    }

    /// Like `generate_exponent_pair`, but deterministic from a 32-byte seed.
    /// A caller that can reproduce the seed (e.g. by re-deriving it from a
    /// WebAuthn PRF output the same way every time) gets back the same
    /// exponent pair without persisting `d` anywhere between calls.
    pub fn generate_exponent_pair_from_seed(&self, seed: [u8; 32]) -> Result<ExponentPair, ShamirError> {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::from_seed(seed);
        for _ in 0..MAX_EXPONENT_SAMPLE_ATTEMPTS {
            let e = sample_in_range(&mut rng, &self.p_minus_1);
            if let Ok(d) = mod_inverse(&e, &self.p_minus_1) {
                return Ok(ExponentPair { e, d });
            }
        }
        Err(ShamirError::RandomGenerationFailed)
    }

    /// Pass 1: the client raises its secret value to its own exponent `e_c`.
    /// `value` must already be reduced into `[1, p-1]` (callers encode the
    /// KEK/seed into that range before calling).
    pub fn client_lock(&self, value: &BigUint, client: &ExponentPair) -> Result<BigUint, ShamirError> {
        self.lock(value, &client.e)
    }

    /// Pass 2: the server raises the client-locked value to its own
    /// exponent `e_s`, producing a value locked under both parties' keys.
    pub fn server_lock(&self, client_locked: &BigUint, server: &ExponentPair) -> Result<BigUint, ShamirError> {
        self.lock(client_locked, &server.e)
    }

    /// Pass 2b (server side of unlock): the server removes its own lock
    /// using `d_s`, leaving the value locked under the client's key alone.
    pub fn server_unlock(&self, double_locked: &BigUint, server: &ExponentPair) -> Result<BigUint, ShamirError> {
        self.lock(double_locked, &server.d)
    }

    /// Pass 3 (client side of unlock): the client removes its own lock
    /// using `d_c`, recovering the original plaintext value. Because
    /// exponentiation mod `p` commutes, this is correct regardless of
    /// which lock/unlock order the two parties performed their half.
    pub fn client_unlock(&self, server_unlocked: &BigUint, client: &ExponentPair) -> Result<BigUint, ShamirError> {
        self.lock(server_unlocked, &client.d)
    }

    fn lock(&self, value: &BigUint, exponent: &BigUint) -> Result<BigUint, ShamirError> {
        require_in_range(value, &self.p)?;
        Ok(mod_exp(value, exponent, &self.p)?)
    }
}

fn sample_in_range(rng: &mut impl RngCore, upper_exclusive: &BigUint) -> BigUint {
    let byte_len = ((upper_exclusive.bits() + 7) / 8).max(1) as usize;
    loop {
        let mut bytes = vec![0u8; byte_len];
        rng.fill_bytes(&mut bytes);
        let candidate = BigUint::from_bytes_be(&bytes);
        if candidate >= BigUint::from(2u32) && &candidate < upper_exclusive {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_engine() -> Shamir3Pass {
        // A real 256-bit prime kept small enough for fast exhaustive tests
        // would defeat the purpose; exercise the algebra against the actual
        // default prime instead, it's the only modulus we ship.
        Shamir3Pass::with_default_prime().unwrap()
    }

    #[test]
    fn full_round_trip_recovers_original_value() {
        let engine = small_engine();
        let client = engine.generate_exponent_pair().unwrap();
        let server = engine.generate_exponent_pair().unwrap();

        let original = BigUint::from(123456789u64);

        let client_locked = engine.client_lock(&original, &client).unwrap();
        let double_locked = engine.server_lock(&client_locked, &server).unwrap();
        let server_unlocked = engine.server_unlock(&double_locked, &server).unwrap();
        let recovered = engine.client_unlock(&server_unlocked, &client).unwrap();

        assert_eq!(recovered, original);
    }

    #[test]
    fn rejects_value_out_of_range() {
        let engine = small_engine();
        let client = engine.generate_exponent_pair().unwrap();
        assert!(engine.client_lock(&BigUint::from(0u32), &client).is_err());
        assert!(engine.client_lock(engine.prime(), &client).is_err());
    }

    #[test]
    fn rejects_prime_below_minimum_bits() {
        let tiny = BigUint::from(23u32);
        assert!(matches!(Shamir3Pass::new(tiny), Err(ShamirError::PrimeTooSmall { .. })));
    }

    #[test]
    fn exponent_pair_from_seed_is_deterministic() {
        let engine = small_engine();
        let a = engine.generate_exponent_pair_from_seed([7u8; 32]).unwrap();
        let b = engine.generate_exponent_pair_from_seed([7u8; 32]).unwrap();
        assert_eq!(a.e, b.e);
        assert_eq!(a.d, b.d);
        let c = engine.generate_exponent_pair_from_seed([8u8; 32]).unwrap();
        assert_ne!(a.e, c.e);
    }

    #[test]
    fn exponent_pairs_are_distinct_and_valid_inverses() {
        let engine = small_engine();
        let pair = engine.generate_exponent_pair().unwrap();
        let p_minus_1 = engine.prime() - BigUint::one();
        assert_eq!((&pair.e * &pair.d) % &p_minus_1, BigUint::one());
    }
}
