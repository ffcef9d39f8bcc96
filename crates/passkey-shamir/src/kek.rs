//! KEK <-> big-integer encoding, and the AEAD operations that use a
//! recovered KEK to protect a VRF keypair's seed. Grounded on the teacher's
//! `encrypt_with_kek`/`decrypt_with_kek` in `shamir3pass/mod.rs`, generalized
//! to take an explicit AAD (spec.md §3's per-account binding requirement)
//! rather than the teacher's unauthenticated-by-context encryption.

use num_bigint::BigUint;

use passkey_crypto::aead::{self, AeadCiphertext};
use passkey_crypto::kdf::hkdf_sha256_32;

use crate::config::SHAMIR_AEAD_HKDF_INFO;
use crate::error::ShamirError;

/// Encode a 32-byte KEK as a big-integer value reduced into the engine's
/// valid range by construction (32 bytes is always less than the 256-bit+
/// primes this crate accepts).
pub fn kek_to_biguint(kek: &[u8; 32]) -> BigUint {
    BigUint::from_bytes_be(kek)
}

/// Decode a big-integer value (recovered via `client_unlock`) back into a
/// fixed 32-byte KEK. Left-pads with zeroes; values that don't fit in 32
/// bytes indicate a protocol or configuration error upstream.
pub fn biguint_to_kek(value: &BigUint) -> Result<[u8; 32], ShamirError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(ShamirError::OutOfRange);
    }
    let mut kek = [0u8; 32];
    kek[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(kek)
}

fn derive_aead_key(kek: &[u8; 32]) -> Result<[u8; 32], ShamirError> {
    Ok(hkdf_sha256_32(&[], kek, SHAMIR_AEAD_HKDF_INFO)?)
}

/// Encrypt a VRF keypair seed (or any secret byte string) under a recovered
/// KEK, bound to `aad` (the account-scoped binding spec.md §3 requires).
pub fn encrypt_with_kek(kek: &[u8; 32], aad: &[u8], plaintext: &[u8]) -> Result<AeadCiphertext, ShamirError> {
    let aead_key = derive_aead_key(kek)?;
    aead::encrypt(&aead_key, aad, plaintext).map_err(|e| ShamirError::EncryptionFailed(e.to_string()))
}

/// Decrypt a ciphertext produced by `encrypt_with_kek`.
pub fn decrypt_with_kek(kek: &[u8; 32], aad: &[u8], data: &AeadCiphertext) -> Result<Vec<u8>, ShamirError> {
    let aead_key = derive_aead_key(kek)?;
    aead::decrypt(&aead_key, aad, data).map_err(|e| ShamirError::DecryptionFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kek_biguint_round_trip() {
        let kek = [0xABu8; 32];
        let value = kek_to_biguint(&kek);
        assert_eq!(biguint_to_kek(&value).unwrap(), kek);
    }

    #[test]
    fn kek_biguint_round_trip_with_leading_zero_bytes() {
        let mut kek = [0xCDu8; 32];
        kek[0] = 0x00;
        kek[1] = 0x00;
        let value = kek_to_biguint(&kek);
        assert_eq!(biguint_to_kek(&value).unwrap(), kek);
    }

    #[test]
    fn aead_round_trip_under_kek() {
        let kek = [3u8; 32];
        let aad = b"alice.testnet";
        let seed = b"a fake 32 byte vrf seed value!!";
        let enc = encrypt_with_kek(&kek, aad, seed).unwrap();
        let dec = decrypt_with_kek(&kek, aad, &enc).unwrap();
        assert_eq!(dec, seed);
    }

    #[test]
    fn aead_fails_under_wrong_kek() {
        let aad = b"alice.testnet";
        let seed = b"a fake 32 byte vrf seed value!!";
        let enc = encrypt_with_kek(&[1u8; 32], aad, seed).unwrap();
        assert!(decrypt_with_kek(&[2u8; 32], aad, &enc).is_err());
    }

    #[test]
    fn aead_fails_under_wrong_aad() {
        let kek = [3u8; 32];
        let seed = b"a fake 32 byte vrf seed value!!";
        let enc = encrypt_with_kek(&kek, b"alice.testnet", seed).unwrap();
        assert!(decrypt_with_kek(&kek, b"bob.testnet", &enc).is_err());
    }

    #[test]
    fn spec_example_seed_kek_round_trip() {
        // spec.md §8: given the shipped prime and kek = SHA256("seed"), a
        // full four-step client/server lock/unlock round trip recovers
        // exactly that kek.
        use crate::engine::Shamir3Pass;

        let kek = passkey_crypto::hash::sha256(b"seed");
        let engine = Shamir3Pass::with_default_prime().unwrap();
        let client = engine.generate_exponent_pair().unwrap();
        let server = engine.generate_exponent_pair().unwrap();

        let value = kek_to_biguint(&kek);
        let client_locked = engine.client_lock(&value, &client).unwrap();
        let double_locked = engine.server_lock(&client_locked, &server).unwrap();
        let server_unlocked = engine.server_unlock(&double_locked, &server).unwrap();
        let recovered = engine.client_unlock(&server_unlocked, &client).unwrap();

        assert_eq!(biguint_to_kek(&recovered).unwrap(), kek);
    }
}
