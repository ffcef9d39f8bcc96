//! Ed25519 signing keyed from a 32-byte seed. Grounded on
//! `wasm_signer_worker/src/crypto.rs::derive_ed25519_key_from_prf_output`
//! and `transaction.rs::sign_transaction`, stripped of the NEAR-specific
//! base58/"ed25519:" wire framing (that lives in `passkey-signer`).

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::CryptoError;

pub const ED25519_SEED_SIZE: usize = 32;
pub const ED25519_SIGNATURE_SIZE: usize = 64;

/// `ed25519FromSeed(seed32) -> (pub32, sk64)`. The "sk64" the spec refers to
/// is NEAR's on-wire private-key convention (seed ∥ public key); we return
/// the `SigningKey` itself and let callers materialize that 64-byte form
/// where the NEAR wire format demands it (`passkey-signer::near`).
pub fn from_seed(seed: &[u8]) -> Result<SigningKey, CryptoError> {
    if seed.len() != ED25519_SEED_SIZE {
        return Err(CryptoError::InvalidSeedLength(seed.len()));
    }
    let mut arr = [0u8; ED25519_SEED_SIZE];
    arr.copy_from_slice(seed);
    Ok(SigningKey::from_bytes(&arr))
}

pub fn public_key(signing_key: &SigningKey) -> VerifyingKey {
    signing_key.verifying_key()
}

pub fn sign(signing_key: &SigningKey, msg: &[u8]) -> [u8; ED25519_SIGNATURE_SIZE] {
    signing_key.sign(msg).to_bytes()
}

pub fn verify(public_key: &VerifyingKey, msg: &[u8], sig: &[u8]) -> bool {
    let Ok(sig_bytes) = <[u8; ED25519_SIGNATURE_SIZE]>::try_from(sig) else {
        return false;
    };
    let signature = ed25519_dalek::Signature::from_bytes(&sig_bytes);
    public_key.verify(msg, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_round_trip() {
        let seed = [42u8; ED25519_SEED_SIZE];
        let signing_key = from_seed(&seed).unwrap();
        let vk = public_key(&signing_key);
        let sig = sign(&signing_key, b"hello");
        assert!(verify(&vk, b"hello", &sig));
        assert!(!verify(&vk, b"goodbye", &sig));
    }

    #[test]
    fn derivation_is_deterministic() {
        let seed = [7u8; ED25519_SEED_SIZE];
        let a = from_seed(&seed).unwrap();
        let b = from_seed(&seed).unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(public_key(&a).to_bytes(), public_key(&b).to_bytes());
    }

    #[test]
    fn rejects_wrong_seed_length() {
        assert!(matches!(from_seed(&[0u8; 16]), Err(CryptoError::InvalidSeedLength(16))));
    }
}
