//! ChaCha20-Poly1305 AEAD over raw bytes. Ported from the teacher's
//! `crypto.rs::{encrypt_data_chacha20,decrypt_data_chacha20}`, generalized
//! from string plaintexts to arbitrary byte plaintexts so it can encrypt
//! both Ed25519 seeds and VRF seeds, and to take an explicit AAD parameter
//! (the teacher hardcodes no AAD; spec.md §3 requires one per ciphertext).

use chacha20poly1305::aead::{Aead, Payload};
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Nonce};
use getrandom::getrandom;

use crate::error::CryptoError;

pub const CHACHA20_KEY_SIZE: usize = 32;
pub const CHACHA20_NONCE_SIZE: usize = 12;

/// A ciphertext plus its nonce, the on-disk shape of every `Encrypted*` type
/// in spec.md §3 (`EncryptedEd25519Key`, `EncryptedVrfKeypair`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AeadCiphertext {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; CHACHA20_NONCE_SIZE],
}

fn require_key_len(key: &[u8]) -> Result<(), CryptoError> {
    if key.len() != CHACHA20_KEY_SIZE {
        return Err(CryptoError::InvalidKeySize {
            expected: CHACHA20_KEY_SIZE,
            actual: key.len(),
        });
    }
    Ok(())
}

/// `chacha20Poly1305Encrypt(key, nonce(12B), aad, data)`. Generates a fresh
/// random nonce internally; callers never supply their own (nonce reuse
/// under a fixed key is catastrophic for this cipher).
pub fn encrypt(key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<AeadCiphertext, CryptoError> {
    require_key_len(key)?;
    let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));

    let mut nonce_bytes = [0u8; CHACHA20_NONCE_SIZE];
    getrandom(&mut nonce_bytes).map_err(|e| CryptoError::EncryptError(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptError(e.to_string()))?;

    Ok(AeadCiphertext { ciphertext, nonce: nonce_bytes })
}

/// `chacha20Poly1305Decrypt(key, nonce, aad, data)`. Fails with
/// `CryptoError::DecryptError` on tag mismatch, matching spec.md §4.1.
pub fn decrypt(key: &[u8], aad: &[u8], data: &AeadCiphertext) -> Result<Vec<u8>, CryptoError> {
    require_key_len(key)?;
    let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(key));
    let nonce = Nonce::from_slice(&data.nonce);

    cipher
        .decrypt(
            nonce,
            Payload { msg: &data.ciphertext, aad },
        )
        .map_err(|_| CryptoError::DecryptError)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [7u8; CHACHA20_KEY_SIZE];
        let aad = b"alice.testnet";
        let msg = b"super secret seed material";
        let enc = encrypt(&key, aad, msg).unwrap();
        let dec = decrypt(&key, aad, &enc).unwrap();
        assert_eq!(dec, msg);
    }

    #[test]
    fn tamper_ciphertext_fails() {
        let key = [1u8; CHACHA20_KEY_SIZE];
        let aad = b"aad";
        let mut enc = encrypt(&key, aad, b"payload").unwrap();
        enc.ciphertext[0] ^= 0xFF;
        assert!(matches!(decrypt(&key, aad, &enc), Err(CryptoError::DecryptError)));
    }

    #[test]
    fn tamper_aad_fails() {
        let key = [1u8; CHACHA20_KEY_SIZE];
        let enc = encrypt(&key, b"aad-a", b"payload").unwrap();
        assert!(matches!(decrypt(&key, b"aad-b", &enc), Err(CryptoError::DecryptError)));
    }

    #[test]
    fn tamper_nonce_fails() {
        let key = [1u8; CHACHA20_KEY_SIZE];
        let mut enc = encrypt(&key, b"aad", b"payload").unwrap();
        enc.nonce[0] ^= 0xFF;
        assert!(matches!(decrypt(&key, b"aad", &enc), Err(CryptoError::DecryptError)));
    }

    #[test]
    fn rejects_wrong_key_size() {
        let short_key = [0u8; 16];
        assert!(matches!(
            encrypt(&short_key, b"aad", b"x"),
            Err(CryptoError::InvalidKeySize { .. })
        ));
    }
}
