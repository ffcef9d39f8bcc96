//! Ed25519 on-chain signing keypair: derivation from PRF-B, AEAD protection
//! under PRF-A, and NEAR's wire encoding. Grounded on
//! `wasm_signer_worker/src/crypto.rs::derive_ed25519_key_from_prf_output`,
//! split into composable steps (derive / encrypt / decrypt / NEAR-encode)
//! instead of the teacher's single function that does all four at once,
//! since `recoverKeypair` needs the derive+NEAR-encode half without the
//! teacher's particular wrap-key-seed encryption path.

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use passkey_crypto::aead;
use passkey_crypto::encoders::{base64_url_decode, base64_url_encode};

use crate::config::{ED25519_AEAD_KEY_HKDF_INFO, ED25519_SEED_HKDF_INFO, ED25519_SEED_SIZE};
use crate::error::{KeyManagerError, KeyManagerResult};
use crate::types::EncryptedEd25519Key;

/// `seed = HKDF(prfB, salt=accountId, info="w3a/near-ed25519/v1", 32)`.
pub fn derive_ed25519_seed(prf_b: &[u8], account_id: &str) -> KeyManagerResult<[u8; 32]> {
    if prf_b.is_empty() {
        return Err(KeyManagerError::PrfMissing);
    }
    let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), prf_b);
    let mut seed = [0u8; ED25519_SEED_SIZE];
    hk.expand(ED25519_SEED_HKDF_INFO, &mut seed)
        .map_err(|_| KeyManagerError::Crypto(passkey_crypto::CryptoError::HkdfError))?;
    Ok(seed)
}

fn derive_aead_key(prf_a: &[u8], account_id: &str) -> KeyManagerResult<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), prf_a);
    let mut key = [0u8; 32];
    hk.expand(ED25519_AEAD_KEY_HKDF_INFO, &mut key)
        .map_err(|_| KeyManagerError::Crypto(passkey_crypto::CryptoError::HkdfError))?;
    Ok(key)
}

/// `k_enc = HKDF(prfA, salt=accountId, info="w3a/aead/v1", 32)`; encrypt the
/// seed under it with AAD = AccountId (spec.md §3).
pub fn encrypt_ed25519_seed(seed: &[u8; 32], prf_a: &[u8], account_id: &str) -> KeyManagerResult<EncryptedEd25519Key> {
    let aead_key = derive_aead_key(prf_a, account_id)?;
    let ciphertext = aead::encrypt(&aead_key, account_id.as_bytes(), seed)?;
    Ok(EncryptedEd25519Key {
        ciphertext_b64u: base64_url_encode(&ciphertext.ciphertext),
        nonce_b64u: base64_url_encode(&ciphertext.nonce),
    })
}

/// Inverse of `encrypt_ed25519_seed`. The recovered seed is zeroized by the
/// caller once no longer needed; this function does not retain a copy.
pub fn decrypt_ed25519_seed(
    encrypted: &EncryptedEd25519Key,
    prf_a: &[u8],
    account_id: &str,
) -> KeyManagerResult<[u8; 32]> {
    let aead_key = derive_aead_key(prf_a, account_id)?;
    let ciphertext_bytes = base64_url_decode(&encrypted.ciphertext_b64u)?;
    let nonce_bytes = base64_url_decode(&encrypted.nonce_b64u)?;
    let nonce = <[u8; 12]>::try_from(nonce_bytes.as_slice())
        .map_err(|_| KeyManagerError::DecryptError("invalid nonce length".into()))?;

    let plaintext = aead::decrypt(
        &aead_key,
        account_id.as_bytes(),
        &aead::AeadCiphertext { ciphertext: ciphertext_bytes, nonce },
    )
    .map_err(|e| KeyManagerError::DecryptError(e.to_string()))?;

    <[u8; 32]>::try_from(plaintext.as_slice()).map_err(|_| KeyManagerError::DecryptError("unexpected seed length".into()))
}

/// NEAR's wire encoding: `ed25519:<base58(seed ∥ pubkey)>` for the private
/// key, `ed25519:<base58(pubkey)>` for the public key.
pub fn near_key_strings(seed: &[u8; 32]) -> KeyManagerResult<(String, String)> {
    let signing_key = passkey_crypto::ed25519::from_seed(seed)?;
    let verifying_key = passkey_crypto::ed25519::public_key(&signing_key);

    let mut private_key_bytes = Vec::with_capacity(64);
    private_key_bytes.extend_from_slice(seed);
    private_key_bytes.extend_from_slice(verifying_key.as_bytes());

    let private_key = format!("ed25519:{}", bs58::encode(&private_key_bytes).into_string());
    let public_key = format!("ed25519:{}", bs58::encode(verifying_key.as_bytes()).into_string());

    private_key_bytes.zeroize();
    Ok((private_key, public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic_and_account_scoped() {
        let prf_b = [5u8; 32];
        let a = derive_ed25519_seed(&prf_b, "alice.testnet").unwrap();
        let b = derive_ed25519_seed(&prf_b, "alice.testnet").unwrap();
        let c = derive_ed25519_seed(&prf_b, "bob.testnet").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn rejects_empty_prf() {
        assert!(matches!(derive_ed25519_seed(&[], "alice.testnet"), Err(KeyManagerError::PrfMissing)));
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let seed = derive_ed25519_seed(&[1u8; 32], "alice.testnet").unwrap();
        let prf_a = [2u8; 32];
        let encrypted = encrypt_ed25519_seed(&seed, &prf_a, "alice.testnet").unwrap();
        let recovered = decrypt_ed25519_seed(&encrypted, &prf_a, "alice.testnet").unwrap();
        assert_eq!(seed, recovered);
    }

    #[test]
    fn decrypt_fails_under_wrong_account_aad() {
        let seed = derive_ed25519_seed(&[1u8; 32], "alice.testnet").unwrap();
        let prf_a = [2u8; 32];
        let encrypted = encrypt_ed25519_seed(&seed, &prf_a, "alice.testnet").unwrap();
        assert!(decrypt_ed25519_seed(&encrypted, &prf_a, "bob.testnet").is_err());
    }

    #[test]
    fn near_key_strings_have_expected_prefixes_and_lengths() {
        let seed = [7u8; 32];
        let (private_key, public_key) = near_key_strings(&seed).unwrap();
        assert!(private_key.starts_with("ed25519:"));
        assert!(public_key.starts_with("ed25519:"));
        let decoded_private = bs58::decode(private_key.trim_start_matches("ed25519:")).into_vec().unwrap();
        assert_eq!(decoded_private.len(), 64);
        let decoded_public = bs58::decode(public_key.trim_start_matches("ed25519:")).into_vec().unwrap();
        assert_eq!(decoded_public.len(), 32);
    }

    #[test]
    fn near_key_strings_deterministic_from_seed() {
        let seed = [9u8; 32];
        let (priv_a, pub_a) = near_key_strings(&seed).unwrap();
        let (priv_b, pub_b) = near_key_strings(&seed).unwrap();
        assert_eq!(priv_a, priv_b);
        assert_eq!(pub_a, pub_b);
    }
}
