//! Key Manager (KM) — spec.md §4.4.
//!
//! Owns the account's two secrets: the Ed25519 signing seed (derived from
//! PRF-B, encrypted under a PRF-A-derived key) and the VRF keypair (held
//! unlocked in a private `VrfEngine`, never copied out). Grounded on
//! `wasm_signer_worker/src/handlers/{handle_derive_near_keypair_and_encrypt.rs,
//! handle_recover_keypair_from_passkey.rs}` composed with
//! `wasm_vrf_worker/src/handlers/handle_unlock_vrf_keypair.rs`, restated as
//! methods on one struct instead of five separate wasm-bindgen handlers.

use passkey_shamir::ExponentPair;
use passkey_vrf::{
    EncryptedVrfKeypair, ServerEncryptedVrfKeypair, VrfEngine, VrfInputData,
};

use crate::ed25519_key::{decrypt_ed25519_seed, derive_ed25519_seed, encrypt_ed25519_seed, near_key_strings};
use crate::error::{KeyManagerError, KeyManagerResult};
use crate::types::{RecoverKeypairOutcome, RegisterAccountOutcome, VrfSecretHandle};

/// Holds at most one account's unlocked VRF keypair at a time, mirroring
/// spec.md §4.2's single-unlocked-session invariant at the KM layer: a new
/// `unlock_vrf_keypair`/`recover_keypair` call replaces (and zeroizes) the
/// previous one.
pub struct KeyManager {
    vrf_engine: VrfEngine,
    unlocked_account: Option<String>,
}

impl KeyManager {
    pub fn new() -> KeyManagerResult<Self> {
        Ok(Self {
            vrf_engine: VrfEngine::new()?,
            unlocked_account: None,
        })
    }

    pub fn is_unlocked(&self, account_id: &str) -> bool {
        self.vrf_engine.is_unlocked() && self.unlocked_account.as_deref() == Some(account_id)
    }

    /// `registerAccount({accountId, prfA, prfB, vrfChallenge, relay}) ->
    /// (Ed25519PublicKey, EncryptedEd25519Key, EncryptedVrfKeypair,
    /// ServerEncryptedVrfKeypair?)`.
    ///
    /// Derives the Ed25519 seed from PRF-B and the VRF keypair
    /// deterministically from PRF-A, both account-scoped, and encrypts
    /// both at rest. Shamir enrollment (the optional `ServerEncryptedVrfKeypair`)
    /// is left to `enroll_shamir_vrf_kek`, since it requires a relay round
    /// trip this crate does not perform itself.
    pub fn register_account(
        &mut self,
        account_id: &str,
        prf_a: &[u8],
        prf_b: &[u8],
        vrf_challenge_input: Option<VrfInputData>,
    ) -> KeyManagerResult<RegisterAccountOutcome> {
        if prf_a.is_empty() || prf_b.is_empty() {
            return Err(KeyManagerError::PrfMissing);
        }

        let ed25519_seed = derive_ed25519_seed(prf_b, account_id)?;
        let (_private_key, ed25519_public_key) = near_key_strings(&ed25519_seed)?;
        let encrypted_ed25519_key = encrypt_ed25519_seed(&ed25519_seed, prf_a, account_id)?;

        let (vrf_response, _vrf_keypair) =
            self.vrf_engine
                .derive_vrf_keypair_from_prf(prf_a, account_id, vrf_challenge_input)?;
        let encrypted_vrf_keypair = vrf_response
            .encrypted_vrf_keypair
            .ok_or_else(|| KeyManagerError::Crypto(passkey_crypto::CryptoError::InvalidInput(
                "VRF derivation did not produce an encrypted keypair".into(),
            )))?;

        self.unlocked_account = Some(account_id.to_string());

        Ok(RegisterAccountOutcome {
            ed25519_public_key,
            encrypted_ed25519_key,
            vrf_public_key: vrf_response.vrf_public_key,
            encrypted_vrf_keypair,
            server_encrypted_vrf_keypair: None,
        })
    }

    /// Lock a freshly registered VRF keypair's KEK behind a Shamir
    /// three-pass exchange with a relay. This crate only performs the
    /// client-side math (`passkey-shamir`'s `client_lock`); the relay round
    /// trip itself is a `RelayClient` concern in `passkey-session`.
    pub fn enroll_shamir_vrf_kek(
        &self,
        encrypted_vrf_keypair: &EncryptedVrfKeypair,
        client_exponents: &ExponentPair,
    ) -> KeyManagerResult<ServerEncryptedVrfKeypair> {
        Ok(self
            .vrf_engine
            .client_lock_vrf_keypair(encrypted_vrf_keypair, client_exponents)?)
    }

    /// `unlockVrfKeypair({accountId, prfA, encryptedVrf, relay}) ->
    /// VrfSecretHandle` for the no-Shamir path: decrypts the VRF keypair
    /// directly with the PRF-A-derived AEAD key.
    pub fn unlock_vrf_keypair(
        &mut self,
        account_id: &str,
        prf_a: &[u8],
        encrypted_vrf: &EncryptedVrfKeypair,
    ) -> KeyManagerResult<VrfSecretHandle> {
        if prf_a.is_empty() {
            return Err(KeyManagerError::PrfMissing);
        }
        self.vrf_engine.unlock_vrf_keypair(encrypted_vrf, prf_a, account_id)?;
        self.unlocked_account = Some(account_id.to_string());
        Ok(VrfSecretHandle { account_id: account_id.to_string() })
    }

    /// `unlockVrfKeypair` for the Shamir-gated path: the caller has already
    /// performed `client_lock` → relay round trip → `server_unlock` and
    /// hands back the server-unlocked scalar. The recovered scalar is a
    /// function of the record's (public) nonce, not a secret in its own
    /// right, so it cannot stand in for PRF-A as a decryption key; what it
    /// proves is that the relay cooperated in removing its own lock, which
    /// only a party holding the correct `client_exponents` for *this* record
    /// could have driven to completion. Recovery gates on that proof, then
    /// decrypts with the real PRF-A as usual — the relay's refusal to
    /// cooperate is therefore enough to block login even for a caller that
    /// still has PRF-A, which is the login-availability control spec.md's
    /// Shamir Engine exists for.
    pub fn unlock_vrf_keypair_via_shamir(
        &mut self,
        account_id: &str,
        encrypted_vrf: &EncryptedVrfKeypair,
        prf_a: &[u8],
        client_exponents: &ExponentPair,
        server_unlocked_scalar: &passkey_crypto::num_bigint::BigUint,
    ) -> KeyManagerResult<VrfSecretHandle> {
        if prf_a.is_empty() {
            return Err(KeyManagerError::PrfMissing);
        }
        let recovered_kek_value = self.vrf_engine.shamir().client_unlock(server_unlocked_scalar, client_exponents)?;
        let expected_kek_seed = passkey_crypto::hash::sha256(encrypted_vrf.chacha20_nonce_b64u.as_bytes());
        let expected_kek_value = passkey_shamir::kek_to_biguint(&expected_kek_seed);
        if recovered_kek_value != expected_kek_value {
            return Err(KeyManagerError::Vrf(passkey_vrf::VrfError::VrfNotUnlocked));
        }
        self.vrf_engine.unlock_vrf_keypair(encrypted_vrf, prf_a, account_id)?;
        self.unlocked_account = Some(account_id.to_string());
        Ok(VrfSecretHandle { account_id: account_id.to_string() })
    }

    /// `recoverKeypair({prfA, prfB, accountId}) -> (Ed25519PublicKey,
    /// EncryptedEd25519Key)`. Deterministic from the two PRFs; idempotent.
    pub fn recover_keypair(
        &mut self,
        account_id: &str,
        prf_a: &[u8],
        prf_b: &[u8],
    ) -> KeyManagerResult<RecoverKeypairOutcome> {
        if prf_a.is_empty() || prf_b.is_empty() {
            return Err(KeyManagerError::PrfMissing);
        }

        let ed25519_seed = derive_ed25519_seed(prf_b, account_id)?;
        let (_private_key, ed25519_public_key) = near_key_strings(&ed25519_seed)?;
        let encrypted_ed25519_key = encrypt_ed25519_seed(&ed25519_seed, prf_a, account_id)?;

        let (vrf_response, _vrf_keypair) =
            self.vrf_engine.derive_vrf_keypair_from_prf(prf_a, account_id, None)?;
        let encrypted_vrf_keypair = vrf_response
            .encrypted_vrf_keypair
            .ok_or_else(|| KeyManagerError::Crypto(passkey_crypto::CryptoError::InvalidInput(
                "VRF derivation did not produce an encrypted keypair".into(),
            )))?;
        self.unlocked_account = Some(account_id.to_string());

        Ok(RecoverKeypairOutcome {
            ed25519_public_key,
            encrypted_ed25519_key,
            vrf_public_key: vrf_response.vrf_public_key,
            encrypted_vrf_keypair,
        })
    }

    /// Re-derive and decrypt an `EncryptedEd25519Key` for signing, verifying
    /// it still matches the account's on-record public key (`StaleRecord` if
    /// not — the caller should treat this as "re-register", not a bug).
    pub fn decrypt_ed25519_key(
        &self,
        encrypted: &crate::types::EncryptedEd25519Key,
        prf_a: &[u8],
        account_id: &str,
        expected_public_key: &str,
    ) -> KeyManagerResult<[u8; 32]> {
        let seed = decrypt_ed25519_seed(encrypted, prf_a, account_id)?;
        let (_private_key, public_key) = near_key_strings(&seed)?;
        if public_key != expected_public_key {
            return Err(KeyManagerError::StaleRecord);
        }
        Ok(seed)
    }

    /// `rotateVrf(...)`: derive and encrypt a fresh VRF keypair for the
    /// account, without touching the Ed25519 signing key. The caller is
    /// responsible for publishing the new `vrfPublicKey` to the
    /// `AuthenticatorRecord` (the one field spec.md §3 allows to mutate).
    pub fn rotate_vrf(
        &mut self,
        account_id: &str,
        prf_a: &[u8],
        vrf_challenge_input: Option<VrfInputData>,
    ) -> KeyManagerResult<EncryptedVrfKeypair> {
        if prf_a.is_empty() {
            return Err(KeyManagerError::PrfMissing);
        }
        let rotation_salt = format!("{account_id}/rotate");
        let (vrf_response, _vrf_keypair) =
            self.vrf_engine
                .derive_vrf_keypair_from_prf(prf_a, &rotation_salt, vrf_challenge_input)?;
        let encrypted = vrf_response
            .encrypted_vrf_keypair
            .ok_or_else(|| KeyManagerError::Crypto(passkey_crypto::CryptoError::InvalidInput(
                "VRF rotation did not produce an encrypted keypair".into(),
            )))?;
        Ok(encrypted)
    }

    /// `lockSession()`: clear the unlocked VRF keypair from memory.
    pub fn lock_session(&mut self) {
        self.vrf_engine.logout();
        self.unlocked_account = None;
    }

    pub fn generate_vrf_challenge(
        &self,
        account_id: &str,
        input_data: VrfInputData,
    ) -> KeyManagerResult<passkey_vrf::VrfChallengeData> {
        if !self.is_unlocked(account_id) {
            return Err(KeyManagerError::Vrf(passkey_vrf::VrfError::VrfNotUnlocked));
        }
        Ok(self.vrf_engine.generate_vrf_challenge(input_data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vrf_input(account_id: &str) -> VrfInputData {
        VrfInputData {
            user_id: account_id.to_string(),
            rp_id: "example.com".into(),
            block_height: "100".into(),
            block_hash: bs58::encode([1u8; 32]).into_string(),
            intent_digest: None,
            session_policy_digest_32: None,
        }
    }

    #[test]
    fn register_account_produces_consistent_public_keys() {
        let mut km = KeyManager::new().unwrap();
        let outcome = km
            .register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None)
            .unwrap();
        assert!(outcome.ed25519_public_key.starts_with("ed25519:"));
        assert!(km.is_unlocked("alice.testnet"));
    }

    #[test]
    fn register_account_rejects_missing_prf() {
        let mut km = KeyManager::new().unwrap();
        assert!(matches!(
            km.register_account("alice.testnet", &[], &[2u8; 32], None),
            Err(KeyManagerError::PrfMissing)
        ));
    }

    #[test]
    fn recover_keypair_is_idempotent() {
        let mut km = KeyManager::new().unwrap();
        let a = km.recover_keypair("alice.testnet", &[9u8; 32], &[8u8; 32]).unwrap();
        let b = km.recover_keypair("alice.testnet", &[9u8; 32], &[8u8; 32]).unwrap();
        assert_eq!(a.ed25519_public_key, b.ed25519_public_key);
    }

    #[test]
    fn decrypt_ed25519_key_detects_stale_record() {
        let mut km = KeyManager::new().unwrap();
        let outcome = km.register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None).unwrap();
        let result = km.decrypt_ed25519_key(
            &outcome.encrypted_ed25519_key,
            &[1u8; 32],
            "alice.testnet",
            "ed25519:not-the-real-key",
        );
        assert!(matches!(result, Err(KeyManagerError::StaleRecord)));
    }

    #[test]
    fn decrypt_ed25519_key_round_trips_for_matching_record() {
        let mut km = KeyManager::new().unwrap();
        let outcome = km.register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None).unwrap();
        let result = km.decrypt_ed25519_key(
            &outcome.encrypted_ed25519_key,
            &[1u8; 32],
            "alice.testnet",
            &outcome.ed25519_public_key,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn rotate_vrf_produces_a_different_ciphertext_than_registration() {
        let mut km = KeyManager::new().unwrap();
        let outcome = km.register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None).unwrap();
        let rotated = km.rotate_vrf("alice.testnet", &[1u8; 32], None).unwrap();
        assert_ne!(
            outcome.encrypted_vrf_keypair.encrypted_vrf_data_b64u,
            rotated.encrypted_vrf_data_b64u
        );
    }

    #[test]
    fn lock_session_clears_unlocked_state() {
        let mut km = KeyManager::new().unwrap();
        km.register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None).unwrap();
        assert!(km.is_unlocked("alice.testnet"));
        km.lock_session();
        assert!(!km.is_unlocked("alice.testnet"));
    }

    #[test]
    fn challenge_generation_requires_matching_unlocked_account() {
        let mut km = KeyManager::new().unwrap();
        km.register_account("alice.testnet", &[1u8; 32], &[2u8; 32], None).unwrap();
        assert!(km.generate_vrf_challenge("bob.testnet", vrf_input("bob.testnet")).is_err());
        assert!(km.generate_vrf_challenge("alice.testnet", vrf_input("alice.testnet")).is_ok());
    }
}
