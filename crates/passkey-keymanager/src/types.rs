//! Durable record types owned by the Key Manager — spec.md §3.
//!
//! These are the shapes a `Storage` collaborator persists; this crate only
//! defines them and the operations that construct/consume them, it does not
//! perform I/O itself (that boundary belongs to `passkey-session`).

use serde::{Deserialize, Serialize};

pub use passkey_vrf::{EncryptedVrfKeypair, ServerEncryptedVrfKeypair};

/// `{ ciphertext, nonce }`. ChaCha20-Poly1305 over the 32-byte Ed25519 seed;
/// AAD = AccountId.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedEd25519Key {
    pub ciphertext_b64u: String,
    pub nonce_b64u: String,
}

/// WebAuthn transport hints, mirrored from the credential the browser
/// reports at registration time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    Internal,
    Hybrid,
}

/// `{ credentialId, credentialPublicKey (COSE), transports, deviceNumber ≥ 1,
/// registeredAt, vrfPublicKey, userVerificationPolicy, originPolicy }`.
/// Immutable except `vrfPublicKey` on rotation.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorRecord {
    pub credential_id: String,
    /// Raw COSE-encoded public key bytes extracted from the attestation
    /// object (`cose::extract_cose_public_key_from_attestation`).
    pub credential_public_key: Vec<u8>,
    pub transports: Vec<AuthenticatorTransport>,
    pub device_number: u32,
    pub registered_at_ms: u64,
    pub vrf_public_key: String,
    pub user_verification_policy: String,
    pub origin_policy: String,
}

/// `{ accountId, deviceNumber, ed25519PublicKey, encryptedEd25519Key,
/// encryptedVrfKeypair, serverEncryptedVrfKeypair?, preferences,
/// lastLoginMs, registeredAtMs }`.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub account_id: String,
    pub device_number: u32,
    pub ed25519_public_key: String,
    pub encrypted_ed25519_key: EncryptedEd25519Key,
    pub encrypted_vrf_keypair: EncryptedVrfKeypair,
    pub server_encrypted_vrf_keypair: Option<ServerEncryptedVrfKeypair>,
    pub preferences: serde_json::Value,
    pub last_login_ms: u64,
    pub registered_at_ms: u64,
}

/// Result of `registerAccount`.
#[derive(Debug, Clone)]
pub struct RegisterAccountOutcome {
    pub ed25519_public_key: String,
    pub encrypted_ed25519_key: EncryptedEd25519Key,
    pub vrf_public_key: String,
    pub encrypted_vrf_keypair: EncryptedVrfKeypair,
    pub server_encrypted_vrf_keypair: Option<ServerEncryptedVrfKeypair>,
}

/// Result of `recoverKeypair`. `encrypted_vrf_keypair`/`vrf_public_key` are
/// included so a caller (`passkey-session`) can persist a fresh
/// `UserRecord` for the recovering device without a second derivation —
/// `recover_keypair` already leaves the VRF engine unlocked with this same
/// material.
#[derive(Debug, Clone)]
pub struct RecoverKeypairOutcome {
    pub ed25519_public_key: String,
    pub encrypted_ed25519_key: EncryptedEd25519Key,
    pub vrf_public_key: String,
    pub encrypted_vrf_keypair: EncryptedVrfKeypair,
}

/// Proof that `unlockVrfKeypair` succeeded for a given account. Deliberately
/// opaque and keyless: the decrypted VRF keypair stays inside the
/// `KeyManager`'s internal `VrfEngine`, never copied out to a caller, so
/// `passkey-session` drives challenge generation through `KeyManager`
/// methods rather than handling raw VRF secret bytes itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VrfSecretHandle {
    pub account_id: String,
}
