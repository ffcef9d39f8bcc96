//! Wire types for VRF challenge generation and at-rest keypair storage.
//! Grounded on `wasm_vrf_worker/src/types/mod.rs`, stripped of its
//! `wasm_bindgen`/`serde_wasm_bindgen` plumbing (there is no JS boundary to
//! cross here) but keeping the same field names and `camelCase` JSON shape,
//! since downstream relays and explorers already expect it.

use serde::{Deserialize, Serialize};

/// Parameters the caller supplies to derive a fresh VRF challenge.
/// `intent_digest`/`session_policy_digest_32`, when present, must each
/// decode to exactly 32 bytes; they bind a tx-intent digest and/or a
/// relayer session policy digest into the VRF input hash so a given
/// challenge cannot be replayed against a different intent or policy.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VrfInputData {
    pub user_id: String,
    pub rp_id: String,
    pub block_height: String,
    pub block_hash: String,
    pub intent_digest: Option<String>,
    pub session_policy_digest_32: Option<String>,
}

/// The proof, output, and echoed inputs for one VRF challenge. This is the
/// value an `Authenticator` collaborator uses as the WebAuthn challenge
/// bytes, and what a relay/contract later verifies against.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VrfChallengeData {
    pub vrf_input: String,
    pub vrf_output: String,
    pub vrf_proof: String,
    pub vrf_public_key: String,
    pub user_id: String,
    pub rp_id: String,
    pub block_height: String,
    pub block_hash: String,
    pub intent_digest: Option<String>,
    pub session_policy_digest_32: Option<String>,
}

/// A bincode-serialized `ECVRFKeyPair` plus its public key, the payload
/// that gets AEAD-encrypted for storage.
#[derive(Serialize, Deserialize, Clone)]
pub struct VrfKeypairData {
    pub keypair_bytes: Vec<u8>,
    pub public_key_base64: String,
}

/// A VRF keypair encrypted under a PRF-derived (or Shamir-recovered) AEAD
/// key, in the on-disk/on-wire representation callers persist.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedVrfKeypair {
    pub encrypted_vrf_data_b64u: String,
    pub chacha20_nonce_b64u: String,
}

/// The server-side counterpart: a VRF keypair locked under the *server's*
/// Shamir exponent, held by a relay between the two lock passes of
/// `passkey_shamir::Shamir3Pass`. Opaque to the server (it is still
/// AEAD-ciphertext plus a Shamir-locked scalar, never a plaintext key).
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ServerEncryptedVrfKeypair {
    pub encrypted_vrf_keypair: EncryptedVrfKeypair,
    /// Base64url-encoded big-endian bytes of the server-locked KEK scalar.
    pub server_locked_kek_b64u: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateVrfKeypairBootstrapResponse {
    pub vrf_public_key: String,
    pub vrf_challenge_data: Option<VrfChallengeData>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EncryptedVrfKeypairResponse {
    pub vrf_public_key: String,
    pub encrypted_vrf_keypair: EncryptedVrfKeypair,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct DeterministicVrfKeypairResponse {
    pub vrf_public_key: String,
    pub vrf_challenge_data: Option<VrfChallengeData>,
    pub encrypted_vrf_keypair: Option<EncryptedVrfKeypair>,
    pub server_encrypted_vrf_keypair: Option<ServerEncryptedVrfKeypair>,
}
