//! VRF Engine (VE) — spec.md §4.2.
//!
//! Grounded on `wasm_vrf_worker/src/manager.rs`'s `VRFKeyManager`: the same
//! bootstrap/unlock/derive/challenge-generation lifecycle, restated as a
//! plain struct with no `wasm_bindgen` boundary and no implicit worker-global
//! mutable state (callers own a `VrfEngine` value directly).

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Nonce};
use getrandom::getrandom;
use hkdf::Hkdf;
use sha2::{Digest, Sha256};
use vrf_wasm::ecvrf::ECVRFKeyPair;
use vrf_wasm::traits::WasmRngFromSeed;
use vrf_wasm::vrf::{VRFKeyPair, VRFProof};
use zeroize::ZeroizeOnDrop;

use passkey_crypto::encoders::{base64_url_decode, base64_url_encode};
use passkey_shamir::Shamir3Pass;

use crate::config::*;
use crate::error::{VrfError, VrfResult};
use crate::types::{
    DeterministicVrfKeypairResponse, EncryptedVrfKeypair, EncryptedVrfKeypairResponse,
    GenerateVrfKeypairBootstrapResponse, ServerEncryptedVrfKeypair, VrfChallengeData, VrfInputData,
    VrfKeypairData,
};

/// Zeroizing wrapper around an in-memory unlocked VRF keypair.
#[derive(ZeroizeOnDrop)]
pub struct SecureVrfKeyPair {
    keypair: ECVRFKeyPair,
}

impl SecureVrfKeyPair {
    fn new(keypair: ECVRFKeyPair) -> Self {
        Self { keypair }
    }

    pub fn inner(&self) -> &ECVRFKeyPair {
        &self.keypair
    }

    pub fn secret_key_bytes(&self) -> Vec<u8> {
        self.keypair.secret_key_bytes().to_vec()
    }
}

/// Holds at most one unlocked VRF keypair at a time (spec.md §4.2's
/// single-unlocked-session invariant) plus the Shamir engine used to
/// optionally gate recovery behind a relay-held exponent.
pub struct VrfEngine {
    vrf_keypair: Option<SecureVrfKeyPair>,
    session_active: bool,
    shamir: Shamir3Pass,
}

impl VrfEngine {
    /// Build an engine using the crate's default Shamir prime.
    pub fn new() -> VrfResult<Self> {
        Ok(Self {
            vrf_keypair: None,
            session_active: false,
            shamir: Shamir3Pass::with_default_prime()?,
        })
    }

    /// Build an engine against a caller-supplied Shamir engine (a relay
    /// deployment with its own prime configuration).
    pub fn with_shamir(shamir: Shamir3Pass) -> Self {
        Self {
            vrf_keypair: None,
            session_active: false,
            shamir,
        }
    }

    pub fn shamir(&self) -> &Shamir3Pass {
        &self.shamir
    }

    pub fn is_unlocked(&self) -> bool {
        self.session_active && self.vrf_keypair.is_some()
    }

    /// Generate a fresh, non-deterministic VRF keypair and hold it
    /// unencrypted in memory (callers must follow up with
    /// `encrypt_vrf_keypair_with_prf` once the real PRF output is
    /// available, the same two-phase bootstrap the teacher's worker uses).
    pub fn generate_vrf_keypair_bootstrap(
        &mut self,
        vrf_input_data: Option<VrfInputData>,
    ) -> VrfResult<GenerateVrfKeypairBootstrapResponse> {
        self.vrf_keypair.take();

        let vrf_keypair = generate_vrf_keypair()?;
        let vrf_public_key_b64 = encode_public_key(&vrf_keypair)?;

        self.vrf_keypair = Some(SecureVrfKeyPair::new(vrf_keypair));
        self.session_active = true;

        let mut result = GenerateVrfKeypairBootstrapResponse {
            vrf_public_key: vrf_public_key_b64,
            vrf_challenge_data: None,
        };

        if let Some(input_data) = vrf_input_data {
            let keypair = self.vrf_keypair.as_ref().unwrap().inner();
            result.vrf_challenge_data = Some(generate_vrf_challenge_with_keypair(keypair, input_data)?);
        }

        Ok(result)
    }

    /// Encrypt the in-memory bootstrapped keypair under a real PRF output,
    /// verifying the caller's expected public key matches first. `account_id`
    /// is folded into the AEAD's associated data (spec.md §3: AAD =
    /// `AccountId ∥ "vrf"`), binding the ciphertext to one account.
    pub fn encrypt_vrf_keypair_with_prf(
        &mut self,
        expected_public_key: &str,
        prf_key: &[u8],
        account_id: &str,
    ) -> VrfResult<EncryptedVrfKeypairResponse> {
        if !self.session_active || self.vrf_keypair.is_none() {
            return Err(VrfError::NoVrfKeypair);
        }
        let vrf_keypair = self.vrf_keypair.as_ref().unwrap().inner();
        let stored_public_key = encode_public_key(vrf_keypair)?;

        if stored_public_key != expected_public_key {
            return Err(VrfError::PublicKeyMismatch {
                expected: expected_public_key.to_string(),
                actual: stored_public_key,
            });
        }

        let (vrf_public_key, encrypted_vrf_keypair) =
            encrypt_vrf_keypair_data(vrf_keypair, prf_key, account_id, &vrf_aad(account_id))?;
        Ok(EncryptedVrfKeypairResponse {
            vrf_public_key,
            encrypted_vrf_keypair,
        })
    }

    /// Unlock a previously encrypted VRF keypair with its PRF-derived key,
    /// replacing any keypair currently held in memory.
    pub fn unlock_vrf_keypair(
        &mut self,
        encrypted_vrf_keypair: &EncryptedVrfKeypair,
        prf_key: &[u8],
        account_id: &str,
    ) -> VrfResult<()> {
        self.vrf_keypair.take();
        let keypair = decrypt_vrf_keypair(encrypted_vrf_keypair, prf_key, account_id, &vrf_aad(account_id))?;
        self.vrf_keypair = Some(SecureVrfKeyPair::new(keypair));
        self.session_active = true;
        Ok(())
    }

    /// Load an already-plaintext keypair (the tail end of a Shamir unlock,
    /// where the server-gated KEK has already decrypted the stored bytes).
    pub fn load_plaintext_vrf_keypair(&mut self, keypair_data: &VrfKeypairData) -> VrfResult<()> {
        self.vrf_keypair.take();
        let keypair: ECVRFKeyPair = bincode::deserialize(&keypair_data.keypair_bytes)
            .map_err(|e| VrfError::Serialization(e.to_string()))?;
        self.vrf_keypair = Some(SecureVrfKeyPair::new(keypair));
        self.session_active = true;
        Ok(())
    }

    pub fn generate_vrf_challenge(&self, input_data: VrfInputData) -> VrfResult<VrfChallengeData> {
        if !self.session_active || self.vrf_keypair.is_none() {
            return Err(VrfError::VrfNotUnlocked);
        }
        generate_vrf_challenge_with_keypair(self.vrf_keypair.as_ref().unwrap().inner(), input_data)
    }

    pub fn logout(&mut self) {
        self.vrf_keypair.take();
        self.session_active = false;
    }

    /// Deterministically derive a VRF keypair from PRF output, the
    /// recovery-path entry point (spec.md §4.6's deterministic recovery
    /// scenario): the same `(prf_output, account_id)` pair always yields the
    /// same keypair, with no state persisted between calls.
    pub fn derive_vrf_keypair_from_prf(
        &self,
        prf_output: &[u8],
        account_id: &str,
        vrf_input_params: Option<VrfInputData>,
    ) -> VrfResult<(DeterministicVrfKeypairResponse, ECVRFKeyPair)> {
        if prf_output.is_empty() {
            return Err(VrfError::EmptyPrfOutput);
        }

        let vrf_keypair = generate_vrf_keypair_from_seed(prf_output, account_id)?;
        let vrf_public_key_b64 = encode_public_key(&vrf_keypair)?;
        let (_pk, encrypted_vrf_keypair) =
            encrypt_vrf_keypair_data(&vrf_keypair, prf_output, account_id, &vrf_aad(account_id))?;

        let vrf_challenge_data = vrf_input_params
            .map(|params| generate_vrf_challenge_with_keypair(&vrf_keypair, params))
            .transpose()?;

        let response = DeterministicVrfKeypairResponse {
            vrf_public_key: vrf_public_key_b64,
            vrf_challenge_data,
            encrypted_vrf_keypair: Some(encrypted_vrf_keypair),
            server_encrypted_vrf_keypair: None,
        };

        Ok((response, vrf_keypair))
    }

    /// Lock a VRF keypair's seed bytes behind the Shamir three-pass
    /// protocol: the caller supplies its own exponent pair, this produces a
    /// client-locked scalar a relay can further lock with its own exponent
    /// (`Shamir3Pass::server_lock`) without ever seeing the plaintext seed.
    pub fn client_lock_vrf_keypair(
        &self,
        encrypted_vrf_keypair: &EncryptedVrfKeypair,
        client_exponents: &passkey_shamir::ExponentPair,
    ) -> VrfResult<ServerEncryptedVrfKeypair> {
        let kek_seed = passkey_crypto::hash::sha256(encrypted_vrf_keypair.chacha20_nonce_b64u.as_bytes());
        let kek_value = passkey_shamir::kek_to_biguint(&kek_seed);
        let client_locked = self.shamir.client_lock(&kek_value, client_exponents)?;

        Ok(ServerEncryptedVrfKeypair {
            encrypted_vrf_keypair: encrypted_vrf_keypair.clone(),
            server_locked_kek_b64u: passkey_crypto::encoders::base64_url_encode(&client_locked.to_bytes_be()),
        })
    }
}

impl Default for VrfEngine {
    fn default() -> Self {
        Self::new().expect("default Shamir prime must be valid")
    }
}

fn generate_vrf_keypair() -> VrfResult<ECVRFKeyPair> {
    let mut rng = WasmRngFromSeed::from_entropy();
    Ok(ECVRFKeyPair::generate(&mut rng))
}

fn generate_vrf_keypair_from_seed(seed: &[u8], account_id: &str) -> VrfResult<ECVRFKeyPair> {
    let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), seed);
    let mut vrf_seed = [0u8; VRF_SEED_SIZE];
    hk.expand(HKDF_VRF_KEYPAIR_INFO, &mut vrf_seed)
        .map_err(|_| VrfError::Serialization("HKDF VRF seed derivation failed".into()))?;

    let mut rng = WasmRngFromSeed::from_seed(vrf_seed);
    Ok(ECVRFKeyPair::generate(&mut rng))
}

fn encode_public_key(keypair: &ECVRFKeyPair) -> VrfResult<String> {
    let bytes = bincode::serialize(&keypair.pk).map_err(|e| VrfError::Serialization(e.to_string()))?;
    Ok(base64_url_encode(&bytes))
}

fn generate_vrf_challenge_with_keypair(
    vrf_keypair: &ECVRFKeyPair,
    input_data: VrfInputData,
) -> VrfResult<VrfChallengeData> {
    let block_height_num: u64 = input_data
        .block_height
        .parse()
        .map_err(|_| VrfError::InvalidBlockHeight(input_data.block_height.clone()))?;

    let block_hash_bytes = bs58::decode(&input_data.block_hash)
        .into_vec()
        .map_err(|e| VrfError::InvalidBlockHash(e.to_string()))?;

    let mut message = Vec::new();
    message.extend_from_slice(VRF_DOMAIN_SEPARATOR);
    message.extend_from_slice(input_data.user_id.as_bytes());
    message.extend_from_slice(input_data.rp_id.as_bytes());
    message.extend_from_slice(&block_height_num.to_be_bytes());
    message.extend_from_slice(&block_hash_bytes);

    if let Some(digest) = &input_data.intent_digest {
        message.extend_from_slice(&require_32_bytes(digest)?);
    }
    if let Some(digest) = &input_data.session_policy_digest_32 {
        message.extend_from_slice(&require_32_bytes(digest)?);
    }

    let vrf_input = Sha256::digest(&message).to_vec();

    let proof = vrf_keypair.prove(&vrf_input);
    let vrf_output = proof.to_hash().to_vec();

    let proof_bytes = bincode::serialize(&proof).map_err(|e| VrfError::Serialization(e.to_string()))?;
    let pk_bytes = bincode::serialize(&vrf_keypair.pk).map_err(|e| VrfError::Serialization(e.to_string()))?;

    Ok(VrfChallengeData {
        vrf_input: base64_url_encode(&vrf_input),
        vrf_output: base64_url_encode(&vrf_output),
        vrf_proof: base64_url_encode(&proof_bytes),
        vrf_public_key: base64_url_encode(&pk_bytes),
        user_id: input_data.user_id,
        rp_id: input_data.rp_id,
        block_height: input_data.block_height,
        block_hash: base64_url_encode(&block_hash_bytes),
        intent_digest: input_data.intent_digest,
        session_policy_digest_32: input_data.session_policy_digest_32,
    })
}

fn require_32_bytes(b64u: &str) -> VrfResult<[u8; 32]> {
    let bytes = base64_url_decode(b64u).map_err(|_| VrfError::InvalidDigestLength(b64u.to_string()))?;
    <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| VrfError::InvalidDigestLength(b64u.to_string()))
}

/// `AccountId ∥ "vrf"`, the AEAD associated data spec.md §3 requires for
/// every `EncryptedVrfKeypair` ciphertext.
fn vrf_aad(account_id: &str) -> Vec<u8> {
    let mut aad = account_id.as_bytes().to_vec();
    aad.extend_from_slice(b"vrf");
    aad
}

fn decrypt_vrf_keypair(
    encrypted: &EncryptedVrfKeypair,
    prf_key: &[u8],
    account_id: &str,
    aad: &[u8],
) -> VrfResult<ECVRFKeyPair> {
    let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), prf_key);
    let mut chacha20_key = [0u8; CHACHA20_KEY_SIZE];
    hk.expand(HKDF_CHACHA20_KEY_INFO, &mut chacha20_key)
        .map_err(|_| VrfError::Serialization("HKDF key derivation failed".into()))?;

    let encrypted_data = base64_url_decode(&encrypted.encrypted_vrf_data_b64u)
        .map_err(|_| VrfError::Serialization("invalid encryptedVrfDataB64u".into()))?;
    let nonce_bytes = base64_url_decode(&encrypted.chacha20_nonce_b64u)
        .map_err(|_| VrfError::Serialization("invalid chacha20NonceB64u".into()))?;

    if nonce_bytes.len() != CHACHA20_NONCE_SIZE {
        return Err(VrfError::Serialization(format!(
            "expected {}-byte nonce, got {}",
            CHACHA20_NONCE_SIZE,
            nonce_bytes.len()
        )));
    }

    let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(&chacha20_key));
    let nonce = Nonce::from_slice(&nonce_bytes);
    let decrypted = cipher
        .decrypt(nonce, Payload { msg: &encrypted_data, aad })
        .map_err(|_| VrfError::Serialization("VRF keypair AEAD decryption failed".into()))?;

    let keypair_data: VrfKeypairData =
        bincode::deserialize(&decrypted).map_err(|e| VrfError::Serialization(e.to_string()))?;
    bincode::deserialize(&keypair_data.keypair_bytes).map_err(|e| VrfError::Serialization(e.to_string()))
}

fn encrypt_vrf_keypair_data(
    vrf_keypair: &ECVRFKeyPair,
    prf_key: &[u8],
    account_id: &str,
    aad: &[u8],
) -> VrfResult<(String, EncryptedVrfKeypair)> {
    let vrf_keypair_bytes = bincode::serialize(vrf_keypair).map_err(|e| VrfError::Serialization(e.to_string()))?;
    let vrf_public_key_bytes = bincode::serialize(&vrf_keypair.pk).map_err(|e| VrfError::Serialization(e.to_string()))?;

    let keypair_data = VrfKeypairData {
        keypair_bytes: vrf_keypair_bytes,
        public_key_base64: base64_url_encode(&vrf_public_key_bytes),
    };
    let keypair_data_bytes =
        bincode::serialize(&keypair_data).map_err(|e| VrfError::Serialization(e.to_string()))?;

    let encrypted = encrypt_vrf_keypair(&keypair_data_bytes, prf_key, account_id, aad)?;
    Ok((base64_url_encode(&vrf_public_key_bytes), encrypted))
}

fn encrypt_vrf_keypair(data: &[u8], key: &[u8], account_id: &str, aad: &[u8]) -> VrfResult<EncryptedVrfKeypair> {
    let hk = Hkdf::<Sha256>::new(Some(account_id.as_bytes()), key);
    let mut chacha20_key = [0u8; CHACHA20_KEY_SIZE];
    hk.expand(HKDF_CHACHA20_KEY_INFO, &mut chacha20_key)
        .map_err(|_| VrfError::Serialization("HKDF key derivation failed".into()))?;

    let cipher = ChaCha20Poly1305::new(chacha20poly1305::Key::from_slice(&chacha20_key));

    let mut nonce_bytes = [0u8; CHACHA20_NONCE_SIZE];
    getrandom(&mut nonce_bytes).map_err(|e| VrfError::Serialization(e.to_string()))?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: data, aad })
        .map_err(|e| VrfError::Serialization(e.to_string()))?;

    Ok(EncryptedVrfKeypair {
        encrypted_vrf_data_b64u: base64_url_encode(&ciphertext),
        chacha20_nonce_b64u: base64_url_encode(&nonce_bytes),
    })
}
