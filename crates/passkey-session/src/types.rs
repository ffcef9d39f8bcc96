//! Wire and flow types owned by the Session Orchestrator: WebAuthn
//! credential/PRF shapes, chain view results, broadcast wait status, login
//! state, and the QR device-linking payload (spec.md §3, §6).

use serde::{Deserialize, Serialize};


/// The two PRF outputs a platform authenticator returns alongside a
/// WebAuthn credential (spec.md GLOSSARY: "PRF output A/B"). `first` keys
/// AEAD, `second` seeds the Ed25519 signing key.
#[derive(Clone)]
pub struct PrfOutputs {
    pub first: Vec<u8>,
    pub second: Option<Vec<u8>>,
}

impl PrfOutputs {
    pub fn require_both(&self) -> Result<(&[u8], &[u8]), crate::error::CoreError> {
        if self.first.is_empty() {
            return Err(crate::error::CoreError::PrfMissing);
        }
        match &self.second {
            Some(second) if !second.is_empty() => Ok((&self.first, second)),
            Some(_) => Err(crate::error::CoreError::PrfIncomplete),
            None => Err(crate::error::CoreError::PrfIncomplete),
        }
    }
}

/// An opaque WebAuthn credential as returned by `Authenticator::create`/
/// `get`. The attestation/assertion bytes are collaborator-specific; this
/// core only needs the PRF outputs and (for registration) the raw
/// attestation object to extract a COSE key from.
#[derive(Clone)]
pub struct WebAuthnCredential {
    pub credential_id: Vec<u8>,
    pub prf: PrfOutputs,
    /// Present on `create()` results; used to extract the COSE public key.
    pub attestation_object_b64u: Option<String>,
    pub transports: Vec<passkey_keymanager::AuthenticatorTransport>,
}

/// Options passed to `Authenticator::create`.
#[derive(Clone)]
pub struct CreateCredentialOptions {
    pub rp_id: String,
    pub user_id: String,
    pub challenge: Vec<u8>,
    pub prf_salt_a: Vec<u8>,
    pub prf_salt_b: Vec<u8>,
}

/// Options passed to `Authenticator::get`.
#[derive(Clone)]
pub struct GetCredentialOptions {
    pub rp_id: String,
    pub challenge: Vec<u8>,
    pub allow_credential_ids: Vec<Vec<u8>>,
    pub prf_salt_a: Vec<u8>,
    pub prf_salt_b: Vec<u8>,
}

/// `viewBlock({finality})` result: the minimal chain-state fields the VRF
/// Engine and nonce sequencing need (spec.md §4.2, §4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockView {
    pub height: u64,
    pub hash_b58: String,
}

/// `viewAccessKey` result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
}

/// Caller-selected broadcast wait status (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStatus {
    ExecutedOptimistic,
    IncludedFinal,
    Final,
}

/// `sendTransaction` result.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    pub tx_hash: String,
    pub success: bool,
    pub logs: Vec<String>,
}

/// One signed-and-broadcast transaction as returned by
/// `signAndSendTransactions` (spec.md §6 Exit contracts).
#[derive(Debug, Clone)]
pub struct SignAndSendResult {
    pub tx_hash: String,
    pub outcome: TxOutcome,
}

/// `login(...) -> LoginState` (spec.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    LoggedOut,
    LoggedIn { account_id: String, device_number: u32 },
}

/// QR device-linking payload (spec.md §6 wire formats):
/// `{ device2PublicKey: "ed25519:<base58>", accountId?: string, timestamp: i64_ms }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrLinkPayload {
    #[serde(rename = "device2PublicKey")]
    pub device2_public_key: String,
    #[serde(rename = "accountId", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub timestamp: i64,
}

/// `linkDeviceFromQr(...) -> {linkedToAccount, device2PublicKey,
/// cleanupSignedTx}` (spec.md §6 Exit contracts).
pub struct DeviceLinkResult {
    pub linked_to_account: String,
    pub device2_public_key: String,
    /// The pre-signed `DeleteKey` cleanup transaction, retained unbroadcast
    /// and handed to the dead-man's-switch poller (spec.md §4.6 step 3).
    pub cleanup_signed_tx: passkey_signer::SignedTransaction,
}

/// A discoverable credential offered during account-recovery's discover
/// phase (spec.md §4.6: "a safe selection view (credentialId,
/// displayName)"). No PRF is touched to build this list.
#[derive(Debug, Clone)]
pub struct RecoveryCandidate {
    pub credential_id: String,
    pub display_name: String,
}

/// One transaction a caller wants signed, before the orchestrator has
/// assigned it a nonce or block hash (spec.md §4.6: "SO ... increments
/// nonce monotonically per request in a batch"). `passkey_signer::
/// TxSigningRequest` is the post-assignment form the Signer Core actually
/// validates and signs.
#[derive(Debug, Clone)]
pub struct PendingTxRequest {
    pub receiver_id: String,
    pub actions: Vec<passkey_signer::ActionParams>,
}
