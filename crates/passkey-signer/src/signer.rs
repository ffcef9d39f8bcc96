//! The Signer Core's state machine and its two operations: signing a batch
//! of NEAR transactions behind one confirm handshake, and signing a NEP-413
//! off-chain message. Grounded on `wasm_signer_worker/src/handlers/
//! handle_sign_transactions_with_actions.rs` (batch signing + confirm flow)
//! and `handlers/handle_sign_nep413_message.rs` (message signing); the
//! `Idle -> AwaitingConfirm -> (Confirmed|Rejected|TimedOut) -> (Signed|Failed)
//! -> Idle` machine is spec.md §4.5's own addition, not present verbatim in
//! the teacher (the teacher interleaves confirm state into a single
//! handler function rather than a named enum) — modeled here the way the
//! teacher models other small state machines, e.g. `KeyManager`'s unlock
//! lifecycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use uuid::Uuid;

use crate::actions::ActionParams;
use crate::config::{DEFAULT_CONFIRM_TIMEOUT, NEP413_PREFIX};
use crate::confirm::{
    validate_and_normalize_confirmation_config, CancelToken, ConfirmationConfig, PendingRequest,
    PromptUserConfirm, UiCollaborator,
};
use crate::error::{SignerError, SignerResult};
use crate::intent::{compute_intent_digest, validate_nonce_sequence, TxSigningRequest};
use crate::near::{CryptoHash, PublicKey, SignedTransaction, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerState {
    Idle,
    AwaitingConfirm,
    Confirmed,
    Rejected,
    TimedOut,
    Signed,
    Failed,
}

/// A NEP-413 message-signing result, mirroring the teacher's
/// `SignNep413Result` (spec.md §4.5).
#[derive(Debug, Clone)]
pub struct Nep413Signature {
    pub account_id: String,
    pub public_key: String,
    pub signature_b64: String,
    pub state: Option<String>,
}

/// Runs the confirm-handshake-then-sign ceremony described in spec.md §4.5.
/// Holds no long-lived secrets itself — the signing key is supplied
/// per-call by the caller (typically `passkey_session`, after a Key
/// Manager unlock).
pub struct SignerCore {
    busy: AtomicBool,
    confirm_timeout: Duration,
    seen_nep413_nonces: Mutex<HashSet<[u8; 32]>>,
}

impl Default for SignerCore {
    fn default() -> Self {
        Self::new()
    }
}

impl SignerCore {
    pub fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            seen_nep413_nonces: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Validates and signs a batch of transactions behind a single confirm
    /// handshake. All transactions share one intent digest and either all
    /// succeed or all fail — there is no partial signing of a batch
    /// (spec.md §4.5, §8).
    #[allow(clippy::too_many_arguments)]
    pub async fn sign_transactions(
        &self,
        requests: Vec<TxSigningRequest>,
        signer_id: &str,
        signing_key: &SigningKey,
        confirmation_config: ConfirmationConfig,
        ui: &dyn UiCollaborator,
        cancel: &CancelToken,
    ) -> SignerResult<Vec<SignedTransaction>> {
        if requests.is_empty() {
            return Err(SignerError::InputValidation("no transactions provided for signing".into()));
        }

        // All validation happens before the busy flag is claimed or any
        // network/UI call is made, so a malformed batch never occupies the
        // single confirm slot.
        validate_nonce_sequence(&requests)?;
        let mut parsed_actions: Vec<Vec<ActionParams>> = Vec::with_capacity(requests.len());
        for req in &requests {
            for action in &req.actions {
                action.to_action()?;
            }
            parsed_actions.push(req.actions.clone());
        }

        if self.busy.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(SignerError::BusyState);
        }
        let result = self
            .sign_transactions_inner(requests, signer_id, signing_key, confirmation_config, ui, cancel)
            .await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }

    async fn sign_transactions_inner(
        &self,
        requests: Vec<TxSigningRequest>,
        signer_id: &str,
        signing_key: &SigningKey,
        confirmation_config: ConfirmationConfig,
        ui: &dyn UiCollaborator,
        cancel: &CancelToken,
    ) -> SignerResult<Vec<SignedTransaction>> {
        let confirmation_config = validate_and_normalize_confirmation_config(confirmation_config);
        let intent_digest = compute_intent_digest(&requests)?;
        let request_id = Uuid::new_v4().to_string();

        let prompt = PromptUserConfirm {
            request_id: request_id.clone(),
            requests: requests
                .iter()
                .map(|r| PendingRequest { receiver_id: r.receiver_id.clone(), actions: r.actions.clone() })
                .collect(),
            intent_digest: intent_digest.clone(),
            confirmation_config,
        };

        // State: Idle -> AwaitingConfirm
        ui.prompt(&prompt).await?;

        if cancel.is_cancelled() {
            return Err(SignerError::Cancelled);
        }

        let decision = ui.await_decision(&request_id, self.confirm_timeout, cancel).await;
        let decision = match decision {
            Ok(d) => d,
            Err(SignerError::TimedOut) => return Err(SignerError::TimedOut),
            Err(e) => return Err(e),
        };

        if cancel.is_cancelled() {
            return Err(SignerError::Cancelled);
        }

        // State: AwaitingConfirm -> (Confirmed | Rejected)
        if !decision.confirmed || decision.ui_intent_digest != intent_digest {
            return Err(SignerError::IntentMismatch);
        }

        // State: Confirmed -> Signed (or Failed, on any signing error below)
        let public_key = PublicKey::from_ed25519_bytes(signing_key.verifying_key().as_bytes());
        let mut signed = Vec::with_capacity(requests.len());
        for req in requests {
            let receiver_id = req.receiver_id.parse()?;
            let block_hash_bytes = bs58::decode(&req.block_hash)
                .into_vec()
                .map_err(|e| SignerError::InputValidation(format!("invalid block hash: {e}")))?;
            let block_hash_arr: [u8; 32] = block_hash_bytes
                .try_into()
                .map_err(|_| SignerError::InputValidation("block hash must be 32 bytes".into()))?;

            let actions = req
                .actions
                .iter()
                .map(|a| a.to_action())
                .collect::<SignerResult<Vec<_>>>()?;

            let tx = Transaction {
                signer_id: signer_id.parse()?,
                public_key: public_key.clone(),
                nonce: req.nonce,
                receiver_id,
                block_hash: CryptoHash::from_bytes(block_hash_arr),
                actions,
            };
            signed.push(tx.sign(signing_key)?);
        }

        Ok(signed)
    }

    /// Signs a NEP-413 off-chain message. Independent of the confirm
    /// handshake — spec.md §4.5 scopes `PROMPT_USER_CONFIRM` to transaction
    /// batches; NEP-413 signing is authorized upstream by the caller having
    /// already unlocked the signing key.
    pub fn sign_nep413(
        &self,
        account_id: &str,
        signing_key: &SigningKey,
        message: &str,
        recipient: &str,
        nonce: &[u8; 32],
        state: Option<String>,
    ) -> SignerResult<Nep413Signature> {
        {
            let mut seen = self.seen_nep413_nonces.lock().expect("nonce set lock poisoned");
            if !seen.insert(*nonce) {
                return Err(SignerError::NonceConflict);
            }
        }

        #[derive(borsh::BorshSerialize)]
        struct Nep413Payload {
            message: String,
            recipient: String,
            nonce: [u8; 32],
            state: Option<String>,
        }

        let payload = Nep413Payload {
            message: message.to_string(),
            recipient: recipient.to_string(),
            nonce: *nonce,
            state: state.clone(),
        };
        let serialized = borsh::to_vec(&payload)
            .map_err(|e| SignerError::InputValidation(format!("borsh encode failed: {e}")))?;

        let mut prefixed = NEP413_PREFIX.to_le_bytes().to_vec();
        prefixed.extend_from_slice(&serialized);

        let hash = passkey_crypto::hash::sha256(&prefixed);
        let signature_bytes = passkey_crypto::ed25519::sign(signing_key, &hash);
        let public_key = PublicKey::from_ed25519_bytes(signing_key.verifying_key().as_bytes());

        Ok(Nep413Signature {
            account_id: account_id.to_string(),
            public_key: public_key.to_near_string(),
            signature_b64: passkey_crypto::encoders::base64_standard_encode(&signature_bytes),
            state,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmationBehavior, ConfirmationUIMode, UserConfirmResponse};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    struct FakeUi {
        confirmed: bool,
        digest_override: Option<String>,
    }

    #[async_trait]
    impl UiCollaborator for FakeUi {
        async fn prompt(&self, _event: &PromptUserConfirm) -> SignerResult<()> {
            Ok(())
        }

        async fn await_decision(
            &self,
            _request_id: &str,
            _timeout: Duration,
            _cancel: &CancelToken,
        ) -> SignerResult<UserConfirmResponse> {
            Ok(UserConfirmResponse {
                confirmed: self.confirmed,
                ui_intent_digest: self.digest_override.clone().unwrap_or_default(),
                credential: serde_json::json!({}),
            })
        }
    }

    fn test_key() -> SigningKey {
        passkey_crypto::ed25519::from_seed(&[7u8; 32]).unwrap()
    }

    fn test_request(nonce: u64) -> TxSigningRequest {
        TxSigningRequest {
            receiver_id: "bob.testnet".into(),
            actions: vec![ActionParams::Transfer { deposit: "1".into() }],
            nonce,
            block_hash: bs58::encode([1u8; 32]).into_string(),
        }
    }

    struct AgreeingUi;

    #[async_trait]
    impl UiCollaborator for AgreeingUi {
        async fn prompt(&self, _event: &PromptUserConfirm) -> SignerResult<()> {
            Ok(())
        }
        async fn await_decision(
            &self,
            _request_id: &str,
            _timeout: Duration,
            _cancel: &CancelToken,
        ) -> SignerResult<UserConfirmResponse> {
            unreachable!("overridden per-test")
        }
    }

    #[tokio::test]
    async fn signs_batch_when_digests_agree() {
        let core = SignerCore::new();
        let key = test_key();
        let requests = vec![test_request(1)];
        let digest = compute_intent_digest(&requests).unwrap();
        let ui = FakeUi { confirmed: true, digest_override: Some(digest) };
        let cancel = CancelToken::new();
        let config = ConfirmationConfig {
            ui_mode: ConfirmationUIMode::Skip,
            behavior: ConfirmationBehavior::AutoProceed,
            auto_proceed_delay_ms: None,
            theme: None,
        };
        let signed = core
            .sign_transactions(requests, "alice.testnet", &key, config, &ui, &cancel)
            .await
            .unwrap();
        assert_eq!(signed.len(), 1);
    }

    #[tokio::test]
    async fn rejects_on_digest_mismatch() {
        let core = SignerCore::new();
        let key = test_key();
        let requests = vec![test_request(1)];
        let ui = FakeUi { confirmed: true, digest_override: Some("wrong-digest".into()) };
        let cancel = CancelToken::new();
        let result = core
            .sign_transactions(requests, "alice.testnet", &key, ConfirmationConfig::default(), &ui, &cancel)
            .await;
        assert!(matches!(result, Err(SignerError::IntentMismatch)));
    }

    #[tokio::test]
    async fn rejects_on_user_decline() {
        let core = SignerCore::new();
        let key = test_key();
        let requests = vec![test_request(1)];
        let digest = compute_intent_digest(&requests).unwrap();
        let ui = FakeUi { confirmed: false, digest_override: Some(digest) };
        let cancel = CancelToken::new();
        let result = core
            .sign_transactions(requests, "alice.testnet", &key, ConfirmationConfig::default(), &ui, &cancel)
            .await;
        assert!(matches!(result, Err(SignerError::IntentMismatch)));
    }

    #[tokio::test]
    async fn rejects_batch_with_non_increasing_nonces() {
        let core = SignerCore::new();
        let key = test_key();
        let requests = vec![test_request(5), test_request(5)];
        let cancel = CancelToken::new();
        let result = core
            .sign_transactions(requests, "alice.testnet", &key, ConfirmationConfig::default(), &AgreeingUi, &cancel)
            .await;
        assert!(matches!(result, Err(SignerError::InputValidation(_))));
    }

    #[test]
    fn nep413_rejects_reused_nonce() {
        let core = SignerCore::new();
        let key = test_key();
        let nonce = [9u8; 32];
        assert!(core.sign_nep413("alice.testnet", &key, "hello", "bob.testnet", &nonce, None).is_ok());
        assert!(matches!(
            core.sign_nep413("alice.testnet", &key, "hello", "bob.testnet", &nonce, None),
            Err(SignerError::NonceConflict)
        ));
    }

    #[test]
    fn nep413_signature_verifies() {
        let core = SignerCore::new();
        let key = test_key();
        let result = core
            .sign_nep413("alice.testnet", &key, "hello", "bob.testnet", &[1u8; 32], Some("s".into()))
            .unwrap();
        assert_eq!(result.account_id, "alice.testnet");
        assert!(result.public_key.starts_with("ed25519:"));
    }

    #[test]
    fn busy_flag_defaults_false() {
        let core = SignerCore::new();
        assert!(!core.is_busy());
    }
}
