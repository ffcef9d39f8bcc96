//! The confirmation handshake: `ConfirmationConfig` (advisory UI config),
//! `PromptUserConfirm`/`UserConfirmResponse` (the two handshake messages),
//! `CancelToken`, and the `UiCollaborator` trait the Signer Core drives.
//! Grounded on `wasm_signer_worker/src/types/handlers.rs`'s
//! `ConfirmationConfig`/`ConfirmationUIMode`/`ConfirmationBehavior` and on
//! `handlers/confirm_tx_details.rs`'s request/response flow (spec.md §4.5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::actions::ActionParams;
use crate::error::SignerResult;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationUIMode {
    Skip,
    Modal,
    Embedded,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationBehavior {
    #[serde(rename = "requireClick")]
    RequireClick,
    #[serde(rename = "autoProceed")]
    AutoProceed,
}

/// Purely advisory to the UI collaborator (spec.md §3); the Signer Core
/// only ever reads the digest the UI reports back.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationConfig {
    pub ui_mode: ConfirmationUIMode,
    pub behavior: ConfirmationBehavior,
    pub auto_proceed_delay_ms: Option<u32>,
    pub theme: Option<String>,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            ui_mode: ConfirmationUIMode::Modal,
            behavior: ConfirmationBehavior::RequireClick,
            auto_proceed_delay_ms: Some(2000),
            theme: Some("dark".to_string()),
        }
    }
}

/// Normalizes an inbound config: `AutoProceed` without a delay gets the
/// default delay; `Skip` mode never waits on a delay.
pub fn validate_and_normalize_confirmation_config(mut config: ConfirmationConfig) -> ConfirmationConfig {
    if config.behavior == ConfirmationBehavior::AutoProceed && config.auto_proceed_delay_ms.is_none() {
        config.auto_proceed_delay_ms = Some(2000);
    }
    if config.ui_mode == ConfirmationUIMode::Skip {
        config.auto_proceed_delay_ms = None;
    }
    config
}

/// One outstanding transaction in a batch, as surfaced to the UI.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub receiver_id: String,
    pub actions: Vec<ActionParams>,
}

/// `PROMPT_USER_CONFIRM` (spec.md §4.5): `{requests, intentDigest,
/// confirmationConfig}`, emitted by the Signer Core to the UI collaborator.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PromptUserConfirm {
    pub request_id: String,
    pub requests: Vec<PendingRequest>,
    pub intent_digest: String,
    pub confirmation_config: ConfirmationConfig,
}

/// `USER_PASSKEY_CONFIRM_RESPONSE` (spec.md §4.5): the UI independently
/// recomputes the digest and reports it back alongside its decision.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserConfirmResponse {
    pub confirmed: bool,
    pub ui_intent_digest: String,
    /// Opaque WebAuthn assertion carrying the PRF outputs needed to sign.
    pub credential: serde_json::Value,
}

/// Cooperative cancellation shared between the caller and the in-flight
/// confirmation wait. Grounded on the teacher's cancellation signal used by
/// `wasm_vrf_worker`'s long-running device-link polling loops.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The UI-facing side of the confirm handshake (spec.md §6: "Lit web
/// components emitting `w3a:confirm` / `w3a:cancel`"). Defined here, not in
/// `passkey-session`, because the Signer Core itself owns the handshake
/// state machine and is the only component that calls it.
#[async_trait]
pub trait UiCollaborator: Send + Sync {
    /// Emits a `PROMPT_USER_CONFIRM` event for the UI to render.
    async fn prompt(&self, event: &PromptUserConfirm) -> SignerResult<()>;

    /// Blocks until the UI reports a decision, the timeout elapses, or
    /// `cancel` is set. Implementations should poll `cancel` frequently
    /// enough that `SignerCore::sign_transactions` returns promptly after
    /// cancellation.
    async fn await_decision(
        &self,
        request_id: &str,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> SignerResult<UserConfirmResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_auto_proceed_without_delay() {
        let config = ConfirmationConfig {
            ui_mode: ConfirmationUIMode::Modal,
            behavior: ConfirmationBehavior::AutoProceed,
            auto_proceed_delay_ms: None,
            theme: None,
        };
        let normalized = validate_and_normalize_confirmation_config(config);
        assert_eq!(normalized.auto_proceed_delay_ms, Some(2000));
    }

    #[test]
    fn skip_mode_clears_delay() {
        let config = ConfirmationConfig {
            ui_mode: ConfirmationUIMode::Skip,
            behavior: ConfirmationBehavior::RequireClick,
            auto_proceed_delay_ms: Some(5000),
            theme: None,
        };
        let normalized = validate_and_normalize_confirmation_config(config);
        assert_eq!(normalized.auto_proceed_delay_ms, None);
    }

    #[test]
    fn cancel_token_reflects_state() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
