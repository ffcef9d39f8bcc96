//! Signer Core (SC) — spec.md §4.5.
//!
//! Validates transaction intents, computes the canonical intent digest,
//! runs the user-confirmation handshake, and produces Borsh-encoded signed
//! NEAR transactions and NEP-413 signatures. Holds no secrets of its own:
//! callers (typically `passkey-session`, after a Key Manager unlock) supply
//! the Ed25519 signing key for each ceremony. Single-threaded cooperative
//! scheduling — one confirm handshake outstanding at a time.

pub mod actions;
pub mod confirm;
pub mod config;
pub mod error;
pub mod intent;
pub mod near;
pub mod signer;

pub use actions::ActionParams;
pub use confirm::{
    validate_and_normalize_confirmation_config, CancelToken, ConfirmationBehavior,
    ConfirmationConfig, ConfirmationUIMode, PendingRequest, PromptUserConfirm, UiCollaborator,
    UserConfirmResponse,
};
pub use error::{scrub_error_message, SignerError, SignerResult};
pub use intent::{compute_intent_digest, validate_nonce_sequence, TxSigningRequest};
pub use near::{
    AccessKey, AccessKeyPermission, AccountId, Balance, CryptoHash, DelegateAction,
    FunctionCallAction, FunctionCallPermission, Gas, NearAction, Nonce, PublicKey, Signature,
    SignedDelegate, SignedTransaction, Transaction,
};
pub use signer::{Nep413Signature, SignerCore, SignerState};
