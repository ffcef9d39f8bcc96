//! Session Orchestrator (SO) — spec.md §4.6.
//!
//! Composes the Key Manager, VRF Engine, Shamir Engine, and Signer Core
//! against five pluggable collaborators (`ChainClient`, `RelayClient`,
//! `Authenticator`, `Storage`, `UiCollaborator`) into the five end-to-end
//! flows a host application actually drives: registration, login,
//! transaction execution, account recovery, and device linking. No teacher
//! file owns this composition directly — it replaces the message-dispatch
//! boundary in `wasm_signer_worker/src/lib.rs::handle_signer_message_inner`,
//! restated as ordinary async methods on one `SessionOrchestrator` struct
//! that a host can drive from native Rust, a native mobile shell, or a WASM
//! bundle without this crate knowing which.

pub mod collaborators;
pub mod config;
pub mod device_link;
pub mod error;
pub mod login;
pub mod orchestrator;
pub mod pool;
pub mod recovery;
pub mod registration;
pub mod transaction;
pub mod transport;
pub mod types;

pub use collaborators::{
    Authenticator, CancelToken, ChainClient, Ed25519KeyRecord, NoOpProgressSink, ProgressSink,
    RelayClient, Storage, UiCollaborator, VrfKeyRecord,
};
pub use config::SessionConfig;
pub use device_link::DeviceLinkCleanupOutcome;
pub use error::{ChainErrorKind, CoreError, CoreResult};
pub use orchestrator::SessionOrchestrator;
pub use pool::{SignerHandle, WorkerPool};
pub use transport::{HttpRelayClient, JsonRpcChainClient};
pub use types::{
    AccessKeyView, BlockView, CreateCredentialOptions, DeviceLinkResult, GetCredentialOptions,
    LoginState, PendingTxRequest, PrfOutputs, QrLinkPayload, RecoveryCandidate,
    SignAndSendResult, TxOutcome, WaitStatus, WebAuthnCredential,
};
