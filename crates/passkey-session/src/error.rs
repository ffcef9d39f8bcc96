//! `CoreError`: the top-level error taxonomy from spec.md §7, assembled
//! from the lower crates' error enums plus the flow-level variants that
//! only make sense once a `ChainClient`/`RelayClient`/`Authenticator`
//! collaborator is in the picture (`ChainError`, `RelayLockError` as a
//! retryable wrapper, `AccountMismatch`, `BusyState`). Every public
//! `SessionOrchestrator` method returns `CoreResult<T>`.

/// `ChainError{transient|fatal}` (spec.md §7): the core retries transient
/// RPC failures with jittered backoff up to a caller ceiling; fatal ones
/// propagate immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainErrorKind {
    Transient,
    Fatal,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("input validation failed: {0}")]
    InputValidation(String),

    #[error("required PRF output missing from credential")]
    PrfMissing,

    #[error("credential returned only one PRF output, both are required")]
    PrfIncomplete,

    #[error("decryption failed: {0}")]
    DecryptError(String),

    #[error("intent digest mismatch between UI and signer, or user declined confirmation")]
    IntentMismatch,

    #[error("VRF challenge is outside the freshness window (block height {block_height}, window {window} blocks)")]
    StaleChallenge { block_height: u64, window: u64 },

    #[error("chain reports a higher access-key nonce than the local cache")]
    NonceConflict,

    #[error("Shamir relay was unreachable or returned an error: {0}")]
    RelayLockError(String),

    #[error("chain RPC error ({kind:?}): {message}")]
    ChainError { kind: ChainErrorKind, message: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("operation timed out")]
    TimedOut,

    #[error("a confirmation handshake or linking session is already outstanding")]
    BusyState,

    #[error("derived public key has no access key on the requested account")]
    AccountMismatch,

    #[error("stored record is stale relative to the requested operation")]
    StaleRecord,

    #[error("QR device-linking payload has expired")]
    QrExpired,

    #[error(transparent)]
    Crypto(#[from] passkey_crypto::CryptoError),

    #[error(transparent)]
    Shamir(#[from] passkey_shamir::ShamirError),

    #[error(transparent)]
    Vrf(#[from] passkey_vrf::VrfError),

    #[error(transparent)]
    KeyManager(#[from] passkey_keymanager::KeyManagerError),

    #[error(transparent)]
    Signer(#[from] passkey_signer::SignerError),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl std::fmt::Debug for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", passkey_signer::scrub_error_message(&self.to_string()))
    }
}
