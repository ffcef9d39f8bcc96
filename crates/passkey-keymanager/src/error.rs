#[derive(Debug, thiserror::Error)]
pub enum KeyManagerError {
    #[error("required PRF output missing from credential")]
    PrfMissing,

    #[error("decryption failed: {0}")]
    DecryptError(String),

    #[error("relay returned an error or was unreachable while locking/unlocking the VRF KEK: {0}")]
    RelayLockError(String),

    #[error("stored record is stale relative to the requested operation")]
    StaleRecord,

    #[error("derived public key has no access key on the requested account")]
    AccountMismatch,

    #[error("malformed COSE/attestation data: {0}")]
    MalformedCredential(String),

    #[error(transparent)]
    Crypto(#[from] passkey_crypto::CryptoError),

    #[error(transparent)]
    Vrf(#[from] passkey_vrf::VrfError),

    #[error(transparent)]
    Shamir(#[from] passkey_shamir::ShamirError),
}

pub type KeyManagerResult<T> = Result<T, KeyManagerError>;
