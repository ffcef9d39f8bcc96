#[derive(Debug, thiserror::Error)]
pub enum VrfError {
    #[error("no VRF keypair in memory - generate or unlock one first")]
    NoVrfKeypair,

    #[error("VRF keypair not unlocked - unlock or bootstrap before requesting a challenge")]
    VrfNotUnlocked,

    #[error("PRF output cannot be empty")]
    EmptyPrfOutput,

    #[error("expected VRF public key {expected} but unlocked keypair has {actual}")]
    PublicKeyMismatch { expected: String, actual: String },

    #[error("invalid block height: {0}")]
    InvalidBlockHeight(String),

    #[error("invalid block hash: {0}")]
    InvalidBlockHash(String),

    #[error("optional digest must decode to exactly 32 bytes: {0}")]
    InvalidDigestLength(String),

    #[error("VRF keypair (de)serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Crypto(#[from] passkey_crypto::CryptoError),

    #[error(transparent)]
    Shamir(#[from] passkey_shamir::ShamirError),
}

pub type VrfResult<T> = Result<T, VrfError>;
