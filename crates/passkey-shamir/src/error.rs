#[derive(Debug, Clone, thiserror::Error)]
pub enum ShamirError {
    #[error("prime is invalid: {0}")]
    InvalidPrime(String),

    #[error("prime is too small: {bits} bits, need at least {min_bits}")]
    PrimeTooSmall { bits: u64, min_bits: usize },

    #[error("value out of range for the configured prime")]
    OutOfRange,

    #[error("no modular inverse exists for the sampled exponent")]
    ModularInverseNotFound,

    #[error("failed to sample a random exponent after the maximum number of attempts")]
    RandomGenerationFailed,

    #[error("KEK-derived AEAD encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("KEK-derived AEAD decryption failed: {0}")]
    DecryptionFailed(String),

    #[error(transparent)]
    Crypto(#[from] passkey_crypto::CryptoError),
}
