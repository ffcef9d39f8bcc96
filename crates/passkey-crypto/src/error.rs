use std::fmt;

/// Errors raised by the crypto primitives layer.
///
/// This layer is pure and side-effect free, so every error here reflects a
/// structural problem with the caller's input (wrong length, bad encoding,
/// tag mismatch) rather than an I/O failure.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key size: expected {expected} bytes, got {actual}")]
    InvalidKeySize { expected: usize, actual: usize },

    #[error("invalid nonce size: expected {expected} bytes, got {actual}")]
    InvalidNonceSize { expected: usize, actual: usize },

    #[error("AEAD decryption failed (tag mismatch or corrupted ciphertext/aad/nonce)")]
    DecryptError,

    #[error("AEAD encryption failed: {0}")]
    EncryptError(String),

    #[error("HKDF expand failed (requested length too large for the hash output)")]
    HkdfError,

    #[error("base64url decode failed: {0}")]
    Base64Decode(String),

    #[error("invalid Ed25519 seed: expected 32 bytes, got {0}")]
    InvalidSeedLength(usize),

    #[error("invalid Ed25519 signature encoding")]
    InvalidSignature,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("modular inverse does not exist for the given exponent and modulus")]
    NoModularInverse,

    #[error("value out of range for modulus p (must be in [1, p-1])")]
    OutOfRange,
}

impl From<DecodeErrorMarker> for CryptoError {
    fn from(e: DecodeErrorMarker) -> Self {
        CryptoError::Base64Decode(e.0)
    }
}

/// Internal marker so `base64ct`'s error type doesn't leak through the public API.
pub(crate) struct DecodeErrorMarker(pub String);

impl fmt::Debug for DecodeErrorMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
