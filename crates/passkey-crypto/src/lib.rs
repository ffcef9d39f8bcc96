//! Crypto Primitives Layer (CP) — spec.md §4.1.
//!
//! Pure, side-effect-free building blocks used by every other crate in the
//! workspace: HKDF-SHA256, ChaCha20-Poly1305 AEAD, Ed25519 signing, SHA-256,
//! an unpadded base64url codec, and the modular bigint arithmetic the Shamir
//! three-pass engine builds on. Nothing here touches I/O, randomness sources
//! beyond `getrandom`, or external state; it is unit-testable in isolation
//! and has no async boundary.
//!
//! Borsh (NEAR's wire codec) is re-exported rather than wrapped: every other
//! crate derives `BorshSerialize`/`BorshDeserialize` directly on its domain
//! types the same way the teacher's `types/near.rs` does.

pub mod aead;
pub mod bigint;
pub mod ed25519;
pub mod encoders;
pub mod error;
pub mod hash;
pub mod kdf;

pub use aead::{AeadCiphertext, CHACHA20_KEY_SIZE, CHACHA20_NONCE_SIZE};
pub use encoders::{base64_standard_decode, base64_standard_encode, base64_url_decode, base64_url_encode};
pub use error::CryptoError;
pub use hash::sha256;
pub use kdf::{hkdf_sha256, hkdf_sha256_32};

pub use borsh;
pub use ed25519_dalek;
pub use num_bigint;
