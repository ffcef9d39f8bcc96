//! Shamir Engine (SE) — spec.md §4.3.
//!
//! A commutative three-pass encryption protocol used to gate access to a
//! user's VRF keypair seed behind a server-held secret, without the server
//! ever learning the seed itself and without the client ever learning the
//! server's exponent. `Shamir3Pass` implements the four wire operations
//! (`client_lock`, `server_lock`, `server_unlock`, `client_unlock`); `kek`
//! wraps a recovered key-encryption-key into an AEAD operation over the
//! VRF seed it protects.

pub mod config;
pub mod engine;
pub mod error;
pub mod kek;

pub use engine::{ExponentPair, Shamir3Pass};
pub use error::ShamirError;
pub use kek::{biguint_to_kek, decrypt_with_kek, encrypt_with_kek, kek_to_biguint};
