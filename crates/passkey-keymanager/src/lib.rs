//! Key Manager (KM) — spec.md §4.4.
//!
//! Composes the Ed25519 signing key (PRF-B derived, PRF-A encrypted at
//! rest) with a `passkey-vrf::VrfEngine`, and extracts COSE public keys
//! from WebAuthn attestation objects. Pure crypto/composition: no network
//! I/O or `Storage`/`RelayClient` collaborator calls happen here, those
//! belong to `passkey-session`.

pub mod config;
pub mod cose;
pub mod ed25519_key;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{KeyManagerError, KeyManagerResult};
pub use manager::KeyManager;
pub use types::{
    AuthenticatorRecord, AuthenticatorTransport, EncryptedEd25519Key, RecoverKeypairOutcome,
    RegisterAccountOutcome, UserRecord, VrfSecretHandle,
};
