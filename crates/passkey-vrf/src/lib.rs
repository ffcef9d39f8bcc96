//! VRF Engine (VE) — spec.md §4.2.
//!
//! Manages a single unlocked ECVRF keypair in memory, derives it
//! deterministically from PRF-B output for account recovery, and produces
//! replay-resistant per-authentication challenges bound to a domain
//! separator, user/rp identifiers, a recent block, and optionally an
//! intent or session-policy digest. Encrypts the keypair at rest with
//! `passkey-crypto`'s AEAD primitives and can additionally gate recovery
//! behind `passkey-shamir`'s three-pass protocol.

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use engine::{SecureVrfKeyPair, VrfEngine};
pub use error::{VrfError, VrfResult};
pub use types::{
    DeterministicVrfKeypairResponse, EncryptedVrfKeypair, EncryptedVrfKeypairResponse,
    GenerateVrfKeypairBootstrapResponse, ServerEncryptedVrfKeypair, VrfChallengeData, VrfInputData,
    VrfKeypairData,
};
