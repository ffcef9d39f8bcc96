//! HKDF domain separators for the Ed25519/VRF key hierarchy, taken directly
//! from spec.md §4.2/§4.4's operation definitions rather than the teacher's
//! own (`wasm_signer_worker/src/config.rs` uses different literal strings
//! for the same derivations; these are kept as the canonical wire-visible
//! constants since other implementations of this scheme need to match them
//! byte for byte).

/// `seed = HKDF(prfB, salt=accountId, info="w3a/near-ed25519/v1", 32)`.
pub const ED25519_SEED_HKDF_INFO: &[u8] = b"w3a/near-ed25519/v1";

/// `k_enc = HKDF(prfA, salt=accountId, info="w3a/aead/v1", 32)`, the key
/// that encrypts the Ed25519 seed produced by `ED25519_SEED_HKDF_INFO`.
pub const ED25519_AEAD_KEY_HKDF_INFO: &[u8] = b"w3a/aead/v1";

pub const ED25519_SEED_SIZE: usize = 32;
pub const ED25519_PRIVATE_KEY_WIRE_SIZE: usize = 64;
