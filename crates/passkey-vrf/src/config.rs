//! Configuration constants for the VRF engine. Grounded on
//! `wasm_vrf_worker/src/config.rs`; kept as a flat `const` module the same
//! way, so a deployment can recompile with a different domain separator
//! without threading it through every call site.

/// Domain separator mixed into every VRF input hash. Distinct domain
/// separators produce unrelated challenges for the same (user, rp, block)
/// tuple, which is what lets multiple independent deployments share a VRF
/// keypair derivation scheme without challenge collisions.
pub const VRF_DOMAIN_SEPARATOR: &[u8] = b"web3_authn_challenge_v3";

/// HKDF info string for deriving a ChaCha20 key from PRF-A when encrypting
/// a VRF keypair at rest (`encryptKeypair`, spec.md §4.2).
pub const HKDF_CHACHA20_KEY_INFO: &[u8] = b"w3a/vrf/v1";

/// HKDF info string for deriving the 32-byte VRF keypair seed from PRF-A
/// (`deriveDeterministicKeypair`, spec.md §4.2).
pub const HKDF_VRF_KEYPAIR_INFO: &[u8] = b"w3a/vrf-seed/v1";

pub const CHACHA20_KEY_SIZE: usize = 32;
pub const CHACHA20_NONCE_SIZE: usize = 12;
pub const VRF_SEED_SIZE: usize = 32;
