//! Default prime and exponent-sampling bounds for the three-pass protocol.
//! Grounded on `wasm_vrf_worker/src/config.rs`'s embedded prime constant;
//! the teacher ships one fixed modulus compiled into the worker, which we
//! keep as the crate default while still letting callers supply their own
//! (spec.md §4.3 treats `p` as configuration, not a hardcoded constant).

/// Default modulus: the NIST P-256 field prime
/// `2^256 - 2^224 + 2^192 + 2^96 - 1`, expressed in hex. It is a well-known,
/// independently verifiable 256-bit prime, which makes it a reasonable
/// off-the-shelf default for `Shamir3Pass::with_default_prime()` without
/// this crate needing to generate or vendor one of its own.
pub const DEFAULT_SHAMIR_P_HEX: &str =
    "FFFFFFFF00000001000000000000000000000000FFFFFFFFFFFFFFFFFFFFFFFF";

/// Minimum acceptable bit length for a caller-supplied prime. Below this the
/// discrete-log problem the protocol's security rests on is not hard enough.
pub const MIN_PRIME_BITS: usize = 256;

/// Upper bound on attempts to sample a random exponent coprime to `p - 1`
/// before giving up (`ShamirError::RandomGenerationFailed`). The teacher's
/// worker retries a handful of times; failures this common indicate a
/// misconfigured prime, not transient bad luck.
pub const MAX_EXPONENT_SAMPLE_ATTEMPTS: usize = 16;

/// Domain-separation string for the HKDF step that turns a KEK's raw
/// big-integer bytes into a ChaCha20-Poly1305 key.
pub const SHAMIR_AEAD_HKDF_INFO: &[u8] = b"passkey-shamir/kek-aead-key/v1";
