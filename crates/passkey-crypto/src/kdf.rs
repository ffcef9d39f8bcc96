//! HKDF-SHA256 key derivation, used to turn PRF outputs and Shamir KEKs into
//! fixed-size symmetric keys with domain separation via the `info` parameter.

use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::CryptoError;

/// `HKDF-SHA256(salt, ikm, info, len) -> bytes`, matching spec.md §4.1.
pub fn hkdf_sha256(salt: &[u8], ikm: &[u8], info: &[u8], len: usize) -> Result<Vec<u8>, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut out = vec![0u8; len];
    hk.expand(info, &mut out).map_err(|_| CryptoError::HkdfError)?;
    Ok(out)
}

/// Convenience wrapper for the common 32-byte-key case.
pub fn hkdf_sha256_32(salt: &[u8], ikm: &[u8], info: &[u8]) -> Result<[u8; 32], CryptoError> {
    let bytes = hkdf_sha256(salt, ikm, info, 32)?;
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}
