//! Unpadded, URL-safe base64 codec. Mirrors the teacher's `encoders.rs`
//! helpers used throughout the signer and VRF workers for every wire value.

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::{CryptoError, DecodeErrorMarker};

pub fn base64_url_encode(data: &[u8]) -> String {
    Base64UrlUnpadded::encode_string(data)
}

pub fn base64_url_decode(data: &str) -> Result<Vec<u8>, CryptoError> {
    Base64UrlUnpadded::decode_vec(data)
        .map_err(|e| CryptoError::from(DecodeErrorMarker(e.to_string())))
}

/// Standard (padded) base64, used only where a wire format demands it (NEP-413 signatures).
pub fn base64_standard_encode(data: &[u8]) -> String {
    use base64ct::Base64;
    Base64::encode_string(data)
}

pub fn base64_standard_decode(data: &str) -> Result<Vec<u8>, CryptoError> {
    use base64ct::Base64;
    Base64::decode_vec(data).map_err(|e| CryptoError::from(DecodeErrorMarker(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_arbitrary_bytes() {
        let data = b"\x00\x01\xff\xfe hello world";
        let encoded = base64_url_encode(data);
        assert!(!encoded.contains('='), "unpadded encoding must not contain '='");
        let decoded = base64_url_decode(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_garbage() {
        assert!(base64_url_decode("not valid base64!!").is_err());
    }
}
