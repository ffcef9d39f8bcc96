//! COSE public key extraction from a WebAuthn attestation object — a
//! supplemented feature (spec.md's `AuthenticatorRecord.credentialPublicKey
//! (COSE)` field names the data but not how to obtain it from a raw
//! ceremony response). Ported from `wasm_signer_worker/src/cose.rs`,
//! generalized from `Result<_, String>` to this crate's typed error.

use ciborium::Value as CborValue;

use crate::error::{KeyManagerError, KeyManagerResult};

/// Parse a CBOR-encoded WebAuthn attestation object and return its
/// `authData` field.
pub fn parse_attestation_object(attestation_object_bytes: &[u8]) -> KeyManagerResult<Vec<u8>> {
    let cbor_value: CborValue = ciborium::from_reader(attestation_object_bytes)
        .map_err(|e| KeyManagerError::MalformedCredential(format!("failed to parse CBOR: {e}")))?;

    let CborValue::Map(map) = cbor_value else {
        return Err(KeyManagerError::MalformedCredential(
            "attestation object is not a CBOR map".into(),
        ));
    };

    for (key, value) in &map {
        if let CborValue::Text(key_str) = key {
            if key_str == "authData" {
                if let CborValue::Bytes(auth_data_bytes) = value {
                    return Ok(auth_data_bytes.clone());
                }
            }
        }
    }
    Err(KeyManagerError::MalformedCredential("authData not found in attestation object".into()))
}

/// Parse WebAuthn authenticator data and extract the trailing COSE public
/// key, skipping past rpIdHash/flags/counter/AAGUID/credentialId.
pub fn parse_authenticator_data(auth_data_bytes: &[u8]) -> KeyManagerResult<Vec<u8>> {
    if auth_data_bytes.len() < 37 {
        return Err(KeyManagerError::MalformedCredential("authenticator data too short".into()));
    }

    let flags = auth_data_bytes[32];
    if (flags & 0x40) == 0 {
        return Err(KeyManagerError::MalformedCredential("no attested credential data present".into()));
    }

    let mut offset = 37; // rpIdHash(32) + flags(1) + counter(4)

    if auth_data_bytes.len() < offset + 16 {
        return Err(KeyManagerError::MalformedCredential("authenticator data too short for AAGUID".into()));
    }
    offset += 16;

    if auth_data_bytes.len() < offset + 2 {
        return Err(KeyManagerError::MalformedCredential(
            "authenticator data too short for credential ID length".into(),
        ));
    }
    let cred_id_length = u16::from_be_bytes([auth_data_bytes[offset], auth_data_bytes[offset + 1]]) as usize;
    offset += 2;

    if auth_data_bytes.len() < offset + cred_id_length {
        return Err(KeyManagerError::MalformedCredential(
            "authenticator data too short for credential ID".into(),
        ));
    }
    offset += cred_id_length;

    Ok(auth_data_bytes[offset..].to_vec())
}

/// Decode an attestation object (base64url) straight to its COSE public key.
pub fn extract_cose_public_key_from_attestation(attestation_object_b64u: &str) -> KeyManagerResult<Vec<u8>> {
    let attestation_object_bytes = passkey_crypto::encoders::base64_url_decode(attestation_object_b64u)?;
    let auth_data_bytes = parse_attestation_object(&attestation_object_bytes)?;
    parse_authenticator_data(&auth_data_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_auth_data(cred_id: &[u8], cose_key: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&[0u8; 32]); // rpIdHash
        data.push(0x40); // AT flag set
        data.extend_from_slice(&[0u8; 4]); // counter
        data.extend_from_slice(&[0u8; 16]); // AAGUID
        data.extend_from_slice(&(cred_id.len() as u16).to_be_bytes());
        data.extend_from_slice(cred_id);
        data.extend_from_slice(cose_key);
        data
    }

    #[test]
    fn extracts_cose_key_past_credential_id() {
        let cose_key = b"fake-cose-bytes";
        let auth_data = build_auth_data(b"cred-1", cose_key);
        let extracted = parse_authenticator_data(&auth_data).unwrap();
        assert_eq!(extracted, cose_key);
    }

    #[test]
    fn rejects_missing_attested_credential_data_flag() {
        let mut data = vec![0u8; 37];
        data[32] = 0x00; // AT flag not set
        assert!(parse_authenticator_data(&data).is_err());
    }

    #[test]
    fn rejects_truncated_data() {
        assert!(parse_authenticator_data(&[0u8; 10]).is_err());
    }
}
