//! `TxSigningRequest` and the canonical intent digest. Ported from the
//! teacher's `compute_intent_digest_from_js_inputs` in
//! `handlers/confirm_tx_details.rs`: recursively alphabetize JSON object
//! keys, serialize, SHA-256, base64url — this has to match byte-for-byte
//! whatever the UI independently computes, so the algorithm is not
//! rewritten, only retargeted at this crate's `ActionParams`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::actions::ActionParams;
use crate::near::Nonce;
use crate::error::{SignerError, SignerResult};

/// One transaction's worth of intent, as handed to the Signer Core by the
/// Session Orchestrator. `nonce` and `block_hash` are pre-populated by SO
/// (it owns the Chain Client and per-batch nonce sequencing); SC only
/// validates that nonces strictly increase across a batch.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TxSigningRequest {
    pub receiver_id: String,
    pub actions: Vec<ActionParams>,
    pub nonce: Nonce,
    /// Base58-encoded NEAR block hash to sign against.
    pub block_hash: String,
}

fn alphabetize_json_value(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                if let Some(child) = map.get(k) {
                    out.insert(k.clone(), alphabetize_json_value(child));
                }
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(alphabetize_json_value).collect()),
        _ => v.clone(),
    }
}

/// Computes the canonical intent digest for a batch of requests: `{
/// receiverId, actions }` per request, keys alphabetized recursively,
/// serialized, SHA-256'd, base64url-encoded. Must match whatever the UI
/// independently computes over the same requests (spec.md §4.5).
pub fn compute_intent_digest(requests: &[TxSigningRequest]) -> SignerResult<String> {
    let array: Vec<Value> = requests
        .iter()
        .map(|req| {
            serde_json::json!({
                "receiverId": req.receiver_id,
                "actions": req.actions,
            })
        })
        .collect();

    let alphabetized = alphabetize_json_value(&Value::Array(array));
    let serialized = serde_json::to_string(&alphabetized)
        .map_err(|e| SignerError::InputValidation(format!("failed to serialize intent: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    let digest = hasher.finalize();
    Ok(passkey_crypto::encoders::base64_url_encode(&digest))
}

/// Nonces within a batch must strictly increase; this is a sanity check,
/// not the source of truth (the Session Orchestrator assigns nonces).
pub fn validate_nonce_sequence(requests: &[TxSigningRequest]) -> SignerResult<()> {
    let mut prev: Option<Nonce> = None;
    for req in requests {
        if let Some(p) = prev {
            if req.nonce <= p {
                return Err(SignerError::InputValidation(format!(
                    "nonces must strictly increase within a batch: {} did not follow {}",
                    req.nonce, p
                )));
            }
        }
        prev = Some(req.nonce);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(receiver: &str, nonce: Nonce) -> TxSigningRequest {
        TxSigningRequest {
            receiver_id: receiver.to_string(),
            actions: vec![ActionParams::Transfer { deposit: "1".into() }],
            nonce,
            block_hash: "11111111111111111111111111111111".into(),
        }
    }

    #[test]
    fn digest_is_deterministic_regardless_of_key_order_in_actions() {
        let a = req("bob.testnet", 1);
        let b = req("bob.testnet", 1);
        assert_eq!(compute_intent_digest(&[a]).unwrap(), compute_intent_digest(&[b]).unwrap());
    }

    #[test]
    fn digest_differs_for_different_receivers() {
        let a = compute_intent_digest(&[req("bob.testnet", 1)]).unwrap();
        let b = compute_intent_digest(&[req("carol.testnet", 1)]).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn nonce_sequence_rejects_non_increasing() {
        let requests = vec![req("bob.testnet", 5), req("carol.testnet", 5)];
        assert!(validate_nonce_sequence(&requests).is_err());
    }

    #[test]
    fn nonce_sequence_accepts_strictly_increasing() {
        let requests = vec![req("bob.testnet", 5), req("carol.testnet", 6)];
        assert!(validate_nonce_sequence(&requests).is_ok());
    }
}
