//! `ActionParams`: the JSON-facing action sum type and its validation into a
//! concrete [`crate::near::NearAction`]. Grounded on the teacher's
//! `wasm_signer_worker/src/actions.rs`, with two changes: the NEP-591
//! `DeployGlobalContract`/`UseGlobalContract` variants are dropped (no
//! counterpart in spec.md's data model), and `AccessKey` JSON is parsed with
//! `serde_json` directly — this crate is not WASM-bundle-size constrained,
//! so the teacher's hand-rolled native-target JSON parser has no reason to
//! exist here.

use serde::{Deserialize, Serialize};

use crate::error::{SignerError, SignerResult};
use crate::near::{
    AccessKey, Balance, FunctionCallAction, Gas, NearAction, PublicKey, SignedDelegate,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "action_type")]
pub enum ActionParams {
    CreateAccount,
    DeployContract {
        code: Vec<u8>,
    },
    FunctionCall {
        method_name: String,
        /// JSON-encoded arguments, as received from a caller.
        args: String,
        gas: String,
        deposit: String,
    },
    Transfer {
        deposit: String,
    },
    Stake {
        stake: String,
        public_key: String,
    },
    AddKey {
        public_key: String,
        /// JSON-encoded `AccessKey`.
        access_key: String,
    },
    DeleteKey {
        public_key: String,
    },
    DeleteAccount {
        beneficiary_id: String,
    },
    SignedDelegate {
        delegate_action: crate::near::DelegateAction,
        signature: crate::near::Signature,
    },
}

fn parse_near_public_key(public_key: &str) -> SignerResult<PublicKey> {
    if public_key.is_empty() {
        return Err(SignerError::InputValidation("public key cannot be empty".into()));
    }
    PublicKey::from_near_str(public_key)
}

impl ActionParams {
    /// Validates the current params and converts them into a concrete
    /// [`NearAction`]. All validation happens up-front, before any
    /// transaction is built — see spec.md §4.5's atomicity requirement for
    /// `sign_transactions`.
    pub fn to_action(&self) -> SignerResult<NearAction> {
        match self {
            ActionParams::CreateAccount => Ok(NearAction::CreateAccount),

            ActionParams::DeployContract { code } => {
                if code.is_empty() {
                    return Err(SignerError::InputValidation("contract code cannot be empty".into()));
                }
                if code.len() >= crate::config::MAX_CONTRACT_CODE_BYTES {
                    return Err(SignerError::InputValidation(format!(
                        "contract code must be under {} bytes",
                        crate::config::MAX_CONTRACT_CODE_BYTES
                    )));
                }
                Ok(NearAction::DeployContract { code: code.clone() })
            }

            ActionParams::FunctionCall { method_name, args, gas, deposit } => {
                if method_name.is_empty() {
                    return Err(SignerError::InputValidation("method name cannot be empty".into()));
                }
                if serde_json::from_str::<serde_json::Value>(args).is_err() {
                    return Err(SignerError::InputValidation("function call args must be valid JSON".into()));
                }
                let gas_amount = gas
                    .parse::<Gas>()
                    .map_err(|_| SignerError::InputValidation("invalid gas amount".into()))?;
                let deposit_amount = deposit
                    .parse::<Balance>()
                    .map_err(|_| SignerError::InputValidation("invalid deposit amount".into()))?;

                Ok(NearAction::FunctionCall(Box::new(FunctionCallAction {
                    method_name: method_name.clone(),
                    args: args.as_bytes().to_vec(),
                    gas: gas_amount,
                    deposit: deposit_amount,
                })))
            }

            ActionParams::Transfer { deposit } => {
                if deposit.is_empty() {
                    return Err(SignerError::InputValidation("transfer deposit cannot be empty".into()));
                }
                let deposit_amount = deposit
                    .parse::<Balance>()
                    .map_err(|_| SignerError::InputValidation("invalid deposit amount".into()))?;
                Ok(NearAction::Transfer { deposit: deposit_amount })
            }

            ActionParams::Stake { stake, public_key } => {
                if stake.is_empty() {
                    return Err(SignerError::InputValidation("stake amount cannot be empty".into()));
                }
                let stake_amount = stake
                    .parse::<Balance>()
                    .map_err(|_| SignerError::InputValidation("invalid stake amount".into()))?;
                let parsed_public_key = parse_near_public_key(public_key)?;
                Ok(NearAction::Stake { stake: stake_amount, public_key: parsed_public_key })
            }

            ActionParams::AddKey { public_key, access_key } => {
                let parsed_public_key = parse_near_public_key(public_key)?;
                let parsed_access_key: AccessKey = serde_json::from_str(access_key)
                    .map_err(|e| SignerError::InputValidation(format!("invalid access_key JSON: {e}")))?;
                Ok(NearAction::AddKey { public_key: parsed_public_key, access_key: parsed_access_key })
            }

            ActionParams::DeleteKey { public_key } => {
                let parsed_public_key = parse_near_public_key(public_key)?;
                Ok(NearAction::DeleteKey { public_key: parsed_public_key })
            }

            ActionParams::DeleteAccount { beneficiary_id } => {
                if beneficiary_id.is_empty() {
                    return Err(SignerError::InputValidation("beneficiary id cannot be empty".into()));
                }
                let beneficiary = beneficiary_id.parse()?;
                Ok(NearAction::DeleteAccount { beneficiary_id: beneficiary })
            }

            ActionParams::SignedDelegate { delegate_action, signature } => {
                if delegate_action.sender_id.0.is_empty() {
                    return Err(SignerError::InputValidation("delegate_action.sender_id cannot be empty".into()));
                }
                if delegate_action.receiver_id.0.is_empty() {
                    return Err(SignerError::InputValidation("delegate_action.receiver_id cannot be empty".into()));
                }
                if delegate_action.actions.is_empty() {
                    return Err(SignerError::InputValidation("delegate_action.actions cannot be empty".into()));
                }
                if delegate_action.nonce == 0 {
                    return Err(SignerError::InputValidation("delegate_action.nonce must be non-zero".into()));
                }
                Ok(NearAction::SignedDelegate(Box::new(SignedDelegate {
                    delegate_action: delegate_action.clone(),
                    signature: signature.clone(),
                })))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_call_rejects_empty_method_name() {
        let params = ActionParams::FunctionCall {
            method_name: String::new(),
            args: "{}".into(),
            gas: "30000000000000".into(),
            deposit: "0".into(),
        };
        assert!(matches!(params.to_action(), Err(SignerError::InputValidation(_))));
    }

    #[test]
    fn function_call_builds_valid_action() {
        let params = ActionParams::FunctionCall {
            method_name: "set_greeting".into(),
            args: r#"{"greeting":"hi"}"#.into(),
            gas: "30000000000000".into(),
            deposit: "0".into(),
        };
        let action = params.to_action().unwrap();
        assert!(matches!(action, NearAction::FunctionCall(_)));
    }

    #[test]
    fn function_call_rejects_non_json_args() {
        let params = ActionParams::FunctionCall {
            method_name: "set_greeting".into(),
            args: "not json".into(),
            gas: "30000000000000".into(),
            deposit: "0".into(),
        };
        assert!(matches!(params.to_action(), Err(SignerError::InputValidation(_))));
    }

    #[test]
    fn deploy_contract_rejects_oversized_code() {
        let params = ActionParams::DeployContract {
            code: vec![0u8; crate::config::MAX_CONTRACT_CODE_BYTES],
        };
        assert!(params.to_action().is_err());
    }

    #[test]
    fn add_key_parses_full_access_json() {
        let params = ActionParams::AddKey {
            public_key: format!("ed25519:{}", bs58::encode([1u8; 32]).into_string()),
            access_key: r#"{"nonce":0,"permission":"FullAccess"}"#.into(),
        };
        let action = params.to_action().unwrap();
        assert!(matches!(
            action,
            NearAction::AddKey { access_key: AccessKey { permission: crate::near::AccessKeyPermission::FullAccess, .. }, .. }
        ));
    }

    #[test]
    fn delete_account_rejects_empty_beneficiary() {
        let params = ActionParams::DeleteAccount { beneficiary_id: String::new() };
        assert!(params.to_action().is_err());
    }
}
