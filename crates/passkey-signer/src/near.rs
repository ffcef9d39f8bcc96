//! NEAR wire types: `TxSigningRequest`'s closed action sum type, the Borsh
//! `Transaction`/`SignedTransaction` layout, and NEP-461 delegate actions.
//! Grounded on `wasm_signer_worker/src/types/near.rs`, trimmed to spec.md
//! §3's eight closed `Action` variants plus `SignedDelegate` (a supplement,
//! see SPEC_FULL.md §2); the teacher's NEP-591 global-contract variants are
//! dropped — there is no counterpart in spec.md's data model.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{SignerError, SignerResult};

pub type Nonce = u64;
pub type Gas = u64;
pub type Balance = u128;

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountId(pub String);

/// `[a-z0-9_-]+(\.[a-z0-9_-]+)+`, ≤ 64 bytes (spec.md §3).
impl std::str::FromStr for AccountId {
    type Err = SignerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > 64 {
            return Err(SignerError::InputValidation(format!(
                "account id must be 1-64 bytes, got {}",
                s.len()
            )));
        }
        let valid = s
            .split('.')
            .all(|label| !label.is_empty() && label.chars().all(is_account_char))
            && s.contains('.');
        if !valid {
            return Err(SignerError::InputValidation(format!(
                "account id '{s}' does not match [a-z0-9_-]+(\\.[a-z0-9_-]+)+"
            )));
        }
        Ok(AccountId(s.to_string()))
    }
}

fn is_account_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
    pub key_type: u8,
    pub key_data: [u8; 32],
}

impl PublicKey {
    pub fn from_ed25519_bytes(bytes: &[u8; 32]) -> Self {
        PublicKey { key_type: 0, key_data: *bytes }
    }

    /// Parses NEAR's `ed25519:<base58>` wire encoding.
    pub fn from_near_str(s: &str) -> SignerResult<Self> {
        let Some(key_str) = s.strip_prefix("ed25519:") else {
            return Err(SignerError::InputValidation(
                "public key must start with 'ed25519:'".into(),
            ));
        };
        let bytes = bs58::decode(key_str)
            .into_vec()
            .map_err(|e| SignerError::InputValidation(format!("invalid base58 public key: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| SignerError::InputValidation("public key must be 32 bytes".into()))?;
        Ok(Self::from_ed25519_bytes(&arr))
    }

    pub fn to_near_string(&self) -> String {
        format!("ed25519:{}", bs58::encode(self.key_data).into_string())
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signature {
    pub key_type: u8,
    pub signature_data: [u8; 64],
}

impl Signature {
    pub fn from_ed25519_bytes(bytes: &[u8; 64]) -> Self {
        Signature { key_type: 0, signature_data: *bytes }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoHash(pub [u8; 32]);

impl CryptoHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        CryptoHash(bytes)
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }
}

/// Decimal-string (de)serialization for `Balance`/`Gas`-as-u128 wire
/// fields, per spec.md §3 ("Numeric fields are decimal strings ≤ 2^128").
/// Accepts a plain number on input too, so callers aren't forced through a
/// string at every call site.
mod serde_balance_as_dec_str {
    use super::Balance;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Balance, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Balance, D::Error> {
        struct Visitor;
        impl<'de> serde::de::Visitor<'de> for Visitor {
            type Value = Balance;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a non-negative u128 as a decimal string or number")
            }
            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Balance, E> {
                Ok(v as Balance)
            }
            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Balance, E> {
                v.parse::<Balance>().map_err(E::custom)
            }
            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<Balance, E> {
                self.visit_str(&v)
            }
        }
        deserializer.deserialize_any(Visitor)
    }
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallAction {
    pub method_name: String,
    pub args: Vec<u8>,
    pub gas: Gas,
    #[serde(with = "serde_balance_as_dec_str")]
    pub deposit: Balance,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessKeyPermission {
    FunctionCall(FunctionCallPermission),
    FullAccess,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallPermission {
    pub allowance: Option<Balance>,
    pub receiver_id: String,
    pub method_names: Vec<String>,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    pub nonce: Nonce,
    pub permission: AccessKeyPermission,
}

/// Closed sum type: `{CreateAccount, DeployContract, FunctionCall, Transfer,
/// Stake, AddKey, DeleteKey, DeleteAccount}` per spec.md §3, plus
/// `SignedDelegate` (NEP-461 meta-transactions, SPEC_FULL.md §2).
#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NearAction {
    CreateAccount,
    DeployContract {
        code: Vec<u8>,
    },
    FunctionCall(Box<FunctionCallAction>),
    Transfer {
        #[serde(with = "serde_balance_as_dec_str")]
        deposit: Balance,
    },
    Stake {
        #[serde(with = "serde_balance_as_dec_str")]
        stake: Balance,
        public_key: PublicKey,
    },
    AddKey {
        public_key: PublicKey,
        access_key: AccessKey,
    },
    DeleteKey {
        public_key: PublicKey,
    },
    DeleteAccount {
        beneficiary_id: AccountId,
    },
    SignedDelegate(Box<SignedDelegate>),
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegateAction {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub actions: Vec<NearAction>,
    pub nonce: Nonce,
    pub max_block_height: u64,
    pub public_key: PublicKey,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedDelegate {
    pub delegate_action: DelegateAction,
    pub signature: Signature,
}

#[derive(BorshSerialize, BorshDeserialize, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub signer_id: AccountId,
    pub public_key: PublicKey,
    pub nonce: Nonce,
    pub receiver_id: AccountId,
    pub block_hash: CryptoHash,
    pub actions: Vec<NearAction>,
}

/// The wire struct a NEAR RPC endpoint expects for `broadcast_tx_*`: the
/// unsigned `Transaction` paired with its signature, Borsh-encoded as one
/// unit. Kept private — callers only ever see the encoded bytes inside
/// `SignedTransaction::borsh_bytes`, per spec.md §3's `SignedTransaction`
/// shape (`{borshBytes, signature, txHash}`, not a structured transaction).
#[derive(BorshSerialize, BorshDeserialize)]
struct SignedTransactionWire {
    transaction: Transaction,
    signature: Signature,
}

impl Transaction {
    /// `txHash = SHA256(borsh(Transaction))`, mirroring NEAR protocol's
    /// `Transaction::get_hash_and_size`.
    pub fn hash(&self) -> SignerResult<CryptoHash> {
        let bytes = borsh::to_vec(self)
            .map_err(|e| SignerError::InputValidation(format!("borsh encode failed: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&digest);
        Ok(CryptoHash(out))
    }

    /// Signs `self` with the given Ed25519 key, producing spec.md §3's
    /// `SignedTransaction{borshBytes, signature, txHash}` where `borshBytes`
    /// is the full `Transaction ∥ Signature` encoding ready for
    /// `ChainClient::sendTransaction`.
    pub fn sign(&self, signing_key: &ed25519_dalek::SigningKey) -> SignerResult<SignedTransaction> {
        let tx_hash = self.hash()?;
        let sig_bytes = passkey_crypto::ed25519::sign(signing_key, &tx_hash.0);
        let signature = Signature::from_ed25519_bytes(&sig_bytes);

        let wire = SignedTransactionWire { transaction: self.clone(), signature: signature.clone() };
        let borsh_bytes = borsh::to_vec(&wire)
            .map_err(|e| SignerError::InputValidation(format!("borsh encode failed: {e}")))?;

        Ok(SignedTransaction { borsh_bytes, signature, tx_hash })
    }
}

/// `{ borshBytes, signature, txHash }` (spec.md §3).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    pub borsh_bytes: Vec<u8>,
    pub signature: Signature,
    pub tx_hash: CryptoHash,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> ed25519_dalek::SigningKey {
        passkey_crypto::ed25519::from_seed(&[3u8; 32]).unwrap()
    }

    #[test]
    fn account_id_parses_valid_names() {
        assert!("alice.testnet".parse::<AccountId>().is_ok());
        assert!("sub.alice.near".parse::<AccountId>().is_ok());
    }

    #[test]
    fn account_id_rejects_malformed_names() {
        assert!("".parse::<AccountId>().is_err());
        assert!("NoDots".parse::<AccountId>().is_err());
        assert!("Has.Upper".parse::<AccountId>().is_err());
        assert!("a".repeat(65).parse::<AccountId>().is_err());
    }

    #[test]
    fn public_key_near_string_round_trips() {
        let pk = PublicKey::from_ed25519_bytes(&[9u8; 32]);
        let s = pk.to_near_string();
        assert!(s.starts_with("ed25519:"));
        let parsed = PublicKey::from_near_str(&s).unwrap();
        assert_eq!(pk, parsed);
    }

    #[test]
    fn sign_produces_verifiable_transaction() {
        let signing_key = test_key();
        let tx = Transaction {
            signer_id: "alice.testnet".parse().unwrap(),
            public_key: PublicKey::from_ed25519_bytes(signing_key.verifying_key().as_bytes()),
            nonce: 1,
            receiver_id: "bob.testnet".parse().unwrap(),
            block_hash: CryptoHash::from_bytes([1u8; 32]),
            actions: vec![NearAction::Transfer { deposit: 1 }],
        };
        let signed = tx.sign(&signing_key).unwrap();
        assert!(passkey_crypto::ed25519::verify(
            &signing_key.verifying_key(),
            &signed.tx_hash.0,
            &signed.signature.signature_data,
        ));
        assert!(!signed.borsh_bytes.is_empty());
    }

    #[test]
    fn hash_is_deterministic_for_identical_transactions() {
        let signing_key = test_key();
        let tx = Transaction {
            signer_id: "alice.testnet".parse().unwrap(),
            public_key: PublicKey::from_ed25519_bytes(signing_key.verifying_key().as_bytes()),
            nonce: 5,
            receiver_id: "bob.testnet".parse().unwrap(),
            block_hash: CryptoHash::from_bytes([2u8; 32]),
            actions: vec![NearAction::CreateAccount],
        };
        assert_eq!(tx.hash().unwrap(), tx.hash().unwrap());
    }
}
