//! Device linking — spec.md §4.6 step 4's QR-mediated handshake that adds a
//! new authenticator's key to an existing account without a full
//! registration ceremony, plus the dead-man's-switch cleanup that prevents
//! a stranded passkey if Device2 never claims. Grounded on
//! `wasm_vrf_worker/src/handlers/handle_device2_registration_session.rs`'s
//! polling loop, restated without its `setTimeout`/`postMessage` plumbing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ed25519_dalek::SigningKey;
use rand::RngCore;

use passkey_keymanager::{AuthenticatorRecord, AuthenticatorTransport, UserRecord};
use passkey_signer::{ActionParams, ConfirmationConfig, PublicKey, TxSigningRequest};

use crate::error::{CoreError, CoreResult};
use crate::orchestrator::SessionOrchestrator;
use crate::types::{CreateCredentialOptions, DeviceLinkResult, GetCredentialOptions, QrLinkPayload};

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn full_access_json() -> &'static str {
    r#"{"nonce":0,"permission":"FullAccess"}"#
}

/// Outcome of the dead-man's-switch poll (spec.md §4.6 step 3, §8 scenario
/// 6): either the cleanup `DeleteKey` was broadcast because Device2 never
/// claimed, or it was discarded because Device2 already replaced the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceLinkCleanupOutcome {
    Broadcast { tx_hash: String },
    Discarded,
}

impl SessionOrchestrator {
    /// Device2's half of step 1: generates a fresh Ed25519 keypair locally
    /// (never touching WebAuthn/PRF — this key is a temporary bearer
    /// credential, not the account's real signing key) and returns both the
    /// QR payload to display and the signing key Device2 must hold onto
    /// until it claims the mapping.
    pub fn generate_device_link_qr(&self, account_id_hint: Option<&str>) -> (QrLinkPayload, SigningKey) {
        let mut seed = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut seed);
        let signing_key = SigningKey::from_bytes(&seed);
        let public_key = PublicKey::from_ed25519_bytes(signing_key.verifying_key().as_bytes()).to_near_string();
        let payload = QrLinkPayload {
            device2_public_key: public_key,
            account_id: account_id_hint.map(|s| s.to_string()),
            timestamp: now_ms(),
        };
        (payload, signing_key)
    }

    /// Device1's half of steps 1-3: validates the QR's freshness, signs the
    /// `AddKey`/`storeDeviceLinkingMapping`/`DeleteKey` triple atomically
    /// behind one confirm handshake, broadcasts the first two, and hands
    /// the third back unbroadcast for the caller to schedule with
    /// [`Self::run_device_link_cleanup`].
    pub async fn link_device_from_qr(
        &self,
        account_id: &str,
        rp_id: &str,
        contract_id: &str,
        qr: &QrLinkPayload,
        confirmation_config: ConfirmationConfig,
    ) -> CoreResult<DeviceLinkResult> {
        let age_ms = now_ms() - qr.timestamp;
        if age_ms < 0 || Duration::from_millis(age_ms as u64) > self.config.qr_ttl {
            return Err(CoreError::QrExpired);
        }
        {
            let km = self.key_manager.lock().expect("key manager lock poisoned");
            if !km.is_unlocked(account_id) {
                return Err(CoreError::InputValidation(format!(
                    "{account_id} is not the currently unlocked session; call login() first"
                )));
            }
        }

        let record = self
            .storage
            .get_user_record(account_id)
            .await?
            .ok_or_else(|| CoreError::InputValidation(format!("no stored record for {account_id}")))?;

        self.progress("device_link", "fetching access key and block");
        let tip = self.fetch_fresh_block("final").await?;
        let access_key = self
            .retry_chain(|| {
                let chain = self.chain.clone();
                let account_id = account_id.to_string();
                let public_key = record.ed25519_public_key.clone();
                async move { chain.view_access_key(&account_id, &public_key).await }
            })
            .await?;

        let requests = vec![
            TxSigningRequest {
                receiver_id: account_id.to_string(),
                actions: vec![ActionParams::AddKey {
                    public_key: qr.device2_public_key.clone(),
                    access_key: full_access_json().to_string(),
                }],
                nonce: access_key.nonce + 1,
                block_hash: tip.hash_b58.clone(),
            },
            TxSigningRequest {
                receiver_id: contract_id.to_string(),
                actions: vec![ActionParams::FunctionCall {
                    method_name: "store_device_linking_mapping".to_string(),
                    args: serde_json::json!({
                        "device_public_key": qr.device2_public_key,
                        "target_account_id": account_id,
                    })
                    .to_string(),
                    gas: "30000000000000".to_string(),
                    deposit: "0".to_string(),
                }],
                nonce: access_key.nonce + 2,
                block_hash: tip.hash_b58.clone(),
            },
            TxSigningRequest {
                receiver_id: account_id.to_string(),
                actions: vec![ActionParams::DeleteKey { public_key: qr.device2_public_key.clone() }],
                nonce: access_key.nonce + 3,
                block_hash: tip.hash_b58.clone(),
            },
        ];

        self.progress("device_link", "requesting assertion");
        let mut challenge = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut challenge);
        let authenticators = self.storage.list_authenticators(account_id).await?;
        let allow_credential_ids = authenticators
            .iter()
            .filter_map(|a| passkey_crypto::encoders::base64_url_decode(&a.credential_id).ok())
            .collect::<Vec<_>>();
        let credential = self
            .authenticator
            .get(GetCredentialOptions {
                rp_id: rp_id.to_string(),
                challenge: challenge.to_vec(),
                allow_credential_ids,
                prf_salt_a: crate::registration::prf_salt(account_id, "a"),
                prf_salt_b: crate::registration::prf_salt(account_id, "b"),
            })
            .await?;
        let (prf_a, _prf_b) = credential.prf.require_both()?;

        self.progress("device_link", "confirming and signing");
        let mut seed = {
            let km = self.key_manager.lock().expect("key manager lock poisoned");
            km.decrypt_ed25519_key(&record.encrypted_ed25519_key, prf_a, account_id, &record.ed25519_public_key)?
        };
        let signing_key = passkey_crypto::ed25519::from_seed(&seed)?;
        zeroize::Zeroize::zeroize(&mut seed);

        let (worker_idx, worker) = self.signer_pool.checkout();
        let cancel = passkey_signer::CancelToken::new();
        let signed = worker
            .sign_transactions(requests, account_id, &signing_key, confirmation_config, self.ui.as_ref(), &cancel)
            .await;
        let mut signed = match signed {
            Ok(s) => s,
            Err(e) => {
                self.signer_pool.report_failed(worker_idx);
                return Err(e.into());
            }
        };
        let cleanup_signed_tx = signed.pop().expect("three requests were signed");
        let mapping_tx = signed.pop().expect("three requests were signed");
        let add_key_tx = signed.pop().expect("three requests were signed");

        self.progress("device_link", "broadcasting AddKey and mapping");
        self.retry_chain(|| {
            let chain = self.chain.clone();
            let bytes = add_key_tx.borsh_bytes.clone();
            async move { chain.send_transaction(&bytes, crate::types::WaitStatus::IncludedFinal).await }
        })
        .await?;
        self.retry_chain(|| {
            let chain = self.chain.clone();
            let bytes = mapping_tx.borsh_bytes.clone();
            async move { chain.send_transaction(&bytes, crate::types::WaitStatus::IncludedFinal).await }
        })
        .await?;

        self.progress("device_link", "complete");
        Ok(DeviceLinkResult {
            linked_to_account: account_id.to_string(),
            device2_public_key: qr.device2_public_key.clone(),
            cleanup_signed_tx,
        })
    }

    /// The dead-man's-switch poller (spec.md §4.6 step 3): checks every
    /// `device_link_poll_interval` whether `device2_public_key` still has
    /// an access key on `account_id`. If it is still present once
    /// `device_link_cleanup_window` has elapsed, broadcasts the pre-signed
    /// `DeleteKey`; if it disappears earlier (Device2 replaced it via
    /// [`Self::claim_device_link`]), the cleanup transaction is discarded
    /// unbroadcast.
    pub async fn run_device_link_cleanup(
        &self,
        account_id: &str,
        device2_public_key: &str,
        cleanup_signed_tx: passkey_signer::SignedTransaction,
    ) -> CoreResult<DeviceLinkCleanupOutcome> {
        let deadline = self.config.device_link_cleanup_window;
        let interval = self.config.device_link_poll_interval;
        let mut elapsed = Duration::ZERO;

        loop {
            if self.chain.view_access_key(account_id, device2_public_key).await.is_err() {
                return Ok(DeviceLinkCleanupOutcome::Discarded);
            }
            if elapsed >= deadline {
                break;
            }
            tokio::time::sleep(interval).await;
            elapsed += interval;
        }

        let outcome = self
            .retry_chain(|| {
                let chain = self.chain.clone();
                let bytes = cleanup_signed_tx.borsh_bytes.clone();
                async move { chain.send_transaction(&bytes, crate::types::WaitStatus::IncludedFinal).await }
            })
            .await?;
        Ok(DeviceLinkCleanupOutcome::Broadcast { tx_hash: outcome.tx_hash })
    }

    /// Device2's half of step 4: on first subsequent authentication,
    /// derives its own PRF-scoped signing and VRF keypairs for
    /// `account_id`, replaces the temporary FullAccess key with them, and
    /// removes the linking mapping — all signed with the temporary key
    /// Device2 has held since [`Self::generate_device_link_qr`].
    pub async fn claim_device_link(
        &self,
        account_id: &str,
        rp_id: &str,
        contract_id: &str,
        device_number: u32,
        temp_signing_key: &SigningKey,
        confirmation_config: ConfirmationConfig,
    ) -> CoreResult<UserRecord> {
        let temp_public_key = PublicKey::from_ed25519_bytes(temp_signing_key.verifying_key().as_bytes()).to_near_string();

        self.progress("claim_device_link", "requesting credential");
        let mut challenge = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut challenge);
        let credential = self
            .authenticator
            .create(CreateCredentialOptions {
                rp_id: rp_id.to_string(),
                user_id: account_id.to_string(),
                challenge: challenge.to_vec(),
                prf_salt_a: crate::registration::prf_salt(account_id, "a"),
                prf_salt_b: crate::registration::prf_salt(account_id, "b"),
            })
            .await?;
        let (prf_a, prf_b) = credential.prf.require_both()?;
        let attestation_object_b64u = credential
            .attestation_object_b64u
            .as_deref()
            .ok_or_else(|| CoreError::InputValidation("authenticator did not return an attestation object".into()))?;
        let cose_public_key = passkey_keymanager::cose::extract_cose_public_key_from_attestation(attestation_object_b64u)?;

        self.progress("claim_device_link", "deriving device keys");
        let outcome = {
            let mut km = self.key_manager.lock().expect("key manager lock poisoned");
            km.register_account(account_id, prf_a, prf_b, None)?
        };

        self.progress("claim_device_link", "fetching access key and block");
        let tip = self.fetch_fresh_block("final").await?;
        let access_key = self
            .retry_chain(|| {
                let chain = self.chain.clone();
                let account_id = account_id.to_string();
                let temp_public_key = temp_public_key.clone();
                async move { chain.view_access_key(&account_id, &temp_public_key).await }
            })
            .await?;

        let requests = vec![
            TxSigningRequest {
                receiver_id: account_id.to_string(),
                actions: vec![ActionParams::AddKey {
                    public_key: outcome.ed25519_public_key.clone(),
                    access_key: full_access_json().to_string(),
                }],
                nonce: access_key.nonce + 1,
                block_hash: tip.hash_b58.clone(),
            },
            TxSigningRequest {
                receiver_id: account_id.to_string(),
                actions: vec![ActionParams::DeleteKey { public_key: temp_public_key.clone() }],
                nonce: access_key.nonce + 2,
                block_hash: tip.hash_b58.clone(),
            },
            TxSigningRequest {
                receiver_id: contract_id.to_string(),
                actions: vec![ActionParams::FunctionCall {
                    method_name: "remove_device_linking_mapping".to_string(),
                    args: serde_json::json!({ "device_public_key": temp_public_key }).to_string(),
                    gas: "30000000000000".to_string(),
                    deposit: "0".to_string(),
                }],
                nonce: access_key.nonce + 3,
                block_hash: tip.hash_b58.clone(),
            },
        ];

        self.progress("claim_device_link", "confirming and signing");
        let (worker_idx, worker) = self.signer_pool.checkout();
        let cancel = passkey_signer::CancelToken::new();
        let signed = worker
            .sign_transactions(requests, account_id, temp_signing_key, confirmation_config, self.ui.as_ref(), &cancel)
            .await;
        let signed = match signed {
            Ok(s) => s,
            Err(e) => {
                self.signer_pool.report_failed(worker_idx);
                return Err(e.into());
            }
        };

        self.progress("claim_device_link", "broadcasting");
        for tx in &signed {
            self.retry_chain(|| {
                let chain = self.chain.clone();
                let bytes = tx.borsh_bytes.clone();
                async move { chain.send_transaction(&bytes, crate::types::WaitStatus::IncludedFinal).await }
            })
            .await?;
        }

        let now = now_ms() as u64;
        let record = UserRecord {
            account_id: account_id.to_string(),
            device_number,
            ed25519_public_key: outcome.ed25519_public_key.clone(),
            encrypted_ed25519_key: outcome.encrypted_ed25519_key,
            encrypted_vrf_keypair: outcome.encrypted_vrf_keypair,
            server_encrypted_vrf_keypair: None,
            preferences: serde_json::Value::Null,
            last_login_ms: now,
            registered_at_ms: now,
        };
        let authenticator_record = AuthenticatorRecord {
            credential_id: passkey_crypto::encoders::base64_url_encode(&credential.credential_id),
            credential_public_key: cose_public_key,
            transports: if credential.transports.is_empty() {
                vec![AuthenticatorTransport::Internal]
            } else {
                credential.transports.clone()
            },
            device_number,
            registered_at_ms: now,
            vrf_public_key: outcome.vrf_public_key,
            user_verification_policy: "required".to_string(),
            origin_policy: rp_id.to_string(),
        };
        self.storage.put_user_record(record.clone()).await?;
        self.storage.put_authenticator(account_id, authenticator_record).await?;
        self.storage.set_last_user(Some(account_id)).await?;
        self.set_login_state(crate::types::LoginState::LoggedIn { account_id: account_id.to_string(), device_number });
        self.progress("claim_device_link", "complete");

        Ok(record)
    }
}
