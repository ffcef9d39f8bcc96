//! Registration flow — spec.md §4.6 step 1. Composes `Authenticator::create`,
//! the Key Manager's `register_account`, optional Shamir enrollment, durable
//! storage, and a relay-sponsored on-chain `create_account_and_register_user`
//! call. Grounded on the handler sequence in `wasm_signer_worker/src/lib.rs::
//! handle_signer_message_inner`'s `REGISTER_ACCOUNT` branch, restated without
//! the message-dispatch boundary.

use std::time::{SystemTime, UNIX_EPOCH};

use passkey_keymanager::{AuthenticatorRecord, AuthenticatorTransport, UserRecord};
use passkey_vrf::VrfInputData;

use crate::error::{CoreError, CoreResult};
use crate::orchestrator::SessionOrchestrator;
use crate::types::{CreateCredentialOptions, LoginState};

fn now_ms() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
}

impl SessionOrchestrator {
    /// Registers a brand-new account: creates a WebAuthn credential with
    /// dual PRF salts, derives and encrypts the Ed25519 signing key and VRF
    /// keypair from the two PRF outputs, optionally enrolls the VRF KEK
    /// behind a Shamir relay, persists the result, and asks the relay to
    /// submit `create_account_and_register_user` on-chain. On any failure
    /// after the durable writes, the partial record is rolled back
    /// atomically (spec.md §4.6: "On any failure after IndexedDB writes, SO
    /// performs atomic rollback").
    pub async fn register(
        &self,
        account_id: &str,
        rp_id: &str,
        device_number: u32,
        relayer_contract_id: &str,
        enroll_shamir: bool,
    ) -> CoreResult<UserRecord> {
        if account_id.is_empty() || rp_id.is_empty() {
            return Err(CoreError::InputValidation("account_id and rp_id are required".into()));
        }

        self.progress("register", "requesting credential");
        let tip = self.fetch_fresh_block("final").await?;

        let mut challenge = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut challenge);

        let credential = self
            .authenticator
            .create(CreateCredentialOptions {
                rp_id: rp_id.to_string(),
                user_id: account_id.to_string(),
                challenge: challenge.to_vec(),
                prf_salt_a: prf_salt(account_id, "a"),
                prf_salt_b: prf_salt(account_id, "b"),
            })
            .await?;
        let (prf_a, prf_b) = credential.prf.require_both()?;

        let attestation_object_b64u = credential
            .attestation_object_b64u
            .as_deref()
            .ok_or_else(|| CoreError::InputValidation("authenticator did not return an attestation object".into()))?;
        let cose_public_key = passkey_keymanager::cose::extract_cose_public_key_from_attestation(attestation_object_b64u)?;

        self.progress("register", "deriving keys");
        let vrf_challenge_input = VrfInputData {
            user_id: account_id.to_string(),
            rp_id: rp_id.to_string(),
            block_height: tip.height.to_string(),
            block_hash: tip.hash_b58.clone(),
            intent_digest: None,
            session_policy_digest_32: None,
        };

        let outcome = {
            let mut km = self.key_manager.lock().expect("key manager lock poisoned");
            km.register_account(account_id, prf_a, prf_b, Some(vrf_challenge_input))?
        };

        // Shamir enrollment locks the KEK under the client's exponent and
        // hands the client-locked scalar to the relay, which locks it again
        // under its own exponent and hands back `kek_cs` — the only form
        // ever persisted. Recovering the plaintext KEK always needs a fresh
        // `removeServerLock` round trip (done in `login.rs`), so refusing
        // that cooperation is enough to block login even with PRF-A intact.
        let server_encrypted_vrf_keypair = if enroll_shamir {
            let relay = self
                .relay
                .as_ref()
                .ok_or_else(|| CoreError::RelayLockError("Shamir enrollment requested but no relay is configured".into()))?;
            let client_exponents = self.derive_shamir_exponents(prf_a, account_id)?;
            let locked = {
                let km = self.key_manager.lock().expect("key manager lock poisoned");
                km.enroll_shamir_vrf_kek(&outcome.encrypted_vrf_keypair, &client_exponents)?
            };
            let kek_cs_b64u = relay.apply_server_lock(&locked.server_locked_kek_b64u).await?;
            Some(passkey_vrf::ServerEncryptedVrfKeypair {
                encrypted_vrf_keypair: outcome.encrypted_vrf_keypair.clone(),
                server_locked_kek_b64u: kek_cs_b64u,
            })
        } else {
            None
        };

        let now = now_ms();
        let vrf_public_key = outcome.vrf_public_key.clone();
        let record = UserRecord {
            account_id: account_id.to_string(),
            device_number,
            ed25519_public_key: outcome.ed25519_public_key.clone(),
            encrypted_ed25519_key: outcome.encrypted_ed25519_key,
            encrypted_vrf_keypair: outcome.encrypted_vrf_keypair,
            server_encrypted_vrf_keypair,
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
            vrf_public_key,
            user_verification_policy: "required".to_string(),
            origin_policy: rp_id.to_string(),
        };

        self.progress("register", "persisting record");
        self.storage.put_user_record(record.clone()).await?;
        self.storage.put_authenticator(account_id, authenticator_record).await?;

        self.progress("register", "submitting on-chain registration");
        let args = serde_json::json!({
            "account_id": account_id,
            "ed25519_public_key": record.ed25519_public_key,
        });
        if let Err(e) = self.chain.call_function(relayer_contract_id, "create_account_and_register_user", args).await {
            self.storage.rollback_user_registration(account_id).await?;
            {
                let mut km = self.key_manager.lock().expect("key manager lock poisoned");
                km.lock_session();
            }
            return Err(e);
        }

        self.storage.set_last_user(Some(account_id)).await?;
        self.set_login_state(LoginState::LoggedIn { account_id: account_id.to_string(), device_number });
        self.progress("register", "complete");

        Ok(record)
    }
}

/// Derives a stable, account- and purpose-scoped PRF salt so the two WebAuthn
/// PRF evaluations for one credential never collide across accounts.
pub(crate) fn prf_salt(account_id: &str, purpose: &str) -> Vec<u8> {
    passkey_crypto::hash::sha256(format!("w3a/prf-salt/{purpose}/{account_id}").as_bytes()).to_vec()
}
