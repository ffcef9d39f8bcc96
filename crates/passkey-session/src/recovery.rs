//! Account recovery — spec.md §4.6's two-phase flow: *discover* candidate
//! credentials from the contract without touching any PRF, then *recover*
//! by running a WebAuthn `get()` restricted to the chosen credential,
//! deterministically re-deriving the signing and VRF keypairs, and
//! verifying the result actually has access on-chain before trusting it.
//! Grounded on `wasm_signer_worker/src/handlers/
//! handle_recover_keypair_from_passkey.rs`; the contract query shape
//! (`get_credential_ids_by_account`) is spec.md §4.6's own name, which the
//! teacher's WASM bridge does not call directly (it happens in the
//! TypeScript layer, out of this core's scope) — modeled here as a thin
//! `ChainClient::view` call instead.

use passkey_keymanager::AuthenticatorRecord;

use crate::error::{CoreError, CoreResult};
use crate::orchestrator::SessionOrchestrator;
use crate::types::{GetCredentialOptions, RecoveryCandidate};

impl SessionOrchestrator {
    /// *Discover*: lists the account's registered credentials from the
    /// contract so the caller can offer the user a safe selection view.
    /// Touches no PRF and mutates no local state (spec.md §4.6).
    pub async fn discover_recovery_candidates(&self, contract_id: &str, account_id: &str) -> CoreResult<Vec<RecoveryCandidate>> {
        if account_id.is_empty() {
            return Err(CoreError::InputValidation("account_id is required".into()));
        }
        let args = serde_json::json!({ "account_id": account_id });
        let result = self.chain.view(contract_id, "get_credential_ids_by_account", args).await?;
        let ids = result
            .as_array()
            .ok_or_else(|| CoreError::InputValidation("contract did not return a credential id array".into()))?;

        Ok(ids
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_str().map(|id| RecoveryCandidate {
                credential_id: id.to_string(),
                display_name: format!("Passkey #{}", i + 1),
            }))
            .collect())
    }

    /// *Recover*: restricts the WebAuthn ceremony to `credential_id_b64u`,
    /// harvests both PRF outputs, deterministically re-derives the Ed25519
    /// and VRF keypairs, and refuses the result unless the derived public
    /// key actually has an access key on `account_id` (`AccountMismatch`
    /// otherwise — spec.md §4.6, §7). Re-syncs the local authenticator list
    /// from the contract and leaves the VRF keypair unlocked. Idempotent:
    /// repeating this flow with the same inputs yields byte-identical key
    /// material (spec.md §8 scenario 1).
    pub async fn recover_account(
        &self,
        contract_id: &str,
        account_id: &str,
        rp_id: &str,
        device_number: u32,
        credential_id_b64u: &str,
    ) -> CoreResult<(String, String)> {
        if account_id.is_empty() || rp_id.is_empty() || credential_id_b64u.is_empty() {
            return Err(CoreError::InputValidation(
                "account_id, rp_id, and credential_id are required".into(),
            ));
        }
        let credential_id_bytes = passkey_crypto::encoders::base64_url_decode(credential_id_b64u)
            .map_err(|_| CoreError::InputValidation("malformed credential id".into()))?;

        self.progress("recover", "requesting assertion");
        let mut challenge = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut challenge);
        let credential = self
            .authenticator
            .get(GetCredentialOptions {
                rp_id: rp_id.to_string(),
                challenge: challenge.to_vec(),
                allow_credential_ids: vec![credential_id_bytes],
                prf_salt_a: crate::registration::prf_salt(account_id, "a"),
                prf_salt_b: crate::registration::prf_salt(account_id, "b"),
            })
            .await?;
        let (prf_a, prf_b) = credential.prf.require_both()?;

        self.progress("recover", "re-deriving keys");
        let outcome = {
            let mut km = self.key_manager.lock().expect("key manager lock poisoned");
            km.recover_keypair(account_id, prf_a, prf_b)?
        };

        self.progress("recover", "verifying on-chain access");
        if self.chain.view_access_key(account_id, &outcome.ed25519_public_key).await.is_err() {
            let mut km = self.key_manager.lock().expect("key manager lock poisoned");
            km.lock_session();
            return Err(CoreError::AccountMismatch);
        }

        self.progress("recover", "syncing authenticators");
        let remote = self
            .chain
            .view(contract_id, "get_authenticators_by_account", serde_json::json!({ "account_id": account_id }))
            .await?;
        if let Ok(records) = serde_json::from_value::<Vec<AuthenticatorRecord>>(remote) {
            self.storage.delete_authenticators(account_id).await?;
            for record in records {
                self.storage.put_authenticator(account_id, record).await?;
            }
        }

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let existing = self.storage.get_user_record(account_id).await?;
        let user_record = passkey_keymanager::UserRecord {
            account_id: account_id.to_string(),
            device_number,
            ed25519_public_key: outcome.ed25519_public_key.clone(),
            encrypted_ed25519_key: outcome.encrypted_ed25519_key,
            encrypted_vrf_keypair: outcome.encrypted_vrf_keypair,
            server_encrypted_vrf_keypair: existing.and_then(|e| e.server_encrypted_vrf_keypair),
            preferences: serde_json::Value::Null,
            last_login_ms: now,
            registered_at_ms: now,
        };
        self.storage.put_user_record(user_record).await?;
        self.storage.set_last_user(Some(account_id)).await?;
        self.set_login_state(crate::types::LoginState::LoggedIn { account_id: account_id.to_string(), device_number });
        self.progress("recover", "complete");

        Ok((account_id.to_string(), outcome.ed25519_public_key))
    }
}
