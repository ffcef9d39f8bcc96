//! Login flow — spec.md §4.6 step 2. Fetches the stored record, asks the
//! authenticator for a fresh assertion carrying both PRF outputs, unlocks
//! the VRF keypair (directly from PRF-A, or via a Shamir relay round trip
//! when the account enrolled one), and marks the session logged in.
//! Grounded on `wasm_vrf_worker/src/handlers/handle_unlock_vrf_keypair.rs`.

use crate::error::{CoreError, CoreResult};
use crate::orchestrator::SessionOrchestrator;
use crate::types::{GetCredentialOptions, LoginState};

impl SessionOrchestrator {
    /// Logs in to `account_id_hint`, or the last-used account if `None`.
    /// Only one account can be unlocked at a time (spec.md §4.2); a
    /// successful login here replaces whatever the Key Manager previously
    /// had unlocked.
    pub async fn login(&self, account_id_hint: Option<&str>, rp_id: &str) -> CoreResult<LoginState> {
        let account_id = match account_id_hint {
            Some(id) => id.to_string(),
            None => self
                .storage
                .get_last_user()
                .await?
                .ok_or_else(|| CoreError::InputValidation("no account to log into and none was specified".into()))?,
        };

        self.progress("login", "loading record");
        let record = self
            .storage
            .get_user_record(&account_id)
            .await?
            .ok_or_else(|| CoreError::InputValidation(format!("no stored record for {account_id}")))?;
        let authenticators = self.storage.list_authenticators(&account_id).await?;
        let allow_credential_ids = authenticators
            .iter()
            .filter_map(|a| passkey_crypto::encoders::base64_url_decode(&a.credential_id).ok())
            .collect::<Vec<_>>();

        self.progress("login", "requesting assertion");
        let mut challenge = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut challenge);

        let credential = self
            .authenticator
            .get(GetCredentialOptions {
                rp_id: rp_id.to_string(),
                challenge: challenge.to_vec(),
                allow_credential_ids,
                prf_salt_a: crate::registration::prf_salt(&account_id, "a"),
                prf_salt_b: crate::registration::prf_salt(&account_id, "b"),
            })
            .await?;
        let (prf_a, _prf_b) = credential.prf.require_both()?;

        self.progress("login", "unlocking VRF keypair");
        match &record.server_encrypted_vrf_keypair {
            Some(server_encrypted) if self.relay.is_some() => {
                let relay = self.relay.as_ref().expect("checked above");
                let client_exponents = self.derive_shamir_exponents(prf_a, &account_id)?;
                let kek_s_b64u = relay.remove_server_lock(&server_encrypted.server_locked_kek_b64u).await?;
                let kek_s_bytes = passkey_crypto::encoders::base64_url_decode(&kek_s_b64u)
                    .map_err(|_| CoreError::RelayLockError("relay returned malformed kek_s".into()))?;
                let server_unlocked_scalar = passkey_crypto::num_bigint::BigUint::from_bytes_be(&kek_s_bytes);

                let mut km = self.key_manager.lock().expect("key manager lock poisoned");
                km.unlock_vrf_keypair_via_shamir(
                    &account_id,
                    &record.encrypted_vrf_keypair,
                    prf_a,
                    &client_exponents,
                    &server_unlocked_scalar,
                )?;
            }
            _ => {
                let mut km = self.key_manager.lock().expect("key manager lock poisoned");
                km.unlock_vrf_keypair(&account_id, prf_a, &record.encrypted_vrf_keypair)?;
            }
        }

        self.storage.set_last_user(Some(&account_id)).await?;
        let state = LoginState::LoggedIn { account_id, device_number: record.device_number };
        self.set_login_state(state.clone());
        self.progress("login", "complete");
        Ok(state)
    }

    /// `logout()`: clears the unlocked VRF keypair and the session's login
    /// state, without touching durable storage (spec.md §4.2).
    pub fn logout(&self) {
        self.key_manager.lock().expect("key manager lock poisoned").lock_session();
        self.set_login_state(LoginState::LoggedOut);
    }
}
