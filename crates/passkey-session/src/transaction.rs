//! Transaction execution — spec.md §4.6 step 3. Pulls a fresh access-key
//! nonce and block via the `ChainClient`, assigns strictly increasing
//! nonces to a batch, drives a confirm-handshake signing ceremony on a
//! pooled `SignerCore`, and broadcasts the results. Grounded on the
//! `SIGN_AND_SEND_TRANSACTIONS` branch of `wasm_signer_worker/src/lib.rs::
//! handle_signer_message_inner` composed with `handlers/
//! handle_sign_transactions_with_actions.rs`'s nonce-sequencing.

use passkey_signer::{ConfirmationConfig, TxSigningRequest};

use crate::error::{CoreError, CoreResult};
use crate::orchestrator::SessionOrchestrator;
use crate::types::{GetCredentialOptions, PendingTxRequest, SignAndSendResult, WaitStatus};

impl SessionOrchestrator {
    /// `signAndSendTransactions(...) -> [{txHash, outcome}]` (spec.md §6).
    ///
    /// Requires the account's VRF keypair to already be unlocked (i.e. a
    /// prior `login()`): the VRF challenge bound to this batch's intent
    /// digest is what the platform authenticator signs over, and the Key
    /// Manager refuses to emit a challenge for an account it hasn't
    /// unlocked.
    pub async fn sign_and_send_transactions(
        &self,
        account_id: &str,
        rp_id: &str,
        requests: Vec<PendingTxRequest>,
        confirmation_config: ConfirmationConfig,
        wait_status: WaitStatus,
    ) -> CoreResult<Vec<SignAndSendResult>> {
        if requests.is_empty() {
            return Err(CoreError::InputValidation("no transactions provided for signing".into()));
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

        self.progress("sign_and_send", "fetching access key and block");
        let tip = self.fetch_fresh_block("final").await?;
        let access_key = self
            .retry_chain(|| {
                let chain = self.chain.clone();
                let account_id = account_id.to_string();
                let public_key = record.ed25519_public_key.clone();
                async move { chain.view_access_key(&account_id, &public_key).await }
            })
            .await?;

        // Nonces within a batch are base+1, base+2, ... strictly
        // increasing (spec.md §4.6, §5, §8 scenario "Nonces in a batch of
        // N are base+1 ... base+N").
        let tx_requests: Vec<TxSigningRequest> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| TxSigningRequest {
                receiver_id: r.receiver_id.clone(),
                actions: r.actions.clone(),
                nonce: access_key.nonce + 1 + i as u64,
                block_hash: tip.hash_b58.clone(),
            })
            .collect();

        let intent_digest = passkey_signer::compute_intent_digest(&tx_requests)?;

        self.progress("sign_and_send", "requesting assertion");
        let vrf_challenge = {
            let km = self.key_manager.lock().expect("key manager lock poisoned");
            km.generate_vrf_challenge(
                account_id,
                passkey_vrf::VrfInputData {
                    user_id: account_id.to_string(),
                    rp_id: rp_id.to_string(),
                    block_height: tip.height.to_string(),
                    block_hash: tip.hash_b58.clone(),
                    intent_digest: Some(intent_digest.clone()),
                    session_policy_digest_32: None,
                },
            )?
        };
        let challenge_bytes = passkey_crypto::encoders::base64_url_decode(&vrf_challenge.vrf_output)
            .map_err(|_| CoreError::InputValidation("VRF engine produced a malformed challenge".into()))?;

        let authenticators = self.storage.list_authenticators(account_id).await?;
        let allow_credential_ids = authenticators
            .iter()
            .filter_map(|a| passkey_crypto::encoders::base64_url_decode(&a.credential_id).ok())
            .collect::<Vec<_>>();

        let credential = self
            .authenticator
            .get(GetCredentialOptions {
                rp_id: rp_id.to_string(),
                challenge: challenge_bytes,
                allow_credential_ids,
                prf_salt_a: crate::registration::prf_salt(account_id, "a"),
                prf_salt_b: crate::registration::prf_salt(account_id, "b"),
            })
            .await?;
        let (prf_a, _prf_b) = credential.prf.require_both()?;

        self.progress("sign_and_send", "decrypting signing key");
        let mut seed = {
            let km = self.key_manager.lock().expect("key manager lock poisoned");
            km.decrypt_ed25519_key(&record.encrypted_ed25519_key, prf_a, account_id, &record.ed25519_public_key)?
        };
        let signing_key = passkey_crypto::ed25519::from_seed(&seed)?;
        zeroize::Zeroize::zeroize(&mut seed);

        self.progress("sign_and_send", "confirming and signing");
        let (worker_idx, worker) = self.signer_pool.checkout();
        let cancel = passkey_signer::CancelToken::new();
        let signed = worker
            .sign_transactions(tx_requests, account_id, &signing_key, confirmation_config, self.ui.as_ref(), &cancel)
            .await;
        let signed = match signed {
            Ok(signed) => signed,
            Err(e) => {
                // spec.md §5: "a failed worker is terminated and replaced,
                // never reused". A sandbox that errored mid-ceremony might
                // be left holding partial state (e.g. its busy flag), so
                // it is evicted from the pool rather than handed out again.
                self.signer_pool.report_failed(worker_idx);
                return Err(e.into());
            }
        };

        self.progress("sign_and_send", "broadcasting");
        let mut results = Vec::with_capacity(signed.len());
        for tx in signed {
            let borsh_bytes = tx.borsh_bytes.clone();
            let outcome = self
                .retry_chain(|| {
                    let chain = self.chain.clone();
                    let borsh_bytes = borsh_bytes.clone();
                    async move { chain.send_transaction(&borsh_bytes, wait_status).await }
                })
                .await?;
            results.push(SignAndSendResult {
                tx_hash: format!("{}", bs58::encode(tx.tx_hash.0).into_string()),
                outcome,
            });
        }

        self.progress("sign_and_send", "complete");
        Ok(results)
    }

    /// `signNEP413(...) -> {accountId, publicKey, signatureB64, stateB64?}`
    /// (spec.md §6). Independent of the batch-signing confirm handshake
    /// (spec.md §4.5): authorized by the caller already having unlocked the
    /// account via `login()`, plus a fresh PRF-A assertion to decrypt the
    /// signing key for this one ceremony.
    pub async fn sign_nep413(
        &self,
        account_id: &str,
        rp_id: &str,
        message: &str,
        recipient: &str,
        nonce: &[u8; 32],
        state: Option<String>,
    ) -> CoreResult<passkey_signer::Nep413Signature> {
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

        let mut challenge = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut challenge);
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

        let mut seed = {
            let km = self.key_manager.lock().expect("key manager lock poisoned");
            km.decrypt_ed25519_key(&record.encrypted_ed25519_key, prf_a, account_id, &record.ed25519_public_key)?
        };
        let signing_key = passkey_crypto::ed25519::from_seed(&seed)?;
        zeroize::Zeroize::zeroize(&mut seed);

        let (_worker_idx, worker) = self.signer_pool.checkout();
        Ok(worker.sign_nep413(account_id, &signing_key, message, recipient, nonce, state)?)
    }
}
