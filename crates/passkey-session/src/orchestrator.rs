//! `SessionOrchestrator` — spec.md §4.6. Composes KM/VE/SE/SC against a
//! pluggable `ChainClient`/`RelayClient`/`Authenticator`/`Storage`/
//! `UiCollaborator`. No single teacher file owns this composition: it
//! replaces the handler dispatch in `wasm_signer_worker/src/lib.rs::
//! handle_signer_message_inner`, which enumerates exactly these operations
//! as message types, restated as ordinary async methods on one struct.

use std::future::Future;
use std::sync::{Arc, Mutex};

use rand::Rng;

use passkey_keymanager::KeyManager;
use passkey_shamir::Shamir3Pass;

use crate::collaborators::{Authenticator, ChainClient, NoOpProgressSink, ProgressSink, RelayClient, Storage, UiCollaborator};
use crate::config::SessionConfig;
use crate::error::{ChainErrorKind, CoreError, CoreResult};
use crate::pool::WorkerPool;
use crate::types::{BlockView, LoginState};

/// Owns the process-wide unlocked session (at most one account at a time,
/// spec.md §4.4) plus every collaborator the flows in `registration.rs`,
/// `login.rs`, `transaction.rs`, `recovery.rs`, and `device_link.rs` drive.
/// All secret-touching operations serialize behind `key_manager`'s mutex
/// (spec.md §5); read-only collaborator calls are not held behind it.
pub struct SessionOrchestrator {
    pub(crate) key_manager: Mutex<KeyManager>,
    pub(crate) shamir: Shamir3Pass,
    pub(crate) signer_pool: WorkerPool,
    pub(crate) chain: Arc<dyn ChainClient>,
    pub(crate) relay: Option<Arc<dyn RelayClient>>,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) ui: Arc<dyn UiCollaborator>,
    pub(crate) progress: Arc<dyn ProgressSink>,
    pub(crate) config: SessionConfig,
    pub(crate) login_state: Mutex<LoginState>,
}

impl SessionOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<dyn ChainClient>,
        relay: Option<Arc<dyn RelayClient>>,
        authenticator: Arc<dyn Authenticator>,
        storage: Arc<dyn Storage>,
        ui: Arc<dyn UiCollaborator>,
        config: SessionConfig,
    ) -> CoreResult<Self> {
        Ok(Self {
            key_manager: Mutex::new(KeyManager::new()?),
            shamir: Shamir3Pass::with_default_prime()?,
            signer_pool: WorkerPool::new(config.worker_pool_size),
            chain,
            relay,
            authenticator,
            storage,
            ui,
            progress: Arc::new(NoOpProgressSink),
            config,
            login_state: Mutex::new(LoginState::LoggedOut),
        })
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn login_state(&self) -> LoginState {
        self.login_state.lock().expect("login state lock poisoned").clone()
    }

    pub(crate) fn set_login_state(&self, state: LoginState) {
        *self.login_state.lock().expect("login state lock poisoned") = state;
    }

    pub(crate) fn progress(&self, stage: &str, detail: &str) {
        self.progress.on_progress(stage, detail);
    }

    /// Fetches a fresh block via the `ChainClient`, retrying transient
    /// errors with jittered exponential backoff up to the configured
    /// ceiling (spec.md §7: "transient ones retried with jittered
    /// exponential backoff up to a caller-specified ceiling").
    pub(crate) async fn fetch_fresh_block(&self, finality: &str) -> CoreResult<BlockView> {
        let chain = self.chain.clone();
        let finality = finality.to_string();
        self.retry_chain(move || {
            let chain = chain.clone();
            let finality = finality.clone();
            async move { chain.view_block(&finality).await }
        })
        .await
    }

    /// Generic transient-RPC retry wrapper: retries `CoreError::ChainError
    /// { kind: Transient, .. }` up to `chain_retry_max_attempts` times with
    /// jittered exponential backoff; any other error (including
    /// `ChainErrorKind::Fatal`) propagates immediately.
    pub(crate) async fn retry_chain<F, Fut, T>(&self, mut f: F) -> CoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoreResult<T>>,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Ok(v) => return Ok(v),
                Err(CoreError::ChainError { kind: ChainErrorKind::Transient, message })
                    if attempt + 1 < self.config.chain_retry_max_attempts =>
                {
                    attempt += 1;
                    let backoff = self.config.chain_retry_base_backoff * 2u32.pow(attempt.min(6));
                    let jitter_ms = rand::thread_rng().gen_range(0..=backoff.as_millis() as u64 / 2 + 1);
                    let delay = backoff + std::time::Duration::from_millis(jitter_ms);
                    self.progress("chain_retry", &format!("attempt {attempt} after transient error: {message}"));
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Derives this device's Shamir client exponent pair deterministically
    /// from PRF-A (spec.md §4.3's exponent-persistence Open Question): the
    /// same authenticator, asked for the same PRF-A salt, reproduces the
    /// same `(e_c, d_c)` every time, so the core never has to persist a
    /// secret exponent to durable storage between registration and login.
    pub(crate) fn derive_shamir_exponents(&self, prf_a: &[u8], account_id: &str) -> CoreResult<passkey_shamir::ExponentPair> {
        let seed = passkey_crypto::kdf::hkdf_sha256_32(account_id.as_bytes(), prf_a, b"w3a/shamir-exponent/v1")?;
        Ok(self.shamir.generate_exponent_pair_from_seed(seed)?)
    }

    /// Checks a `VrfChallenge`'s `blockHeight` against the current chain
    /// tip and the configured freshness window (spec.md §3, §8 scenario
    /// 2's `StaleChallenge` rejection).
    pub(crate) async fn assert_challenge_fresh(&self, challenge_block_height: u64) -> CoreResult<()> {
        let tip = self.fetch_fresh_block("optimistic").await?;
        if tip.height.saturating_sub(challenge_block_height) > self.config.freshness_window_blocks {
            return Err(CoreError::StaleChallenge {
                block_height: challenge_block_height,
                window: self.config.freshness_window_blocks,
            });
        }
        Ok(())
    }
}
