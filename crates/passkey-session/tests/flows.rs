//! End-to-end flow tests over `SessionOrchestrator`, driven entirely through
//! in-memory fakes of the five collaborator traits. No real network, chain,
//! or platform authenticator is touched; the fakes exist only to give the
//! orchestrator enough of a world to run its flows against.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use passkey_keymanager::{AuthenticatorRecord, UserRecord};
use passkey_session::{
    AccessKeyView, Authenticator, BlockView, CancelToken, ChainClient, ChainErrorKind, CoreError,
    CoreResult, CreateCredentialOptions, DeviceLinkCleanupOutcome, GetCredentialOptions,
    LoginState, PendingTxRequest, RelayClient, SessionConfig, SessionOrchestrator, Storage,
    TxOutcome, UiCollaborator, WaitStatus, WebAuthnCredential,
};
use passkey_signer::{
    ActionParams, ConfirmationConfig, PromptUserConfirm, PublicKey, SignerError, SignerResult,
    UserConfirmResponse,
};

fn prf_for(account_id: &str, tag: &str) -> Vec<u8> {
    passkey_crypto::hash::sha256(format!("{account_id}/{tag}").as_bytes()).to_vec()
}

fn fake_attestation_object() -> String {
    let cose_key = vec![0xa1, 0x01, 0x02];
    let mut auth_data = Vec::new();
    auth_data.extend_from_slice(&[0u8; 32]); // rpIdHash
    auth_data.push(0x40); // attested credential data present
    auth_data.extend_from_slice(&[0u8; 4]); // counter
    auth_data.extend_from_slice(&[0u8; 16]); // AAGUID
    let cred_id = b"fake-cred-id";
    auth_data.extend_from_slice(&(cred_id.len() as u16).to_be_bytes());
    auth_data.extend_from_slice(cred_id);
    auth_data.extend_from_slice(&cose_key);

    let value = ciborium::value::Value::Map(vec![(
        ciborium::value::Value::Text("authData".to_string()),
        ciborium::value::Value::Bytes(auth_data),
    )]);
    let mut bytes = Vec::new();
    ciborium::into_writer(&value, &mut bytes).unwrap();
    passkey_crypto::encoders::base64_url_encode(&bytes)
}

/// Always returns a credential whose PRF outputs are a deterministic
/// function of the `user_id`/account hint the caller passed in, so the same
/// "device" produces the same keys across `register`/`login`/`recover`.
struct FakeAuthenticator {
    credential_id: Vec<u8>,
}

impl FakeAuthenticator {
    fn new() -> Self {
        Self { credential_id: b"fake-cred-id".to_vec() }
    }
}

#[async_trait]
impl Authenticator for FakeAuthenticator {
    async fn create(&self, options: CreateCredentialOptions) -> CoreResult<WebAuthnCredential> {
        Ok(WebAuthnCredential {
            credential_id: self.credential_id.clone(),
            prf: passkey_session::PrfOutputs {
                first: prf_for(&options.user_id, "a"),
                second: Some(prf_for(&options.user_id, "b")),
            },
            attestation_object_b64u: Some(fake_attestation_object()),
            transports: vec![],
        })
    }

    async fn get(&self, options: GetCredentialOptions) -> CoreResult<WebAuthnCredential> {
        // The fakes key PRF derivation off the account id baked into the
        // salts, since `GetCredentialOptions` carries no account hint.
        let account_id = account_id_from_prf_salt(&options.prf_salt_a)
            .ok_or_else(|| CoreError::InputValidation("test fixture could not recover account id".into()))?;
        Ok(WebAuthnCredential {
            credential_id: self.credential_id.clone(),
            prf: passkey_session::PrfOutputs {
                first: prf_for(&account_id, "a"),
                second: Some(prf_for(&account_id, "b")),
            },
            attestation_object_b64u: None,
            transports: vec![],
        })
    }
}

/// Inverts `crate::registration::prf_salt`'s one-way hash is not possible;
/// instead the fakes keep a small registry mapping a salt back to the
/// account id that produced it, populated as each test registers accounts.
fn account_id_from_prf_salt(salt: &[u8]) -> Option<String> {
    SALT_REGISTRY
        .lock()
        .unwrap()
        .iter()
        .find(|(s, _)| s.as_slice() == salt)
        .map(|(_, a)| a.clone())
}

static SALT_REGISTRY: StdMutex<Vec<(Vec<u8>, String)>> = StdMutex::new(Vec::new());

fn register_salts_for(account_id: &str) {
    let salt_a = prf_salt_like(account_id, "a");
    let salt_b = prf_salt_like(account_id, "b");
    let mut reg = SALT_REGISTRY.lock().unwrap();
    reg.push((salt_a, account_id.to_string()));
    reg.push((salt_b, account_id.to_string()));
}

fn prf_salt_like(account_id: &str, purpose: &str) -> Vec<u8> {
    passkey_crypto::hash::sha256(format!("w3a/prf-salt/{purpose}/{account_id}").as_bytes()).to_vec()
}

#[derive(Default)]
struct ChainState {
    height: u64,
    hash: String,
    access_keys: HashMap<(String, String), u64>,
    views: HashMap<(String, String), serde_json::Value>,
    broadcasts: Vec<Vec<u8>>,
}

struct FakeChainClient {
    state: Mutex<ChainState>,
}

impl FakeChainClient {
    fn new() -> Self {
        Self {
            state: Mutex::new(ChainState {
                height: 1000,
                hash: bs58::encode([9u8; 32]).into_string(),
                ..Default::default()
            }),
        }
    }

    fn insert_access_key(&self, account_id: &str, public_key: &str, nonce: u64) {
        self.state
            .lock()
            .unwrap()
            .access_keys
            .insert((account_id.to_string(), public_key.to_string()), nonce);
    }

    fn remove_access_key(&self, account_id: &str, public_key: &str) {
        self.state
            .lock()
            .unwrap()
            .access_keys
            .remove(&(account_id.to_string(), public_key.to_string()));
    }

    fn set_view(&self, contract_id: &str, method: &str, value: serde_json::Value) {
        self.state
            .lock()
            .unwrap()
            .views
            .insert((contract_id.to_string(), method.to_string()), value);
    }

    fn broadcast_count(&self) -> usize {
        self.state.lock().unwrap().broadcasts.len()
    }
}

#[async_trait]
impl ChainClient for FakeChainClient {
    async fn view_access_key(&self, account_id: &str, public_key: &str) -> CoreResult<AccessKeyView> {
        let state = self.state.lock().unwrap();
        state
            .access_keys
            .get(&(account_id.to_string(), public_key.to_string()))
            .map(|nonce| AccessKeyView { nonce: *nonce })
            .ok_or_else(|| CoreError::ChainError {
                kind: ChainErrorKind::Fatal,
                message: format!("no access key for {public_key} on {account_id}"),
            })
    }

    async fn view_block(&self, _finality: &str) -> CoreResult<BlockView> {
        let state = self.state.lock().unwrap();
        Ok(BlockView { height: state.height, hash_b58: state.hash.clone() })
    }

    async fn view(&self, contract_id: &str, method: &str, _args: serde_json::Value) -> CoreResult<serde_json::Value> {
        let state = self.state.lock().unwrap();
        Ok(state
            .views
            .get(&(contract_id.to_string(), method.to_string()))
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![])))
    }

    async fn call_function(&self, _contract_id: &str, _method: &str, _args: serde_json::Value) -> CoreResult<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn send_transaction(&self, borsh_bytes: &[u8], _wait_status: WaitStatus) -> CoreResult<TxOutcome> {
        let mut state = self.state.lock().unwrap();
        state.broadcasts.push(borsh_bytes.to_vec());
        Ok(TxOutcome {
            tx_hash: bs58::encode(passkey_crypto::hash::sha256(borsh_bytes)).into_string(),
            success: true,
            logs: vec![],
        })
    }
}

/// Plays the server half of the Shamir three-pass protocol for real, using
/// its own exponent pair against the same default prime the orchestrator's
/// engine uses — the only way `apply_server_lock`/`remove_server_lock` can
/// cooperate meaningfully with the client math in `login.rs`/`registration.rs`.
struct FakeRelayClient {
    engine: passkey_shamir::Shamir3Pass,
    exponents: passkey_shamir::ExponentPair,
}

impl FakeRelayClient {
    fn new() -> Self {
        let engine = passkey_shamir::Shamir3Pass::with_default_prime().unwrap();
        let exponents = engine.generate_exponent_pair().unwrap();
        Self { engine, exponents }
    }
}

#[async_trait]
impl RelayClient for FakeRelayClient {
    async fn apply_server_lock(&self, kek_c_b64u: &str) -> CoreResult<String> {
        let bytes = passkey_crypto::encoders::base64_url_decode(kek_c_b64u)
            .map_err(|_| CoreError::RelayLockError("malformed kek_c".into()))?;
        let client_locked = passkey_crypto::num_bigint::BigUint::from_bytes_be(&bytes);
        let double_locked = self
            .engine
            .server_lock(&client_locked, &self.exponents)
            .map_err(|e| CoreError::RelayLockError(e.to_string()))?;
        Ok(passkey_crypto::encoders::base64_url_encode(&double_locked.to_bytes_be()))
    }

    async fn remove_server_lock(&self, kek_cs_b64u: &str) -> CoreResult<String> {
        let bytes = passkey_crypto::encoders::base64_url_decode(kek_cs_b64u)
            .map_err(|_| CoreError::RelayLockError("malformed kek_cs".into()))?;
        let double_locked = passkey_crypto::num_bigint::BigUint::from_bytes_be(&bytes);
        let server_unlocked = self
            .engine
            .server_unlock(&double_locked, &self.exponents)
            .map_err(|e| CoreError::RelayLockError(e.to_string()))?;
        Ok(passkey_crypto::encoders::base64_url_encode(&server_unlocked.to_bytes_be()))
    }
}

#[derive(Default)]
struct StorageState {
    users: HashMap<String, UserRecord>,
    authenticators: HashMap<String, Vec<AuthenticatorRecord>>,
    last_user: Option<String>,
}

#[derive(Default)]
struct FakeStorage {
    state: Mutex<StorageState>,
}

#[async_trait]
impl Storage for FakeStorage {
    async fn put_user_record(&self, record: UserRecord) -> CoreResult<()> {
        self.state.lock().unwrap().users.insert(record.account_id.clone(), record);
        Ok(())
    }

    async fn get_user_record(&self, account_id: &str) -> CoreResult<Option<UserRecord>> {
        Ok(self.state.lock().unwrap().users.get(account_id).cloned())
    }

    async fn delete_user_record(&self, account_id: &str) -> CoreResult<()> {
        self.state.lock().unwrap().users.remove(account_id);
        Ok(())
    }

    async fn put_authenticator(&self, account_id: &str, record: AuthenticatorRecord) -> CoreResult<()> {
        self.state.lock().unwrap().authenticators.entry(account_id.to_string()).or_default().push(record);
        Ok(())
    }

    async fn list_authenticators(&self, account_id: &str) -> CoreResult<Vec<AuthenticatorRecord>> {
        Ok(self.state.lock().unwrap().authenticators.get(account_id).cloned().unwrap_or_default())
    }

    async fn delete_authenticators(&self, account_id: &str) -> CoreResult<()> {
        self.state.lock().unwrap().authenticators.remove(account_id);
        Ok(())
    }

    async fn set_last_user(&self, account_id: Option<&str>) -> CoreResult<()> {
        self.state.lock().unwrap().last_user = account_id.map(|s| s.to_string());
        Ok(())
    }

    async fn get_last_user(&self) -> CoreResult<Option<String>> {
        Ok(self.state.lock().unwrap().last_user.clone())
    }
}

/// Always confirms, recomputing nothing itself — it just echoes back
/// whatever intent digest the Signer Core handed it in `prompt`, the way a
/// UI that correctly re-derives the same digest from the same requests
/// would. `confirmed` can be flipped per-test to exercise rejection.
struct AutoConfirmUi {
    confirmed: bool,
    last_digest: Mutex<Option<String>>,
}

impl AutoConfirmUi {
    fn new(confirmed: bool) -> Self {
        Self { confirmed, last_digest: Mutex::new(None) }
    }
}

#[async_trait]
impl UiCollaborator for AutoConfirmUi {
    async fn prompt(&self, event: &PromptUserConfirm) -> SignerResult<()> {
        *self.last_digest.lock().unwrap() = Some(event.intent_digest.clone());
        Ok(())
    }

    async fn await_decision(
        &self,
        _request_id: &str,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> SignerResult<UserConfirmResponse> {
        let digest = self.last_digest.lock().unwrap().clone().unwrap_or_default();
        Ok(UserConfirmResponse {
            confirmed: self.confirmed,
            ui_intent_digest: digest,
            credential: serde_json::json!({}),
        })
    }
}

/// Always confirms, but reports a digest unrelated to the one it was shown
/// — models a UI that disagrees with the Signer Core about what it's
/// signing.
struct WrongDigestUi;

#[async_trait]
impl UiCollaborator for WrongDigestUi {
    async fn prompt(&self, _event: &PromptUserConfirm) -> SignerResult<()> {
        Ok(())
    }

    async fn await_decision(
        &self,
        _request_id: &str,
        _timeout: Duration,
        _cancel: &CancelToken,
    ) -> SignerResult<UserConfirmResponse> {
        Ok(UserConfirmResponse {
            confirmed: true,
            ui_intent_digest: "not-the-real-digest".to_string(),
            credential: serde_json::json!({}),
        })
    }
}

struct Harness {
    orchestrator: SessionOrchestrator,
    chain: Arc<FakeChainClient>,
}

fn harness_with(ui_confirmed: bool, config: SessionConfig) -> Harness {
    let chain = Arc::new(FakeChainClient::new());
    let orchestrator = SessionOrchestrator::new(
        chain.clone(),
        None,
        Arc::new(FakeAuthenticator::new()),
        Arc::new(FakeStorage::default()),
        Arc::new(AutoConfirmUi::new(ui_confirmed)),
        config,
    )
    .unwrap();
    Harness { orchestrator, chain }
}

fn harness() -> Harness {
    harness_with(true, SessionConfig::default())
}

async fn register_alice(h: &Harness) -> UserRecord {
    register_salts_for("alice.testnet");
    h.orchestrator
        .register("alice.testnet", "example.com", 1, "relayer.testnet", false)
        .await
        .expect("registration should succeed")
}

#[tokio::test]
async fn register_then_login_round_trips() {
    let h = harness();
    let record = register_alice(&h).await;
    assert!(record.ed25519_public_key.starts_with("ed25519:"));
    assert_eq!(
        h.orchestrator.login_state(),
        LoginState::LoggedIn { account_id: "alice.testnet".into(), device_number: 1 }
    );

    h.orchestrator.logout();
    assert_eq!(h.orchestrator.login_state(), LoginState::LoggedOut);

    let state = h.orchestrator.login(Some("alice.testnet"), "example.com").await.unwrap();
    assert_eq!(state, LoginState::LoggedIn { account_id: "alice.testnet".into(), device_number: 1 });
}

#[tokio::test]
async fn registration_rolls_back_when_chain_call_fails() {
    struct FailingChain(Arc<FakeChainClient>);

    #[async_trait]
    impl ChainClient for FailingChain {
        async fn view_access_key(&self, a: &str, p: &str) -> CoreResult<AccessKeyView> {
            self.0.view_access_key(a, p).await
        }
        async fn view_block(&self, f: &str) -> CoreResult<BlockView> {
            self.0.view_block(f).await
        }
        async fn view(&self, c: &str, m: &str, a: serde_json::Value) -> CoreResult<serde_json::Value> {
            self.0.view(c, m, a).await
        }
        async fn call_function(&self, _c: &str, _m: &str, _a: serde_json::Value) -> CoreResult<serde_json::Value> {
            Err(CoreError::ChainError { kind: ChainErrorKind::Fatal, message: "relayer rejected".into() })
        }
        async fn send_transaction(&self, b: &[u8], w: WaitStatus) -> CoreResult<TxOutcome> {
            self.0.send_transaction(b, w).await
        }
    }

    let inner = Arc::new(FakeChainClient::new());
    let storage = Arc::new(FakeStorage::default());
    let orchestrator = SessionOrchestrator::new(
        Arc::new(FailingChain(inner)),
        None,
        Arc::new(FakeAuthenticator::new()),
        storage.clone(),
        Arc::new(AutoConfirmUi::new(true)),
        SessionConfig::default(),
    )
    .unwrap();

    register_salts_for("bob.testnet");
    let result = orchestrator.register("bob.testnet", "example.com", 1, "relayer.testnet", false).await;
    assert!(result.is_err());
    assert_eq!(orchestrator.login_state(), LoginState::LoggedOut);
    assert!(storage.get_user_record("bob.testnet").await.unwrap().is_none());
}

#[tokio::test]
async fn shamir_gated_registration_and_login_round_trip() {
    let chain = Arc::new(FakeChainClient::new());
    let relay = Arc::new(FakeRelayClient::new());
    let orchestrator = SessionOrchestrator::new(
        chain.clone(),
        Some(relay.clone()),
        Arc::new(FakeAuthenticator::new()),
        Arc::new(FakeStorage::default()),
        Arc::new(AutoConfirmUi::new(true)),
        SessionConfig::default(),
    )
    .unwrap();

    register_salts_for("carol.testnet");
    let record = orchestrator
        .register("carol.testnet", "example.com", 1, "relayer.testnet", true)
        .await
        .expect("shamir-enrolled registration should succeed");
    assert!(record.server_encrypted_vrf_keypair.is_some());

    orchestrator.logout();
    let state = orchestrator.login(Some("carol.testnet"), "example.com").await.expect("shamir login should succeed");
    assert_eq!(state, LoginState::LoggedIn { account_id: "carol.testnet".into(), device_number: 1 });
}

#[tokio::test]
async fn sign_and_send_transactions_happy_path() {
    let h = harness();
    let record = register_alice(&h).await;
    h.chain.insert_access_key("alice.testnet", &record.ed25519_public_key, 5);

    let requests = vec![PendingTxRequest {
        receiver_id: "bob.testnet".to_string(),
        actions: vec![ActionParams::Transfer { deposit: "1000000000000000000".into() }],
    }];
    let results = h
        .orchestrator
        .sign_and_send_transactions(
            "alice.testnet",
            "example.com",
            requests,
            ConfirmationConfig::default(),
            WaitStatus::ExecutedOptimistic,
        )
        .await
        .expect("sign and send should succeed");

    assert_eq!(results.len(), 1);
    assert!(results[0].outcome.success);
    assert_eq!(h.chain.broadcast_count(), 1);
}

#[tokio::test]
async fn sign_and_send_transactions_requires_login() {
    let h = harness();
    register_salts_for("dana.testnet");
    h.orchestrator.register("dana.testnet", "example.com", 1, "relayer.testnet", false).await.unwrap();
    h.orchestrator.logout();

    let requests = vec![PendingTxRequest {
        receiver_id: "bob.testnet".to_string(),
        actions: vec![ActionParams::Transfer { deposit: "1".into() }],
    }];
    let result = h
        .orchestrator
        .sign_and_send_transactions(
            "dana.testnet",
            "example.com",
            requests,
            ConfirmationConfig::default(),
            WaitStatus::ExecutedOptimistic,
        )
        .await;
    assert!(matches!(result, Err(CoreError::InputValidation(_))));
}

#[tokio::test]
async fn sign_and_send_transactions_rejects_ui_digest_mismatch() {
    let chain = Arc::new(FakeChainClient::new());
    let orchestrator = SessionOrchestrator::new(
        chain.clone(),
        None,
        Arc::new(FakeAuthenticator::new()),
        Arc::new(FakeStorage::default()),
        Arc::new(WrongDigestUi),
        SessionConfig::default(),
    )
    .unwrap();

    register_salts_for("erin.testnet");
    let record = orchestrator.register("erin.testnet", "example.com", 1, "relayer.testnet", false).await.unwrap();
    chain.insert_access_key("erin.testnet", &record.ed25519_public_key, 0);

    let requests = vec![PendingTxRequest {
        receiver_id: "bob.testnet".to_string(),
        actions: vec![ActionParams::Transfer { deposit: "1".into() }],
    }];
    let result = orchestrator
        .sign_and_send_transactions(
            "erin.testnet",
            "example.com",
            requests,
            ConfirmationConfig::default(),
            WaitStatus::ExecutedOptimistic,
        )
        .await;
    assert!(matches!(result, Err(CoreError::Signer(SignerError::IntentMismatch))));
}

#[tokio::test]
async fn recovery_discovers_and_recovers_matching_keys() {
    let h = harness();
    let record = register_alice(&h).await;
    h.chain.insert_access_key("alice.testnet", &record.ed25519_public_key, 0);
    h.chain.set_view(
        "registry.testnet",
        "get_credential_ids_by_account",
        serde_json::json!([passkey_crypto::encoders::base64_url_encode(b"fake-cred-id")]),
    );
    h.chain.set_view("registry.testnet", "get_authenticators_by_account", serde_json::json!([]));

    let candidates = h
        .orchestrator
        .discover_recovery_candidates("registry.testnet", "alice.testnet")
        .await
        .unwrap();
    assert_eq!(candidates.len(), 1);

    let (account_id, recovered_public_key) = h
        .orchestrator
        .recover_account("registry.testnet", "alice.testnet", "example.com", 1, &candidates[0].credential_id)
        .await
        .expect("recovery should succeed for a key with on-chain access");
    assert_eq!(account_id, "alice.testnet");
    assert_eq!(recovered_public_key, record.ed25519_public_key);
}

#[tokio::test]
async fn recovery_rejects_when_no_access_key_matches() {
    let h = harness();
    register_alice(&h).await;
    // No access key inserted for alice's derived public key: the chain has
    // never heard of this account.
    let result = h
        .orchestrator
        .recover_account(
            "registry.testnet",
            "alice.testnet",
            "example.com",
            1,
            &passkey_crypto::encoders::base64_url_encode(b"fake-cred-id"),
        )
        .await;
    assert!(matches!(result, Err(CoreError::AccountMismatch)));
}

#[tokio::test]
async fn device_link_cleanup_discards_when_device2_already_claimed() {
    let h = harness();
    let record = register_alice(&h).await;
    h.chain.insert_access_key("alice.testnet", &record.ed25519_public_key, 0);

    let (qr, _device2_key) = h.orchestrator.generate_device_link_qr(Some("alice.testnet"));
    let link_result = h
        .orchestrator
        .link_device_from_qr("alice.testnet", "example.com", "registry.testnet", &qr, ConfirmationConfig::default())
        .await
        .expect("link_device_from_qr should succeed");
    assert_eq!(link_result.device2_public_key, qr.device2_public_key);
    // Device2's key was never actually added to the fake chain, modeling
    // Device2 having already replaced it with its own real key by the time
    // the cleanup poller looks.
    let mut config = SessionConfig::default();
    config.device_link_poll_interval = Duration::from_millis(5);
    config.device_link_cleanup_window = Duration::from_millis(20);
    let outcome = h
        .orchestrator
        .run_device_link_cleanup("alice.testnet", &link_result.device2_public_key, link_result.cleanup_signed_tx)
        .await
        .unwrap();
    assert_eq!(outcome, DeviceLinkCleanupOutcome::Discarded);
}

#[tokio::test]
async fn device_link_cleanup_broadcasts_when_device2_never_claims() {
    let chain = Arc::new(FakeChainClient::new());
    let mut config = SessionConfig::default();
    config.device_link_poll_interval = Duration::from_millis(5);
    config.device_link_cleanup_window = Duration::from_millis(15);
    let orchestrator = SessionOrchestrator::new(
        chain.clone(),
        None,
        Arc::new(FakeAuthenticator::new()),
        Arc::new(FakeStorage::default()),
        Arc::new(AutoConfirmUi::new(true)),
        config,
    )
    .unwrap();

    register_salts_for("frank.testnet");
    let record = orchestrator.register("frank.testnet", "example.com", 1, "relayer.testnet", false).await.unwrap();
    chain.insert_access_key("frank.testnet", &record.ed25519_public_key, 0);

    let (qr, _device2_key) = orchestrator.generate_device_link_qr(Some("frank.testnet"));
    let link_result = orchestrator
        .link_device_from_qr("frank.testnet", "example.com", "registry.testnet", &qr, ConfirmationConfig::default())
        .await
        .unwrap();
    // Device2's key stays present on-chain the whole time: it never claims.
    chain.insert_access_key("frank.testnet", &link_result.device2_public_key, 0);

    let outcome = orchestrator
        .run_device_link_cleanup("frank.testnet", &link_result.device2_public_key, link_result.cleanup_signed_tx)
        .await
        .unwrap();
    assert!(matches!(outcome, DeviceLinkCleanupOutcome::Broadcast { .. }));
    // AddKey + mapping during linking, plus the cleanup DeleteKey.
    assert_eq!(chain.broadcast_count(), 3);
}

#[tokio::test]
async fn claim_device_link_adds_and_removes_the_temporary_key() {
    let h = harness();
    let record = register_alice(&h).await;
    h.chain.insert_access_key("alice.testnet", &record.ed25519_public_key, 0);

    let (_qr, device2_key) = h.orchestrator.generate_device_link_qr(Some("alice.testnet"));
    let temp_public_key = PublicKey::from_ed25519_bytes(device2_key.verifying_key().as_bytes()).to_near_string();
    h.chain.insert_access_key("alice.testnet", &temp_public_key, 0);

    register_salts_for("alice.testnet");
    let claimed = h
        .orchestrator
        .claim_device_link("alice.testnet", "example.com", "registry.testnet", 2, &device2_key, ConfirmationConfig::default())
        .await
        .expect("claim_device_link should succeed");
    assert_eq!(claimed.device_number, 2);
    assert_eq!(h.chain.broadcast_count(), 3);
}

#[tokio::test]
async fn qr_payload_past_ttl_is_rejected() {
    let h = harness();
    register_alice(&h).await;
    let mut qr = h.orchestrator.generate_device_link_qr(Some("alice.testnet")).0;
    qr.timestamp -= (h.orchestrator.config().qr_ttl.as_millis() as i64) + 1_000;

    let result = h
        .orchestrator
        .link_device_from_qr("alice.testnet", "example.com", "registry.testnet", &qr, ConfirmationConfig::default())
        .await;
    assert!(matches!(result, Err(CoreError::QrExpired)));
}
