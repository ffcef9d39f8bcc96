//! External collaborator traits — spec.md §6, redesigned per §9's
//! guidance: the teacher's `wasm_bindgen extern "C"` blocks and IndexedDB/
//! MessagePort/Lit-component plumbing become plain `async_trait` traits a
//! host implements over whatever transport it has (HTTPS, an in-process
//! fake, a native WebAuthn platform binding). `passkey-session` is
//! generic over all five; nothing here assumes a browser.

use async_trait::async_trait;

use passkey_keymanager::{AuthenticatorRecord, EncryptedEd25519Key, UserRecord};
use passkey_vrf::EncryptedVrfKeypair;

use crate::error::CoreResult;
use crate::types::{
    AccessKeyView, BlockView, CreateCredentialOptions, GetCredentialOptions, TxOutcome,
    WaitStatus, WebAuthnCredential,
};

/// A thin view/broadcast interface over a NEAR RPC endpoint (spec.md §6).
/// The core never hosts or mirrors a full RPC; it only consumes this.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn view_access_key(&self, account_id: &str, public_key: &str) -> CoreResult<AccessKeyView>;
    async fn view_block(&self, finality: &str) -> CoreResult<BlockView>;
    async fn view(&self, contract_id: &str, method: &str, args: serde_json::Value) -> CoreResult<serde_json::Value>;
    async fn call_function(&self, contract_id: &str, method: &str, args: serde_json::Value) -> CoreResult<serde_json::Value>;
    async fn send_transaction(&self, borsh_bytes: &[u8], wait_status: WaitStatus) -> CoreResult<TxOutcome>;
}

/// The Shamir relay's two HTTP endpoints (spec.md §4.3, §6). `mint_session`
/// is named in spec.md §6 as an optional threshold-mode extension point;
/// left unimplemented here since threshold signing is out of scope
/// (SPEC_FULL.md §2) but kept on the trait with a default so a future
/// threshold-mode relay can override it without breaking this one.
#[async_trait]
pub trait RelayClient: Send + Sync {
    /// `applyServerLock({kek_c}) -> {kek_cs}`: the server raises the
    /// client-locked scalar to its own exponent.
    async fn apply_server_lock(&self, kek_c_b64u: &str) -> CoreResult<String>;

    /// `removeServerLock({kek_cs}) -> {kek_s}`: the server removes its own
    /// lock, handing back a value still locked under the client's key.
    async fn remove_server_lock(&self, kek_cs_b64u: &str) -> CoreResult<String>;

    async fn mint_session(&self, _account_id: &str) -> CoreResult<String> {
        Err(crate::error::CoreError::RelayLockError(
            "threshold session minting is not supported by this relay".into(),
        ))
    }
}

/// Platform authenticator (spec.md §6): `create()`/`get()` returning
/// WebAuthn credentials carrying the dual PRF extension outputs.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn create(&self, options: CreateCredentialOptions) -> CoreResult<WebAuthnCredential>;
    async fn get(&self, options: GetCredentialOptions) -> CoreResult<WebAuthnCredential>;
}

/// CRUD over the durable record types, with atomic per-account rollback
/// (spec.md §6). The core assumes single-writer semantics per account key
/// (spec.md §5); it does not itself serialize concurrent writers.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn put_user_record(&self, record: UserRecord) -> CoreResult<()>;
    async fn get_user_record(&self, account_id: &str) -> CoreResult<Option<UserRecord>>;
    async fn delete_user_record(&self, account_id: &str) -> CoreResult<()>;

    async fn put_authenticator(&self, account_id: &str, record: AuthenticatorRecord) -> CoreResult<()>;
    async fn list_authenticators(&self, account_id: &str) -> CoreResult<Vec<AuthenticatorRecord>>;
    async fn delete_authenticators(&self, account_id: &str) -> CoreResult<()>;

    async fn set_last_user(&self, account_id: Option<&str>) -> CoreResult<()>;
    async fn get_last_user(&self) -> CoreResult<Option<String>>;

    /// Delete user record, authenticators, and encrypted keys for
    /// `account_id`, and clear the "last user" pointer if it pointed at
    /// this account. Spec.md §4.6: "On any failure after IndexedDB writes,
    /// SO performs atomic rollback."
    async fn rollback_user_registration(&self, account_id: &str) -> CoreResult<()> {
        self.delete_user_record(account_id).await?;
        self.delete_authenticators(account_id).await?;
        if self.get_last_user().await?.as_deref() == Some(account_id) {
            self.set_last_user(None).await?;
        }
        Ok(())
    }
}

pub use passkey_signer::{CancelToken, UiCollaborator};

/// Optional progress-stream callback (SPEC_FULL.md §2's supplemented
/// `types/progress.rs`): a strict behavioral superset of
/// `UiCollaborator::prompt`/`await_decision` that costs nothing when
/// unused. No-op by default.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, _stage: &str, _detail: &str) {}
}

/// A `ProgressSink` that discards every event, the default when a caller
/// does not care about granular progress.
pub struct NoOpProgressSink;
impl ProgressSink for NoOpProgressSink {}

/// Re-exported so callers only need one `use passkey_session::*` for the
/// encrypted record types these traits move around.
pub type Ed25519KeyRecord = EncryptedEd25519Key;
pub type VrfKeyRecord = EncryptedVrfKeypair;
