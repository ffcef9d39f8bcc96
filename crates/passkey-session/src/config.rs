//! Session Orchestrator policy — spec.md §5. Unlike the lower crates'
//! flat-`const` `config.rs` modules (nothing here is a wire-level domain
//! separator), the SO is the only component with caller-tunable policy, so
//! it gets a `SessionConfig` struct per SPEC_FULL.md §1.

use std::time::Duration;

/// `blockHeight` freshness window (spec.md §3): a `VrfChallenge` is valid
/// only if the block it was generated against is at most this many blocks
/// old relative to the chain tip at verification time.
pub const DEFAULT_FRESHNESS_WINDOW_BLOCKS: u64 = 100;

/// Confirmation handshake timeout (spec.md §4.5, §5).
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// `ChainClient` call timeout (spec.md §5).
pub const DEFAULT_CHAIN_CALL_TIMEOUT: Duration = Duration::from_secs(20);

/// Default signer worker pool size (spec.md §5).
pub const DEFAULT_WORKER_POOL_SIZE: usize = 3;

/// QR device-linking payload TTL (spec.md §4.6 step 1).
pub const DEFAULT_QR_TTL: Duration = Duration::from_secs(10 * 60);

/// Device-linking dead-man's-switch poll interval and window (spec.md
/// §4.6 step 3).
pub const DEVICE_LINK_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const DEVICE_LINK_CLEANUP_WINDOW: Duration = Duration::from_secs(20);

/// Relay lock retry policy (spec.md §7: "Retryable with backoff; failure
/// after N retries fails the login").
pub const DEFAULT_RELAY_LOCK_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RELAY_LOCK_BASE_BACKOFF: Duration = Duration::from_millis(200);

/// Chain RPC transient-error retry ceiling (spec.md §7).
pub const DEFAULT_CHAIN_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_CHAIN_RETRY_BASE_BACKOFF: Duration = Duration::from_millis(250);

/// Caller-tunable policy for one `SessionOrchestrator`. Grounded on
/// spec.md §5's concurrency/resource model, which is the only section that
/// names orchestrator-level defaults explicitly rather than wire-level
/// constants.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub freshness_window_blocks: u64,
    pub confirm_timeout: Duration,
    pub chain_call_timeout: Duration,
    pub worker_pool_size: usize,
    pub qr_ttl: Duration,
    pub device_link_poll_interval: Duration,
    pub device_link_cleanup_window: Duration,
    pub relay_lock_max_retries: u32,
    pub relay_lock_base_backoff: Duration,
    pub chain_retry_max_attempts: u32,
    pub chain_retry_base_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            freshness_window_blocks: DEFAULT_FRESHNESS_WINDOW_BLOCKS,
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            chain_call_timeout: DEFAULT_CHAIN_CALL_TIMEOUT,
            worker_pool_size: DEFAULT_WORKER_POOL_SIZE,
            qr_ttl: DEFAULT_QR_TTL,
            device_link_poll_interval: DEVICE_LINK_POLL_INTERVAL,
            device_link_cleanup_window: DEVICE_LINK_CLEANUP_WINDOW,
            relay_lock_max_retries: DEFAULT_RELAY_LOCK_MAX_RETRIES,
            relay_lock_base_backoff: DEFAULT_RELAY_LOCK_BASE_BACKOFF,
            chain_retry_max_attempts: DEFAULT_CHAIN_RETRY_MAX_ATTEMPTS,
            chain_retry_base_backoff: DEFAULT_CHAIN_RETRY_BASE_BACKOFF,
        }
    }
}
