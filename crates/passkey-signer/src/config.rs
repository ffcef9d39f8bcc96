//! Configuration constants for the Signer Core. Grounded on the teacher's
//! `wasm_signer_worker/src/config.rs` flat-`const` convention.

use std::time::Duration;

/// Default confirmation window before a `PROMPT_USER_CONFIRM` handshake is
/// abandoned and the batch fails with `SignerError::TimedOut` (spec.md §4.5,
/// §5). Callers may override this per `SignerCore::with_confirm_timeout`.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// NEP-413 message-signing prefix: `2^31 + 413`, little-endian u32, per the
/// NEP-413 standard (spec.md §4.5).
pub const NEP413_PREFIX: u32 = 2_147_484_061;

/// Maximum `DeployContract`/`DeployGlobalContract` code size spec.md §4.5
/// names explicitly ("code >= 4 MiB" is rejected).
pub const MAX_CONTRACT_CODE_BYTES: usize = 4 * 1024 * 1024;
