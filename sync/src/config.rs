//! Engine constants and per-run settings.

use std::time::Duration;

/// Give up on recovery after this many attempts across the peer list.
pub const MAX_RECOVERY_ATTEMPTS: u32 = 5;

/// Fixed delay between recovery attempts.
pub const RECOVERY_BACKOFF: Duration = Duration::from_secs(60);

/// Sequential indexing polls the cancel flag every this many blocks.
pub const CANCEL_CHECK_INTERVAL: u64 = 1000;

/// Head-number ceiling applied in dev mode to bound a run.
pub const DEV_MODE_MAX_NUMBER: u64 = 5000;

/// Default number of blocks per batch request.
pub const DEFAULT_BATCH_SIZE: u32 = 1000;

/// Bounded retry for detached writes turned away by write admission.
pub const DETACHED_RETRY_ATTEMPTS: u32 = 5;
pub const DETACHED_RETRY_DELAY: Duration = Duration::from_secs(1);
pub const DETACHED_RETRY_JITTER_MS: u64 = 250;

/// Per-run indexing options.
#[derive(Clone, Debug)]
pub struct SyncSettings {
    /// Group blocks into one storage write instead of writing one by one.
    pub bulk: bool,
    /// Blocks per batch request in bulk mode.
    pub batch_size: u32,
    /// Cap runs at [`DEV_MODE_MAX_NUMBER`] blocks.
    pub dev_mode: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            bulk: true,
            batch_size: DEFAULT_BATCH_SIZE,
            dev_mode: false,
        }
    }
}
