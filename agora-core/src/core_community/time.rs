//! Wall-clock source for update and sync stamps

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time in milliseconds since the Unix epoch.
///
/// Only used for `updated_at`/`synced_at` bookkeeping; ordering of
/// descriptions is decided by the Lamport clock alone.
pub trait TimeSource: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Time source backed by the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
