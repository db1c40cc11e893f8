//! Metric names and descriptions for the community engine
//!
//! Counters are emitted through the `metrics` facade; installing a recorder
//! is left to the embedding application.

use metrics::{describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Local mutations committed, labelled by `operation`
pub const MUTATIONS_COMMITTED: &str = "community.mutations.committed";

/// Local mutations refused (authorization or validation), labelled by `operation`
pub const MUTATIONS_REJECTED: &str = "community.mutations.rejected";

/// Remote descriptions adopted
pub const UPDATES_ADOPTED: &str = "community.updates.adopted";

/// Remote descriptions discarded because their clock was not newer
pub const UPDATES_STALE: &str = "community.updates.stale";

/// Remote descriptions that failed validation
pub const UPDATES_REJECTED: &str = "community.updates.rejected";

/// Time spent handling a remote description, labelled by `outcome`
/// (`adopted`, `stale` or `rejected`)
pub const UPDATE_DURATION_MS: &str = "community.update.duration_ms";

/// Snapshots written to a description store
pub const SNAPSHOTS_SAVED: &str = "community.snapshots.saved";

/// Register descriptions for every community metric
pub fn init_metrics() {
    describe_counter!(MUTATIONS_COMMITTED, "Number of committed local community mutations");
    describe_counter!(MUTATIONS_REJECTED, "Number of refused local community mutations");
    describe_counter!(UPDATES_ADOPTED, "Number of adopted remote descriptions");
    describe_counter!(UPDATES_STALE, "Number of remote descriptions discarded as stale");
    describe_counter!(UPDATES_REJECTED, "Number of remote descriptions failing validation");
    describe_histogram!(UPDATE_DURATION_MS, "Remote description handling duration in milliseconds, by outcome");
    describe_counter!(SNAPSHOTS_SAVED, "Number of description snapshots persisted");
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration under `outcome`
    pub fn stop(self, outcome: &'static str) {
        let duration = self.start.elapsed();
        histogram!(self.name, "outcome" => outcome).record(duration.as_secs_f64() * 1000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_init() {
        // No recorder installed; describing must still be a no-op
        init_metrics();
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new(UPDATE_DURATION_MS);
        std::thread::sleep(std::time::Duration::from_millis(1));
        timer.stop("adopted");
    }
}
