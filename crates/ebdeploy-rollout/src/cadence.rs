//! Adaptive poll cadence.

use std::time::Duration;

const EARLY_INTERVAL: Duration = Duration::from_secs(10);
const MIDDLE_INTERVAL: Duration = Duration::from_secs(20);
const LATE_INTERVAL: Duration = Duration::from_secs(30);

const MIDDLE_AFTER: Duration = Duration::from_secs(5 * 60);
const LATE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Wait before the next poll, given the time elapsed since monitoring began.
///
/// 10s for the first five minutes, 20s until ten minutes, 30s afterwards.
#[must_use]
pub fn poll_interval(elapsed: Duration) -> Duration {
    if elapsed >= LATE_AFTER {
        LATE_INTERVAL
    } else if elapsed >= MIDDLE_AFTER {
        MIDDLE_INTERVAL
    } else {
        EARLY_INTERVAL
    }
}
