//! Wall-clock synchronization wait.
//!
//! Log timestamps and TLS certificate validity checks both need a sane wall
//! clock. The host syncs time on its own (NTP via systemd-timesyncd or
//! chrony); at boot the sign just waits a bounded time for that to happen.
//! A clock that never syncs is a degraded state, not a fatal one.

use std::time::Duration;
use tokio::time::sleep;

/// Clock checks before giving up
pub const SYNC_ATTEMPTS: usize = 20;
/// Delay after each clock check
pub const SYNC_RETRY: Duration = Duration::from_millis(500);
/// Any Unix time before this (September 2001) means the clock was never set
pub const MIN_SYNCED_UNIX_SECS: i64 = 1_000_000_000;

/// Whether a Unix timestamp looks like a synchronized clock
pub fn is_synced(unix_secs: i64) -> bool {
    unix_secs >= MIN_SYNCED_UNIX_SECS
}

/// Wait for the system clock to be set.
pub async fn wait_for_clock_sync() -> bool {
    wait_until_synced(|| chrono::Utc::now().timestamp(), SYNC_ATTEMPTS, SYNC_RETRY).await
}

/// Poll `now` up to `attempts` times, `retry` apart, until it reports a synced
/// time. Each check is followed by the retry delay.
pub async fn wait_until_synced<F>(mut now: F, attempts: usize, retry: Duration) -> bool
where
    F: FnMut() -> i64,
{
    for _ in 0..attempts {
        if is_synced(now()) {
            return true;
        }
        sleep(retry).await;
    }
    is_synced(now())
}
