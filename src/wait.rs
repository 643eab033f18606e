//! Tick-sliced waiting.
//!
//! Every long hold in the sign (page interval, message pages, fetch backoff)
//! goes through [`hold`], which sleeps in short ticks and runs an upkeep step
//! between them. That is what keeps the telemetry link serviced while a page is
//! on screen, without a second thread.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Default upkeep tick while holding a page
pub const POLL_TICK: Duration = Duration::from_millis(100);

/// Work to run between wait ticks.
pub trait Upkeep {
    fn upkeep(&mut self) -> impl Future<Output = ()>;
}

/// No-op upkeep, for holds that have nothing to service.
impl Upkeep for () {
    async fn upkeep(&mut self) {}
}

/// Wait `total`, running `upkeep` before each tick of at most `tick`.
///
/// The hold ends once `total` has elapsed since the call; a slow upkeep step
/// shortens the remaining sleep rather than extending the hold by a full tick.
pub async fn hold<U: Upkeep>(total: Duration, tick: Duration, upkeep: &mut U) {
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= total {
            break;
        }
        upkeep.upkeep().await;

        let remaining = total.saturating_sub(start.elapsed());
        if remaining.is_zero() {
            break;
        }
        sleep(tick.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        calls: usize,
    }

    impl Upkeep for Counter {
        async fn upkeep(&mut self) {
            self.calls += 1;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_polls_every_tick() {
        let mut counter = Counter::default();
        let start = Instant::now();

        hold(Duration::from_secs(1), POLL_TICK, &mut counter).await;

        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(counter.calls, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_last_tick_is_shortened() {
        let mut counter = Counter::default();
        let start = Instant::now();

        hold(Duration::from_millis(250), POLL_TICK, &mut counter).await;

        assert_eq!(start.elapsed(), Duration::from_millis(250));
        assert_eq!(counter.calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_hold_returns_immediately() {
        let mut counter = Counter::default();
        hold(Duration::ZERO, POLL_TICK, &mut counter).await;
        assert_eq!(counter.calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unit_upkeep() {
        let start = Instant::now();
        hold(Duration::from_secs(3), POLL_TICK, &mut ()).await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }
}
