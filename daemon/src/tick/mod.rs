//! Per-second tick driver
//!
//! Armed only while the session runs. Cancelling drops the interval, so a
//! cancelled driver can never fire against stale state.

use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Tick period of the session clock
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Cancellable periodic ticker
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    pub fn every_second() -> Self {
        Self::new(TICK_PERIOD)
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Start ticking; the first tick lands one period from now.
    /// Arming an armed ticker keeps the existing schedule.
    pub fn arm(&mut self) {
        if self.is_armed() {
            return;
        }
        let mut interval = interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        debug!(period_ms = self.period.as_millis() as u64, "ticker armed");
    }

    /// Stop ticking. Returns true if the ticker was armed.
    pub fn cancel(&mut self) -> bool {
        let was_armed = self.interval.take().is_some();
        if was_armed {
            debug!("ticker cancelled");
        }
        was_armed
    }

    /// Wait for the next tick. Never completes while disarmed.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::every_second()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_disarmed_ticker_never_fires() {
        let mut ticker = Ticker::every_second();
        let mut tick = task::spawn(ticker.tick());
        assert_pending!(tick.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let mut ticker = Ticker::every_second();
        ticker.arm();

        let start = Instant::now();
        ticker.tick().await;
        assert_eq!(start.elapsed(), TICK_PERIOD);
        ticker.tick().await;
        assert_eq!(start.elapsed(), TICK_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let mut ticker = Ticker::every_second();
        ticker.arm();
        assert!(ticker.cancel());
        assert!(!ticker.cancel());
        assert!(!ticker.is_armed());

        tokio::time::advance(TICK_PERIOD * 3).await;
        let mut tick = task::spawn(ticker.tick());
        assert_pending!(tick.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_restarts_schedule() {
        let mut ticker = Ticker::every_second();
        ticker.arm();
        tokio::time::advance(Duration::from_millis(700)).await;
        ticker.cancel();
        ticker.arm();

        let mut tick = task::spawn(ticker.tick());
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_pending!(tick.poll());
        tokio::time::advance(Duration::from_millis(500)).await;
        assert_ready!(tick.poll());
    }
}
