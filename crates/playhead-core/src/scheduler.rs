//! Avail polling scheduler
//!
//! While a live ad-enabled stream plays, a background timer task asks the
//! session to poll for scheduled ad breaks. The timer never touches session
//! state: it only posts [`Handoff::Tick`] messages onto the session channel,
//! and fetch results come back the same way as [`Handoff::AvailsFetched`].
//!
//! Each timer carries a generation number. Stopping the timer bumps the
//! generation, so ticks or fetch results still in flight from a cancelled
//! timer are recognised as stale and dropped by the session.

use crate::collaborators::AvailProvider;
use crate::types::{Avail, DEFAULT_AVAIL_POLL_PERIOD};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use url::Url;

/// Messages handed from background tasks to the session task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff {
    /// The avail timer fired
    Tick { generation: u64 },
    /// An avail fetch started by a tick completed
    AvailsFetched { generation: u64, avails: Vec<Avail> },
}

/// Recurring avail polling timer; at most one live timer per scheduler
pub struct AvailScheduler {
    handoff_tx: mpsc::UnboundedSender<Handoff>,
    standard_period: Duration,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

impl AvailScheduler {
    pub fn new(handoff_tx: mpsc::UnboundedSender<Handoff>, standard_period: Duration) -> Self {
        Self {
            handoff_tx,
            standard_period: period_or_default(standard_period),
            generation: 0,
            timer: None,
        }
    }

    /// Change the standard period. A running timer is restarted on the new
    /// period; the generation keeps counting so its queued ticks go stale.
    pub fn set_standard_period(&mut self, period: Duration) {
        self.standard_period = period_or_default(period);
        if self.is_running() {
            self.start_standard();
        }
    }

    /// Start polling, replacing any running timer.
    ///
    /// A zero delay or period substitutes [`DEFAULT_AVAIL_POLL_PERIOD`] for both.
    pub fn start(&mut self, initial_delay: Duration, period: Duration) {
        self.stop();

        let (initial_delay, period) = normalize_timing(initial_delay, period);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime available, avail polling disabled");
            return;
        };

        self.generation += 1;
        let generation = self.generation;
        let tx = self.handoff_tx.clone();

        self.timer = Some(runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + initial_delay, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(Handoff::Tick { generation }).is_err() {
                    debug!(generation, "Session channel closed, avail timer exiting");
                    break;
                }
            }
        }));

        info!(
            generation,
            initial_delay_ms = initial_delay.as_millis() as u64,
            period_ms = period.as_millis() as u64,
            "Avail polling started"
        );
    }

    /// (Re)start with the standard period for both delay and period
    pub fn start_standard(&mut self) {
        self.start(self.standard_period, self.standard_period);
    }

    /// Cancel the timer. Safe to call when nothing is running.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            info!(generation = self.generation, "Avail polling stopped");
        }
        // Invalidate anything the cancelled timer already queued
        self.generation += 1;
    }

    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Whether a tick or fetch result belongs to the live timer
    pub fn accepts(&self, generation: u64) -> bool {
        self.timer.is_some() && generation == self.generation
    }

    pub fn standard_period(&self) -> Duration {
        self.standard_period
    }

    /// Fetch avails off the session task and hand the result back.
    ///
    /// Provider failures are logged and reported as an empty result, so the
    /// next tick simply retries.
    pub fn fetch_in_background(
        &self,
        provider: Arc<dyn AvailProvider>,
        tracking_url: Url,
        generation: u64,
    ) {
        let tx = self.handoff_tx.clone();
        tokio::spawn(async move {
            let avails = match provider.fetch_avails(&tracking_url).await {
                Ok(avails) => avails,
                Err(e) => {
                    warn!(url = %tracking_url, error = %e, "Avail fetch failed, retrying next tick");
                    Vec::new()
                }
            };
            let _ = tx.send(Handoff::AvailsFetched { generation, avails });
        });
    }
}

impl Drop for AvailScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

fn period_or_default(period: Duration) -> Duration {
    if period.is_zero() {
        DEFAULT_AVAIL_POLL_PERIOD
    } else {
        period
    }
}

/// Apply the fallback period to non-positive timings
pub fn normalize_timing(initial_delay: Duration, period: Duration) -> (Duration, Duration) {
    if initial_delay.is_zero() || period.is_zero() {
        (DEFAULT_AVAIL_POLL_PERIOD, DEFAULT_AVAIL_POLL_PERIOD)
    } else {
        (initial_delay, period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> (AvailScheduler, mpsc::UnboundedReceiver<Handoff>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AvailScheduler::new(tx, DEFAULT_AVAIL_POLL_PERIOD), rx)
    }

    #[test]
    fn test_zero_timing_uses_fallback() {
        let fallback = (DEFAULT_AVAIL_POLL_PERIOD, DEFAULT_AVAIL_POLL_PERIOD);
        assert_eq!(normalize_timing(Duration::ZERO, Duration::ZERO), fallback);
        assert_eq!(normalize_timing(Duration::from_secs(5), Duration::ZERO), fallback);
        assert_eq!(normalize_timing(Duration::ZERO, Duration::from_secs(5)), fallback);
        assert_eq!(
            normalize_timing(Duration::from_secs(1), Duration::from_secs(2)),
            (Duration::from_secs(1), Duration::from_secs(2))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_start_matches_default_start() {
        let (mut zero, mut zero_rx) = scheduler();
        let (mut explicit, mut explicit_rx) = scheduler();
        zero.start(Duration::ZERO, Duration::ZERO);
        explicit.start(DEFAULT_AVAIL_POLL_PERIOD, DEFAULT_AVAIL_POLL_PERIOD);

        time::sleep(Duration::from_millis(17_999)).await;
        assert!(zero_rx.try_recv().is_err());
        assert!(explicit_rx.try_recv().is_err());

        time::sleep(Duration::from_millis(2)).await;
        assert!(matches!(zero_rx.try_recv(), Ok(Handoff::Tick { .. })));
        assert!(matches!(explicit_rx.try_recv(), Ok(Handoff::Tick { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_period_after_initial_delay() {
        let (mut scheduler, mut rx) = scheduler();
        scheduler.start(Duration::from_secs(1), Duration::from_secs(5));

        time::sleep(Duration::from_millis(1_001)).await;
        let Ok(Handoff::Tick { generation }) = rx.try_recv() else {
            panic!("expected first tick");
        };
        assert!(scheduler.accepts(generation));

        time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());

        time::sleep(Duration::from_secs(2)).await;
        assert!(matches!(rx.try_recv(), Ok(Handoff::Tick { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_invalidates_previous_timer() {
        let (mut scheduler, mut rx) = scheduler();
        scheduler.start(Duration::from_secs(1), Duration::from_secs(1));
        time::sleep(Duration::from_millis(1_001)).await;
        let Ok(Handoff::Tick { generation: old }) = rx.try_recv() else {
            panic!("expected tick");
        };

        scheduler.start(Duration::from_secs(10), Duration::from_secs(10));
        assert!(!scheduler.accepts(old));

        // The old timer no longer fires
        time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_is_idempotent() {
        let (mut scheduler, mut rx) = scheduler();
        scheduler.stop();
        assert!(!scheduler.is_running());

        scheduler.start(Duration::from_secs(1), Duration::from_secs(1));
        assert!(scheduler.is_running());
        scheduler.stop();
        scheduler.stop();
        assert!(!scheduler.is_running());

        time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_change_restarts_running_timer() {
        let (mut scheduler, mut rx) = scheduler();
        scheduler.start_standard();
        time::sleep(DEFAULT_AVAIL_POLL_PERIOD + Duration::from_millis(1)).await;
        let Ok(Handoff::Tick { generation: old }) = rx.try_recv() else {
            panic!("expected tick");
        };

        scheduler.set_standard_period(Duration::from_secs(5));
        assert!(scheduler.is_running());
        assert_eq!(scheduler.standard_period(), Duration::from_secs(5));
        assert!(!scheduler.accepts(old));

        time::sleep(Duration::from_millis(5_001)).await;
        let Ok(Handoff::Tick { generation }) = rx.try_recv() else {
            panic!("expected tick on the new period");
        };
        assert!(generation > old);
        assert!(scheduler.accepts(generation));
    }

    #[test]
    fn test_period_change_while_idle_does_not_start() {
        let (mut scheduler, _rx) = scheduler();
        scheduler.set_standard_period(Duration::ZERO);
        assert_eq!(scheduler.standard_period(), DEFAULT_AVAIL_POLL_PERIOD);
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_start_without_runtime_is_noop() {
        let (mut scheduler, _rx) = scheduler();
        scheduler.start(Duration::from_secs(1), Duration::from_secs(1));
        assert!(!scheduler.is_running());
    }
}
