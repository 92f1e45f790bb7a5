use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

#[async_trait]
pub trait TickHandler: Send + Sync + 'static {
    async fn on_tick(&self, tick: DateTime<Utc>) -> anyhow::Result<()>;
}

/// Runs `handler` on every wall-clock multiple of `interval` until `shutdown`
/// is cancelled. The handler receives the boundary instant, not the time it
/// actually woke up. Ticks run one after another and never overlap.
pub fn spawn(
    handler: Arc<dyn TickHandler>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    task::spawn(async move {
        log::info!("Reminder ticker started. [interval = {:?}]", interval);
        loop {
            let now = clock.now();
            let tick = next_tick(now, interval);
            let delay = (tick - now).to_std().unwrap_or_default();

            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("Reminder ticker shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {
                    if let Err(e) = handler.on_tick(tick).await {
                        log::error!("Reminder run for {tick} failed: {e:#}");
                    }
                }
            }
        }
    })
}

/// First multiple of `interval` since the Unix epoch strictly after `now`.
pub(crate) fn next_tick(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval_secs = i64::try_from(interval.as_secs()).unwrap_or(i64::MAX).max(1);
    let boundary = (now.timestamp().div_euclid(interval_secs) + 1) * interval_secs;

    DateTime::from_timestamp(boundary, 0).unwrap_or(now + TimeDelta::seconds(interval_secs))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;

    use super::*;
    use crate::clock::FixedClock;

    const FIVE_MINUTES: Duration = Duration::from_secs(300);

    #[derive(Default)]
    struct RecordingHandler {
        ticks: Mutex<Vec<DateTime<Utc>>>,
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TickHandler for RecordingHandler {
        async fn on_tick(&self, tick: DateTime<Utc>) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.ticks.lock().unwrap().push(tick);
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            Ok(())
        }
    }

    #[test]
    fn next_tick_is_the_following_boundary() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 3, 20).unwrap();
        assert_eq!(
            next_tick(now, FIVE_MINUTES),
            Utc.with_ymd_and_hms(2024, 5, 1, 4, 5, 0).unwrap()
        );

        let on_boundary = Utc.with_ymd_and_hms(2024, 5, 1, 4, 5, 0).unwrap();
        assert_eq!(
            next_tick(on_boundary, FIVE_MINUTES),
            Utc.with_ymd_and_hms(2024, 5, 1, 4, 10, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn handler_runs_on_each_boundary_until_cancelled() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 3, 20).unwrap();
        let handler = Arc::new(RecordingHandler::default());
        let shutdown = CancellationToken::new();

        let ticker = spawn(
            handler.clone(),
            Arc::new(FixedClock(now)),
            FIVE_MINUTES,
            shutdown.clone(),
        );

        // The fixed clock keeps the next boundary 100s away.
        tokio::time::sleep(Duration::from_secs(250)).await;
        shutdown.cancel();
        ticker.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        let ticks = handler.ticks.lock().unwrap();
        let boundary = Utc.with_ymd_and_hms(2024, 5, 1, 4, 5, 0).unwrap();
        assert!(ticks.iter().all(|tick| *tick == boundary));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_runs_do_not_stop_the_ticker() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 4, 0).unwrap();
        let handler = Arc::new(RecordingHandler {
            fail: true,
            ..Default::default()
        });
        let shutdown = CancellationToken::new();

        let ticker = spawn(
            handler.clone(),
            Arc::new(FixedClock(now)),
            FIVE_MINUTES,
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_secs(190)).await;
        shutdown.cancel();
        ticker.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_before_first_tick_skips_handler() {
        let handler = Arc::new(RecordingHandler::default());
        let shutdown = CancellationToken::new();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 4, 0, 1).unwrap();

        let ticker = spawn(
            handler.clone(),
            Arc::new(FixedClock(now)),
            FIVE_MINUTES,
            shutdown.clone(),
        );
        shutdown.cancel();
        ticker.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    proptest! {
        #[test]
        fn next_tick_is_aligned_and_within_one_interval(
            secs in 946_684_800i64..4_102_444_800i64,
            minutes in 1u64..=60,
        ) {
            let now = DateTime::from_timestamp(secs, 0).unwrap();
            let interval = Duration::from_secs(minutes * 60);

            let tick = next_tick(now, interval);

            prop_assert!(tick > now);
            prop_assert!(tick - now <= TimeDelta::seconds(minutes as i64 * 60));
            prop_assert_eq!(tick.second(), 0);
            prop_assert_eq!(tick.timestamp() % (minutes as i64 * 60), 0);
        }
    }
}
