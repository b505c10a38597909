//! Periodic broadcast timer.
//!
//! A `PeriodicTimer` is driven by one task calling [`PeriodicTimer::run`].
//! Each time an interval boundary passes, every task currently parked in
//! [`PeriodicTimer::wait`] is released once. Ticks are counted against
//! elapsed monotonic time from when driving began, so a late wakeup fires
//! the intervals it missed instead of drifting.

use crate::error::TimerError;
use rootcause::Report;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use weft_core::{Result, TimerId};

/// What a waiter observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// An interval elapsed; carries the total tick count so far.
    Fired(u64),
    /// The timer was stopped.
    Stopped,
}

struct TimerInner {
    id: TimerId,
    interval: Duration,
    notify: Notify,
    ticks: AtomicU64,
    driven: AtomicBool,
    cancel: CancellationToken,
}

/// A cancellable clock broadcasting one notification per interval.
///
/// Cloning yields another handle to the same timer.
#[derive(Clone)]
pub struct PeriodicTimer {
    inner: Arc<TimerInner>,
}

impl PeriodicTimer {
    /// Creates a timer that is not yet being driven.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::ZeroInterval` for a zero `interval`.
    pub fn new(interval: Duration) -> Result<Self, TimerError> {
        if interval.is_zero() {
            return Err(Report::new(TimerError::ZeroInterval));
        }
        Ok(Self {
            inner: Arc::new(TimerInner {
                id: TimerId::new(),
                interval,
                notify: Notify::new(),
                ticks: AtomicU64::new(0),
                driven: AtomicBool::new(false),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// This timer's identifier.
    #[must_use]
    pub fn id(&self) -> TimerId {
        self.inner.id
    }

    /// The tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Ticks fired so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.load(Ordering::Acquire)
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Waits for the next tick, or for the timer to stop.
    pub async fn wait(&self) -> Tick {
        // Registered before the stop check so a tick racing with it is kept.
        let notified = self.inner.notify.notified();
        if self.is_stopped() {
            return Tick::Stopped;
        }

        tokio::select! {
            biased;
            () = self.inner.cancel.cancelled() => Tick::Stopped,
            () = notified => Tick::Fired(self.ticks()),
        }
    }

    /// Drives the timer until [`stop`](Self::stop) is called.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::AlreadyDriven` if another task is driving it.
    #[instrument(skip(self), fields(timer = %self.inner.id))]
    pub async fn run(&self) -> Result<(), TimerError> {
        if self.inner.driven.swap(true, Ordering::AcqRel) {
            return Err(Report::new(TimerError::AlreadyDriven));
        }
        debug!(interval = ?self.inner.interval, "timer started");

        let mut deadline = Instant::now() + self.inner.interval;
        loop {
            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => break,
                () = tokio::time::sleep_until(deadline) => {}
            }

            let now = Instant::now();
            while deadline <= now {
                self.inner.ticks.fetch_add(1, Ordering::AcqRel);
                self.inner.notify.notify_waiters();
                deadline += self.inner.interval;
            }
        }

        debug!(ticks = self.ticks(), "timer stopped");
        Ok(())
    }

    /// Stops the driving loop and releases every waiter.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
    }
}

impl std::fmt::Debug for PeriodicTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeriodicTimer")
            .field("id", &self.inner.id)
            .field("interval", &self.inner.interval)
            .field("ticks", &self.ticks())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(ms: u64) -> PeriodicTimer {
        PeriodicTimer::new(Duration::from_millis(ms)).expect("non-zero interval")
    }

    #[test]
    fn zero_interval_rejected() {
        let err = PeriodicTimer::new(Duration::ZERO).unwrap_err();
        assert_eq!(err.current_context(), &TimerError::ZeroInterval);
    }

    #[tokio::test(start_paused = true)]
    async fn one_tick_per_elapsed_interval() {
        let timer = timer(100);
        let driver = tokio::spawn({
            let timer = timer.clone();
            async move { timer.run().await }
        });
        let counter = tokio::spawn({
            let timer = timer.clone();
            async move {
                let mut observed = 0u64;
                while let Tick::Fired(_) = timer.wait().await {
                    observed += 1;
                }
                observed
            }
        });

        tokio::time::sleep(Duration::from_millis(310)).await;
        timer.stop();

        let observed = counter.await.expect("counter task");
        driver.await.expect("driver task").expect("run");
        assert_eq!(timer.ticks(), 3);
        assert!((3..=4).contains(&observed), "observed {observed} ticks");
    }

    #[tokio::test(start_paused = true)]
    async fn every_waiter_sees_the_same_tick() {
        let timer = timer(50);
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let timer = timer.clone();
                tokio::spawn(async move { timer.wait().await })
            })
            .collect();
        let driver = tokio::spawn({
            let timer = timer.clone();
            async move { timer.run().await }
        });

        for waiter in waiters {
            assert_eq!(waiter.await.expect("waiter"), Tick::Fired(1));
        }
        timer.stop();
        driver.await.expect("driver").expect("run");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_waiters_before_next_tick() {
        let timer = timer(3_600_000);
        let driver = tokio::spawn({
            let timer = timer.clone();
            async move { timer.run().await }
        });
        let waiter = tokio::spawn({
            let timer = timer.clone();
            async move { timer.wait().await }
        });

        tokio::task::yield_now().await;
        timer.stop();

        let tick = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter released promptly")
            .expect("waiter task");
        assert_eq!(tick, Tick::Stopped);
        driver.await.expect("driver").expect("run");
        assert_eq!(timer.ticks(), 0);
    }

    #[tokio::test]
    async fn stopped_timer_returns_immediately() {
        let timer = timer(10);
        timer.stop();
        assert_eq!(timer.wait().await, Tick::Stopped);
        timer.run().await.expect("run on a stopped timer ends at once");
    }

    #[tokio::test]
    async fn only_one_driver() {
        let timer = timer(10);
        let first = tokio::spawn({
            let timer = timer.clone();
            async move { timer.run().await }
        });
        tokio::task::yield_now().await;

        let err = timer.run().await.unwrap_err();
        assert_eq!(err.current_context(), &TimerError::AlreadyDriven);

        timer.stop();
        first.await.expect("driver").expect("run");
    }
}
