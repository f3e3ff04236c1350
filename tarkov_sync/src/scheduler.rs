//! Timer-driven, single-flight job runner
//!
//! The first run starts after an initial delay, then one trigger fires every
//! interval. A trigger that fires while the previous run is still active is
//! skipped, never run alongside it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// At most one holder of the flight at a time
#[derive(Debug, Clone, Default)]
pub struct SingleFlight {
    running: Arc<AtomicBool>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flight, or `None` if it is already taken
    pub fn try_acquire(&self) -> Option<FlightGuard> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightGuard {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the flight when dropped, also on panic
#[derive(Debug)]
pub struct FlightGuard {
    running: Arc<AtomicBool>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// What happened during one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub started: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    initial_delay: Duration,
    interval: Duration,
}

impl Scheduler {
    pub fn new(initial_delay: Duration, interval: Duration) -> Self {
        Self {
            initial_delay,
            interval,
        }
    }

    /// Trigger `job` until `shutdown` resolves, then wait for the run in
    /// flight, if any.
    pub async fn run<F, Fut, S>(&self, mut job: F, shutdown: S) -> SchedulerStats
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        S: Future<Output = ()>,
    {
        let flight = SingleFlight::new();
        let mut stats = SchedulerStats::default();
        let mut in_flight: Option<JoinHandle<()>> = None;

        let mut ticker = time::interval_at(Instant::now() + self.initial_delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "Scheduler started: first run in {}s, then every {}s",
            self.initial_delay.as_secs(),
            self.interval.as_secs()
        );

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping scheduler");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(guard) = flight.try_acquire() else {
                        log::warn!("Previous sync cycle still running, skipping this trigger");
                        stats.skipped += 1;
                        continue;
                    };
                    log::info!("Scheduled run triggered");
                    stats.started += 1;
                    let run = job();
                    in_flight = Some(tokio::spawn(async move {
                        run.await;
                        drop(guard);
                    }));
                }
            }
        }

        if let Some(handle) = in_flight {
            if flight.is_running() {
                log::info!("Waiting for the running sync cycle to finish");
            }
            if let Err(e) = handle.await {
                log::error!("Sync cycle task failed: {}", e);
            }
        }

        stats
    }
}
