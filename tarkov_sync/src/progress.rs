//! Progress reporting for long-running sync phases

use std::time::{Duration, Instant};

/// A snapshot of one phase's progress
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub phase: String,
    pub processed: usize,
    pub total: usize,
    pub percent: usize,
    /// Extrapolated from the average time per processed element
    pub eta: Duration,
}

/// Receives progress updates; the sync never depends on what it does with them
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, update: &ProgressUpdate);
}

impl<F> ProgressObserver for F
where
    F: Fn(&ProgressUpdate) + Send + Sync,
{
    fn on_progress(&self, update: &ProgressUpdate) {
        self(update)
    }
}

/// Default observer: one `info` line per update
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn on_progress(&self, update: &ProgressUpdate) {
        log::info!(
            "{} | Progress {}% ({}/{}), estimated remaining time: {} ms",
            update.phase,
            update.percent,
            update.processed,
            update.total,
            update.eta.as_millis()
        );
    }
}

/// Apply `f` to every element, notifying `observer` each time a new 10 %
/// boundary is crossed. Stops at the first error.
pub fn track_progress<T, E, F>(
    phase: &str,
    elements: &[T],
    observer: &dyn ProgressObserver,
    mut f: F,
) -> Result<(), E>
where
    F: FnMut(&T) -> Result<(), E>,
{
    let total = elements.len();
    let started = Instant::now();
    let mut last_decile = 0;

    for (index, element) in elements.iter().enumerate() {
        f(element)?;

        let processed = index + 1;
        let percent = processed * 100 / total;
        let decile = percent / 10;
        if decile > last_decile {
            last_decile = decile;
            let per_element = started.elapsed() / processed as u32;
            observer.on_progress(&ProgressUpdate {
                phase: phase.to_string(),
                processed,
                total,
                percent,
                eta: per_element * (total - processed) as u32,
            });
        }
    }

    Ok(())
}
