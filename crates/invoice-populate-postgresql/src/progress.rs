//! Shared progress counter and the periodic throughput reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Interval between progress log lines.
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Rows committed so far in the current run.
///
/// Only whole committed batches are added. Cloning shares the same count.
#[derive(Debug, Clone, Default)]
pub struct ProgressCounter {
    inserted: Arc<AtomicU64>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, rows: u64) {
        self.inserted.fetch_add(rows, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }
}

/// Throughput figures for one progress tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub inserted: u64,
    pub remaining: u64,
    pub rows_per_second: f64,
    /// `None` while nothing has been inserted yet.
    pub eta: Option<Duration>,
}

impl ProgressSnapshot {
    pub fn compute(inserted: u64, remaining: u64, elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        let rows_per_second = if secs > 0.0 {
            inserted as f64 / secs
        } else {
            0.0
        };

        let eta = (rows_per_second > 0.0).then(|| {
            let left = remaining.saturating_sub(inserted) as f64;
            Duration::from_secs((left / rows_per_second).round() as u64)
        });

        Self {
            inserted,
            remaining,
            rows_per_second,
            eta,
        }
    }

    fn log(&self) {
        match self.eta {
            Some(eta) => info!(
                "Inserted {}/{} rows ({:.0} rows/sec, ETA: {:?})",
                self.inserted, self.remaining, self.rows_per_second, eta
            ),
            None => info!(
                "Inserted {}/{} rows ({:.0} rows/sec, ETA: unknown)",
                self.inserted, self.remaining, self.rows_per_second
            ),
        }
    }
}

/// Background task logging progress until stopped.
pub struct ProgressReporter {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl ProgressReporter {
    /// Start reporting against `remaining` rows, measuring from `started`.
    ///
    /// The first line is logged one `interval` after start.
    pub fn spawn(
        counter: ProgressCounter,
        remaining: u64,
        started: Instant,
        interval: Duration,
    ) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        ProgressSnapshot::compute(counter.get(), remaining, started.elapsed()).log();
                    }
                    _ = &mut stopped => break,
                }
            }
        });

        Self { stop, handle }
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.handle.await {
            warn!("Progress reporter exited abnormally: {}", e);
        }
    }
}
