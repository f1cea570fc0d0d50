//! Seed orchestration: plan the remaining work, fan it out to workers, and
//! fan their outcomes back in.

use crate::args::{SeedSettings, MAX_WORKER_COUNT};
use crate::error::SeedError;
use crate::progress::{ProgressCounter, ProgressReporter, DEFAULT_REPORT_INTERVAL};
use crate::store::{Store, Table};
use crate::worker::{job_queue, Job, Worker, WorkerOutcome};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Table whose row count stands in for both mirrored tables.
pub const PROXY_TABLE: Table = Table::WithVirtual;

/// The work needed to bring the tables up to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedPlan {
    pub target_total: u64,
    pub existing: u64,
    pub batch_size: u64,
}

impl SeedPlan {
    pub fn new(target_total: u64, existing: u64, batch_size: u64) -> Self {
        Self {
            target_total,
            existing,
            batch_size: batch_size.max(1),
        }
    }

    /// Nothing left to insert.
    pub fn is_complete(&self) -> bool {
        self.existing >= self.target_total
    }

    pub fn remaining(&self) -> u64 {
        self.target_total.saturating_sub(self.existing)
    }

    pub fn job_count(&self) -> u64 {
        self.remaining().div_ceil(self.batch_size)
    }

    /// Full batches followed by one smaller remainder, if any.
    pub fn jobs(&self) -> impl Iterator<Item = Job> {
        let remaining = self.remaining();
        let batch_size = self.batch_size;
        (0..self.job_count()).map(move |id| Job {
            id,
            size: batch_size.min(remaining - id * batch_size),
        })
    }

    pub fn last_job_size(&self) -> Option<u64> {
        match self.remaining() {
            0 => None,
            r if r % self.batch_size == 0 => Some(self.batch_size),
            r => Some(r % self.batch_size),
        }
    }
}

/// Summary of a finished seed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedReport {
    /// Rows present before the run.
    pub existing: u64,
    /// Rows committed by this run.
    pub inserted: u64,
    /// Batches committed by this run.
    pub batches: u64,
    pub elapsed: Duration,
}

impl SeedReport {
    /// Calculate rows per second.
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.inserted as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Fills the invoice tables up to a target row count using concurrent workers.
pub struct Seeder<S> {
    store: Arc<S>,
    settings: SeedSettings,
    report_interval: Duration,
}

impl<S: Store> Seeder<S> {
    pub fn new(store: Arc<S>, settings: SeedSettings) -> Self {
        Self {
            store,
            settings,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }

    /// Set how often progress is logged.
    pub fn with_report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    pub fn settings(&self) -> &SeedSettings {
        &self.settings
    }

    /// Read the current row count and work out what is left to do.
    pub async fn plan(&self) -> Result<SeedPlan, SeedError> {
        let existing = self
            .store
            .count_rows(PROXY_TABLE)
            .await
            .map_err(|e| SeedError::CountRows(Box::new(e)))?;

        Ok(SeedPlan::new(
            self.settings.target_total,
            existing,
            self.settings.batch_size,
        ))
    }

    /// Insert rows until the proxy table holds the target total.
    ///
    /// Safe to call again after a restart: only the missing rows are
    /// inserted, and nothing is written when the target is already met.
    /// Returns the first worker error, after every worker has reported.
    pub async fn seed(&self) -> Result<SeedReport, SeedError> {
        let plan = self.plan().await?;

        if plan.is_complete() {
            info!(
                "Data already seeded ({} rows), skipping...",
                plan.existing
            );
            return Ok(SeedReport {
                existing: plan.existing,
                ..SeedReport::default()
            });
        }

        let worker_count = self.settings.worker_count.clamp(1, MAX_WORKER_COUNT);
        let remaining = plan.remaining();
        info!(
            "Seeding {} rows with {} workers (existing: {}, target: {})...",
            remaining, worker_count, plan.existing, plan.target_total
        );
        let start = Instant::now();

        let progress = ProgressCounter::new();
        let (jobs, job_rx) = job_queue(worker_count.saturating_mul(2));
        let (outcome_tx, mut outcome_rx) = mpsc::channel::<WorkerOutcome>(worker_count);

        for index in 0..worker_count {
            let worker = Worker::new(index, self.store.clone(), job_rx.clone(), progress.clone());
            let outcome_tx = outcome_tx.clone();
            tokio::spawn(async move {
                let outcome = worker.run().await;
                let _ = outcome_tx.send(outcome).await;
            });
        }
        drop(outcome_tx);
        drop(job_rx);

        let reporter =
            ProgressReporter::spawn(progress.clone(), remaining, start, self.report_interval);

        // Every job is offered even after a worker fails; the only early exit
        // is when no worker is left to receive.
        for job in plan.jobs() {
            if let Err(job) = jobs.send(job).await {
                warn!(
                    "All workers exited; job {} and later were not enqueued",
                    job.id
                );
                break;
            }
        }
        drop(jobs);

        let mut first_err = None;
        let mut batches = 0u64;
        let mut received = 0usize;
        while received < worker_count {
            let Some(outcome) = outcome_rx.recv().await else {
                break;
            };
            received += 1;
            batches += outcome.completed.len() as u64;
            if let Err(e) = outcome.result {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }

        reporter.stop().await;

        if received < worker_count && first_err.is_none() {
            first_err = Some(SeedError::WorkersLost {
                missing: worker_count - received,
            });
        }
        if let Some(e) = first_err {
            return Err(e);
        }

        let report = SeedReport {
            existing: plan.existing,
            inserted: progress.get(),
            batches,
            elapsed: start.elapsed(),
        };
        info!(
            "Seeding completed: {} rows in {:?} ({:.2} rows/sec)",
            report.inserted,
            report.elapsed,
            report.rows_per_second()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_partitions_remainder() {
        let plan = SeedPlan::new(12_345, 0, 5_000);
        let sizes: Vec<u64> = plan.jobs().map(|j| j.size).collect();
        assert_eq!(sizes, vec![5_000, 5_000, 2_345]);
        assert_eq!(plan.job_count(), 3);
        assert_eq!(plan.last_job_size(), Some(2_345));
    }

    #[test]
    fn test_plan_even_split() {
        let plan = SeedPlan::new(20_000, 10_000, 5_000);
        let sizes: Vec<u64> = plan.jobs().map(|j| j.size).collect();
        assert_eq!(sizes, vec![5_000, 5_000]);
        assert_eq!(plan.last_job_size(), Some(5_000));
    }

    #[test]
    fn test_plan_complete() {
        for existing in [100, 101, 5_000] {
            let plan = SeedPlan::new(100, existing, 5_000);
            assert!(plan.is_complete());
            assert_eq!(plan.remaining(), 0);
            assert_eq!(plan.jobs().count(), 0);
            assert_eq!(plan.last_job_size(), None);
        }
    }

    #[test]
    fn test_plan_job_ids_are_unique_and_ordered() {
        let plan = SeedPlan::new(10_001, 0, 1_000);
        let ids: Vec<u64> = plan.jobs().map(|j| j.id).collect();
        assert_eq!(ids, (0..11).collect::<Vec<_>>());
        assert_eq!(plan.jobs().map(|j| j.size).sum::<u64>(), 10_001);
    }

    #[test]
    fn test_plan_zero_batch_size_is_clamped() {
        let plan = SeedPlan::new(3, 0, 0);
        assert_eq!(plan.job_count(), 3);
    }

    #[test]
    fn test_report_rate() {
        let report = SeedReport {
            existing: 0,
            inserted: 1_000,
            batches: 10,
            elapsed: Duration::from_secs(10),
        };
        assert_eq!(report.rows_per_second(), 100.0);
        assert_eq!(SeedReport::default().rows_per_second(), 0.0);
    }
}
