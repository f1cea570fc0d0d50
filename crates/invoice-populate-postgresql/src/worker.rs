//! Job queue and the insert workers draining it.

use crate::error::SeedError;
use crate::insert::insert_batch;
use crate::progress::ProgressCounter;
use crate::store::Store;
use invoice_generator::worker_rng;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

/// One batch waiting to be inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Position of the job in the run, unique per run.
    pub id: u64,
    /// Number of records to insert.
    pub size: u64,
}

/// Create a bounded job queue.
///
/// Sending blocks once `capacity` jobs are waiting. Dropping the sender
/// closes the queue; receivers still drain whatever is buffered.
pub fn job_queue(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        JobSender { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer side of the job queue.
#[derive(Debug)]
pub struct JobSender {
    tx: mpsc::Sender<Job>,
}

impl JobSender {
    /// Enqueue a job, waiting for room.
    ///
    /// Gives the job back if every receiver is gone.
    pub async fn send(&self, job: Job) -> Result<(), Job> {
        self.tx.send(job).await.map_err(|e| e.0)
    }
}

/// Consumer side of the job queue, shared by all workers.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobReceiver {
    /// Next job in FIFO order, or `None` once the queue is closed and empty.
    pub async fn next(&self) -> Option<Job> {
        // One worker at a time waits on the queue
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// The single terminal report of a worker.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub worker: usize,
    /// Ids of the jobs this worker committed, in the order it took them.
    pub completed: Vec<u64>,
    /// `Err` holds the first failure; the worker took no jobs after it.
    pub result: Result<(), SeedError>,
}

/// Insert worker owning a private random stream.
pub struct Worker<S> {
    index: usize,
    store: Arc<S>,
    jobs: JobReceiver,
    progress: ProgressCounter,
}

impl<S: Store> Worker<S> {
    pub fn new(index: usize, store: Arc<S>, jobs: JobReceiver, progress: ProgressCounter) -> Self {
        Self {
            index,
            store,
            jobs,
            progress,
        }
    }

    /// Take jobs until the queue is drained or a batch fails.
    ///
    /// A failure stops only this worker. Jobs still queued are left to the
    /// other workers and nothing already running is cancelled.
    pub async fn run(self) -> WorkerOutcome {
        let mut rng = worker_rng(self.index);
        let mut completed = Vec::new();

        while let Some(job) = self.jobs.next().await {
            if let Err(e) = insert_batch(self.store.as_ref(), job.size, &mut rng).await {
                error!(
                    "Worker {} failed on job {} ({} rows): {}",
                    self.index, job.id, job.size, e
                );
                return WorkerOutcome {
                    worker: self.index,
                    completed,
                    result: Err(e),
                };
            }

            self.progress.add(job.size);
            completed.push(job.id);
        }

        debug!(
            "Worker {} finished after {} job(s)",
            self.index,
            completed.len()
        );
        WorkerOutcome {
            worker: self.index,
            completed,
            result: Ok(()),
        }
    }
}
