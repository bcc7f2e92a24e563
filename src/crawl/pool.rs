// src/crawl/pool.rs
// =============================================================================
// A fixed-size pool of fetch workers connected by two bounded queues.
//
//   Submitter ──jobs──▶ [worker 1..N] ──outcomes──▶ PoolEvents
//
// How it works:
// 1. WorkerPool::new() creates both queues and hands back the Submitter
// 2. run() spawns N worker tasks; each takes a job, fetches the page and
//    publishes one Outcome
// 3. A worker exits when the job queue is closed and empty, or when the
//    cancellation token fires
// 4. Once every worker has exited, the outcome queue closes and PoolEvents
//    yields PoolEvent::Done
//
// Backpressure: both queues are bounded, so submit() and reserve() wait while
// the job queue is full and workers wait while the outcome queue is full.
//
// Rust concepts:
// - mpsc channels: bounded async queues from tokio
// - Arc<Mutex<Receiver>>: lets several workers pull from one receiver
// - CancellationToken: one signal observed by every task
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::job::{Job, Outcome};
use crate::error::PoolError;
use crate::fetch::PageFetcher;

/// The worker side of the pool, before it is started
pub struct WorkerPool {
    fetcher: Arc<dyn PageFetcher>,
    jobs: mpsc::Receiver<Job>,
    outcomes_tx: mpsc::Sender<Outcome>,
    outcomes_rx: mpsc::Receiver<Outcome>,
    request_timeout: Duration,
}

/// The job side of the pool
///
/// There is exactly one Submitter per pool and it is not Clone, so the task
/// that owns it is the only one that can submit jobs or close the input.
pub struct Submitter {
    jobs: Option<mpsc::Sender<Job>>,
}

/// Outcomes published by the workers, followed by a single Done
pub struct PoolEvents {
    outcomes: mpsc::Receiver<Outcome>,
    done: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub enum PoolEvent {
    Outcome(Outcome),
    /// Every worker has exited and every outcome has been handed out
    Done,
}

impl WorkerPool {
    // Creates the pool and its Submitter
    //
    // Parameters:
    //   fetcher: shared by all workers
    //   capacity: size of the job queue and of the outcome queue
    //   request_timeout: upper bound for one page fetch
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        capacity: usize,
        request_timeout: Duration,
    ) -> (Self, Submitter) {
        let capacity = capacity.max(1);
        let (jobs_tx, jobs_rx) = mpsc::channel(capacity);
        let (outcomes_tx, outcomes_rx) = mpsc::channel(capacity);

        let pool = Self {
            fetcher,
            jobs: jobs_rx,
            outcomes_tx,
            outcomes_rx,
            request_timeout,
        };

        (pool, Submitter { jobs: Some(jobs_tx) })
    }

    /// Starts `workers` worker tasks and returns the outcome stream
    pub fn run(self, workers: usize, cancel: CancellationToken) -> PoolEvents {
        let jobs = Arc::new(Mutex::new(self.jobs));

        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|index| {
                tokio::spawn(worker(
                    index,
                    self.fetcher.clone(),
                    jobs.clone(),
                    self.outcomes_tx.clone(),
                    cancel.clone(),
                    self.request_timeout,
                ))
            })
            .collect();

        // Only the workers hold senders now, so the outcome queue closes
        // as soon as the last worker exits
        drop(self.outcomes_tx);

        let done = tokio::spawn(async move {
            for result in futures::future::join_all(handles).await {
                if let Err(e) = result {
                    error!("worker task failed: {}", e);
                }
            }
            debug!(workers, "all workers exited");
        });

        PoolEvents {
            outcomes: self.outcomes_rx,
            done: Some(done),
        }
    }
}

// One worker: take a job, execute it, publish the outcome, repeat
async fn worker(
    index: usize,
    fetcher: Arc<dyn PageFetcher>,
    jobs: Arc<Mutex<mpsc::Receiver<Job>>>,
    outcomes: mpsc::Sender<Outcome>,
    cancel: CancellationToken,
    request_timeout: Duration,
) {
    loop {
        let job = {
            let mut jobs = jobs.lock().await;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                job = jobs.recv() => job,
            }
        };

        // None: input closed and drained, or cancelled
        let Some(job) = job else {
            break;
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(worker = index, url = %job.url, "fetch aborted by cancellation");
                break;
            }
            result = job.execute(fetcher.as_ref(), request_timeout) => result,
        };

        if outcomes.send(Outcome { job, result }).await.is_err() {
            // Nobody is listening for outcomes any more
            break;
        }
    }

    debug!(worker = index, "worker exited");
}

impl Submitter {
    /// Enqueues a job, waiting while the job queue is full
    ///
    /// A caller that also has to keep receiving outcomes should wait on
    /// reserve() inside its select! instead, so it never sits blocked here
    /// while the workers wait for it.
    pub async fn submit(&self, job: Job) -> Result<(), PoolError> {
        let permit = self.reserve().await?;
        permit.send(job);
        Ok(())
    }

    /// Waits for a free slot in the job queue
    ///
    /// The returned permit sends exactly one job. Dropping it unused gives
    /// the slot back.
    pub async fn reserve(&self) -> Result<mpsc::Permit<'_, Job>, PoolError> {
        let jobs = self.jobs.as_ref().ok_or(PoolError::InputClosed)?;
        jobs.reserve().await.map_err(|_| PoolError::InputClosed)
    }

    /// Jobs waiting in the queue (for progress output only)
    pub fn queue_depth(&self) -> usize {
        self.jobs
            .as_ref()
            .map_or(0, |jobs| jobs.max_capacity() - jobs.capacity())
    }

    // Signals that no more jobs will be submitted
    //
    // Workers finish what is already queued and then exit. Only the first
    // call closes the queue; it returns false afterwards.
    pub fn close_input(&mut self) -> bool {
        self.jobs.take().is_some()
    }
}

impl PoolEvents {
    /// Waits for the next outcome, or for Done once the pool has finished
    ///
    /// Buffered outcomes are always handed out before Done.
    pub async fn next(&mut self) -> PoolEvent {
        let Some(done) = self.done.as_mut() else {
            return PoolEvent::Done;
        };

        let event = tokio::select! {
            biased;
            Some(outcome) = self.outcomes.recv() => PoolEvent::Outcome(outcome),
            joined = done => {
                if let Err(e) = joined {
                    error!("worker pool supervisor failed: {}", e);
                }
                PoolEvent::Done
            }
        };

        if matches!(event, PoolEvent::Done) {
            self.done = None;
        }
        event
    }
}
