//! Bounded worker pool.
//!
//! A fixed number of long-lived tokio tasks pull boxed [`Job`]s from one
//! bounded queue. `submit` waits when the queue is full; `stop` closes the
//! queue and waits for every worker to drain it. Each job runs in its own
//! task so a panic is contained to that job.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use devread_shared::{DevreadError, PoolConfig, Result};

/// Future returned by [`Job::execute`].
pub type JobFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of work run by the pool.
///
/// Execution must not fail outward: jobs handle and log their own errors.
pub trait Job: Send + 'static {
    fn execute(self: Box<Self>) -> JobFuture;
}

type BoxedJob = Box<dyn Job>;

enum PoolState {
    Idle,
    Running {
        sender: mpsc::Sender<BoxedJob>,
        workers: Vec<JoinHandle<()>>,
    },
    Stopped,
}

/// Fixed-concurrency job runner. One instance per crawl cycle.
pub struct WorkerPool {
    config: PoolConfig,
    state: PoolState,
}

impl WorkerPool {
    /// Create an idle pool. Sizes of zero are raised to one.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config: PoolConfig {
                workers: config.workers.max(1),
                queue_capacity: config.queue_capacity.max(1),
            },
            state: PoolState::Idle,
        }
    }

    /// Number of workers this pool runs.
    pub fn workers(&self) -> usize {
        self.config.workers
    }

    /// Spawn the workers. Only valid once, on an idle pool.
    pub fn start(&mut self) -> Result<()> {
        if !matches!(self.state, PoolState::Idle) {
            return Err(DevreadError::pool("start called on a pool that is not idle"));
        }

        let (sender, receiver) = mpsc::channel::<BoxedJob>(self.config.queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..self.config.workers)
            .map(|id| tokio::spawn(worker_loop(id, Arc::clone(&receiver))))
            .collect();

        debug!(
            workers = self.config.workers,
            queue_capacity = self.config.queue_capacity,
            "worker pool started"
        );
        self.state = PoolState::Running { sender, workers };
        Ok(())
    }

    /// Enqueue a job, waiting for a free slot when the queue is full.
    pub async fn submit(&self, job: impl Job) -> Result<()> {
        let PoolState::Running { sender, .. } = &self.state else {
            return Err(DevreadError::pool("submit called on a pool that is not running"));
        };

        sender
            .send(Box::new(job))
            .await
            .map_err(|_| DevreadError::pool("all workers have exited"))
    }

    /// Close the queue and wait for queued and in-flight jobs to finish.
    pub async fn stop(&mut self) -> Result<()> {
        let (sender, workers) = match std::mem::replace(&mut self.state, PoolState::Stopped) {
            PoolState::Running { sender, workers } => (sender, workers),
            other => {
                // A rejected call leaves the state untouched.
                self.state = other;
                return Err(DevreadError::pool("stop called on a pool that is not running"));
            }
        };

        drop(sender);
        for (id, handle) in workers.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!(worker = id, error = %e, "worker terminated abnormally");
            }
        }

        debug!("worker pool stopped");
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if let PoolState::Running { .. } = self.state {
            // Dropping the sender lets the workers drain the queue and exit on their own.
            warn!("worker pool dropped while running; queued jobs finish detached");
        }
    }
}

async fn worker_loop(id: usize, receiver: Arc<Mutex<mpsc::Receiver<BoxedJob>>>) {
    loop {
        let job = {
            let mut rx = receiver.lock().await;
            rx.recv().await
        };
        let Some(job) = job else { break };
        // A panicking job ends its own task, never the worker.
        if let Err(e) = tokio::spawn(job.execute()).await {
            error!(worker = id, error = %e, "job terminated abnormally");
        }
    }
    debug!(worker = id, "worker exiting");
}
