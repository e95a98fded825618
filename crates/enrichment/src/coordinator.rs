//! Bounded fan-out of per-airline work.
//!
//! Every airline gets its own Tokio task; a semaphore caps how many run at
//! once. Tasks are never cancelled: the batch waits for all of them, and a
//! failed or panicking task only marks its own airline as failed.

use std::future::Future;
use std::sync::Arc;

use common::{EntityId, Error};
use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Matches the worker count of the daily collection jobs.
pub const DEFAULT_MAX_CONCURRENT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPhase {
    Idle,
    Dispatching,
    Collecting,
    Done,
}

/// Terminal state of one airline's task.
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Succeeded(T),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityFailure {
    pub entity_id: EntityId,
    pub reason: String,
}

/// Results of one batch, in dispatch order.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub succeeded: Vec<(EntityId, T)>,
    pub failures: Vec<EntityFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failures.len()
    }
}

/// Runs per-airline operations with at most `max_concurrent` in flight.
#[derive(Debug)]
pub struct FetchCoordinator {
    max_concurrent: usize,
    phase: Mutex<BatchPhase>,
}

impl FetchCoordinator {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            phase: Mutex::new(BatchPhase::Idle),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn phase(&self) -> BatchPhase {
        *self.phase.lock()
    }

    fn enter(&self, phase: BatchPhase) {
        debug!("Batch phase: {:?}", phase);
        *self.phase.lock() = phase;
    }

    /// Run `op` once per airline and collect every result.
    pub async fn run<T, F, Fut>(&self, entities: Vec<EntityId>, op: F) -> BatchOutcome<T>
    where
        T: Send + 'static,
        F: Fn(EntityId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        self.enter(BatchPhase::Dispatching);
        info!(
            "Dispatching {} airlines ({} at a time)",
            entities.len(),
            self.max_concurrent
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let op = Arc::new(op);
        let mut handles = Vec::with_capacity(entities.len());

        for entity_id in entities {
            let semaphore = semaphore.clone();
            let op = op.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| Error::Other(format!("worker pool closed: {}", e)))?;
                op(entity_id).await
            });
            handles.push((entity_id, handle));
        }

        self.enter(BatchPhase::Collecting);

        let mut outcome = BatchOutcome {
            succeeded: Vec::new(),
            failures: Vec::new(),
        };

        for (entity_id, handle) in handles {
            let task_outcome = match handle.await {
                Ok(Ok(value)) => TaskOutcome::Succeeded(value),
                Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
                Err(e) => TaskOutcome::Failed(format!("task aborted: {}", e)),
            };

            match task_outcome {
                TaskOutcome::Succeeded(value) => outcome.succeeded.push((entity_id, value)),
                TaskOutcome::Failed(reason) => {
                    warn!("Airline {} failed: {}", entity_id, reason);
                    outcome.failures.push(EntityFailure { entity_id, reason });
                }
            }
        }

        self.enter(BatchPhase::Done);
        info!(
            "Batch done: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failures.len()
        );

        outcome
    }
}

impl Default for FetchCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT)
    }
}
