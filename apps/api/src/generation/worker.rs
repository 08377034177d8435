//! Bounded pool for background generation runs.
//!
//! A run must reserve a permit *before* any record is created; when none is free the
//! request is rejected instead of queued. The permit travels into the spawned task and is
//! released when the task ends.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct GenerationWorkers {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Proof that a worker slot is held.
pub struct WorkerSlot(OwnedSemaphorePermit);

impl GenerationWorkers {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Reserves a slot without waiting. `None` means the pool is saturated.
    pub fn try_reserve(&self) -> Option<WorkerSlot> {
        self.semaphore.clone().try_acquire_owned().ok().map(WorkerSlot)
    }

    /// Runs `task` in the background, holding `slot` until it finishes.
    pub fn spawn<F>(&self, slot: WorkerSlot, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let _slot = slot;
            task.await;
        })
    }
}
