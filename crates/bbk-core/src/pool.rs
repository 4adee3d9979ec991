//! Bounded worker pools for blocking work.
//!
//! A pool is a semaphore in front of `tokio::task::spawn_blocking`: at most
//! `size` closures of a pool run at once. The run uses two pools, one for
//! network calls and one for checksum (disk) work, so a backlog on one side
//! never starves the other.

use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::control::RunControl;
use crate::transfer::TransferError;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    size: usize,
    permits: Arc<Semaphore>,
    control: Arc<RunControl>,
}

impl WorkerPool {
    pub fn new(name: &'static str, size: usize, control: Arc<RunControl>) -> Self {
        let size = size.max(1);
        Self {
            name,
            size,
            permits: Arc::new(Semaphore::new(size)),
            control,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of closures currently running (or holding a slot).
    pub fn busy(&self) -> usize {
        self.size - self.permits.available_permits()
    }

    /// Runs `f` on a blocking thread once a slot is free.
    ///
    /// Fails with `TransferError::Cancelled` if the run was aborted before the
    /// closure could start.
    pub async fn run<T, F>(&self, f: F) -> Result<T, TransferError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.control.is_aborted() {
            return Err(TransferError::Cancelled);
        }
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| TransferError::Cancelled)?;
        if self.control.is_aborted() {
            return Err(TransferError::Cancelled);
        }
        tokio::task::spawn_blocking(move || {
            // Slot is held until the closure returns, even if the awaiting task is dropped.
            let _permit = permit;
            f()
        })
        .await
        .map_err(|source| TransferError::Worker {
            pool: self.name,
            source,
        })
    }

    /// Refuse all further work. Closures already running finish on their own.
    pub fn close(&self) {
        self.permits.close();
    }
}
