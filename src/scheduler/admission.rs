use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::Cancelled;

/// Caps the number of tasks doing network work at the same time.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// One unit of the concurrency budget. Returned to the gate on drop, so every
/// exit path of the holder releases it.
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    pub fn new(concurrency: usize) -> Self {
        let capacity = concurrency.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.capacity - self.permits.available_permits()
    }

    /// Wait for a permit, or for cancellation, whichever comes first.
    pub async fn admit(&self, cancel: &CancellationToken) -> Result<AdmissionPermit, Cancelled> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            permit = self.permits.clone().acquire_owned() => permit
                .map(|permit| AdmissionPermit { _permit: permit })
                .map_err(|_| Cancelled),
        }
    }
}
