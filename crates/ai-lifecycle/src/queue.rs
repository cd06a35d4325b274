use ai_memory::WorldRegistry;

use crate::{LifecycleError, SNAPSHOT_QUEUE};

/// Bounded FIFO view over the registry's snapshot queue cell.
///
/// Each mutation is a single registry write, so a blob is either in the
/// queue or not; it can never be consumed twice.
pub struct SnapshotQueue<'a> {
    registry: &'a mut WorldRegistry,
}

impl<'a> SnapshotQueue<'a> {
    pub fn new(registry: &'a mut WorldRegistry) -> Self {
        Self { registry }
    }

    pub fn len(&mut self) -> usize {
        self.registry.get(SNAPSHOT_QUEUE).len()
    }

    pub fn is_empty(&mut self) -> bool {
        self.len() == 0
    }

    pub fn blobs(&mut self) -> Vec<String> {
        self.registry.get(SNAPSHOT_QUEUE)
    }

    pub fn front(&mut self) -> Option<String> {
        self.registry.get(SNAPSHOT_QUEUE).into_iter().next()
    }

    /// Append `blob`; if that exceeds `bound`, the oldest blobs are dropped.
    /// Returns the number dropped.
    pub fn push_back(&mut self, blob: String, bound: usize) -> Result<usize, LifecycleError> {
        let mut blobs = self.registry.get(SNAPSHOT_QUEUE);
        blobs.push(blob);
        let excess = blobs.len().saturating_sub(bound);
        if excess > 0 {
            tracing::warn!(dropped = excess, bound, "snapshot queue full, dropping oldest");
            blobs.drain(..excess);
        }
        self.registry.set(SNAPSHOT_QUEUE, blobs)?;
        Ok(excess)
    }

    pub fn pop_front(&mut self) -> Result<Option<String>, LifecycleError> {
        let mut blobs = self.registry.get(SNAPSHOT_QUEUE);
        if blobs.is_empty() {
            return Ok(None);
        }
        let front = blobs.remove(0);
        self.registry.set(SNAPSHOT_QUEUE, blobs)?;
        Ok(Some(front))
    }

    /// Pop the front only if it is still `expected`.
    pub fn pop_front_if(&mut self, expected: &str) -> Result<bool, LifecycleError> {
        let mut blobs = self.registry.get(SNAPSHOT_QUEUE);
        if blobs.first().map(String::as_str) != Some(expected) {
            return Ok(false);
        }
        blobs.remove(0);
        self.registry.set(SNAPSHOT_QUEUE, blobs)?;
        Ok(true)
    }

    /// Drop the oldest blobs until at most `bound` remain. Returns the number dropped.
    pub fn retain_newest(&mut self, bound: usize) -> Result<usize, LifecycleError> {
        let mut blobs = self.registry.get(SNAPSHOT_QUEUE);
        let excess = blobs.len().saturating_sub(bound);
        if excess == 0 {
            return Ok(0);
        }
        blobs.drain(..excess);
        self.registry.set(SNAPSHOT_QUEUE, blobs)?;
        Ok(excess)
    }

    pub fn clear(&mut self) -> Result<usize, LifecycleError> {
        let n = self.len();
        self.registry.set(SNAPSHOT_QUEUE, Vec::new())?;
        Ok(n)
    }
}
