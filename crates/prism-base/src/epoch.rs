use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Shared generation counter used to invalidate work started earlier.
///
/// Work is stamped with the value of `current()` when it begins. Calling
/// `advance()` makes every earlier stamp stale, so a late result can be
/// recognized and dropped without cancelling the task that produced it.
#[derive(Clone, Debug)]
pub struct Epoch {
    value: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self {
            value: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn current(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Returns the new value.
    pub fn advance(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        epoch == self.current()
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::new()
    }
}
