use {
    prism_base::Tensor,
    std::{
        ops::{Deref, DerefMut},
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
    },
};

/// Snapshot of a [`BufferLedger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub allocated: u64,
    pub freed: u64,
}

impl BufferStats {
    pub fn outstanding(&self) -> u64 {
        self.allocated.saturating_sub(self.freed)
    }
}

/// Counts scratch tensors created and dropped during predicts.
#[derive(Debug, Clone, Default)]
pub struct BufferLedger {
    allocated: Arc<AtomicU64>,
    freed: Arc<AtomicU64>,
}

impl BufferLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tensor`; it is counted as freed when the returned buffer drops.
    pub fn scratch<T>(&self, tensor: Tensor<T>) -> ScratchBuffer<T> {
        self.allocated.fetch_add(1, Ordering::Relaxed);
        ScratchBuffer {
            tensor,
            ledger: self.clone(),
        }
    }

    pub fn stats(&self) -> BufferStats {
        BufferStats {
            allocated: self.allocated.load(Ordering::Acquire),
            freed: self.freed.load(Ordering::Acquire),
        }
    }
}

/// Tensor owned by a single predict call.
pub struct ScratchBuffer<T> {
    tensor: Tensor<T>,
    ledger: BufferLedger,
}

impl<T> Deref for ScratchBuffer<T> {
    type Target = Tensor<T>;

    fn deref(&self) -> &Tensor<T> {
        &self.tensor
    }
}

impl<T> DerefMut for ScratchBuffer<T> {
    fn deref_mut(&mut self) -> &mut Tensor<T> {
        &mut self.tensor
    }
}

impl<T> Drop for ScratchBuffer<T> {
    fn drop(&mut self) {
        self.ledger.freed.fetch_add(1, Ordering::Release);
    }
}
