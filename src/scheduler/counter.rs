//! Shared monotonic counter.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cheaply cloneable counter.
///
/// The owning task increments it; clones handed out beforehand can read the
/// value while the task runs or after it has stopped.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn increment(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }
}
