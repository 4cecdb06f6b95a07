use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Process-wide epoch of the conversation.
///
/// Every job is stamped with the value current at creation and is only
/// processed by a stage while the stamp still equals [`GenerationCounter::read`].
/// Clones share the same cell.
#[derive(Clone, Debug, Default)]
pub struct GenerationCounter {
    value: Arc<AtomicI64>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }

    /// Increments the counter and returns the new value.
    pub fn bump(&self) -> i64 {
        self.value.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: i64) -> bool {
        self.read() == generation
    }
}
