//! Default constants for heap configuration.

/// Slots reserved up front by a new heap.
pub const DEFAULT_HEAP_CAPACITY: usize = 64;

/// Heap configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapOptions {
    /// Initial slot capacity
    pub initial_capacity: usize,
}

impl Default for HeapOptions {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_HEAP_CAPACITY,
        }
    }
}
