//! Serialized access for multi-threaded hosts.
//!
//! The heap itself has no internal synchronization; every operation assumes
//! exclusive access for its whole (bounded, non-blocking) duration. A host
//! with multiple threads serializes all entry points through one global
//! lock, which this wrapper provides.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::heap::{Heap, HeapCorruption, HeapStats, PageSegment, SegmentProvider};

/// A clonable handle to a heap behind a single global lock.
pub struct SharedHeap<S: SegmentProvider = PageSegment> {
    inner: Arc<Mutex<Heap<S>>>,
}

impl<S: SegmentProvider> Clone for SharedHeap<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for SharedHeap<PageSegment> {
    fn default() -> Self {
        Self::new(Heap::default())
    }
}

impl<S: SegmentProvider> SharedHeap<S> {
    /// Wraps `heap` in a shared, lock-serialized handle.
    pub fn new(heap: Heap<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(heap)),
        }
    }

    /// Resets the heap to its initial empty state.
    pub fn init(&self) {
        self.inner.lock().init();
    }

    /// See [`Heap::allocate`].
    pub fn allocate(&self, size: usize) -> Option<usize> {
        self.inner.lock().allocate(size)
    }

    /// See [`Heap::release`].
    pub fn release(&self, ptr: usize) {
        self.inner.lock().release(ptr);
    }

    /// See [`Heap::resize`].
    pub fn resize(&self, ptr: usize, new_size: usize) -> Option<usize> {
        self.inner.lock().resize(ptr, new_size)
    }

    /// Copy of the current operation counters.
    pub fn stats(&self) -> HeapStats {
        self.inner.lock().stats()
    }

    /// Runs the structural validator under the lock.
    pub fn validate(&self) -> Result<(), HeapCorruption> {
        self.inner.lock().validate()
    }

    /// Runs `f` with exclusive access to the heap, for payload reads and
    /// writes that must happen under the same lock as the operations around
    /// them.
    pub fn with<R>(&self, f: impl FnOnce(&mut Heap<S>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
