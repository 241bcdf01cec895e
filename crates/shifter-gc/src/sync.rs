//! Sharing a collector between threads.
//!
//! Allocation and collection both mutate the arena, and a collection moves
//! objects, so every mutator access must be serialized with them.
//! [`SharedCollector`] puts the whole [`Collector`] behind one
//! `parking_lot` mutex: while any thread holds the lock, no collection can
//! run, and addresses it reads stay valid until it releases the lock.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use shifter_gc::{Address, Collector, GcBehavior, Heap, HeapConfig, RootSet, SharedCollector};
//!
//! struct NoRoots;
//!
//! impl GcBehavior for NoRoots {
//!     fn root_set(&self) -> RootSet {
//!         RootSet::new()
//!     }
//!     fn size_of(&self, _heap: &Heap, _object: Address) -> usize {
//!         16
//!     }
//!     fn referenced_fields(&self, _heap: &Heap, _object: Address) -> Vec<usize> {
//!         Vec::new()
//!     }
//! }
//!
//! let shared = Arc::new(SharedCollector::new(Collector::new(
//!     &HeapConfig::new().size(1 << 16),
//!     NoRoots,
//! )));
//! let worker = std::thread::spawn({
//!     let shared = Arc::clone(&shared);
//!     move || shared.alloc_object(16).is_some()
//! });
//! assert!(worker.join().unwrap());
//! shared.collect();
//! assert_eq!(shared.informations().actual_heap_memory, 0);
//! ```

use parking_lot::{Mutex, MutexGuard};

use crate::behavior::GcBehavior;
use crate::collector::Collector;
use crate::metrics::{GcInformations, GcMetrics};
use crate::ptr::Address;

/// A [`Collector`] behind a mutex.
#[derive(Debug)]
pub struct SharedCollector<B: GcBehavior> {
    inner: Mutex<Collector<B>>,
}

impl<B: GcBehavior> SharedCollector<B> {
    /// Wrap `collector`.
    #[must_use]
    pub fn new(collector: Collector<B>) -> Self {
        Self {
            inner: Mutex::new(collector),
        }
    }

    /// Allocate an object; see [`Collector::alloc_object`].
    pub fn alloc_object(&self, size: usize) -> Option<Address> {
        self.inner.lock().alloc_object(size)
    }

    /// Run a full collection.
    pub fn collect(&self) -> GcMetrics {
        self.inner.lock().collect()
    }

    /// Memory use and accumulated timings.
    #[must_use]
    pub fn informations(&self) -> GcInformations {
        self.inner.lock().informations()
    }

    /// Run `f` with exclusive access to the collector.
    pub fn with<R>(&self, f: impl FnOnce(&mut Collector<B>) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Lock the collector for a longer sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Collector<B>> {
        self.inner.lock()
    }

    /// Try to lock the collector without blocking.
    pub fn try_lock(&self) -> Option<MutexGuard<'_, Collector<B>>> {
        self.inner.try_lock()
    }

    /// Unwrap the collector.
    pub fn into_inner(self) -> Collector<B> {
        self.inner.into_inner()
    }
}
