//! The allocation front end.
//!
//! A [`Collector`] pairs a [`Heap`] with the [`GcBehavior`] that describes
//! its objects. It is the usual entry point for an embedder: allocate
//! objects, run collections on demand and query memory use.

use std::time::Instant;

use crate::behavior::GcBehavior;
use crate::heap::{Heap, HeapConfig};
use crate::metrics::{GcInformations, GcMetrics};
use crate::ptr::Address;

/// A heap and the behavior that describes its objects.
///
/// # Example
///
/// ```
/// use shifter_gc::{Address, Collector, GcBehavior, Heap, HeapConfig, RootCell, RootSet};
///
/// #[derive(Default)]
/// struct Leaves {
///     root: RootCell,
/// }
///
/// impl GcBehavior for Leaves {
///     fn root_set(&self) -> RootSet {
///         let mut roots = RootSet::new();
///         roots.push(self.root.clone());
///         roots
///     }
///
///     fn size_of(&self, _heap: &Heap, _object: Address) -> usize {
///         32
///     }
///
///     fn referenced_fields(&self, _heap: &Heap, _object: Address) -> Vec<usize> {
///         Vec::new()
///     }
/// }
///
/// let mut collector = Collector::new(&HeapConfig::new().size(4096), Leaves::default());
/// let _garbage = collector.alloc_object(32).unwrap();
/// let kept = collector.alloc_object(32).unwrap();
/// collector.behavior().root.set(Some(kept));
///
/// let metrics = collector.collect();
/// assert_eq!(metrics.heap_used_after, 32);
/// assert_eq!(collector.behavior().root.get(), Address::new(16));
/// ```
#[derive(Debug)]
pub struct Collector<B: GcBehavior> {
    heap: Heap,
    behavior: B,
}

impl<B: GcBehavior> Collector<B> {
    /// Map a heap described by `config`.
    ///
    /// # Panics
    ///
    /// Panics if the heap cannot be mapped; see [`Heap::with_config`].
    #[must_use]
    pub fn new(config: &HeapConfig, behavior: B) -> Self {
        Self::with_heap(Heap::with_config(config), behavior)
    }

    /// Wrap an existing heap.
    #[must_use]
    pub const fn with_heap(heap: Heap, behavior: B) -> Self {
        Self { heap, behavior }
    }

    /// Allocate a zeroed object of `size` bytes, header included, and
    /// register it.
    ///
    /// Runs a collection first if the free region is too small. Returns
    /// `None` when the object still does not fit.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn alloc_object(&mut self, size: usize) -> Option<Address> {
        debug_assert!(
            size >= self.heap.header_size(),
            "object of {size} bytes cannot hold a {} byte header",
            self.heap.header_size()
        );
        let started = self.behavior.profile().then(Instant::now);
        let address = self.heap.fetch_free_memory(size, &self.behavior).map(|start| {
            self.heap.bytes_mut(start..start + size).fill(0);
            let address = Address::from_start(start, self.heap.header());
            self.heap.add_object_reference(address);
            address
        });
        if let Some(started) = started {
            self.heap.record_alloc_time(started.elapsed());
        }
        address
    }

    /// Run a full collection.
    pub fn collect(&mut self) -> GcMetrics {
        crate::gc::collect(&mut self.heap, &self.behavior)
    }

    /// Memory use and accumulated timings.
    #[must_use]
    pub fn informations(&self) -> GcInformations {
        self.heap.informations()
    }

    /// The managed heap.
    #[must_use]
    pub const fn heap(&self) -> &Heap {
        &self.heap
    }

    /// The managed heap, for writing object contents.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// The embedder's behavior.
    #[must_use]
    pub const fn behavior(&self) -> &B {
        &self.behavior
    }

    /// The embedder's behavior, mutably.
    pub fn behavior_mut(&mut self) -> &mut B {
        &mut self.behavior
    }

    /// Heap and behavior at once, for code that walks objects while
    /// consulting the behavior.
    pub fn parts_mut(&mut self) -> (&mut Heap, &B) {
        (&mut self.heap, &self.behavior)
    }

    /// Unmap the heap and hand back the behavior.
    pub fn shutdown(self) -> B {
        self.heap.shutdown();
        self.behavior
    }
}
