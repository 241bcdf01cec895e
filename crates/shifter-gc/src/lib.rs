//! A shifting mark/sweep/compact garbage collector over one byte arena.
//!
//! `shifter-gc` manages a single contiguous, page-granular arena for a
//! managed runtime such as a JIT. Objects are bump-allocated; when the arena
//! fills up, a stop-the-world collection marks everything reachable from the
//! embedder's roots and then *shifts* the survivors down towards offset 0,
//! closing every gap and rewriting every reference to a moved object.
//!
//! # Features
//!
//! - **Layout agnostic**: object sizes and pointer fields come from a
//!   [`GcBehavior`] supplied by the embedder
//! - **Sliding compaction**: survivors keep their relative order and end up
//!   in one dense prefix, so allocation is always a pointer bump
//! - **Robust marking**: values in roots and fields that are not registered
//!   objects are ignored
//! - **Structured tracing**: spans and events for every phase with the
//!   `tracing` feature
//!
//! # Quick Start
//!
//! ```
//! use shifter_gc::{Address, Collector, GcBehavior, Heap, HeapConfig, RootCell, RootSet, WORD_SIZE};
//!
//! /// Header word 0: size; header word 1: pointer field count.
//! #[derive(Default)]
//! struct Runtime {
//!     global: RootCell,
//! }
//!
//! impl GcBehavior for Runtime {
//!     fn root_set(&self) -> RootSet {
//!         let mut roots = RootSet::new();
//!         roots.push(self.global.clone());
//!         roots
//!     }
//!
//!     fn size_of(&self, heap: &Heap, object: Address) -> usize {
//!         heap.read_word(object.offset() - heap.header_size())
//!     }
//!
//!     fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
//!         let count = heap.read_word(object.offset() - WORD_SIZE);
//!         (0..count).map(|i| object.offset() + i * WORD_SIZE).collect()
//!     }
//! }
//!
//! fn new_object(gc: &mut Collector<Runtime>, size: usize, fields: usize) -> Address {
//!     let object = gc.alloc_object(size).expect("heap exhausted");
//!     let start = object.offset() - gc.heap().header_size();
//!     gc.heap_mut().write_word(start, size);
//!     gc.heap_mut().write_word(start + WORD_SIZE, fields);
//!     object
//! }
//!
//! let mut gc = Collector::new(&HeapConfig::new().size(1 << 16), Runtime::default());
//! let _garbage = new_object(&mut gc, 64, 0);
//! let list = new_object(&mut gc, 24, 1);
//! let item = new_object(&mut gc, 32, 0);
//! gc.heap_mut().write_ptr(list.offset(), Some(item));
//! gc.behavior().global.set(Some(list));
//!
//! let metrics = gc.collect();
//! assert_eq!(metrics.bytes_reclaimed(), 64);
//!
//! let list = gc.behavior().global.get().unwrap();
//! let item = gc.heap().read_ptr(list.offset()).unwrap();
//! assert_eq!(item.offset(), 24 + 16);
//! ```
//!
//! # Thread Safety
//!
//! A [`Collector`] is `Send` when its behavior is. To share one between
//! threads, wrap it in a [`SharedCollector`], which serializes allocation,
//! collection and mutator access behind a single lock.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod behavior;
mod collector;
mod ptr;
mod roots;
mod sync;
mod tracing;

/// Marking, compaction and the collection driver.
///
/// Public for embedders that drive phases themselves and for testing. Most
/// users only need [`Collector`].
pub mod gc;

/// The managed arena.
pub mod heap;

/// Collection metrics and cumulative statistics.
pub mod metrics;

/// Registry of allocated objects.
pub mod object_table;

#[cfg(test)]
mod test_util;

// Re-export public API
pub use behavior::GcBehavior;
pub use collector::Collector;
pub use gc::{collect, verify_compacted, SweepDirection};
pub use heap::{Heap, HeapConfig, DEFAULT_HEADER_SIZE, DEFAULT_HEAP_SIZE};
pub use metrics::{GcInformations, GcMetrics, GcStatistics};
pub use object_table::{ObjectId, ObjectTable, OBJECT_TABLE_STEP};
pub use ptr::{Address, WORD_SIZE};
pub use roots::{RootCell, RootSet, Slot, SlotKey};
pub use sync::SharedCollector;
pub use crate::tracing::GcId;
