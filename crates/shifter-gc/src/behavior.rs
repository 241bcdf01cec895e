//! The embedder's side of the collector contract.
//!
//! The collector knows nothing about object layout. Everything it needs to
//! find roots, size objects and walk their pointer fields comes from a
//! [`GcBehavior`] implementation supplied by the runtime that owns the heap.

use crate::heap::Heap;
use crate::ptr::Address;
use crate::roots::RootSet;

// ============================================================================
// Core Trait
// ============================================================================

/// Callbacks the collector uses to understand the embedder's objects.
///
/// Implementations must be consistent with what was written into the arena:
/// `size_of` must cover the whole object including its header, and every slot
/// returned by `referenced_fields` must lie inside the object.
///
/// # Examples
///
/// An object layout where the first header word holds the total size and the
/// second holds the number of pointer fields that follow the header:
///
/// ```
/// use shifter_gc::{Address, GcBehavior, Heap, RootCell, RootSet, WORD_SIZE};
///
/// struct Counted {
///     root: RootCell,
/// }
///
/// impl GcBehavior for Counted {
///     fn root_set(&self) -> RootSet {
///         let mut roots = RootSet::new();
///         roots.push(self.root.clone());
///         roots
///     }
///
///     fn size_of(&self, heap: &Heap, object: Address) -> usize {
///         heap.read_word(object.offset() - heap.header_size())
///     }
///
///     fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
///         let count = heap.read_word(object.offset() - WORD_SIZE);
///         (0..count).map(|i| object.offset() + i * WORD_SIZE).collect()
///     }
/// }
/// ```
pub trait GcBehavior {
    /// The root slots for the collection about to run.
    fn root_set(&self) -> RootSet;

    /// Total size in bytes of the object at `object`, header included.
    fn size_of(&self, heap: &Heap, object: Address) -> usize;

    /// Arena offsets of the pointer slots inside `object`.
    ///
    /// Slots may hold null, a managed address, or a foreign value; the
    /// collector ignores anything that is not a registered object.
    fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize>;

    /// Emit informational events at each collection milestone.
    fn verbose(&self) -> bool {
        false
    }

    /// Accumulate allocation and collection timings.
    fn profile(&self) -> bool {
        false
    }
}

impl<B: GcBehavior + ?Sized> GcBehavior for &B {
    fn root_set(&self) -> RootSet {
        (**self).root_set()
    }

    fn size_of(&self, heap: &Heap, object: Address) -> usize {
        (**self).size_of(heap, object)
    }

    fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
        (**self).referenced_fields(heap, object)
    }

    fn verbose(&self) -> bool {
        (**self).verbose()
    }

    fn profile(&self) -> bool {
        (**self).profile()
    }
}

impl<B: GcBehavior + ?Sized> GcBehavior for Box<B> {
    fn root_set(&self) -> RootSet {
        (**self).root_set()
    }

    fn size_of(&self, heap: &Heap, object: Address) -> usize {
        (**self).size_of(heap, object)
    }

    fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
        (**self).referenced_fields(heap, object)
    }

    fn verbose(&self) -> bool {
        (**self).verbose()
    }

    fn profile(&self) -> bool {
        (**self).profile()
    }
}
