//! Root slots handed to the collector at the start of each cycle.
//!
//! A root is a *slot* that holds an object address, not the address itself:
//! when compaction moves an object, every root slot that referred to it is
//! rewritten in place. Slots either live inside the arena (a field of some
//! other structure the embedder keeps there) or outside it, in a shared
//! [`RootCell`] the embedder holds on to.

use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::heap::Heap;
use crate::ptr::Address;

// ============================================================================
// RootCell - externally held pointer slot
// ============================================================================

/// A pointer slot that lives outside the arena.
///
/// Clones share the same slot, so the embedder keeps one handle and gives a
/// clone to the collector through its root set. Identity is the shared
/// allocation: two clones of one cell are the same slot.
#[derive(Debug, Clone, Default)]
pub struct RootCell(Arc<AtomicUsize>);

impl RootCell {
    /// Create a cell holding `address`.
    #[must_use]
    pub fn new(address: Option<Address>) -> Self {
        Self(Arc::new(AtomicUsize::new(Address::to_word(address))))
    }

    /// Current contents of the slot.
    #[must_use]
    pub fn get(&self) -> Option<Address> {
        Address::from_word(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the slot.
    pub fn set(&self, address: Option<Address>) {
        self.0.store(Address::to_word(address), Ordering::Release);
    }

    /// Stable identity of the shared slot.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Whether two handles refer to the same slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for RootCell {
    fn eq(&self, other: &Self) -> bool {
        self.same_slot(other)
    }
}

impl Eq for RootCell {}

impl Hash for RootCell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

// ============================================================================
// Slot - a root location
// ============================================================================

/// A location holding a possibly-null object address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A pointer word stored in the arena at this offset.
    Heap(usize),
    /// A pointer held outside the arena.
    External(RootCell),
}

/// Identity of a slot, used to avoid adjusting the same slot twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKey {
    /// Arena offset of the slot.
    Heap(usize),
    /// Identity of an external cell.
    External(usize),
}

impl Slot {
    /// Read the address stored in the slot.
    ///
    /// # Panics
    ///
    /// Panics if a heap slot does not lie entirely within the arena.
    #[must_use]
    pub fn load(&self, heap: &Heap) -> Option<Address> {
        match self {
            Self::Heap(offset) => heap.read_ptr(*offset),
            Self::External(cell) => cell.get(),
        }
    }

    /// Write an address into the slot.
    ///
    /// # Panics
    ///
    /// Panics if a heap slot does not lie entirely within the arena.
    pub fn store(&self, heap: &mut Heap, address: Option<Address>) {
        match self {
            Self::Heap(offset) => heap.write_ptr(*offset, address),
            Self::External(cell) => cell.set(address),
        }
    }

    /// Identity of this slot.
    #[must_use]
    pub fn key(&self) -> SlotKey {
        match self {
            Self::Heap(offset) => SlotKey::Heap(*offset),
            Self::External(cell) => SlotKey::External(cell.id()),
        }
    }
}

impl From<RootCell> for Slot {
    fn from(cell: RootCell) -> Self {
        Self::External(cell)
    }
}

// ============================================================================
// RootSet - the roots of one collection
// ============================================================================

/// The root slots of one collection, in the order the embedder supplied them.
///
/// The set may contain the same slot more than once; it is still adjusted
/// only once per compaction step.
#[derive(Debug, Clone, Default)]
pub struct RootSet {
    slots: Vec<Slot>,
}

impl RootSet {
    /// Create an empty root set.
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Add a root slot.
    pub fn push(&mut self, slot: impl Into<Slot>) {
        self.slots.push(slot.into());
    }

    /// Number of root slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if there are no roots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate over the slots.
    pub fn iter(&self) -> impl Iterator<Item = &Slot> + '_ {
        self.slots.iter()
    }

    /// Follow the bytes moved when `gap` is closed: arena-resident slots
    /// above the gap slide down by its length, slots inside it are dropped.
    pub(crate) fn relocate_heap_slots(&mut self, gap: &Range<usize>) {
        self.slots.retain_mut(|slot| match slot {
            Slot::Heap(offset) if gap.contains(offset) => false,
            Slot::Heap(offset) => {
                if *offset >= gap.end {
                    *offset -= gap.len();
                }
                true
            }
            Slot::External(_) => true,
        });
    }
}

impl From<Vec<Slot>> for RootSet {
    fn from(slots: Vec<Slot>) -> Self {
        Self { slots }
    }
}

impl FromIterator<Slot> for RootSet {
    fn from_iter<I: IntoIterator<Item = Slot>>(iter: I) -> Self {
        Self {
            slots: iter.into_iter().collect(),
        }
    }
}

impl Extend<Slot> for RootSet {
    fn extend<I: IntoIterator<Item = Slot>>(&mut self, iter: I) {
        self.slots.extend(iter);
    }
}

impl<'a> IntoIterator for &'a RootSet {
    type Item = &'a Slot;
    type IntoIter = std::slice::Iter<'a, Slot>;

    fn into_iter(self) -> Self::IntoIter {
        self.slots.iter()
    }
}
