//! Reference adjustment for one compaction step.
//!
//! Before a run of live bytes is slid down over a gap, every pointer that
//! refers to an object in that run is rewritten to the object's new address.
//! Pointers are rewritten in their current location; the byte move that
//! follows carries rewritten fields along with their objects.

use std::collections::HashSet;

use crate::behavior::GcBehavior;
use crate::gc::mark::{Bitmap, LiveObjectSet};
use crate::heap::Heap;
use crate::ptr::{Address, WORD_SIZE};
use crate::roots::{RootSet, Slot, SlotKey};

// ============================================================================
// ShiftStep
// ============================================================================

/// Which objects move in a compaction step, and by how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftStep {
    /// Bytes above this offset move. `None` moves every byte in the arena.
    pub shift_point: Option<usize>,
    /// Bytes each moving object slides down.
    pub shift_amount: usize,
}

impl ShiftStep {
    /// Step that closes the gap `gap_start..gap_end`.
    #[must_use]
    pub const fn closing(gap_start: usize, gap_end: usize) -> Self {
        Self {
            shift_point: Some(gap_end - 1),
            shift_amount: gap_end - gap_start,
        }
    }

    /// Whether the byte at `offset` moves.
    #[must_use]
    pub const fn moves(&self, offset: usize) -> bool {
        match self.shift_point {
            Some(point) => offset > point,
            None => true,
        }
    }

    /// New value of a pointer to `object` if it moves in this step.
    ///
    /// The pointer value itself is compared with the shift point, so a
    /// pointer to any byte above the gap follows the bytes it points at.
    /// Values past the end of the arena are left alone.
    #[must_use]
    pub fn relocate(&self, object: Address, arena_len: usize) -> Option<Address> {
        let offset = object.offset();
        if offset > arena_len || !self.moves(offset) {
            return None;
        }
        object.checked_sub(self.shift_amount)
    }
}

// ============================================================================
// RefreshedSlots
// ============================================================================

/// Slots already rewritten in the current step.
///
/// A slot can be reachable along more than one path, for example a root slot
/// that is also a field of a live object. It must be adjusted exactly once.
#[derive(Debug)]
pub struct RefreshedSlots {
    heap: Bitmap,
    /// Arena offsets set in `heap`, so reset only touches those words.
    touched: Vec<usize>,
    external: HashSet<usize>,
}

impl RefreshedSlots {
    /// Track slots in an arena of `arena_len` bytes.
    #[must_use]
    pub fn new(arena_len: usize) -> Self {
        Self {
            heap: Bitmap::new(arena_len),
            touched: Vec::new(),
            external: HashSet::new(),
        }
    }

    /// Record `key`. Returns `true` if it was not yet recorded this step.
    pub fn insert(&mut self, key: SlotKey) -> bool {
        match key {
            SlotKey::Heap(offset) => {
                let fresh = self.heap.set(offset);
                if fresh {
                    self.touched.push(offset);
                }
                fresh
            }
            SlotKey::External(id) => self.external.insert(id),
        }
    }

    /// Whether `key` was recorded this step.
    #[must_use]
    pub fn contains(&self, key: SlotKey) -> bool {
        match key {
            SlotKey::Heap(offset) => self.heap.test(offset),
            SlotKey::External(id) => self.external.contains(&id),
        }
    }

    /// Number of slots recorded this step.
    #[must_use]
    pub fn len(&self) -> usize {
        self.touched.len() + self.external.len()
    }

    /// Check if nothing was recorded this step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget everything for the next step.
    pub fn reset(&mut self) {
        for offset in self.touched.drain(..) {
            self.heap.clear_word_of(offset);
        }
        self.external.clear();
    }
}

// ============================================================================
// Adjustment
// ============================================================================

/// Rewrite every reference to an object that moves in `step`.
///
/// In order: each root slot, then each pointer field of each live object
/// followed by the live object's own entry, then every object-table entry.
/// Returns the number of slots whose contents changed.
pub fn adjust_references<B: GcBehavior + ?Sized>(
    heap: &mut Heap,
    behavior: &B,
    step: ShiftStep,
    live: &mut LiveObjectSet,
    roots: &RootSet,
    refreshed: &mut RefreshedSlots,
) -> usize {
    let arena_len = heap.len();
    let mut adjusted = 0;

    for slot in roots {
        if refreshed.insert(slot.key()) && adjust_slot(heap, step, slot) {
            adjusted += 1;
        }
    }

    for index in 0..live.len() {
        let Some(object) = live.get(index) else {
            break;
        };
        for field in behavior.referenced_fields(heap, object) {
            if !heap.contains_range(field, WORD_SIZE) {
                continue;
            }
            let slot = Slot::Heap(field);
            if refreshed.insert(slot.key()) && adjust_slot(heap, step, &slot) {
                adjusted += 1;
            }
        }
        if let Some(moved) = step.relocate(object, arena_len) {
            live.set(index, moved);
        }
    }

    for entry in heap.object_table_mut().entries_mut() {
        if let Some(moved) = step.relocate(*entry, arena_len) {
            *entry = moved;
        }
    }

    adjusted
}

/// Rewrite one slot if it refers to a moving object.
fn adjust_slot(heap: &mut Heap, step: ShiftStep, slot: &Slot) -> bool {
    let Some(value) = slot.load(heap) else {
        return false;
    };
    match step.relocate(value, heap.len()) {
        Some(moved) => {
            slot.store(heap, Some(moved));
            true
        }
        None => false,
    }
}
