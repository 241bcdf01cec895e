//! Mark phase: find every object reachable from the roots.
//!
//! Candidate pointers are checked against the object table before anything
//! is dereferenced, so null, foreign or stale values in root slots and fields
//! are skipped. Traversal uses an explicit worklist; deep object graphs do not
//! grow the native stack.

use std::collections::HashMap;

use crate::behavior::GcBehavior;
use crate::gc::mark::{Bitmap, LiveObjectSet};
use crate::heap::Heap;
use crate::object_table::ObjectId;
use crate::ptr::{Address, WORD_SIZE};
use crate::roots::RootSet;

/// Where a [`Marker`] is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkPhase {
    /// Created, nothing marked yet.
    Idle,
    /// Walking the root set.
    MarkingRoots,
    /// Tracing the graph below one root.
    MarkingReachable,
    /// All roots processed.
    Done,
}

/// Everything the mark phase hands to compaction.
#[derive(Debug)]
pub struct MarkOutcome {
    /// Reachable objects in the order they were reached.
    pub live: LiveObjectSet,
    /// Mark bits indexed by object-table position at the start of the cycle.
    pub marks: Bitmap,
    /// Total bytes covered by reachable objects.
    pub bytes_marked: usize,
}

/// One cycle's marking state over a heap.
///
/// Creating a marker clears the heap's occupancy map; marking sets one bit
/// for every byte of every reachable object.
pub struct Marker<'h, B: GcBehavior + ?Sized> {
    heap: &'h mut Heap,
    behavior: &'h B,
    /// Address to table position, built once per cycle.
    index: HashMap<Address, ObjectId>,
    marks: Bitmap,
    live: LiveObjectSet,
    worklist: Vec<Address>,
    bytes_marked: usize,
    phase: MarkPhase,
}

impl<'h, B: GcBehavior + ?Sized> Marker<'h, B> {
    /// Prepare to mark `heap`.
    pub fn new(heap: &'h mut Heap, behavior: &'h B) -> Self {
        heap.occupancy_mut().clear();
        let table = heap.object_table();
        let index = table.index();
        let marks = Bitmap::new(table.len());
        Self {
            heap,
            behavior,
            index,
            marks,
            live: LiveObjectSet::new(),
            worklist: Vec::new(),
            bytes_marked: 0,
            phase: MarkPhase::Idle,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MarkPhase {
        self.phase
    }

    /// Bytes marked so far.
    #[must_use]
    pub const fn bytes_marked(&self) -> usize {
        self.bytes_marked
    }

    /// Whether `object` has been reached this cycle.
    #[must_use]
    pub fn is_marked(&self, object: Address) -> bool {
        self.index
            .get(&object)
            .is_some_and(|id| self.marks.test(*id))
    }

    /// Mark everything reachable from the slots in `roots`. Returns the bytes
    /// newly marked.
    pub fn mark_roots(&mut self, roots: &RootSet) -> usize {
        self.phase = MarkPhase::MarkingRoots;
        let before = self.bytes_marked;
        for slot in roots {
            if let Some(object) = slot.load(self.heap) {
                if !self.is_marked(object) {
                    self.mark_from_root(object);
                }
            }
        }
        self.phase = MarkPhase::Done;
        self.bytes_marked - before
    }

    /// Mark `root` and everything reachable from it. Returns the bytes newly
    /// marked, which is zero for unregistered or already-marked addresses.
    pub fn mark_from_root(&mut self, root: Address) -> usize {
        let resume = self.phase;
        self.phase = MarkPhase::MarkingReachable;
        let marked = self.mark_transitively(root);
        self.phase = resume;
        marked
    }

    /// Mark `object`, then drain the worklist of everything it reaches.
    pub fn mark_transitively(&mut self, object: Address) -> usize {
        let before = self.bytes_marked;
        if !self.visit(object) {
            return 0;
        }
        while let Some(current) = self.worklist.pop() {
            for field in self.behavior.referenced_fields(self.heap, current) {
                if !self.heap.contains_range(field, WORD_SIZE) {
                    continue;
                }
                if let Some(child) = self.heap.read_ptr(field) {
                    self.visit(child);
                }
            }
        }
        self.bytes_marked - before
    }

    /// Mark a single object and queue it for scanning. Returns `false` if
    /// the address is not a registered object or was already marked.
    fn visit(&mut self, object: Address) -> bool {
        let Some(&id) = self.index.get(&object) else {
            return false;
        };
        let Some(start) = self.heap.object_start(object) else {
            return false;
        };
        if !self.marks.set(id) {
            return false;
        }

        let size = self.behavior.size_of(self.heap, object);
        debug_assert!(
            size >= self.heap.header_size(),
            "object {object} is smaller than its header"
        );
        debug_assert!(
            self.heap.contains_range(start, size),
            "object {object} of {size} bytes runs past the arena"
        );
        let end = start.saturating_add(size).min(self.heap.len());
        let overlap = self.heap.occupancy_mut().set_range(start, end);
        debug_assert_eq!(overlap, 0, "object {object} overlaps another live object");

        self.bytes_marked += end - start;
        self.live.insert(object);
        self.worklist.push(object);
        true
    }

    /// Finish the cycle's marking.
    #[must_use]
    pub fn finish(self) -> MarkOutcome {
        MarkOutcome {
            live: self.live,
            marks: self.marks,
            bytes_marked: self.bytes_marked,
        }
    }
}

/// Run a complete mark phase over `heap` from `roots`.
pub fn mark_live<B: GcBehavior + ?Sized>(
    heap: &mut Heap,
    behavior: &B,
    roots: &RootSet,
) -> MarkOutcome {
    let mut marker = Marker::new(heap, behavior);
    marker.mark_roots(roots);
    marker.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roots::{RootCell, Slot};
    use crate::test_util::{alloc, set_field, TestBehavior};

    fn heap() -> Heap {
        Heap::new(sys_alloc::page_size())
    }

    #[test]
    fn test_marks_reachable_chain() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 32, 1);
        let b = alloc(&mut heap, &behavior, 48, 1);
        let c = alloc(&mut heap, &behavior, 16, 0);
        set_field(&mut heap, a, 0, Some(b));
        set_field(&mut heap, b, 0, Some(c));
        behavior.root(Some(a));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.bytes_marked, 96);
        assert_eq!(outcome.live.len(), 3);
        assert_eq!(heap.occupancy().set_count(), 96);
        assert!(heap.occupancy().all_set(0, 96));
    }

    #[test]
    fn test_unreachable_object_not_marked() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 32, 0);
        let dead = alloc(&mut heap, &behavior, 32, 0);
        behavior.root(Some(a));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.bytes_marked, 32);
        assert!(!outcome.live.contains(dead));
        assert!(outcome.marks.test(0));
        assert!(!outcome.marks.test(1));
        assert!(heap.occupancy().none_set(32, 64));
    }

    #[test]
    fn test_cycle_marked_once() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 24, 1);
        let b = alloc(&mut heap, &behavior, 24, 1);
        set_field(&mut heap, a, 0, Some(b));
        set_field(&mut heap, b, 0, Some(a));
        behavior.root(Some(a));
        behavior.root(Some(b));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.live.len(), 2);
        assert_eq!(outcome.bytes_marked, 48);
    }

    #[test]
    fn test_foreign_values_ignored() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 32, 2);
        // One field points into the middle of `a`, the other past the arena.
        set_field(&mut heap, a, 0, Address::new(a.offset() + 4));
        set_field(&mut heap, a, 1, Address::new(usize::MAX - 7));
        behavior.root(Address::new(3));
        behavior.root(Some(a));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.live.as_slice(), &[a]);
        assert_eq!(outcome.bytes_marked, 32);
    }

    #[test]
    fn test_null_root_and_fields() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 32, 2);
        behavior.root(None);
        behavior.root(Some(a));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.live.len(), 1);
    }

    #[test]
    fn test_phases() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 16, 0);
        let mut marker = Marker::new(&mut heap, &behavior);
        assert_eq!(marker.phase(), MarkPhase::Idle);
        assert_eq!(marker.mark_from_root(a), 16);
        assert_eq!(marker.phase(), MarkPhase::Idle);
        assert!(marker.is_marked(a));
        assert_eq!(marker.mark_from_root(a), 0);

        let mut roots = RootSet::new();
        roots.push(RootCell::new(Some(a)));
        assert_eq!(marker.mark_roots(&roots), 0);
        assert_eq!(marker.phase(), MarkPhase::Done);
    }

    #[test]
    fn test_heap_resident_root_slot() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let holder = alloc(&mut heap, &behavior, 24, 0);
        let target = alloc(&mut heap, &behavior, 16, 0);
        // The holder's payload word is not a declared field, only a root slot.
        heap.write_ptr(holder.offset(), Some(target));
        behavior.add_slot(Slot::Heap(holder.offset()));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.live.as_slice(), &[target]);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let behavior = TestBehavior::default();
        let mut heap = Heap::new(sys_alloc::page_size() * 64);
        let first = alloc(&mut heap, &behavior, 24, 1);
        let mut previous = first;
        for _ in 0..9_000 {
            let next = alloc(&mut heap, &behavior, 24, 1);
            set_field(&mut heap, previous, 0, Some(next));
            previous = next;
        }
        behavior.root(Some(first));

        let outcome = mark_live(&mut heap, &behavior, &behavior.root_set());
        assert_eq!(outcome.live.len(), 9_001);
        assert_eq!(outcome.bytes_marked, 9_001 * 24);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "overlaps another live object")]
    fn test_overlapping_objects_are_fatal() {
        let behavior = TestBehavior::default();
        let mut heap = heap();
        let a = alloc(&mut heap, &behavior, 32, 0);
        let b = alloc(&mut heap, &behavior, 16, 0);
        // `a` now claims the bytes `b` occupies.
        heap.write_word(0, 48);
        behavior.root(Some(a));
        behavior.root(Some(b));

        let _ = mark_live(&mut heap, &behavior, &behavior.root_set());
    }
}
