//! Compaction and object-table sweeping.
//!
//! After marking, the occupancy map describes the arena as alternating runs
//! of live and dead bytes. Compaction closes every dead run that lies below a
//! live one, one run per step: references into the moving region are
//! adjusted, then the bytes from the end of the gap up to the bump boundary
//! slide down over it. When every gap is closed the live bytes form a dense
//! prefix, the bump boundary sits at its end and everything above is zeroed.

use std::ops::Range;

use crate::behavior::GcBehavior;
use crate::gc::fixup::{adjust_references, RefreshedSlots, ShiftStep};
use crate::gc::mark::{Bitmap, LiveObjectSet};
use crate::heap::Heap;
use crate::object_table::ObjectTable;
use crate::roots::RootSet;

#[cfg(feature = "tracing")]
use crate::tracing::internal::log_gap_closed;

/// Order in which compaction visits gaps.
///
/// Both orders produce the same final layout. Top-down never has to
/// translate gap positions, since closing a gap only moves bytes above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SweepDirection {
    /// Close the highest gap first.
    #[default]
    TopDown,
    /// Close the lowest gap first.
    BottomUp,
}

/// What compaction did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Free bytes between the final bump boundary and the top of the arena.
    pub bytes_swept: usize,
    /// Number of gaps closed.
    pub steps: usize,
    /// Number of pointer slots rewritten.
    pub slots_adjusted: usize,
}

/// Dead runs below the last live byte, in ascending order.
#[must_use]
pub fn interior_gaps(occupancy: &Bitmap) -> Vec<Range<usize>> {
    let Some(last_live) = occupancy.prev_set(occupancy.len()) else {
        return Vec::new();
    };
    let mut gaps = Vec::new();
    let mut cursor = 0;
    while let Some(gap_start) = occupancy.next_clear(cursor) {
        if gap_start > last_live {
            break;
        }
        let Some(gap_end) = occupancy.next_set(gap_start) else {
            break;
        };
        gaps.push(gap_start..gap_end);
        cursor = gap_end;
    }
    gaps
}

/// Compact `heap` in its configured [`SweepDirection`].
pub fn sweep<B: GcBehavior + ?Sized>(
    heap: &mut Heap,
    behavior: &B,
    live: &mut LiveObjectSet,
    roots: &mut RootSet,
) -> SweepOutcome {
    match heap.sweep_direction() {
        SweepDirection::TopDown => sweep_top_down(heap, behavior, live, roots),
        SweepDirection::BottomUp => sweep_bottom_up(heap, behavior, live, roots),
    }
}

/// Compact `heap`, closing the highest gap first.
pub fn sweep_top_down<B: GcBehavior + ?Sized>(
    heap: &mut Heap,
    behavior: &B,
    live: &mut LiveObjectSet,
    roots: &mut RootSet,
) -> SweepOutcome {
    let gaps = interior_gaps(heap.occupancy());
    let mut compactor = Compactor::new(heap, behavior, live, roots);
    for gap in gaps.into_iter().rev() {
        compactor.close_gap(gap);
    }
    compactor.finish()
}

/// Compact `heap`, closing the lowest gap first.
///
/// Each closed gap moves everything above it, so later gaps are found at
/// their original offsets minus the bytes already reclaimed.
pub fn sweep_bottom_up<B: GcBehavior + ?Sized>(
    heap: &mut Heap,
    behavior: &B,
    live: &mut LiveObjectSet,
    roots: &mut RootSet,
) -> SweepOutcome {
    let gaps = interior_gaps(heap.occupancy());
    let mut compactor = Compactor::new(heap, behavior, live, roots);
    let mut reclaimed = 0;
    for gap in gaps {
        let len = gap.len();
        compactor.close_gap(gap.start - reclaimed..gap.end - reclaimed);
        reclaimed += len;
    }
    compactor.finish()
}

/// Drop object-table entries that were not marked this cycle. Returns the
/// number removed.
pub fn sweep_object_table(table: &mut ObjectTable, marks: &Bitmap) -> usize {
    table.retain_marked(marks)
}

/// State shared by the compaction steps of one cycle.
struct Compactor<'a, B: GcBehavior + ?Sized> {
    heap: &'a mut Heap,
    behavior: &'a B,
    live: &'a mut LiveObjectSet,
    roots: &'a mut RootSet,
    refreshed: RefreshedSlots,
    outcome: SweepOutcome,
}

impl<'a, B: GcBehavior + ?Sized> Compactor<'a, B> {
    /// Drop the free tail above the last live byte and get ready to close
    /// gaps.
    fn new(
        heap: &'a mut Heap,
        behavior: &'a B,
        live: &'a mut LiveObjectSet,
        roots: &'a mut RootSet,
    ) -> Self {
        let live_end = heap
            .occupancy()
            .prev_set(heap.len())
            .map_or(0, |last| last + 1);
        debug_assert!(
            live_end <= heap.bump(),
            "live bytes extend past the bump boundary"
        );
        heap.set_bump(live_end);
        let refreshed = RefreshedSlots::new(heap.len());
        Self {
            heap,
            behavior,
            live,
            roots,
            refreshed,
            outcome: SweepOutcome::default(),
        }
    }

    /// Adjust references into `gap.end..bump`, then slide those bytes down
    /// to `gap.start`.
    fn close_gap(&mut self, gap: Range<usize>) {
        let step = ShiftStep::closing(gap.start, gap.end);
        self.refreshed.reset();
        let adjusted = adjust_references(
            self.heap,
            self.behavior,
            step,
            self.live,
            self.roots,
            &mut self.refreshed,
        );

        let bump = self.heap.bump();
        self.heap.move_bytes(gap.end..bump, gap.start);
        self.heap.set_bump(bump - step.shift_amount);
        self.roots.relocate_heap_slots(&gap);

        #[cfg(feature = "tracing")]
        log_gap_closed(gap.start, step.shift_amount, adjusted);

        self.outcome.steps += 1;
        self.outcome.slots_adjusted += adjusted;
    }

    /// Zero the free region and record the new occupancy.
    fn finish(self) -> SweepOutcome {
        let heap = self.heap;
        heap.zero_free();
        let used = heap.used();
        let occupancy = heap.occupancy_mut();
        occupancy.clear();
        occupancy.set_range(0, used);
        SweepOutcome {
            bytes_swept: heap.free_memory_size(),
            ..self.outcome
        }
    }
}
