//! Collection driver.
//!
//! One collection is a full stop-the-world cycle over a single heap:
//!
//! 1. Ask the behavior for the root set.
//! 2. Mark everything reachable, recording live bytes in the occupancy map.
//! 3. Compact, closing every gap between live objects.
//! 4. Drop dead entries from the object table.

use std::time::Instant;

use crate::behavior::GcBehavior;
use crate::gc::marker::mark_live;
use crate::gc::sweep::{sweep, sweep_object_table};
use crate::heap::Heap;
use crate::metrics::{GcMetrics, PhaseTimer};

#[cfg(feature = "tracing")]
use crate::tracing::internal::{
    log_milestone, log_phase_end, log_phase_start, next_gc_id, trace_gc_collection, trace_phase,
    GcPhase,
};

// ============================================================================
// Collection
// ============================================================================

/// Run one full collection over `heap`.
///
/// On return every object reachable from the behavior's roots sits in a
/// dense prefix of the arena, every reference to a moved object has been
/// rewritten, the bump boundary equals the number of live bytes and the
/// object table holds exactly the survivors.
pub fn collect<B: GcBehavior + ?Sized>(heap: &mut Heap, behavior: &B) -> GcMetrics {
    let profile = behavior.profile();
    let started = profile.then(Instant::now);
    let heap_used_before = heap.used();
    let collection_number = heap.statistics().next_collection_number();
    let mut timer = PhaseTimer::new(profile);

    #[cfg(feature = "tracing")]
    let verbose = behavior.verbose();
    #[cfg(feature = "tracing")]
    let objects_before = heap.object_table().len();
    #[cfg(feature = "tracing")]
    let gc_id = next_gc_id();
    #[cfg(feature = "tracing")]
    let _gc_span = trace_gc_collection(gc_id, heap_used_before);
    #[cfg(feature = "tracing")]
    if verbose {
        log_milestone("collection_start", gc_id, heap_used_before);
    }

    if profile {
        heap.statistics_mut().observe_heap(heap_used_before);
    }

    let mut roots = behavior.root_set();
    let root_count = roots.len();

    // Mark
    timer.start();
    let mut marked = {
        #[cfg(feature = "tracing")]
        let _mark_span = trace_phase(GcPhase::Mark);
        #[cfg(feature = "tracing")]
        if verbose {
            log_milestone("mark_start", gc_id, heap_used_before);
        }
        #[cfg(feature = "tracing")]
        log_phase_start(GcPhase::Mark, heap_used_before);

        let marked = mark_live(heap, behavior, &roots);

        #[cfg(feature = "tracing")]
        log_phase_end(GcPhase::Mark, marked.bytes_marked);
        marked
    };
    timer.end_mark();

    // Compact
    timer.start();
    let swept = {
        #[cfg(feature = "tracing")]
        let _sweep_span = trace_phase(GcPhase::Sweep);
        #[cfg(feature = "tracing")]
        if verbose {
            log_milestone("sweep_start", gc_id, heap_used_before);
        }
        #[cfg(feature = "tracing")]
        log_phase_start(GcPhase::Sweep, heap_used_before);

        let swept = sweep(heap, behavior, &mut marked.live, &mut roots);

        #[cfg(feature = "tracing")]
        log_phase_end(GcPhase::Sweep, swept.bytes_swept);
        swept
    };
    timer.end_sweep();

    debug_assert_eq!(heap.used(), marked.bytes_marked);
    debug_assert_eq!(heap.top() - heap.bump(), swept.bytes_swept);

    // Object table
    timer.start();
    let objects_reclaimed = {
        #[cfg(feature = "tracing")]
        let _table_span = trace_phase(GcPhase::ObjectTable);
        #[cfg(feature = "tracing")]
        log_phase_start(GcPhase::ObjectTable, objects_before);

        let removed = sweep_object_table(heap.object_table_mut(), &marked.marks);

        #[cfg(feature = "tracing")]
        log_phase_end(GcPhase::ObjectTable, removed);
        removed
    };
    timer.end_table_sweep();

    debug_assert_eq!(heap.object_table().len(), marked.live.len());

    let metrics = GcMetrics {
        collection_number,
        duration: started.map(|start| start.elapsed()).unwrap_or_default(),
        mark_duration: timer.mark,
        sweep_duration: timer.sweep,
        table_sweep_duration: timer.table_sweep,
        bytes_marked: marked.bytes_marked,
        bytes_swept: swept.bytes_swept,
        heap_used_before,
        heap_used_after: heap.used(),
        objects_surviving: marked.live.len(),
        objects_reclaimed,
        roots: root_count,
        compaction_steps: swept.steps,
        slots_adjusted: swept.slots_adjusted,
    };
    heap.statistics_mut().record_collection(&metrics);

    #[cfg(feature = "tracing")]
    if verbose {
        log_milestone("sweep_end", gc_id, heap.used());
    }

    metrics
}

// ============================================================================
// Verification
// ============================================================================

/// Re-mark `heap` and check that the live bytes form exactly the prefix
/// below the bump boundary.
///
/// Intended to be called straight after [`collect`]. Rebuilds the occupancy
/// map as a side effect.
pub fn verify_compacted<B: GcBehavior + ?Sized>(heap: &mut Heap, behavior: &B) -> bool {
    let roots = behavior.root_set();
    let marked = mark_live(heap, behavior, &roots);
    let used = heap.used();
    let occupancy = heap.occupancy();
    marked.bytes_marked == used
        && occupancy.all_set(0, used)
        && occupancy.none_set(used, heap.len())
        && heap.bytes(used..heap.len()).iter().all(|byte| *byte == 0)
}
