//! Structured logging for collections.
//!
//! With the `tracing` feature, every collection opens a `gc_collect` span
//! carrying a [`GcId`], each phase opens a nested `gc_phase` span, and phase
//! boundaries and compaction steps are reported as events. Milestones
//! requested through [`GcBehavior::verbose`](crate::GcBehavior::verbose) go
//! out at `INFO`; everything else is `DEBUG` or `TRACE`.

#[cfg(feature = "tracing")]
pub mod internal {
    use std::sync::atomic::{AtomicU64, Ordering};
    use tracing::{span, Level};

    /// Phases of one collection, in the order they run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum GcPhase {
        /// Trace the live object graph from the roots.
        Mark,
        /// Close gaps between live objects.
        Sweep,
        /// Drop dead entries from the object table.
        ObjectTable,
    }

    /// Identifies one collection in log output. Process-wide, starting at 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GcId(pub u64);

    static COLLECTION_IDS: AtomicU64 = AtomicU64::new(1);

    /// Allocate the id for a new collection.
    pub fn next_gc_id() -> GcId {
        GcId(COLLECTION_IDS.fetch_add(1, Ordering::Relaxed))
    }

    /// Enter the span covering a whole collection.
    pub fn trace_gc_collection(gc_id: GcId, heap_used: usize) -> span::EnteredSpan {
        span!(Level::DEBUG, "gc_collect", gc_id = gc_id.0, heap_used).entered()
    }

    /// Enter the span covering one phase.
    pub fn trace_phase(phase: GcPhase) -> span::EnteredSpan {
        span!(Level::DEBUG, "gc_phase", ?phase).entered()
    }

    pub fn log_phase_start(phase: GcPhase, bytes_before: usize) {
        tracing::debug!(?phase, bytes_before, "phase_start");
    }

    /// `amount` is bytes marked, bytes swept or entries removed, by phase.
    pub fn log_phase_end(phase: GcPhase, amount: usize) {
        tracing::debug!(?phase, amount, "phase_end");
    }

    pub fn log_gap_closed(gap_start: usize, shift: usize, slots_adjusted: usize) {
        tracing::trace!(gap_start, shift, slots_adjusted, "gap_closed");
    }

    /// Milestone for behaviors that asked for verbose output.
    pub fn log_milestone(milestone: &str, gc_id: GcId, heap_used: usize) {
        tracing::info!(gc_id = gc_id.0, heap_used, "{milestone}");
    }
}

#[cfg(not(feature = "tracing"))]
#[allow(dead_code)]
pub mod internal {
    /// Collection id; always 0 without the `tracing` feature.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GcId(pub u64);

    pub const fn next_gc_id() -> GcId {
        GcId(0)
    }
}

pub use internal::GcId;

#[cfg(all(test, feature = "tracing"))]
mod tests {
    use super::internal::*;

    #[test]
    fn test_gc_ids_increase() {
        let a = next_gc_id();
        let b = next_gc_id();
        assert!(b.0 > a.0);
    }
}
