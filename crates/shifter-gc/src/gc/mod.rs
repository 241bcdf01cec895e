//! Garbage collection: marking, compaction and the cycle driver.
//!
//! - [`marker`]: reachability from the root set
//! - [`fixup`]: pointer adjustment for one compaction step
//! - [`sweep`]: gap closing and object-table sweeping
//! - [`mark`]: bitmaps and the live-object set shared by the phases

#[allow(clippy::module_inception)]
mod gc;

pub mod fixup;
pub mod mark;
pub mod marker;
pub mod sweep;

pub use gc::{collect, verify_compacted};
pub use marker::{mark_live, MarkOutcome, MarkPhase, Marker};
pub use sweep::{
    interior_gaps, sweep, sweep_bottom_up, sweep_object_table, sweep_top_down, SweepDirection,
    SweepOutcome,
};
