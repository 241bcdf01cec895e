//! Mark phase data structures.
//!
//! - [`Bitmap`]: dense bitmaps for byte occupancy, object marks and
//!   per-step slot bookkeeping
//! - [`LiveObjectSet`]: objects reached in the current cycle

pub mod bitmap;
pub mod live;

pub use bitmap::Bitmap;
pub use live::LiveObjectSet;
