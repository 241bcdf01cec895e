//! The managed arena.
//!
//! A [`Heap`] owns one contiguous, page-granular mapping. Objects are carved
//! from it with a bump boundary: bytes below the boundary belong to objects
//! (live or not yet proven dead), bytes above it are free and always zero.
//! Collection slides every surviving object down towards offset 0, so after a
//! cycle the live bytes form one dense prefix of the arena.
//!
//! # Layout
//!
//! ```text
//! 0 (bottom)                       bump                            len (top)
//! |[hdr|body][hdr|body]...[hdr|body]|000000000000000000000000000000|
//!       ^ Address = start + header_size
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::time::Duration;

use sys_alloc::{Mmap, MmapOptions};

use crate::behavior::GcBehavior;
use crate::gc::mark::Bitmap;
use crate::gc::sweep::SweepDirection;
use crate::metrics::{GcInformations, GcStatistics};
use crate::object_table::{ObjectId, ObjectTable};
use crate::ptr::{Address, WORD_SIZE};

// ============================================================================
// Constants
// ============================================================================

/// Arena size used when a configuration asks for zero bytes.
pub const DEFAULT_HEAP_SIZE: usize = 50_000 * 1024;

/// Default per-object header: two machine words.
pub const DEFAULT_HEADER_SIZE: usize = 2 * WORD_SIZE;

// ============================================================================
// HeapConfig
// ============================================================================

/// Configuration for creating a [`Heap`].
///
/// # Example
///
/// ```
/// use shifter_gc::{HeapConfig, SweepDirection};
///
/// let config = HeapConfig::new()
///     .size(1 << 20)
///     .header_size(16)
///     .sweep_direction(SweepDirection::BottomUp);
/// assert_eq!(config.requested_size(), 1 << 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapConfig {
    size: usize,
    header_size: usize,
    sweep_direction: SweepDirection,
    populate: bool,
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl HeapConfig {
    /// Default configuration: [`DEFAULT_HEAP_SIZE`], [`DEFAULT_HEADER_SIZE`],
    /// top-down compaction.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            size: DEFAULT_HEAP_SIZE,
            header_size: DEFAULT_HEADER_SIZE,
            sweep_direction: SweepDirection::TopDown,
            populate: false,
        }
    }

    /// Requested arena size in bytes. Zero selects [`DEFAULT_HEAP_SIZE`].
    /// Either way the size is rounded up to whole pages.
    #[must_use]
    pub const fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Bytes between the start of an object and its address. Must be non-zero.
    #[must_use]
    pub const fn header_size(mut self, header_size: usize) -> Self {
        self.header_size = header_size;
        self
    }

    /// Order in which compaction closes gaps.
    #[must_use]
    pub const fn sweep_direction(mut self, direction: SweepDirection) -> Self {
        self.sweep_direction = direction;
        self
    }

    /// Pre-fault the arena's pages when mapping it, where supported.
    #[must_use]
    pub const fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// The size as configured, before rounding.
    #[must_use]
    pub const fn requested_size(&self) -> usize {
        self.size
    }

    /// Arena size that will actually be mapped.
    ///
    /// # Panics
    ///
    /// Panics if rounding up to the page size overflows.
    #[must_use]
    pub fn resolved_size(&self) -> usize {
        let size = if self.size == 0 {
            DEFAULT_HEAP_SIZE
        } else {
            self.size
        };
        sys_alloc::round_to_pages(size)
            .unwrap_or_else(|| panic!("heap size {size} overflows when page-rounded"))
    }
}

// ============================================================================
// Heap
// ============================================================================

/// A single contiguous arena with a bump boundary and an object table.
pub struct Heap {
    /// Backing mapping; offset 0 is the bottom of the heap.
    arena: Mmap,
    /// First free byte. Everything in `bump..len` is zero.
    bump: usize,
    header_size: NonZeroUsize,
    /// One bit per arena byte, set for bytes covered by a live object.
    occupancy: Bitmap,
    objects: ObjectTable,
    sweep_direction: SweepDirection,
    stats: GcStatistics,
}

impl Heap {
    /// Map an arena of exactly `size` bytes with the default header size.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero, not a multiple of the page size, or the
    /// mapping fails.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self::with_layout(size, DEFAULT_HEADER_SIZE, SweepDirection::TopDown, false)
    }

    /// Map an arena as described by `config`.
    ///
    /// # Panics
    ///
    /// Panics if the header size is zero or the mapping fails.
    #[must_use]
    pub fn with_config(config: &HeapConfig) -> Self {
        Self::with_layout(
            config.resolved_size(),
            config.header_size,
            config.sweep_direction,
            config.populate,
        )
    }

    fn with_layout(
        size: usize,
        header_size: usize,
        sweep_direction: SweepDirection,
        populate: bool,
    ) -> Self {
        assert!(
            size > 0 && size % sys_alloc::page_size() == 0,
            "heap size {size} must be a non-zero multiple of the page size"
        );
        let Some(header_size) = NonZeroUsize::new(header_size) else {
            panic!("object header size must be non-zero");
        };
        let arena = MmapOptions::new()
            .len(size)
            .populate(populate)
            .map_anon()
            .unwrap_or_else(|err| panic!("failed to map a {size} byte heap: {err}"));

        #[cfg(feature = "tracing")]
        tracing::debug!(size, header_size = header_size.get(), "heap_mapped");

        Self {
            arena,
            bump: 0,
            header_size,
            occupancy: Bitmap::new(size),
            objects: ObjectTable::new(),
            sweep_direction,
            stats: GcStatistics::new(),
        }
    }

    /// Release the arena and all bookkeeping.
    pub fn shutdown(self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(size = self.len(), objects = self.objects.len(), "heap_unmapped");
        drop(self);
    }

    // ------------------------------------------------------------------------
    // Allocation
    // ------------------------------------------------------------------------

    /// Reserve `size` bytes at the bump boundary and return their start.
    ///
    /// If the free region is too small, one collection runs first. Returns
    /// `None` when the request still does not fit afterwards. The returned
    /// bytes are zero.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn fetch_free_memory<B: GcBehavior + ?Sized>(
        &mut self,
        size: usize,
        behavior: &B,
    ) -> Option<usize> {
        assert!(size > 0, "cannot allocate zero bytes");
        if self.free_memory_size() < size {
            crate::gc::collect(self, behavior);
            if self.free_memory_size() < size {
                #[cfg(feature = "tracing")]
                tracing::debug!(size, free = self.free_memory_size(), "allocation_failed");
                return None;
            }
        }
        let start = self.bump;
        self.bump += size;
        if behavior.profile() {
            self.stats.observe_heap(self.bump);
        }
        Some(start)
    }

    /// Register a newly carved object. Every object must be registered
    /// exactly once before the next collection.
    pub fn add_object_reference(&mut self, address: Address) -> ObjectId {
        debug_assert!(
            address.start(self.header_size.get()).is_some_and(|start| start < self.bump),
            "object {address} lies outside the allocated region"
        );
        self.objects.add(address)
    }

    /// Bytes between the bump boundary and the top of the arena.
    #[must_use]
    pub fn free_memory_size(&self) -> usize {
        self.len() - self.bump
    }

    // ------------------------------------------------------------------------
    // Geometry
    // ------------------------------------------------------------------------

    /// Lowest arena offset. Always 0.
    #[must_use]
    pub const fn bottom(&self) -> usize {
        0
    }

    /// One past the highest arena offset.
    #[must_use]
    pub fn top(&self) -> usize {
        self.len()
    }

    /// Arena size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the arena has no bytes. A mapped heap never is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Current bump boundary.
    #[must_use]
    pub const fn bump(&self) -> usize {
        self.bump
    }

    /// Bytes below the bump boundary.
    #[must_use]
    pub const fn used(&self) -> usize {
        self.bump
    }

    /// Bytes between an object's start and its address.
    #[must_use]
    pub const fn header_size(&self) -> usize {
        self.header_size.get()
    }

    pub(crate) const fn header(&self) -> NonZeroUsize {
        self.header_size
    }

    /// Configured compaction order.
    #[must_use]
    pub const fn sweep_direction(&self) -> SweepDirection {
        self.sweep_direction
    }

    /// Change the compaction order used by later collections.
    pub fn set_sweep_direction(&mut self, direction: SweepDirection) {
        self.sweep_direction = direction;
    }

    /// Start of the object at `address`, if that start lies in the arena.
    #[must_use]
    pub fn object_start(&self, address: Address) -> Option<usize> {
        address
            .start(self.header_size.get())
            .filter(|start| *start < self.len())
    }

    /// Whether `offset..offset + len` lies entirely within the arena.
    #[must_use]
    pub fn contains_range(&self, offset: usize, len: usize) -> bool {
        offset.checked_add(len).is_some_and(|end| end <= self.len())
    }

    // ------------------------------------------------------------------------
    // Memory access
    // ------------------------------------------------------------------------

    /// Read a native-endian word at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the word does not lie within the arena.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> usize {
        let mut bytes = [0u8; WORD_SIZE];
        bytes.copy_from_slice(&self.arena.as_slice()[offset..offset + WORD_SIZE]);
        usize::from_ne_bytes(bytes)
    }

    /// Write a native-endian word at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the word does not lie within the arena.
    pub fn write_word(&mut self, offset: usize, value: usize) {
        self.arena.as_mut_slice()[offset..offset + WORD_SIZE].copy_from_slice(&value.to_ne_bytes());
    }

    /// Read a pointer slot at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the slot does not lie within the arena.
    #[must_use]
    pub fn read_ptr(&self, offset: usize) -> Option<Address> {
        Address::from_word(self.read_word(offset))
    }

    /// Write a pointer slot at `offset`.
    ///
    /// # Panics
    ///
    /// Panics if the slot does not lie within the arena.
    pub fn write_ptr(&mut self, offset: usize, address: Option<Address>) {
        self.write_word(offset, Address::to_word(address));
    }

    /// Bytes in `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` does not lie within the arena.
    #[must_use]
    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.arena.as_slice()[range]
    }

    /// Mutable bytes in `range`.
    ///
    /// # Panics
    ///
    /// Panics if `range` does not lie within the arena.
    pub fn bytes_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.arena.as_mut_slice()[range]
    }

    /// Slide `src` down so it starts at `dest`.
    pub(crate) fn move_bytes(&mut self, src: Range<usize>, dest: usize) {
        self.arena.as_mut_slice().copy_within(src, dest);
    }

    pub(crate) fn set_bump(&mut self, bump: usize) {
        debug_assert!(bump <= self.len());
        self.bump = bump;
    }

    /// Zero everything above the bump boundary.
    pub(crate) fn zero_free(&mut self) {
        let bump = self.bump;
        self.arena.as_mut_slice()[bump..].fill(0);
    }

    // ------------------------------------------------------------------------
    // Bookkeeping
    // ------------------------------------------------------------------------

    /// Bytes marked live by the most recent mark phase.
    #[must_use]
    pub const fn occupancy(&self) -> &Bitmap {
        &self.occupancy
    }

    pub(crate) fn occupancy_mut(&mut self) -> &mut Bitmap {
        &mut self.occupancy
    }

    /// Every registered object.
    #[must_use]
    pub const fn object_table(&self) -> &ObjectTable {
        &self.objects
    }

    pub(crate) fn object_table_mut(&mut self) -> &mut ObjectTable {
        &mut self.objects
    }

    /// Cumulative statistics for this heap.
    #[must_use]
    pub const fn statistics(&self) -> &GcStatistics {
        &self.stats
    }

    pub(crate) fn statistics_mut(&mut self) -> &mut GcStatistics {
        &mut self.stats
    }

    pub(crate) fn record_alloc_time(&mut self, elapsed: Duration) {
        self.stats.record_alloc(elapsed);
    }

    /// Summary of memory use and accumulated timings.
    #[must_use]
    pub fn informations(&self) -> GcInformations {
        GcInformations {
            max_heap_memory: self.stats.max_heap().max(self.used()),
            actual_heap_memory: self.used(),
            heap_memory_allocated: self.len(),
            overhead_memory: self.objects.overhead_bytes(),
            total_collect_time: self.stats.total_collect_time(),
            total_alloc_time: self.stats.total_alloc_time(),
        }
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap")
            .field("len", &self.len())
            .field("bump", &self.bump)
            .field("header_size", &self.header_size)
            .field("objects", &self.objects.len())
            .field("sweep_direction", &self.sweep_direction)
            .finish_non_exhaustive()
    }
}
