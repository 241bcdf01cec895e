//! GC metrics and statistics.

use std::time::{Duration, Instant};

/// Statistics from one garbage collection.
///
/// Phase durations are only measured when the behavior asks for profiling;
/// otherwise they stay zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcMetrics {
    /// Ordinal of this collection on its heap, starting at 1.
    pub collection_number: usize,
    /// Duration of the whole collection.
    pub duration: Duration,
    /// Duration of the mark phase.
    pub mark_duration: Duration,
    /// Duration of compaction.
    pub sweep_duration: Duration,
    /// Duration of the object-table sweep.
    pub table_sweep_duration: Duration,
    /// Bytes covered by live objects.
    pub bytes_marked: usize,
    /// Free bytes above the bump boundary once compaction finished.
    pub bytes_swept: usize,
    /// Bytes below the bump boundary before the collection.
    pub heap_used_before: usize,
    /// Bytes below the bump boundary after the collection.
    pub heap_used_after: usize,
    /// Number of objects found reachable.
    pub objects_surviving: usize,
    /// Number of table entries dropped.
    pub objects_reclaimed: usize,
    /// Number of root slots supplied.
    pub roots: usize,
    /// Number of gaps closed.
    pub compaction_steps: usize,
    /// Number of pointer slots rewritten.
    pub slots_adjusted: usize,
}

impl GcMetrics {
    /// Create a new `GcMetrics` with all fields set to zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            collection_number: 0,
            duration: Duration::ZERO,
            mark_duration: Duration::ZERO,
            sweep_duration: Duration::ZERO,
            table_sweep_duration: Duration::ZERO,
            bytes_marked: 0,
            bytes_swept: 0,
            heap_used_before: 0,
            heap_used_after: 0,
            objects_surviving: 0,
            objects_reclaimed: 0,
            roots: 0,
            compaction_steps: 0,
            slots_adjusted: 0,
        }
    }

    /// Bytes returned to the free region by this collection.
    #[must_use]
    pub const fn bytes_reclaimed(&self) -> usize {
        self.heap_used_before.saturating_sub(self.heap_used_after)
    }
}

/// Internal helper for capturing phase durations.
///
/// A disabled timer never reads the clock, so every duration stays zero.
///
/// # Example
///
/// ```
/// use shifter_gc::metrics::PhaseTimer;
///
/// let mut timer = PhaseTimer::new(true);
/// timer.start();
/// // ... mark phase work ...
/// timer.end_mark();
///
/// timer.start();
/// // ... compaction work ...
/// timer.end_sweep();
///
/// timer.start();
/// // ... object table work ...
/// timer.end_table_sweep();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PhaseTimer {
    /// Accumulated mark phase time.
    pub mark: Duration,
    /// Accumulated compaction time.
    pub sweep: Duration,
    /// Accumulated object-table sweep time.
    pub table_sweep: Duration,
    enabled: bool,
    /// Start time of current phase.
    current_start: Option<Instant>,
}

impl PhaseTimer {
    /// Create a timer; `enabled == false` makes every call a no-op.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            mark: Duration::ZERO,
            sweep: Duration::ZERO,
            table_sweep: Duration::ZERO,
            enabled,
            current_start: None,
        }
    }

    /// Start timing a phase.
    pub fn start(&mut self) {
        if self.enabled {
            self.current_start = Some(Instant::now());
        }
    }

    fn take(&mut self) -> Duration {
        self.current_start
            .take()
            .map_or(Duration::ZERO, |start| start.elapsed())
    }

    /// End the mark phase and record its duration.
    pub fn end_mark(&mut self) {
        let elapsed = self.take();
        self.mark += elapsed;
    }

    /// End compaction and record its duration.
    pub fn end_sweep(&mut self) {
        let elapsed = self.take();
        self.sweep += elapsed;
    }

    /// End the object-table sweep and record its duration.
    pub fn end_table_sweep(&mut self) {
        let elapsed = self.take();
        self.table_sweep += elapsed;
    }
}

/// Cumulative statistics owned by one heap.
#[derive(Debug, Clone, Default)]
pub struct GcStatistics {
    collections: usize,
    bytes_reclaimed: usize,
    objects_reclaimed: usize,
    max_heap: usize,
    total_collect_time: Duration,
    total_alloc_time: Duration,
    last: Option<GcMetrics>,
}

impl GcStatistics {
    /// Create statistics with every counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            collections: 0,
            bytes_reclaimed: 0,
            objects_reclaimed: 0,
            max_heap: 0,
            total_collect_time: Duration::ZERO,
            total_alloc_time: Duration::ZERO,
            last: None,
        }
    }

    /// Number of collections run.
    #[must_use]
    pub const fn collections(&self) -> usize {
        self.collections
    }

    /// Total bytes reclaimed across all collections.
    #[must_use]
    pub const fn total_bytes_reclaimed(&self) -> usize {
        self.bytes_reclaimed
    }

    /// Total objects reclaimed across all collections.
    #[must_use]
    pub const fn total_objects_reclaimed(&self) -> usize {
        self.objects_reclaimed
    }

    /// Highest bump boundary observed while profiling.
    #[must_use]
    pub const fn max_heap(&self) -> usize {
        self.max_heap
    }

    /// Time spent collecting while profiling.
    #[must_use]
    pub const fn total_collect_time(&self) -> Duration {
        self.total_collect_time
    }

    /// Time spent allocating while profiling.
    #[must_use]
    pub const fn total_alloc_time(&self) -> Duration {
        self.total_alloc_time
    }

    /// Metrics of the most recent collection.
    #[must_use]
    pub const fn last_collection(&self) -> Option<GcMetrics> {
        self.last
    }

    /// Number the next collection will carry.
    pub(crate) const fn next_collection_number(&self) -> usize {
        self.collections + 1
    }

    pub(crate) fn observe_heap(&mut self, used: usize) {
        self.max_heap = self.max_heap.max(used);
    }

    pub(crate) fn record_alloc(&mut self, elapsed: Duration) {
        self.total_alloc_time += elapsed;
    }

    pub(crate) fn record_collection(&mut self, metrics: &GcMetrics) {
        self.collections += 1;
        self.bytes_reclaimed += metrics.bytes_reclaimed();
        self.objects_reclaimed += metrics.objects_reclaimed;
        self.total_collect_time += metrics.duration;
        self.last = Some(*metrics);
    }
}

/// Memory use and timing summary for a heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcInformations {
    /// Highest bump boundary seen while profiling, or current use if higher.
    pub max_heap_memory: usize,
    /// Bytes currently below the bump boundary.
    pub actual_heap_memory: usize,
    /// Arena size.
    pub heap_memory_allocated: usize,
    /// Bytes reserved for the object table.
    pub overhead_memory: usize,
    /// Accumulated collection time.
    pub total_collect_time: Duration,
    /// Accumulated allocation time.
    pub total_alloc_time: Duration,
}
