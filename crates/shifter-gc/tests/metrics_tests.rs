//! Tests for collection metrics, cumulative statistics and profiling.

mod common;

use std::time::Duration;

use common::{collector_with, new_object, page, Runtime};
use shifter_gc::SweepDirection;

#[test]
fn test_statistics_accumulate() {
    let mut gc = collector_with(page(), SweepDirection::TopDown, Runtime::new());
    let kept = new_object(&mut gc, 32, 0).unwrap();
    gc.behavior().root(Some(kept));

    new_object(&mut gc, 64, 0).unwrap();
    let first = gc.collect();
    new_object(&mut gc, 16, 0).unwrap();
    new_object(&mut gc, 16, 0).unwrap();
    let second = gc.collect();

    assert_eq!(first.collection_number, 1);
    assert_eq!(second.collection_number, 2);
    assert_eq!(second.bytes_reclaimed(), 32);
    assert_eq!(second.objects_reclaimed, 2);

    let statistics = gc.heap().statistics();
    assert_eq!(statistics.collections(), 2);
    assert_eq!(statistics.total_bytes_reclaimed(), 96);
    assert_eq!(statistics.total_objects_reclaimed(), 3);
    assert_eq!(statistics.last_collection(), Some(second));
}

#[test]
fn test_timings_zero_without_profile() {
    let mut gc = collector_with(page(), SweepDirection::TopDown, Runtime::new());
    new_object(&mut gc, 32, 0).unwrap();
    let metrics = gc.collect();

    assert_eq!(metrics.duration, Duration::ZERO);
    assert_eq!(metrics.mark_duration, Duration::ZERO);
    assert_eq!(metrics.sweep_duration, Duration::ZERO);
    assert_eq!(metrics.table_sweep_duration, Duration::ZERO);
    let informations = gc.informations();
    assert_eq!(informations.total_collect_time, Duration::ZERO);
    assert_eq!(informations.total_alloc_time, Duration::ZERO);
}

#[test]
fn test_profile_tracks_peak_and_time() {
    let runtime = Runtime::new().profile(true);
    let mut gc = collector_with(page(), SweepDirection::BottomUp, runtime);
    for _ in 0..8 {
        new_object(&mut gc, 64, 0).unwrap();
    }
    let metrics = gc.collect();

    assert!(metrics.duration >= metrics.mark_duration + metrics.sweep_duration);
    let informations = gc.informations();
    assert_eq!(informations.max_heap_memory, 8 * 64);
    assert_eq!(informations.actual_heap_memory, 0);
    assert_eq!(informations.total_collect_time, metrics.duration);
    assert!(informations.total_alloc_time > Duration::ZERO);
}

#[test]
fn test_metrics_describe_collection() {
    let mut gc = collector_with(page(), SweepDirection::TopDown, Runtime::new());
    let a = new_object(&mut gc, 32, 0).unwrap();
    new_object(&mut gc, 32, 0).unwrap();
    let b = new_object(&mut gc, 48, 0).unwrap();
    new_object(&mut gc, 16, 0).unwrap();
    gc.behavior().root(Some(a));
    gc.behavior().root(Some(b));
    gc.behavior().root(None);

    let metrics = gc.collect();
    assert_eq!(metrics.heap_used_before, 128);
    assert_eq!(metrics.heap_used_after, 80);
    assert_eq!(metrics.bytes_marked, 80);
    assert_eq!(metrics.bytes_swept, gc.heap().len() - 80);
    assert_eq!(metrics.objects_surviving, 2);
    assert_eq!(metrics.objects_reclaimed, 2);
    assert_eq!(metrics.roots, 3);
    assert_eq!(metrics.compaction_steps, 1);
    assert_eq!(metrics.slots_adjusted, 1);
}
