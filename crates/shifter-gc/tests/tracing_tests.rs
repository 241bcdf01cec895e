//! Integration tests for GC tracing feature.
//!
//! These tests verify that tracing spans and events are correctly generated
//! during garbage collection operations.

#![cfg(feature = "tracing")]

mod common;

use std::fmt;
use std::sync::{Arc, Mutex};

use common::{collector_with, new_object, page, Runtime};
use shifter_gc::SweepDirection;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

#[derive(Debug, Clone, Default)]
struct Recorded {
    events: Arc<Mutex<Vec<(Level, String)>>>,
    spans: Arc<Mutex<Vec<String>>>,
}

impl Recorded {
    fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(recorded, _)| *recorded == level)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn count(&self, message: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, recorded)| recorded == message)
            .count()
    }

    fn spans(&self) -> Vec<String> {
        self.spans.lock().unwrap().clone()
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for Recorded {
    fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: Context<'_, S>) {
        self.spans
            .lock()
            .unwrap()
            .push(attrs.metadata().name().to_string());
    }

    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events
            .lock()
            .unwrap()
            .push((*event.metadata().level(), visitor.0));
    }
}

fn record(f: impl FnOnce()) -> Recorded {
    let recorded = Recorded::default();
    let subscriber = tracing_subscriber::registry().with(recorded.clone());
    tracing::subscriber::with_default(subscriber, f);
    recorded
}

fn garbage_then_collect(runtime: Runtime) {
    let mut gc = collector_with(page(), SweepDirection::TopDown, runtime);
    let _dead = new_object(&mut gc, 32, 0).unwrap();
    let kept = new_object(&mut gc, 32, 0).unwrap();
    gc.behavior().root(Some(kept));
    gc.collect();
}

#[test]
fn test_phase_start_end_events() {
    let recorded = record(|| garbage_then_collect(Runtime::new()));
    assert_eq!(recorded.count("phase_start"), 3);
    assert_eq!(recorded.count("phase_end"), 3);
}

#[test]
fn test_phase_span_hierarchy() {
    let recorded = record(|| garbage_then_collect(Runtime::new()));
    assert_eq!(
        recorded.spans(),
        vec!["gc_collect", "gc_phase", "gc_phase", "gc_phase"]
    );
}

#[test]
fn test_gap_closed_event() {
    let recorded = record(|| garbage_then_collect(Runtime::new()));
    assert_eq!(recorded.count("gap_closed"), 1);
}

#[test]
fn test_quiet_behavior_emits_no_milestones() {
    let recorded = record(|| garbage_then_collect(Runtime::new()));
    assert!(recorded.messages(Level::INFO).is_empty());
}

#[test]
fn test_verbose_behavior_emits_milestones() {
    let recorded = record(|| garbage_then_collect(Runtime::new().verbose(true)));
    assert_eq!(
        recorded.messages(Level::INFO),
        vec!["collection_start", "mark_start", "sweep_start", "sweep_end"]
    );
}

#[test]
fn test_allocation_failure_event() {
    let recorded = record(|| {
        let mut gc = collector_with(page(), SweepDirection::TopDown, Runtime::new());
        let object = new_object(&mut gc, page(), 0).unwrap();
        gc.behavior().root(Some(object));
        assert!(new_object(&mut gc, 16, 0).is_none());
    });
    assert_eq!(recorded.count("allocation_failed"), 1);
}
