//! Object layout shared by the integration tests and benchmarks.
//!
//! ```text
//! start            address
//! | size | fields | field 0 | ... | field n-1 | payload ... |
//! ```
//!
//! Header word 0 is the object's total size, header word 1 the number of
//! pointer fields. Fields begin at the object's address; anything after them
//! is opaque payload.

#![allow(dead_code)]

use std::sync::Mutex;

use shifter_gc::{
    Address, Collector, GcBehavior, Heap, HeapConfig, RootCell, RootSet, Slot, SweepDirection,
    DEFAULT_HEADER_SIZE, WORD_SIZE,
};

pub const HEADER: usize = DEFAULT_HEADER_SIZE;

/// Root registry plus the layout callbacks.
#[derive(Debug, Default)]
pub struct Runtime {
    slots: Mutex<Vec<Slot>>,
    verbose: bool,
    profile: bool,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    /// Register a new external root cell holding `address`.
    pub fn root(&self, address: Option<Address>) -> RootCell {
        let cell = RootCell::new(address);
        self.slots.lock().unwrap().push(Slot::External(cell.clone()));
        cell
    }

    pub fn add_slot(&self, slot: Slot) {
        self.slots.lock().unwrap().push(slot);
    }

    pub fn clear_roots(&self) {
        self.slots.lock().unwrap().clear();
    }
}

impl GcBehavior for Runtime {
    fn root_set(&self) -> RootSet {
        self.slots.lock().unwrap().iter().cloned().collect()
    }

    fn size_of(&self, heap: &Heap, object: Address) -> usize {
        heap.read_word(object.offset() - HEADER)
    }

    fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
        let count = heap.read_word(object.offset() - WORD_SIZE);
        (0..count).map(|i| object.offset() + i * WORD_SIZE).collect()
    }

    fn verbose(&self) -> bool {
        self.verbose
    }

    fn profile(&self) -> bool {
        self.profile
    }
}

/// Smallest arena the platform can map.
pub fn page() -> usize {
    sys_alloc::page_size()
}

pub fn collector(size: usize) -> Collector<Runtime> {
    collector_with(size, SweepDirection::TopDown, Runtime::new())
}

pub fn collector_with(
    size: usize,
    direction: SweepDirection,
    runtime: Runtime,
) -> Collector<Runtime> {
    Collector::new(
        &HeapConfig::new().size(size).sweep_direction(direction),
        runtime,
    )
}

/// Bytes needed for an object with `fields` pointers and `payload` words.
pub const fn object_size(fields: usize, payload: usize) -> usize {
    HEADER + (fields + payload) * WORD_SIZE
}

/// Allocate an object and write its header.
pub fn new_object(
    collector: &mut Collector<Runtime>,
    size: usize,
    fields: usize,
) -> Option<Address> {
    assert!(HEADER + fields * WORD_SIZE <= size);
    let object = collector.alloc_object(size)?;
    let start = object.offset() - HEADER;
    let heap = collector.heap_mut();
    heap.write_word(start, size);
    heap.write_word(start + WORD_SIZE, fields);
    Some(object)
}

pub fn size_of(heap: &Heap, object: Address) -> usize {
    heap.read_word(object.offset() - HEADER)
}

pub fn field_count(heap: &Heap, object: Address) -> usize {
    heap.read_word(object.offset() - WORD_SIZE)
}

pub fn field_slot(object: Address, index: usize) -> usize {
    object.offset() + index * WORD_SIZE
}

pub fn set_field(heap: &mut Heap, object: Address, index: usize, value: Option<Address>) {
    heap.write_ptr(field_slot(object, index), value);
}

pub fn field(heap: &Heap, object: Address, index: usize) -> Option<Address> {
    heap.read_ptr(field_slot(object, index))
}

/// Offset of payload word `index`, after the pointer fields.
pub fn payload_slot(heap: &Heap, object: Address, index: usize) -> usize {
    object.offset() + (field_count(heap, object) + index) * WORD_SIZE
}

pub fn set_payload(heap: &mut Heap, object: Address, index: usize, value: usize) {
    let slot = payload_slot(heap, object, index);
    heap.write_word(slot, value);
}

pub fn payload(heap: &Heap, object: Address, index: usize) -> usize {
    heap.read_word(payload_slot(heap, object, index))
}
