//! Object layout used by unit tests.
//!
//! Header word 0 holds the object's total size, header word 1 the number of
//! pointer fields. The fields start at the object's address.

use std::cell::{Cell, RefCell};

use crate::behavior::GcBehavior;
use crate::heap::Heap;
use crate::ptr::{Address, WORD_SIZE};
use crate::roots::{RootCell, RootSet, Slot};

#[derive(Debug, Default)]
pub struct TestBehavior {
    slots: RefCell<Vec<Slot>>,
    profile: Cell<bool>,
}

impl TestBehavior {
    pub fn with_profile(self, profile: bool) -> Self {
        self.profile.set(profile);
        self
    }

    /// Register a new external root holding `address`.
    pub fn root(&self, address: Option<Address>) -> RootCell {
        let cell = RootCell::new(address);
        self.slots.borrow_mut().push(Slot::External(cell.clone()));
        cell
    }

    pub fn add_slot(&self, slot: Slot) {
        self.slots.borrow_mut().push(slot);
    }

    /// External root cells in registration order.
    pub fn roots(&self) -> Vec<RootCell> {
        self.slots
            .borrow()
            .iter()
            .filter_map(|slot| match slot {
                Slot::External(cell) => Some(cell.clone()),
                Slot::Heap(_) => None,
            })
            .collect()
    }
}

impl GcBehavior for TestBehavior {
    fn root_set(&self) -> RootSet {
        self.slots.borrow().iter().cloned().collect()
    }

    fn size_of(&self, heap: &Heap, object: Address) -> usize {
        heap.read_word(object.offset() - heap.header_size())
    }

    fn referenced_fields(&self, heap: &Heap, object: Address) -> Vec<usize> {
        let count = heap.read_word(object.offset() - WORD_SIZE);
        (0..count).map(|i| object.offset() + i * WORD_SIZE).collect()
    }

    fn profile(&self) -> bool {
        self.profile.get()
    }
}

/// Carve and register an object of `size` bytes with `fields` null pointer
/// fields.
pub fn alloc(heap: &mut Heap, behavior: &TestBehavior, size: usize, fields: usize) -> Address {
    assert!(heap.header_size() + fields * WORD_SIZE <= size);
    let start = heap.fetch_free_memory(size, behavior).unwrap();
    heap.write_word(start, size);
    heap.write_word(start + WORD_SIZE, fields);
    let address = Address::from_start(start, heap.header());
    heap.add_object_reference(address);
    address
}

pub fn set_field(heap: &mut Heap, object: Address, index: usize, value: Option<Address>) {
    heap.write_ptr(object.offset() + index * WORD_SIZE, value);
}

pub fn field(heap: &Heap, object: Address, index: usize) -> Option<Address> {
    heap.read_ptr(object.offset() + index * WORD_SIZE)
}
