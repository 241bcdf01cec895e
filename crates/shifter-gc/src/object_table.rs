//! The table of every object allocated in the arena.
//!
//! Mark only follows addresses it finds here, which is what lets the
//! collector ignore foreign or stale values sitting in root slots and fields.
//! An object's position in the table is its [`ObjectId`] for the duration of
//! one cycle; sweeping the table renumbers the survivors.

use std::collections::HashMap;

use crate::gc::mark::Bitmap;
use crate::ptr::{Address, WORD_SIZE};

/// Number of entries the table grows by when it runs out of room.
pub const OBJECT_TABLE_STEP: usize = 500;

/// Position of an object in the [`ObjectTable`].
pub type ObjectId = usize;

/// Dense, insertion-ordered table of object addresses.
#[derive(Debug, Clone)]
pub struct ObjectTable {
    entries: Vec<Address>,
    /// Reserved entries; grows in steps of [`OBJECT_TABLE_STEP`].
    capacity: usize,
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTable {
    /// Create a table with room for [`OBJECT_TABLE_STEP`] entries.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(OBJECT_TABLE_STEP)
    }

    /// Create a table with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an address and return its id.
    ///
    /// Registering the same address twice is a contract violation.
    pub fn add(&mut self, address: Address) -> ObjectId {
        debug_assert!(
            !self.contains(address),
            "object {address} registered twice"
        );
        if self.entries.len() == self.capacity {
            self.capacity += OBJECT_TABLE_STEP;
            self.entries.reserve_exact(self.capacity - self.entries.len());
        }
        self.entries.push(address);
        self.entries.len() - 1
    }

    /// Number of registered objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries the table has room for.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bookkeeping bytes reserved for the table.
    #[must_use]
    pub const fn overhead_bytes(&self) -> usize {
        self.capacity * WORD_SIZE
    }

    /// Address registered under `id`.
    #[must_use]
    pub fn get(&self, id: ObjectId) -> Option<Address> {
        self.entries.get(id).copied()
    }

    /// Whether `address` is registered.
    #[must_use]
    pub fn contains(&self, address: Address) -> bool {
        self.entries.contains(&address)
    }

    /// The registered addresses in id order.
    #[must_use]
    pub fn as_slice(&self) -> &[Address] {
        &self.entries
    }

    /// Iterate over the registered addresses in id order.
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.entries.iter().copied()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [Address] {
        &mut self.entries
    }

    /// Map from address to id, used by mark to validate candidate pointers.
    #[must_use]
    pub fn index(&self) -> HashMap<Address, ObjectId> {
        let mut index = HashMap::with_capacity(self.entries.len());
        for (id, address) in self.entries.iter().enumerate() {
            index.entry(*address).or_insert(id);
        }
        index
    }

    /// Drop every entry whose id is not set in `marks`, keeping survivors in
    /// their original order. Returns the number of entries removed.
    pub fn retain_marked(&mut self, marks: &Bitmap) -> usize {
        let before = self.entries.len();
        let mut id = 0;
        self.entries.retain(|_| {
            let keep = marks.test(id);
            id += 1;
            keep
        });
        before - self.entries.len()
    }
}
