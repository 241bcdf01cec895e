//! The set of objects found reachable in the current cycle.

#[cfg(debug_assertions)]
use std::collections::HashSet;

use crate::ptr::Address;

/// Live objects in the order mark reached them.
///
/// Compaction rewrites the stored addresses as objects slide down, so after
/// sweeping the set holds every survivor's final address.
#[derive(Debug, Clone, Default)]
pub struct LiveObjectSet {
    objects: Vec<Address>,
    #[cfg(debug_assertions)]
    inserted: HashSet<Address>,
}

impl LiveObjectSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly reached object. Inserting the same object twice is a
    /// bug in the caller.
    pub fn insert(&mut self, object: Address) {
        #[cfg(debug_assertions)]
        assert!(
            self.inserted.insert(object),
            "object {object} inserted into the live set twice"
        );
        self.objects.push(object);
    }

    /// Number of live objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Check if no object is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Object at position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Address> {
        self.objects.get(index).copied()
    }

    /// Whether `object` is in the set at its current address.
    #[must_use]
    pub fn contains(&self, object: Address) -> bool {
        self.objects.contains(&object)
    }

    /// Live objects in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[Address] {
        &self.objects
    }

    /// Iterate over live objects in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Address> + '_ {
        self.objects.iter().copied()
    }

    pub(crate) fn set(&mut self, index: usize, object: Address) {
        self.objects[index] = object;
    }
}
