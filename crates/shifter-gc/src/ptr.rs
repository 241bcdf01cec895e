//! Object addresses inside the arena.
//!
//! The collector never hands out raw pointers. An [`Address`] is the arena
//! offset of an object's mutator-visible pointer, which sits
//! `header_size` bytes after the first byte the object occupies. Because the
//! header is never empty, a valid address is never zero, and a zero word in
//! the arena reads back as null.

use std::fmt;
use std::num::NonZeroUsize;

/// Width of a pointer slot stored in the arena.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Mutator-visible address of a managed object, as an arena offset.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(NonZeroUsize);

impl Address {
    /// Wraps an arena offset. Returns `None` for offset 0, which is null.
    #[must_use]
    pub const fn new(offset: usize) -> Option<Self> {
        match NonZeroUsize::new(offset) {
            Some(offset) => Some(Self(offset)),
            None => None,
        }
    }

    /// Address of an object whose bytes begin at `start`.
    #[must_use]
    pub const fn from_start(start: usize, header_size: NonZeroUsize) -> Self {
        Self(header_size.saturating_add(start))
    }

    /// The arena offset this address denotes.
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0.get()
    }

    /// First byte of the object, or `None` if the address lies inside the
    /// first header's width and so cannot belong to any object.
    #[must_use]
    pub const fn start(self, header_size: usize) -> Option<usize> {
        self.0.get().checked_sub(header_size)
    }

    /// The address `amount` bytes lower, if it is still non-null.
    #[must_use]
    pub const fn checked_sub(self, amount: usize) -> Option<Self> {
        match self.0.get().checked_sub(amount) {
            Some(offset) => Self::new(offset),
            None => None,
        }
    }

    /// Decodes a pointer word read from the arena.
    #[must_use]
    pub const fn from_word(word: usize) -> Option<Self> {
        Self::new(word)
    }

    /// Encodes a possibly-null address as a pointer word.
    #[must_use]
    pub const fn to_word(address: Option<Self>) -> usize {
        match address {
            Some(address) => address.offset(),
            None => 0,
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({:#x})", self.offset())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.offset())
    }
}
