//! Page-granular anonymous memory for the collector's arena.
//!
//! The managed heap is one contiguous region whose size is a multiple of the
//! system page size. This crate hands out such regions zero-filled and
//! releases them when the owning [`Mmap`] is dropped.

use std::io;

#[cfg(unix)]
mod unix;
#[cfg(unix)]
use unix as os;

#[cfg(windows)]
mod windows;
#[cfg(windows)]
use windows as os;

pub use os::page_size;

/// Rounds `len` up to the next multiple of the system page size.
///
/// Returns `None` on overflow.
#[must_use]
pub fn round_to_pages(len: usize) -> Option<usize> {
    let page = page_size();
    len.checked_add(page - 1).map(|n| n / page * page)
}

/// An owned, anonymous, read-write memory mapping.
///
/// The region is zero-filled on creation and unmapped on drop.
pub struct Mmap {
    inner: os::MmapInner,
}

impl Mmap {
    /// Returns a pointer to the start of the mapping.
    #[must_use]
    pub fn ptr(&self) -> *mut u8 {
        self.inner.ptr()
    }

    /// Returns the length of the mapping in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the mapping is empty. Mappings created through
    /// [`MmapOptions::map_anon`] never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Views the whole mapping as bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: the mapping is readable for `len` bytes while `self` lives.
        unsafe { std::slice::from_raw_parts(self.ptr(), self.len()) }
    }

    /// Views the whole mapping as mutable bytes.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: the mapping is writable for `len` bytes and `&mut self`
        // guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr(), self.len()) }
    }
}

impl std::fmt::Debug for Mmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mmap")
            .field("ptr", &self.ptr())
            .field("len", &self.len())
            .finish()
    }
}

// SAFETY: the mapping is plain memory owned by this handle.
unsafe impl Send for Mmap {}
unsafe impl Sync for Mmap {}

/// Configuration for creating a memory mapping.
#[derive(Debug, Clone)]
pub struct MmapOptions {
    len: usize,
    populate: bool,
}

impl MmapOptions {
    /// Creates options with length 0. A length must be set before mapping.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            len: 0,
            populate: false,
        }
    }

    /// Sets the length of the mapping in bytes.
    #[must_use]
    pub const fn len(mut self, len: usize) -> Self {
        self.len = len;
        self
    }

    /// Pre-faults the page tables (`MAP_POPULATE` on Linux, ignored elsewhere).
    #[must_use]
    pub const fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// Creates a zero-filled anonymous mapping.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a zero length and the OS error if the
    /// mapping call fails.
    pub fn map_anon(&self) -> io::Result<Mmap> {
        if self.len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "length must be greater than 0",
            ));
        }

        // SAFETY: an anonymous private mapping without an address hint
        // cannot alias any existing allocation.
        let inner = unsafe { os::MmapInner::map_anon(self.len, self.populate)? };

        Ok(Mmap { inner })
    }
}

impl Default for MmapOptions {
    fn default() -> Self {
        Self::new()
    }
}
