use std::io::{self, Error};
use std::mem;
use std::ptr;

use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

pub fn page_size() -> usize {
    // SAFETY: GetSystemInfo only writes into the provided struct.
    unsafe {
        let mut info: SYSTEM_INFO = mem::zeroed();
        GetSystemInfo(&mut info);
        let size = info.dwPageSize as usize;
        if size == 0 {
            4096
        } else {
            size
        }
    }
}

pub struct MmapInner {
    ptr: *mut std::ffi::c_void,
    len: usize,
}

impl MmapInner {
    /// Reserves and commits a read-write region. Committed pages are zeroed
    /// by the OS.
    ///
    /// # Safety
    ///
    /// Calls `VirtualAlloc`; `len` must be non-zero.
    pub unsafe fn map_anon(len: usize, _populate: bool) -> io::Result<Self> {
        let ptr = unsafe { VirtualAlloc(ptr::null(), len, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };

        if ptr.is_null() {
            return Err(Error::last_os_error());
        }

        Ok(Self { ptr, len })
    }

    pub const fn ptr(&self) -> *mut u8 {
        self.ptr.cast::<u8>()
    }

    pub const fn len(&self) -> usize {
        self.len
    }
}

impl Drop for MmapInner {
    fn drop(&mut self) {
        if self.len > 0 {
            // SAFETY: MEM_RELEASE requires a size of 0 and the base address
            // returned by VirtualAlloc.
            unsafe {
                VirtualFree(self.ptr, 0, MEM_RELEASE);
            }
        }
    }
}
