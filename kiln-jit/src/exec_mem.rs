//! Executable memory for compiled code.
//!
//! Code is placed in an anonymous private mapping created writable, then
//! flipped to read+execute before anything can run it. The mapping is owned
//! by the holder and unmapped on drop.

use std::io;
use std::ptr;

use crate::error::JitError;

pub(crate) struct ExecutableMemory {
    ptr: *mut u8,
    len: usize,
}

impl ExecutableMemory {
    /// Map, copy `code` in, and make the region executable.
    pub(crate) fn with_code(code: &[u8]) -> Result<Self, JitError> {
        let len = code.len().max(1);
        // SAFETY: anonymous private mapping with no file descriptor; the
        // kernel picks the address.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(JitError::Map(io::Error::last_os_error()));
        }
        let mapping = Self { ptr: raw.cast::<u8>(), len };

        // SAFETY: the mapping covers len bytes and does not overlap `code`.
        unsafe {
            ptr::copy_nonoverlapping(code.as_ptr(), mapping.ptr, code.len());
        }

        // SAFETY: mmap returned a page-aligned region of at least len bytes.
        let rc = unsafe { libc::mprotect(mapping.ptr.cast(), len, libc::PROT_READ | libc::PROT_EXEC) };
        if rc != 0 {
            return Err(JitError::Map(io::Error::last_os_error()));
        }
        Ok(mapping)
    }

    /// The entry point at the start of the region.
    ///
    /// Calling it is only sound once the region holds a complete function
    /// for the host ABI; the translator guarantees that before handing the
    /// mapping out.
    pub(crate) fn entry(&self) -> unsafe extern "C" fn() -> i64 {
        // SAFETY: fn pointers and data pointers have the same representation
        // on the supported targets.
        unsafe { std::mem::transmute::<*mut u8, unsafe extern "C" fn() -> i64>(self.ptr) }
    }
}

impl Drop for ExecutableMemory {
    fn drop(&mut self) {
        // SAFETY: ptr/len describe exactly the mapping created in with_code.
        unsafe {
            libc::munmap(self.ptr.cast(), self.len);
        }
    }
}
