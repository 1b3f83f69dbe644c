use std::os::fd::RawFd;

use crate::Error;

/// Options used to configure the memory mapping backing a [`SharedBuffer`]. The fields carry POSIX `mmap`
/// semantics directly: `protection` and `flags` are the usual bit-mask configurations (e.g.,
/// [`libc::PROT_READ`], [`libc::MAP_SHARED`]).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MapOptions {
    /// Memory-protection bit mask applied to the mapping.
    pub protection: libc::c_int,

    /// Mapping-configuration bit mask (private/shared/anonymous).
    pub flags: libc::c_int,

    /// Optional descriptor of the file backing the mapping. [`None`] requests a mapping with no backing file.
    pub file_descriptor: Option<RawFd>,

    /// Offset into the backing file at which the mapping starts. Ignored for anonymous mappings.
    pub offset: libc::off_t,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            protection: libc::PROT_READ | libc::PROT_WRITE,
            flags: libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            file_descriptor: None,
            offset: 0,
        }
    }
}

/// Fixed-length raw byte region obtained from the platform's memory-map facility, used for data exchange between
/// cooperating processes. The length is fixed at creation and the region is unmapped when the [`SharedBuffer`] is
/// dropped.
///
/// A [`SharedBuffer`] provides no synchronization of its own: cooperating processes that read and write the region
/// concurrently must establish their own protocol (typically through the collective-communication runtime) before
/// doing so.
pub struct SharedBuffer {
    /// Address at which the region is mapped in this process.
    address: *mut libc::c_void,

    /// Length of the region in bytes.
    length: usize,
}

impl SharedBuffer {
    /// Maps a new region of `length` bytes using the default [`MapOptions`]: read+write protection and a private
    /// anonymous mapping with no backing file.
    pub fn allocate(length: usize) -> Result<Self, Error> {
        Self::allocate_with(length, MapOptions::default())
    }

    /// Maps a new region of `length` bytes using the provided [`MapOptions`]. The request is forwarded to the
    /// platform's `mmap` call as-is; if the OS rejects it, the returned [`Error::Os`] preserves the OS error
    /// number (note that the OS rejects zero-length mappings).
    pub fn allocate_with(length: usize, options: MapOptions) -> Result<Self, Error> {
        let file_descriptor = options.file_descriptor.unwrap_or(-1);
        let address = unsafe {
            libc::mmap(std::ptr::null_mut(), length, options.protection, options.flags, file_descriptor, options.offset)
        };
        if address == libc::MAP_FAILED {
            let error = std::io::Error::last_os_error();
            return Err(Error::from_io(format!("mmap failed for a mapping of {length} bytes"), &error));
        }
        Ok(Self { address, length })
    }

    /// Returns the length of this [`SharedBuffer`] in bytes.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if this [`SharedBuffer`] has length zero.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the address of the mapped region. This is the value shared with cooperating processes that need to
    /// locate the region.
    pub fn as_ptr(&self) -> *const u8 {
        self.address as *const u8
    }

    /// Returns the address of the mapped region for writing.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.address as *mut u8
    }

    /// Returns the mapped region as a byte slice.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.address as *const u8, self.length) }
    }

    /// Returns the mapped region as a mutable byte slice.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.address as *mut u8, self.length) }
    }

    /// Unmaps the region, reporting the OS error that dropping this [`SharedBuffer`] would ignore.
    pub fn unmap(self) -> Result<(), Error> {
        let result = unsafe { libc::munmap(self.address, self.length) };
        let outcome = if result == 0 {
            Ok(())
        } else {
            let error = std::io::Error::last_os_error();
            Err(Error::from_io(format!("munmap failed for a mapping of {} bytes", self.length), &error))
        };
        std::mem::forget(self);
        outcome
    }
}

impl Drop for SharedBuffer {
    fn drop(&mut self) {
        if self.length != 0 {
            unsafe { libc::munmap(self.address, self.length) };
        }
    }
}

unsafe impl Send for SharedBuffer {}
unsafe impl Sync for SharedBuffer {}

#[cfg(test)]
mod tests {
    use crate::{Error, MapOptions, SharedBuffer};

    #[test]
    fn test_allocate() {
        let mut buffer = SharedBuffer::allocate(4096).unwrap();
        assert_eq!(buffer.len(), 4096);
        assert!(!buffer.is_empty());

        // Anonymous mappings are zero-initialized.
        assert!(buffer.as_slice().iter().all(|&byte| byte == 0));

        buffer.as_mut_slice()[0] = 0x2a;
        buffer.as_mut_slice()[4095] = 0x17;
        assert_eq!(buffer.as_slice()[0], 0x2a);
        assert_eq!(buffer.as_slice()[4095], 0x17);

        buffer.unmap().unwrap();
    }

    #[test]
    fn test_allocate_shared() {
        let options =
            MapOptions { flags: libc::MAP_SHARED | libc::MAP_ANONYMOUS, ..MapOptions::default() };
        let buffer = SharedBuffer::allocate_with(65536, options).unwrap();
        assert_eq!(buffer.len(), 65536);
    }

    #[test]
    fn test_allocate_rejected_by_os() {
        // Neither MAP_PRIVATE nor MAP_SHARED: the OS rejects the request and the error code is preserved.
        let options = MapOptions { flags: 0, ..MapOptions::default() };
        assert!(matches!(
            SharedBuffer::allocate_with(4096, options),
            Err(Error::Os { code, .. }) if code != 0,
        ));
    }

    #[test]
    fn test_allocate_zero_length() {
        assert!(matches!(SharedBuffer::allocate(0), Err(Error::Os { code, .. }) if code != 0));
    }
}
