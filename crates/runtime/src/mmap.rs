//! Low-level abstraction for reserving, committing, and decommitting
//! zero-filled pages of memory.

use anyhow::{Context, Result};
use more_asserts::assert_le;

/// The host's virtual-memory page size, in bytes.
pub fn host_page_size() -> usize {
    region::page::size()
}

/// A page-aligned virtual-address reservation whose pages can be committed
/// (made read-write) and decommitted (returned to reserved-but-inaccessible)
/// independently.
#[derive(Debug)]
pub struct Mmap {
    // Note that this is stored as a `usize` instead of a `*const` or `*mut`
    // pointer to allow this structure to be natively `Send` and `Sync`
    // without `unsafe impl`. This type is sendable across threads and
    // shareable since the coordination all happens at the OS layer.
    ptr: usize,
    len: usize,
}

impl Mmap {
    /// Construct a new empty instance of `Mmap`.
    pub fn new() -> Self {
        // Rust's slices require non-null pointers, even when empty. `Vec`
        // contains code to create a non-null dangling pointer value when
        // constructed empty, so we reuse that here.
        let empty = Vec::<u8>::new();
        Self {
            ptr: empty.as_ptr() as usize,
            len: 0,
        }
    }

    /// Create a new `Mmap` pointing to `accessible_size` bytes of
    /// page-aligned accessible memory, within a reserved mapping of
    /// `mapping_size` bytes. `accessible_size` and `mapping_size` must be
    /// native page-size multiples.
    #[cfg(not(target_os = "windows"))]
    pub fn accessible_reserved(accessible_size: usize, mapping_size: usize) -> Result<Self> {
        use rustix::mm::{MapFlags, ProtFlags};

        let page_size = host_page_size();
        assert_le!(accessible_size, mapping_size);
        assert_eq!(mapping_size & (page_size - 1), 0);
        assert_eq!(accessible_size & (page_size - 1), 0);

        // Mmap may return EINVAL if the size is zero, so just special-case
        // that.
        if mapping_size == 0 {
            return Ok(Self::new());
        }

        Ok(if accessible_size == mapping_size {
            // Allocate a single read-write region at once.
            let ptr = unsafe {
                rustix::mm::mmap_anonymous(
                    std::ptr::null_mut(),
                    mapping_size,
                    ProtFlags::READ | ProtFlags::WRITE,
                    MapFlags::PRIVATE,
                )
                .context(format!("mmap failed to allocate {mapping_size:#x} bytes"))?
            };

            Self {
                ptr: ptr as usize,
                len: mapping_size,
            }
        } else {
            // Reserve the mapping size with no access permissions.
            let ptr = unsafe {
                rustix::mm::mmap_anonymous(
                    std::ptr::null_mut(),
                    mapping_size,
                    ProtFlags::empty(),
                    MapFlags::PRIVATE,
                )
                .context(format!("mmap failed to reserve {mapping_size:#x} bytes"))?
            };

            let result = Self {
                ptr: ptr as usize,
                len: mapping_size,
            };

            if accessible_size != 0 {
                // Commit the accessible size.
                result.make_accessible(0, accessible_size)?;
            }

            result
        })
    }

    /// Create a new `Mmap` pointing to `accessible_size` bytes of
    /// page-aligned accessible memory, within a reserved mapping of
    /// `mapping_size` bytes. `accessible_size` and `mapping_size` must be
    /// native page-size multiples.
    #[cfg(target_os = "windows")]
    pub fn accessible_reserved(accessible_size: usize, mapping_size: usize) -> Result<Self> {
        use anyhow::bail;
        use std::io;
        use winapi::um::memoryapi::VirtualAlloc;
        use winapi::um::winnt::{MEM_COMMIT, MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE};

        let page_size = host_page_size();
        assert_le!(accessible_size, mapping_size);
        assert_eq!(mapping_size & (page_size - 1), 0);
        assert_eq!(accessible_size & (page_size - 1), 0);

        if mapping_size == 0 {
            return Ok(Self::new());
        }

        Ok(if accessible_size == mapping_size {
            // Allocate a single read-write region at once.
            let ptr = unsafe {
                VirtualAlloc(
                    std::ptr::null_mut(),
                    mapping_size,
                    MEM_RESERVE | MEM_COMMIT,
                    PAGE_READWRITE,
                )
            };
            if ptr.is_null() {
                bail!("VirtualAlloc failed: {}", io::Error::last_os_error());
            }

            Self {
                ptr: ptr as usize,
                len: mapping_size,
            }
        } else {
            // Reserve the mapping size.
            let ptr = unsafe {
                VirtualAlloc(std::ptr::null_mut(), mapping_size, MEM_RESERVE, PAGE_NOACCESS)
            };
            if ptr.is_null() {
                bail!("VirtualAlloc failed: {}", io::Error::last_os_error());
            }

            let result = Self {
                ptr: ptr as usize,
                len: mapping_size,
            };

            if accessible_size != 0 {
                // Commit the accessible size.
                result.make_accessible(0, accessible_size)?;
            }

            result
        })
    }

    /// Commit the pages starting at `start` and extending for `len` bytes,
    /// making them accessible. `start` and `len` must be native page-size
    /// multiples and describe a range within `self`'s reserved memory.
    ///
    /// Protection changes are coordinated by the OS; callers serialize
    /// ranges among themselves, which is why this takes `&self`.
    #[cfg(not(target_os = "windows"))]
    pub fn make_accessible(&self, start: usize, len: usize) -> Result<()> {
        let page_size = host_page_size();
        assert_eq!(start & (page_size - 1), 0);
        assert_eq!(len & (page_size - 1), 0);
        assert_le!(len, self.len);
        assert_le!(start, self.len - len);

        let ptr = self.ptr as *const u8;
        unsafe {
            region::protect(ptr.add(start), len, region::Protection::READ_WRITE)?;
        }

        Ok(())
    }

    /// Commit the pages starting at `start` and extending for `len` bytes,
    /// making them accessible. `start` and `len` must be native page-size
    /// multiples and describe a range within `self`'s reserved memory.
    #[cfg(target_os = "windows")]
    pub fn make_accessible(&self, start: usize, len: usize) -> Result<()> {
        use anyhow::bail;
        use std::io;
        use winapi::ctypes::c_void;
        use winapi::um::memoryapi::VirtualAlloc;
        use winapi::um::winnt::{MEM_COMMIT, PAGE_READWRITE};

        let page_size = host_page_size();
        assert_eq!(start & (page_size - 1), 0);
        assert_eq!(len & (page_size - 1), 0);
        assert_le!(len, self.len);
        assert_le!(start, self.len - len);

        let ptr = self.ptr as *const u8;
        if unsafe {
            VirtualAlloc(
                ptr.add(start) as *mut c_void,
                len,
                MEM_COMMIT,
                PAGE_READWRITE,
            )
        }
        .is_null()
        {
            bail!("VirtualAlloc failed: {}", io::Error::last_os_error());
        }

        Ok(())
    }

    /// Decommit the pages starting at `start` and extending for `len`
    /// bytes. The range reverts to reserved-but-inaccessible, and its old
    /// contents are discarded. `start` and `len` must be native page-size
    /// multiples and describe a range within `self`'s reserved memory.
    #[cfg(not(target_os = "windows"))]
    pub fn make_inaccessible(&self, start: usize, len: usize) -> Result<()> {
        use rustix::mm::{MapFlags, ProtFlags};

        let page_size = host_page_size();
        assert_eq!(start & (page_size - 1), 0);
        assert_eq!(len & (page_size - 1), 0);
        assert_le!(len, self.len);
        assert_le!(start, self.len - len);

        // Remap fresh inaccessible pages over the range, releasing the old
        // backing while keeping the address space reserved.
        unsafe {
            rustix::mm::mmap_anonymous(
                (self.ptr + start) as *mut std::ffi::c_void,
                len,
                ProtFlags::empty(),
                MapFlags::PRIVATE | MapFlags::FIXED,
            )
            .context(format!("mmap failed to decommit {len:#x} bytes"))?;
        }

        Ok(())
    }

    /// Decommit the pages starting at `start` and extending for `len`
    /// bytes. The range reverts to reserved-but-inaccessible, and its old
    /// contents are discarded. `start` and `len` must be native page-size
    /// multiples and describe a range within `self`'s reserved memory.
    #[cfg(target_os = "windows")]
    pub fn make_inaccessible(&self, start: usize, len: usize) -> Result<()> {
        use anyhow::bail;
        use std::io;
        use winapi::ctypes::c_void;
        use winapi::um::memoryapi::VirtualFree;
        use winapi::um::winnt::MEM_DECOMMIT;

        let page_size = host_page_size();
        assert_eq!(start & (page_size - 1), 0);
        assert_eq!(len & (page_size - 1), 0);
        assert_le!(len, self.len);
        assert_le!(start, self.len - len);

        if unsafe { VirtualFree((self.ptr + start) as *mut c_void, len, MEM_DECOMMIT) } == 0 {
            bail!("VirtualFree failed: {}", io::Error::last_os_error());
        }

        Ok(())
    }

    /// Return the mapped memory as a pointer to u8.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr as *const u8
    }

    /// Return the mapped memory as a mutable pointer to u8.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.ptr as *mut u8
    }

    /// Return the length of the reservation.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return whether any memory has been reserved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Mmap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Mmap {
    #[cfg(not(target_os = "windows"))]
    fn drop(&mut self) {
        if self.len != 0 {
            unsafe { rustix::mm::munmap(self.ptr as *mut std::ffi::c_void, self.len) }
                .expect("munmap failed");
        }
    }

    #[cfg(target_os = "windows")]
    fn drop(&mut self) {
        if self.len != 0 {
            use winapi::ctypes::c_void;
            use winapi::um::memoryapi::VirtualFree;
            use winapi::um::winnt::MEM_RELEASE;
            let r = unsafe { VirtualFree(self.ptr as *mut c_void, 0, MEM_RELEASE) };
            assert_ne!(r, 0);
        }
    }
}

fn _assert() {
    fn _assert_send_sync<T: Send + Sync>() {}
    _assert_send_sync::<Mmap>();
}
