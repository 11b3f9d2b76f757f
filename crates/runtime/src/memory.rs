//! Runtime linear memories backed by guarded virtual-address reservations.
//!
//! Each memory reserves far more address space than it can ever address (8
//! GiB plus a guard page) and commits wasm pages inside the reservation as
//! the program grows it. Out-of-range accesses from compiled code land on
//! reserved-but-uncommitted or guard pages and fault; the process-global
//! registry below lets the fault handler attribute such faults to a wasm
//! memory.

use crate::compartment::{Compartment, MAX_MEMORIES};
use crate::mmap::{host_page_size, Mmap};
use crate::traps::Trap;
use anyhow::{bail, Context, Result};
use more_asserts::assert_le;
use std::cmp;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// The size of a WebAssembly page, in bytes.
pub const WASM_PAGE_SIZE: usize = 0x10000;

/// The number of pages a 32-bit memory can address: 4 GiB worth.
pub const WASM_MAX_PAGES: usize = 0x10000;

/// Address space reserved per memory, excluding guard pages: 8 GiB.
///
/// A 32-bit index plus a 32-bit constant offset is always below 8 GiB, so
/// accesses computed that way stay inside the reservation no matter what the
/// program does, and bounds checks can be elided entirely; only the
/// guard-page fault distinguishes in-range-but-uncommitted from
/// out-of-range.
pub const MEMORY_RESERVATION: usize = 8 * 1024 * 1024 * 1024;

/// Guard pages reserved past the addressable range, in host pages.
pub const NUM_GUARD_PAGES: usize = 1;

/// The type of a linear memory: its size limits, in wasm pages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryType {
    /// The initial (and minimum) number of pages.
    pub minimum: usize,
    /// The maximum number of pages this memory may grow to, if bounded.
    pub maximum: Option<usize>,
}

impl MemoryType {
    /// Create a memory type.
    pub fn new(minimum: usize, maximum: Option<usize>) -> Self {
        MemoryType { minimum, maximum }
    }

    /// The effective maximum in pages: the declared bound, or the 32-bit
    /// addressing limit when unbounded.
    pub fn maximum_pages(&self) -> usize {
        self.maximum.unwrap_or(WASM_MAX_PAGES)
    }
}

struct Reservation {
    base: usize,
    end: usize,
}

// Global list of live memories; used to query whether an address is reserved
// by one of them.
static MEMORIES: Mutex<Vec<Reservation>> = Mutex::new(Vec::new());

/// A runtime linear memory instance.
///
/// Created with [`create_memory`]; destroyed when the last reference drops,
/// after its compartment has detached it.
pub struct Memory {
    ty: MemoryType,
    mmap: Mmap,
    /// Size in bytes of the addressable reservation, excluding guard pages.
    end_offset: usize,
    /// Number of wasm pages currently committed. Stored atomically so
    /// compiled code and the accessors can read it concurrently with growth;
    /// growth itself is serialized by the embedder.
    num_pages: AtomicUsize,
    /// Index in the owning compartment's memories table.
    id: usize,
    compartment: Weak<Compartment>,
}

/// Create a memory of type `ty` attached to `compartment`.
///
/// The steps are: reserve the guarded address range, commit the type's
/// minimum size, attach to the compartment (capacity permitting) and publish
/// the base address for compiled code, then register the reservation in the
/// global registry. Failure at any step unwinds the earlier ones and returns
/// the error.
pub fn create_memory(compartment: &Arc<Compartment>, ty: MemoryType) -> Result<Arc<Memory>> {
    assert_le!(ty.minimum, ty.maximum_pages());

    let page_size = host_page_size();
    let end_offset = MEMORY_RESERVATION;
    let mapping_size = (end_offset / page_size + NUM_GUARD_PAGES) * page_size;
    let mmap = Mmap::accessible_reserved(0, mapping_size)
        .context("failed to reserve address space for a memory")?;

    // Commit the type's minimum size.
    if ty.minimum > 0 {
        mmap.make_accessible(0, ty.minimum * WASM_PAGE_SIZE)
            .context("failed to commit a memory's initial pages")?;
    }

    // Attach to the compartment and publish the base address where compiled
    // code reads it. The slot id is fixed for the memory's lifetime.
    let memory = {
        let mut inner = compartment.inner.lock().unwrap();
        if inner.memories.len() >= MAX_MEMORIES {
            bail!("compartment already has {MAX_MEMORIES} memories");
        }
        let id = inner.memories.len();
        let memory = Arc::new(Memory {
            ty,
            end_offset,
            num_pages: AtomicUsize::new(ty.minimum),
            id,
            compartment: Arc::downgrade(compartment),
            mmap,
        });
        compartment
            .runtime_data()
            .publish_memory_base(id, memory.base_address());
        inner.memories.push(Some(memory.clone()));
        memory
    };

    // Add the memory to the global registry. The compartment lock has
    // already been released; this lock and the compartment's are never held
    // together.
    MEMORIES.lock().unwrap().push(Reservation {
        base: memory.base_address() as usize,
        end: memory.base_address() as usize + memory.end_offset,
    });

    log::debug!(
        "created memory {} at {:p} with {} pages",
        memory.id,
        memory.base_address(),
        ty.minimum
    );
    Ok(memory)
}

/// Create a copy of `memory` under `new_compartment`: same type, grown to
/// the same number of pages, committed contents copied byte for byte.
pub fn clone_memory(memory: &Memory, new_compartment: &Arc<Compartment>) -> Result<Arc<Memory>> {
    let new_memory = create_memory(new_compartment, memory.ty())?;
    let num_pages = memory.num_pages();
    let delta = num_pages - memory.ty().minimum;
    if delta > 0 && new_memory.grow(delta).is_none() {
        bail!("failed to grow the cloned memory to {num_pages} pages");
    }
    debug_assert_eq!(new_memory.num_pages(), num_pages);
    unsafe {
        std::ptr::copy_nonoverlapping(
            memory.base_address() as *const u8,
            new_memory.base_address(),
            num_pages * WASM_PAGE_SIZE,
        );
    }
    Ok(new_memory)
}

/// Whether `address` lies within some live memory's reservation, guard pages
/// excluded. The fault handler uses this to classify host faults as wasm
/// traps versus unrelated crashes.
pub fn is_address_owned_by_memory(address: *const u8) -> bool {
    let address = address as usize;
    let memories = MEMORIES.lock().unwrap();
    memories
        .iter()
        .any(|r| address >= r.base && address < r.end)
}

impl Memory {
    /// The memory's type.
    pub fn ty(&self) -> MemoryType {
        self.ty
    }

    /// Number of wasm pages currently committed.
    pub fn num_pages(&self) -> usize {
        self.num_pages.load(Ordering::SeqCst)
    }

    /// The effective maximum size in pages.
    pub fn maximum_pages(&self) -> usize {
        self.ty.maximum_pages()
    }

    /// The start of the reserved range. Compiled code addresses the memory
    /// relative to this.
    pub fn base_address(&self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    /// Size in bytes of the addressable reservation, excluding guard pages.
    pub fn end_offset(&self) -> usize {
        self.end_offset
    }

    /// The memory's slot in its compartment.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The compartment this memory belongs to, if it is still alive.
    pub fn compartment(&self) -> Option<Arc<Compartment>> {
        self.compartment.upgrade()
    }

    /// Grow the memory by `delta_pages`, committing the new pages directly
    /// after the currently committed region.
    ///
    /// Returns the number of pages before the grow, or `None` (wasm's `-1`)
    /// if the delta exceeds the type's maximum or the commit fails; the
    /// memory is unchanged in that case. Concurrent growth is serialized by
    /// the embedder.
    pub fn grow(&self, delta_pages: usize) -> Option<usize> {
        let previous_pages = self.num_pages.load(Ordering::SeqCst);
        if delta_pages == 0 {
            return Some(previous_pages);
        }

        // If the grown size would exceed the memory's maximum, fail without
        // any state change.
        let maximum = self.ty.maximum_pages();
        if delta_pages > maximum || previous_pages > maximum - delta_pages {
            return None;
        }

        if let Err(e) = self.mmap.make_accessible(
            previous_pages * WASM_PAGE_SIZE,
            delta_pages * WASM_PAGE_SIZE,
        ) {
            log::debug!("memory grow failed to commit pages: {e:#}");
            return None;
        }
        self.num_pages
            .store(previous_pages + delta_pages, Ordering::SeqCst);
        Some(previous_pages)
    }

    /// Shrink the memory by `delta_pages`, decommitting the pages that fall
    /// off the end.
    ///
    /// Returns the number of pages before the shrink, or `None` if the
    /// delta would take the memory below its type's minimum; the memory is
    /// unchanged in that case.
    pub fn shrink(&self, delta_pages: usize) -> Option<usize> {
        let previous_pages = self.num_pages.load(Ordering::SeqCst);
        if delta_pages == 0 {
            return Some(previous_pages);
        }

        if delta_pages > previous_pages || previous_pages - delta_pages < self.ty.minimum {
            return None;
        }

        let new_pages = previous_pages - delta_pages;
        self.num_pages.store(new_pages, Ordering::SeqCst);
        if let Err(e) = self
            .mmap
            .make_inaccessible(new_pages * WASM_PAGE_SIZE, delta_pages * WASM_PAGE_SIZE)
        {
            log::warn!("memory shrink failed to decommit pages: {e:#}");
        }
        Some(previous_pages)
    }

    /// Decommit `num_pages` pages starting at `page_index`, strictly inside
    /// the committed region. The pages read back as zero if recommitted by a
    /// later grow.
    ///
    /// Out-of-range arguments are a programming error. The range must end
    /// before the last committed page.
    pub fn unmap_pages(&self, page_index: usize, num_pages: usize) {
        let committed = self.num_pages.load(Ordering::SeqCst);
        assert!(page_index < committed);
        assert!(page_index + num_pages > page_index);
        assert!(page_index + num_pages < committed);

        self.mmap
            .make_inaccessible(page_index * WASM_PAGE_SIZE, num_pages * WASM_PAGE_SIZE)
            .expect("failed to decommit memory pages");
    }

    /// Validate that `[offset, offset + num_bytes)` lies inside the
    /// memory's addressable reservation and return the host address of
    /// `offset`.
    ///
    /// The offset is saturated to `end_offset` before any arithmetic, so a
    /// huge offset cannot wrap the address computation past the checks; with
    /// the explicit range check this catches every out-of-reservation access
    /// even when the commit level lags far behind the reservation's end.
    pub fn validated_offset_range(&self, offset: usize, num_bytes: usize) -> Result<*mut u8, Trap> {
        let base = self.base_address() as usize;
        let address = base + cmp::min(offset, self.end_offset);
        if address < base
            || address.checked_add(num_bytes).is_none()
            || address + num_bytes > base + self.end_offset
        {
            return Err(Trap::AccessViolation);
        }
        Ok(address as *mut u8)
    }
}

impl Drop for Memory {
    fn drop(&mut self) {
        // Decommit all committed pages.
        let num_pages = self.num_pages.load(Ordering::SeqCst);
        if num_pages > 0 {
            if let Err(e) = self.mmap.make_inaccessible(0, num_pages * WASM_PAGE_SIZE) {
                log::warn!("failed to decommit a dying memory's pages: {e:#}");
            }
        }

        // Remove the memory from the global registry.
        let base = self.mmap.as_ptr() as usize;
        let mut memories = MEMORIES.lock().unwrap();
        if let Some(index) = memories.iter().position(|r| r.base == base) {
            memories.swap_remove(index);
        }

        // The reservation itself is released when the mmap drops.
        log::debug!("destroyed memory {} at {base:#x}", self.id);
    }
}
