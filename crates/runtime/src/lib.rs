//! Runtime support for Kestrel.
//!
//! The centerpiece is the linear-memory subsystem: every wasm memory owns a
//! large guarded virtual-address reservation, commits and decommits wasm
//! pages inside it as the program grows and shrinks the memory, publishes
//! its base address into its compartment's runtime-data block for compiled
//! code to read, and registers its reservation in a process-global table so
//! the fault handler can tell wasm out-of-bounds accesses apart from
//! unrelated crashes.
//!
//! The crate also carries the out-of-line float intrinsics ([`libcalls`])
//! that compiled code calls for the operators whose exact NaN and rounding
//! rules don't match native instructions everywhere.

pub mod libcalls;

mod compartment;
mod memory;
mod mmap;
mod traps;

pub use crate::compartment::{Compartment, CompartmentRuntimeData, MAX_MEMORIES};
pub use crate::memory::{
    clone_memory, create_memory, is_address_owned_by_memory, Memory, MemoryType,
    MEMORY_RESERVATION, NUM_GUARD_PAGES, WASM_MAX_PAGES, WASM_PAGE_SIZE,
};
pub use crate::mmap::{host_page_size, Mmap};
pub use crate::traps::{classify_fault, Trap};
