//! Compartments: the isolation boundary that owns a set of memories and the
//! runtime-data block compiled code reads.

use crate::memory::Memory;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::{Arc, Mutex};

/// Cap on the number of memories attachable to one compartment.
pub const MAX_MEMORIES: usize = 256;

/// The compartment-visible data block read directly by compiled code.
///
/// `memory_bases[id]` holds the base address of the compartment's memory
/// `id`, or null for an empty slot. Entries are atomic because compiled code
/// reads them concurrently with attachment on other threads; a reader
/// observes either the pre- or post-attachment state, never a torn value.
#[repr(C)]
pub struct CompartmentRuntimeData {
    memory_bases: [AtomicPtr<u8>; MAX_MEMORIES],
}

impl CompartmentRuntimeData {
    fn new() -> Box<Self> {
        Box::new(CompartmentRuntimeData {
            memory_bases: std::array::from_fn(|_| AtomicPtr::new(ptr::null_mut())),
        })
    }

    /// The published base address of memory `id`, as compiled code sees it.
    pub fn memory_base(&self, id: usize) -> *mut u8 {
        self.memory_bases[id].load(Ordering::SeqCst)
    }

    pub(crate) fn publish_memory_base(&self, id: usize, base: *mut u8) {
        self.memory_bases[id].store(base, Ordering::SeqCst);
    }
}

pub(crate) struct CompartmentInner {
    pub(crate) memories: Vec<Option<Arc<Memory>>>,
}

/// An isolation boundary owning a set of memories.
///
/// The compartment outlives its memories' attachment: a memory holds only a
/// non-owning back-reference, and detaching happens before the memory's own
/// teardown runs.
pub struct Compartment {
    /// Guards the memories table. Published base addresses are only written
    /// while this is held. This mutex and the global memory registry's are
    /// never held at the same time; attachment takes them one after the
    /// other, compartment side first.
    pub(crate) inner: Mutex<CompartmentInner>,
    runtime_data: Box<CompartmentRuntimeData>,
}

impl Compartment {
    /// Create an empty compartment.
    pub fn new() -> Arc<Compartment> {
        Arc::new(Compartment {
            inner: Mutex::new(CompartmentInner {
                memories: Vec::new(),
            }),
            runtime_data: CompartmentRuntimeData::new(),
        })
    }

    /// The memory attached at `id`, if any.
    pub fn memory(&self, id: usize) -> Option<Arc<Memory>> {
        self.inner.lock().unwrap().memories.get(id).cloned().flatten()
    }

    /// Number of memory slots in use, attached or since detached.
    pub fn num_memories(&self) -> usize {
        self.inner.lock().unwrap().memories.len()
    }

    /// The runtime-data block compiled code reads.
    pub fn runtime_data(&self) -> &CompartmentRuntimeData {
        &self.runtime_data
    }
}

impl Drop for Compartment {
    fn drop(&mut self) {
        // Detach every memory: clear the published base address, then drop
        // the owning reference. Each memory's own teardown (decommit,
        // registry removal, reservation release) runs when its last
        // reference goes away.
        let inner = self.inner.get_mut().unwrap();
        for (id, slot) in inner.memories.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.runtime_data.memory_bases[id].store(ptr::null_mut(), Ordering::SeqCst);
            }
        }
    }
}
