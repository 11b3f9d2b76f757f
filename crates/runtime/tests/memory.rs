//! Integration tests for the linear-memory subsystem, against real
//! reservations.

use kestrel_runtime::{
    clone_memory, create_memory, is_address_owned_by_memory, Compartment, MemoryType, Trap,
    WASM_PAGE_SIZE,
};

#[test]
fn grow_returns_previous_size_and_respects_the_maximum() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(1, Some(3))).unwrap();
    assert_eq!(memory.num_pages(), 1);

    assert_eq!(memory.grow(2), Some(1));
    assert_eq!(memory.num_pages(), 3);

    // Growing past the maximum fails with no state change.
    assert_eq!(memory.grow(1), None);
    assert_eq!(memory.num_pages(), 3);

    // Growing by zero reports the current size.
    assert_eq!(memory.grow(0), Some(3));

    // A delta that overflows the page arithmetic also fails cleanly.
    assert_eq!(memory.grow(usize::MAX), None);
    assert_eq!(memory.num_pages(), 3);
}

#[test]
fn shrink_stops_at_the_minimum() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(2, Some(5))).unwrap();
    assert_eq!(memory.grow(2), Some(2));

    assert_eq!(memory.shrink(1), Some(4));
    assert_eq!(memory.num_pages(), 3);

    // Shrinking below the type's minimum fails with no state change.
    assert_eq!(memory.shrink(2), None);
    assert_eq!(memory.num_pages(), 3);

    assert_eq!(memory.shrink(1), Some(3));
    assert_eq!(memory.num_pages(), 2);

    // Shrinking more pages than exist also fails.
    assert_eq!(memory.shrink(100), None);
}

#[test]
fn grown_pages_are_writable_and_zeroed() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(1, Some(4))).unwrap();
    memory.grow(1).unwrap();

    unsafe {
        let base = memory.base_address();
        *base = 0x11;
        *base.add(WASM_PAGE_SIZE) = 0x22;
        assert_eq!(*base, 0x11);
        assert_eq!(*base.add(WASM_PAGE_SIZE), 0x22);
        assert_eq!(*base.add(2 * WASM_PAGE_SIZE - 1), 0);
    }
}

#[test]
fn address_ownership() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let a = create_memory(&compartment, MemoryType::new(1, None)).unwrap();
    let b = create_memory(&compartment, MemoryType::new(1, None)).unwrap();

    let a_base = a.base_address();
    assert!(is_address_owned_by_memory(a_base));
    assert!(is_address_owned_by_memory(unsafe { a_base.add(1) }));
    assert!(is_address_owned_by_memory(unsafe {
        a_base.add(a.end_offset() - 1)
    }));
    // One past the addressable end is the guard page: reserved, not owned.
    assert!(!is_address_owned_by_memory(unsafe {
        a_base.add(a.end_offset())
    }));
    assert!(is_address_owned_by_memory(unsafe {
        b.base_address().add(1)
    }));
}

#[test]
fn registry_forgets_destroyed_memories() {
    let _ = env_logger::try_init();
    let base;
    {
        let compartment = Compartment::new();
        let memory = create_memory(&compartment, MemoryType::new(1, None)).unwrap();
        base = memory.base_address() as usize;
        assert!(is_address_owned_by_memory(base as *const u8));
    }
    assert!(!is_address_owned_by_memory(base as *const u8));
}

#[test]
fn offset_validation() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(1, Some(2))).unwrap();
    let base = memory.base_address();
    let end = memory.end_offset();

    assert_eq!(memory.validated_offset_range(0, WASM_PAGE_SIZE), Ok(base));
    assert_eq!(memory.validated_offset_range(end - 1, 1), Ok(unsafe {
        base.add(end - 1)
    }));

    // Validation is against the reservation, not the committed size; an
    // uncommitted-but-reserved offset is accepted and left to the guard
    // machinery at access time.
    assert_eq!(
        memory.validated_offset_range(5 * WASM_PAGE_SIZE, 8),
        Ok(unsafe { base.add(5 * WASM_PAGE_SIZE) })
    );

    assert_eq!(
        memory.validated_offset_range(end, 1),
        Err(Trap::AccessViolation)
    );
    assert_eq!(
        memory.validated_offset_range(0, end + 1),
        Err(Trap::AccessViolation)
    );
    // A huge offset saturates instead of wrapping the address computation.
    assert_eq!(
        memory.validated_offset_range(usize::MAX, usize::MAX),
        Err(Trap::AccessViolation)
    );
    assert_eq!(
        memory.validated_offset_range(usize::MAX - 8, 16),
        Err(Trap::AccessViolation)
    );
}

#[test]
fn clone_copies_the_committed_contents() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(1, Some(4))).unwrap();
    memory.grow(1).unwrap();

    unsafe {
        let base = memory.base_address();
        for i in 0..64 {
            *base.add(i * 1024) = i as u8;
        }
        *base.add(WASM_PAGE_SIZE + 17) = 0xEE;
    }

    let other = Compartment::new();
    let cloned = clone_memory(&memory, &other).unwrap();
    assert_eq!(cloned.num_pages(), memory.num_pages());
    assert_ne!(cloned.base_address(), memory.base_address());

    unsafe {
        let a = std::slice::from_raw_parts(memory.base_address(), 2 * WASM_PAGE_SIZE);
        let b = std::slice::from_raw_parts(cloned.base_address(), 2 * WASM_PAGE_SIZE);
        assert_eq!(a, b);
    }
}

#[test]
fn compartment_publishes_base_addresses() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let m0 = create_memory(&compartment, MemoryType::new(1, None)).unwrap();
    let m1 = create_memory(&compartment, MemoryType::new(1, None)).unwrap();

    assert_eq!(m0.id(), 0);
    assert_eq!(m1.id(), 1);
    assert_eq!(compartment.num_memories(), 2);
    assert_eq!(compartment.runtime_data().memory_base(0), m0.base_address());
    assert_eq!(compartment.runtime_data().memory_base(1), m1.base_address());
    assert!(compartment.runtime_data().memory_base(2).is_null());

    let found = compartment.memory(1).unwrap();
    assert_eq!(found.base_address(), m1.base_address());
    assert!(std::sync::Arc::ptr_eq(
        &m0.compartment().unwrap(),
        &compartment
    ));
}

#[test]
fn unmap_pages_decommits_inside_the_committed_region() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(3, Some(3))).unwrap();

    unsafe {
        *memory.base_address() = 1;
        *memory.base_address().add(2 * WASM_PAGE_SIZE) = 3;
    }

    memory.unmap_pages(1, 1);

    // The committed page count is unaffected, and the surrounding pages
    // keep their contents.
    assert_eq!(memory.num_pages(), 3);
    unsafe {
        assert_eq!(*memory.base_address(), 1);
        assert_eq!(*memory.base_address().add(2 * WASM_PAGE_SIZE), 3);
    }
}

#[test]
#[should_panic]
fn unmap_pages_rejects_the_last_page() {
    let _ = env_logger::try_init();
    let compartment = Compartment::new();
    let memory = create_memory(&compartment, MemoryType::new(3, Some(3))).unwrap();
    // The range must end strictly before the last committed page.
    memory.unmap_pages(1, 2);
}
