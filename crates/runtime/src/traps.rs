//! Runtime trap reasons and fault classification.

use core::fmt;

/// The reasons a running wasm program aborts.
///
/// Traps unwind through the host runtime; no other exception crosses a wasm
/// frame. Code-generation-time guards branch into per-kind trap stubs, and
/// guard-page faults are mapped to [`Trap::AccessViolation`] by the fault
/// handler via [`classify_fault`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trap {
    /// An out-of-range linear-memory access.
    AccessViolation,
    /// Integer division by zero.
    IntegerDivisionByZero,
    /// Signed integer overflow (`INT_MIN / -1`).
    IntegerOverflow,
    /// An indirect call whose signature didn't match the callee's.
    IndirectCallSignatureMismatch,
    /// The program executed an `unreachable` instruction.
    Unreachable,
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Trap::AccessViolation => "out of bounds memory access",
            Trap::IntegerDivisionByZero => "integer divide by zero",
            Trap::IntegerOverflow => "integer overflow",
            Trap::IndirectCallSignatureMismatch => "indirect call type mismatch",
            Trap::Unreachable => "unreachable executed",
        })
    }
}

impl std::error::Error for Trap {}

/// Classify a faulting address from the host's fault handler: a fault inside
/// some live memory's reservation is a wasm trap, anything else is an
/// unrelated crash that must be re-raised.
pub fn classify_fault(address: *const u8) -> Option<Trap> {
    if crate::memory::is_address_owned_by_memory(address) {
        Some(Trap::AccessViolation)
    } else {
        None
    }
}
