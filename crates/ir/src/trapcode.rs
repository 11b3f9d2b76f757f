//! Trap codes describing the reason for a trap.

use core::fmt;

/// A trap code describing the reason for a trap.
///
/// All trap instructions have an explicit trap code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TrapCode {
    /// An integer division by zero.
    IntegerDivisionByZero,

    /// An integer arithmetic operation caused an overflow.
    IntegerOverflow,

    /// An out-of-bounds linear-memory access.
    ///
    /// Not all out-of-bounds accesses are reported this way; most are
    /// detected by a fault on the guard region of the memory's reservation.
    HeapOutOfBounds,

    /// A user-defined trap code.
    User(u16),
}

impl fmt::Display for TrapCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let identifier = match *self {
            Self::IntegerDivisionByZero => "int_divz",
            Self::IntegerOverflow => "int_ovf",
            Self::HeapOutOfBounds => "heap_oob",
            Self::User(x) => return write!(f, "user{x}"),
        };
        f.write_str(identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(TrapCode::IntegerDivisionByZero.to_string(), "int_divz");
        assert_eq!(TrapCode::IntegerOverflow.to_string(), "int_ovf");
        assert_eq!(TrapCode::HeapOutOfBounds.to_string(), "heap_oob");
        assert_eq!(TrapCode::User(17).to_string(), "user17");
    }
}
