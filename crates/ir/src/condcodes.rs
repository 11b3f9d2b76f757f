//! Condition codes for comparison instructions.

use core::fmt;

/// Condition codes for integer comparisons.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum IntCC {
    /// `==`.
    Equal,
    /// `!=`.
    NotEqual,
    /// Signed `<`.
    SignedLessThan,
    /// Signed `>=`.
    SignedGreaterThanOrEqual,
    /// Signed `>`.
    SignedGreaterThan,
    /// Signed `<=`.
    SignedLessThanOrEqual,
    /// Unsigned `<`.
    UnsignedLessThan,
    /// Unsigned `>=`.
    UnsignedGreaterThanOrEqual,
    /// Unsigned `>`.
    UnsignedGreaterThan,
    /// Unsigned `<=`.
    UnsignedLessThanOrEqual,
}

impl fmt::Display for IntCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use IntCC::*;
        f.write_str(match self {
            Equal => "eq",
            NotEqual => "ne",
            SignedLessThan => "slt",
            SignedGreaterThanOrEqual => "sge",
            SignedGreaterThan => "sgt",
            SignedLessThanOrEqual => "sle",
            UnsignedLessThan => "ult",
            UnsignedGreaterThanOrEqual => "uge",
            UnsignedGreaterThan => "ugt",
            UnsignedLessThanOrEqual => "ule",
        })
    }
}

/// Condition codes for floating-point comparisons.
///
/// `Equal` and the four orderings are *ordered* comparisons: they are false
/// whenever either operand is NaN. `NotEqual` is the *unordered* complement
/// of `Equal`: it is true whenever either operand is NaN. This matches the
/// comparison semantics WebAssembly requires.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FloatCC {
    /// Ordered `==`.
    Equal,
    /// Unordered-or-not-equal: the complement of `Equal`.
    NotEqual,
    /// Ordered `<`.
    LessThan,
    /// Ordered `<=`.
    LessThanOrEqual,
    /// Ordered `>`.
    GreaterThan,
    /// Ordered `>=`.
    GreaterThanOrEqual,
}

impl fmt::Display for FloatCC {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FloatCC::*;
        f.write_str(match self {
            Equal => "eq",
            NotEqual => "ne",
            LessThan => "lt",
            LessThanOrEqual => "le",
            GreaterThan => "gt",
            GreaterThanOrEqual => "ge",
        })
    }
}
