//! References to entities within a function.
//!
//! Entities are compact `u32` indexes into the dense tables owned by a
//! [`Function`](crate::Function). They display in the conventional textual
//! form (`v12`, `block3`, ...).

macro_rules! entity_ref {
    ($(#[$attr:meta])* $name:ident, $display:expr) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create a reference from its number.
            pub fn from_u32(n: u32) -> Self {
                $name(n)
            }

            /// Return the underlying number.
            pub fn as_u32(self) -> u32 {
                self.0
            }

            /// Return the index used to address dense storage.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                write!(f, concat!($display, "{}"), self.0)
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
                core::fmt::Display::fmt(self, f)
            }
        }
    };
}

entity_ref!(
    /// An SSA value.
    Value,
    "v"
);

entity_ref!(
    /// A basic block in the same function.
    Block,
    "block"
);

entity_ref!(
    /// An instruction in the same function.
    Inst,
    "inst"
);

entity_ref!(
    /// An out-of-line runtime routine imported into a function.
    FuncRef,
    "fn"
);
