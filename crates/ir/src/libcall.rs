//! Well-known runtime routines.
//!
//! A few floating-point operators have semantics that do not match any native
//! instruction on all targets (NaN propagation in `min`/`max`, the rounding
//! discipline of `nearest`). Those are compiled as calls to out-of-line
//! routines that the runtime resolves by symbol name at link time, keeping
//! the semantics-sensitive corners in one place.

use crate::function::Signature;
use crate::types::{F32, F64, Type};
use core::fmt;

/// The runtime routines the code generator may call out of line.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LibCall {
    /// `f32.min` with WebAssembly NaN and signed-zero semantics.
    F32Min,
    /// `f64.min` with WebAssembly NaN and signed-zero semantics.
    F64Min,
    /// `f32.max` with WebAssembly NaN and signed-zero semantics.
    F32Max,
    /// `f64.max` with WebAssembly NaN and signed-zero semantics.
    F64Max,
    /// `f32.ceil`.
    F32Ceil,
    /// `f64.ceil`.
    F64Ceil,
    /// `f32.floor`.
    F32Floor,
    /// `f64.floor`.
    F64Floor,
    /// `f32.trunc`: round toward zero.
    F32Trunc,
    /// `f64.trunc`: round toward zero.
    F64Trunc,
    /// `f32.nearest`: round to nearest, ties to even.
    F32Nearest,
    /// `f64.nearest`: round to nearest, ties to even.
    F64Nearest,
}

impl LibCall {
    /// The symbol name the runtime resolves this routine by.
    pub fn symbol(self) -> &'static str {
        use LibCall::*;
        match self {
            F32Min => "f32.min",
            F64Min => "f64.min",
            F32Max => "f32.max",
            F64Max => "f64.max",
            F32Ceil => "f32.ceil",
            F64Ceil => "f64.ceil",
            F32Floor => "f32.floor",
            F64Floor => "f64.floor",
            F32Trunc => "f32.trunc",
            F64Trunc => "f64.trunc",
            F32Nearest => "f32.nearest",
            F64Nearest => "f64.nearest",
        }
    }

    /// The scalar float type this routine operates on.
    pub fn ty(self) -> Type {
        use LibCall::*;
        match self {
            F32Min | F32Max | F32Ceil | F32Floor | F32Trunc | F32Nearest => F32,
            F64Min | F64Max | F64Ceil | F64Floor | F64Trunc | F64Nearest => F64,
        }
    }

    /// The routine's signature: `(T, T) -> T` for `min`/`max`, `T -> T` for
    /// the rounding routines.
    pub fn signature(self) -> Signature {
        use LibCall::*;
        let ty = self.ty();
        match self {
            F32Min | F64Min | F32Max | F64Max => Signature::new(vec![ty, ty], vec![ty]),
            _ => Signature::new(vec![ty], vec![ty]),
        }
    }

    /// All libcalls, for building resolution tables.
    pub fn all() -> &'static [LibCall] {
        use LibCall::*;
        &[
            F32Min, F64Min, F32Max, F64Max, F32Ceil, F64Ceil, F32Floor, F64Floor, F32Trunc,
            F64Trunc, F32Nearest, F64Nearest,
        ]
    }
}

impl fmt::Display for LibCall {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
