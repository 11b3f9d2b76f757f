//! Performs translation of WebAssembly numeric operators to Kestrel IR.
//!
//! The translation is driven opcode by opcode by an external decoder and
//! mimics the execution of the WebAssembly stack machine: each instruction's
//! result is pushed onto a value stack and instruction arguments are popped
//! off it. Structured control flow, locals, calls, and memory accesses are
//! the surrounding machinery's concern; this crate covers the numeric core,
//! where WebAssembly's precisely specified edge behavior (trapping division,
//! wrapping shift counts, NaN discipline, saturating lanes) has to be mapped
//! onto IR operations whose native forms leave those edges undefined.

use thiserror::Error;

mod code_translator;
mod func_translator;
mod operators;
mod state;

pub use crate::code_translator::translate_operator;
pub use crate::func_translator::FuncTranslator;
pub use crate::operators::Operator;
pub use crate::state::FuncTranslationState;

/// A WebAssembly translation error.
///
/// When a WebAssembly function can't be translated, one of these error codes
/// will be returned to describe the failure.
#[derive(Error, Debug)]
pub enum WasmError {
    /// The input WebAssembly code is invalid.
    ///
    /// The translator returns this when an operator carries an immediate
    /// that validation should have rejected, such as a lane index outside
    /// the vector shape it addresses. It should never happen for validated
    /// WebAssembly code.
    #[error("Invalid input WebAssembly code: {message}")]
    InvalidWebAssembly {
        /// A string describing the validation error.
        message: String,
    },
}

/// A convenient alias for a `Result` that uses `WasmError` as the error type.
pub type WasmResult<T> = Result<T, WasmError>;
