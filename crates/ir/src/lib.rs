//! Kestrel's typed SSA intermediate representation.
//!
//! This crate defines the small IR that the WebAssembly code generator lowers
//! numeric operators into. It is deliberately minimal: a function is a set of
//! blocks with parameters (phis), each holding a straight-line sequence of
//! instructions over typed SSA values, plus conditional and unconditional
//! branches, traps, and calls to well-known out-of-line runtime routines.
//!
//! Two semantic points matter to users of this IR:
//!
//! - Native shift instructions are undefined for shift counts greater than or
//!   equal to the operand's bit width, and `srem` is undefined for
//!   `INT_MIN % -1`. Producers must mask or branch around these cases
//!   themselves.
//! - Blocks can be marked *cold* (`FunctionBuilder::set_cold_block`), which is
//!   how likely-not-taken trap edges are communicated to the backend.
//!
//! The `interp` module contains a reference interpreter used by tests to
//! check the semantics of emitted code rather than just its shape.

pub mod condcodes;
pub mod immediates;
pub mod interp;
pub mod types;

mod builder;
mod entities;
mod function;
mod instructions;
mod libcall;
mod trapcode;

pub use crate::builder::{FuncInstBuilder, FunctionBuilder};
pub use crate::entities::{Block, FuncRef, Inst, Value};
pub use crate::function::{DataFlowGraph, ExtFuncData, Function, Signature, ValueDef};
pub use crate::instructions::{BlockCall, FpControl, InstructionData, Opcode, Rounding, ValueList};
pub use crate::libcall::LibCall;
pub use crate::trapcode::TrapCode;
pub use crate::types::Type;
