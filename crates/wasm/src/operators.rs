//! The numeric operator stream consumed by the translator.
//!
//! The binary decoder is an external collaborator; what it feeds the
//! translator is this enum. Immediates ride along as plain fields: literal
//! constants, compile-time lane indices, and the 16 shuffle indices into the
//! concatenation of two `i8x16` operands. Lane and shuffle indices are
//! range-checked by validation and re-checked by the translator, which
//! rejects out-of-range ones.

use kestrel_ir::immediates::{Ieee32, Ieee64, V128Imm};

/// A WebAssembly numeric operator.
#[derive(Clone, Copy, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Operator {
    // Constants.
    I32Const { value: i32 },
    I64Const { value: i64 },
    F32Const { value: Ieee32 },
    F64Const { value: Ieee64 },
    V128Const { value: V128Imm },

    // 32-bit integer operators.
    I32Clz,
    I32Ctz,
    I32Popcnt,
    I32Eqz,
    I32Add,
    I32Sub,
    I32Mul,
    I32DivS,
    I32DivU,
    I32RemS,
    I32RemU,
    I32And,
    I32Or,
    I32Xor,
    I32Shl,
    I32ShrS,
    I32ShrU,
    I32Rotl,
    I32Rotr,
    I32Eq,
    I32Ne,
    I32LtS,
    I32LtU,
    I32GtS,
    I32GtU,
    I32LeS,
    I32LeU,
    I32GeS,
    I32GeU,

    // 64-bit integer operators.
    I64Clz,
    I64Ctz,
    I64Popcnt,
    I64Eqz,
    I64Add,
    I64Sub,
    I64Mul,
    I64DivS,
    I64DivU,
    I64RemS,
    I64RemU,
    I64And,
    I64Or,
    I64Xor,
    I64Shl,
    I64ShrS,
    I64ShrU,
    I64Rotl,
    I64Rotr,
    I64Eq,
    I64Ne,
    I64LtS,
    I64LtU,
    I64GtS,
    I64GtU,
    I64LeS,
    I64LeU,
    I64GeS,
    I64GeU,

    // Single-precision float operators.
    F32Abs,
    F32Neg,
    F32Sqrt,
    F32Ceil,
    F32Floor,
    F32Trunc,
    F32Nearest,
    F32Add,
    F32Sub,
    F32Mul,
    F32Div,
    F32Min,
    F32Max,
    F32Copysign,
    F32Eq,
    F32Ne,
    F32Lt,
    F32Gt,
    F32Le,
    F32Ge,

    // Double-precision float operators.
    F64Abs,
    F64Neg,
    F64Sqrt,
    F64Ceil,
    F64Floor,
    F64Trunc,
    F64Nearest,
    F64Add,
    F64Sub,
    F64Mul,
    F64Div,
    F64Min,
    F64Max,
    F64Copysign,
    F64Eq,
    F64Ne,
    F64Lt,
    F64Gt,
    F64Le,
    F64Ge,

    // Vector constructors and lane access.
    I8x16Splat,
    I16x8Splat,
    I32x4Splat,
    I64x2Splat,
    F32x4Splat,
    F64x2Splat,
    I8x16ExtractLaneS { lane: u8 },
    I8x16ExtractLaneU { lane: u8 },
    I8x16ReplaceLane { lane: u8 },
    I16x8ExtractLaneS { lane: u8 },
    I16x8ExtractLaneU { lane: u8 },
    I16x8ReplaceLane { lane: u8 },
    I32x4ExtractLane { lane: u8 },
    I32x4ReplaceLane { lane: u8 },
    I64x2ExtractLane { lane: u8 },
    I64x2ReplaceLane { lane: u8 },
    F32x4ExtractLane { lane: u8 },
    F32x4ReplaceLane { lane: u8 },
    F64x2ExtractLane { lane: u8 },
    F64x2ReplaceLane { lane: u8 },
    V8x16Shuffle { lanes: [u8; 16] },

    // Lanewise integer arithmetic.
    I8x16Neg,
    I16x8Neg,
    I32x4Neg,
    I64x2Neg,
    I8x16Add,
    I16x8Add,
    I32x4Add,
    I64x2Add,
    I8x16Sub,
    I16x8Sub,
    I32x4Sub,
    I64x2Sub,
    I8x16Mul,
    I16x8Mul,
    I32x4Mul,
    I8x16AddSaturateS,
    I8x16AddSaturateU,
    I8x16SubSaturateS,
    I8x16SubSaturateU,
    I16x8AddSaturateS,
    I16x8AddSaturateU,
    I16x8SubSaturateS,
    I16x8SubSaturateU,
    I8x16Shl,
    I8x16ShrS,
    I8x16ShrU,
    I16x8Shl,
    I16x8ShrS,
    I16x8ShrU,
    I32x4Shl,
    I32x4ShrS,
    I32x4ShrU,
    I64x2Shl,
    I64x2ShrS,
    I64x2ShrU,

    // Lanewise integer comparisons.
    I8x16Eq,
    I8x16Ne,
    I8x16LtS,
    I8x16LtU,
    I8x16GtS,
    I8x16GtU,
    I8x16LeS,
    I8x16LeU,
    I8x16GeS,
    I8x16GeU,
    I16x8Eq,
    I16x8Ne,
    I16x8LtS,
    I16x8LtU,
    I16x8GtS,
    I16x8GtU,
    I16x8LeS,
    I16x8LeU,
    I16x8GeS,
    I16x8GeU,
    I32x4Eq,
    I32x4Ne,
    I32x4LtS,
    I32x4LtU,
    I32x4GtS,
    I32x4GtU,
    I32x4LeS,
    I32x4LeU,
    I32x4GeS,
    I32x4GeU,

    // Boolean reductions.
    I8x16AnyTrue,
    I8x16AllTrue,
    I16x8AnyTrue,
    I16x8AllTrue,
    I32x4AnyTrue,
    I32x4AllTrue,
    I64x2AnyTrue,
    I64x2AllTrue,

    // Lane-interpretation-free bitwise operators.
    V128And,
    V128Or,
    V128Xor,
    V128Not,
    V128Bitselect,

    // Lanewise float arithmetic.
    F32x4Neg,
    F64x2Neg,
    F32x4Abs,
    F64x2Abs,
    F32x4Sqrt,
    F64x2Sqrt,
    F32x4Add,
    F64x2Add,
    F32x4Sub,
    F64x2Sub,
    F32x4Mul,
    F64x2Mul,
    F32x4Div,
    F64x2Div,
    F32x4Min,
    F64x2Min,
    F32x4Max,
    F64x2Max,

    // Lanewise float comparisons.
    F32x4Eq,
    F32x4Ne,
    F32x4Lt,
    F32x4Gt,
    F32x4Le,
    F32x4Ge,
    F64x2Eq,
    F64x2Ne,
    F64x2Lt,
    F64x2Gt,
    F64x2Le,
    F64x2Ge,
}
