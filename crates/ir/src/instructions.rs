//! Instruction opcodes and formats.

use crate::condcodes::{FloatCC, IntCC};
use crate::entities::{Block, FuncRef, Value};
use crate::immediates::{Ieee32, Ieee64, Imm64, V128Imm};
use crate::trapcode::TrapCode;
use smallvec::SmallVec;

/// A list of SSA values used as instruction or branch arguments.
pub type ValueList = SmallVec<[Value; 4]>;

/// The operation performed by an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Opcode {
    /// Integer constant.
    Iconst,
    /// Single-precision float constant.
    F32const,
    /// Double-precision float constant.
    F64const,
    /// 128-bit vector constant.
    Vconst,
    /// Wrapping integer addition.
    Iadd,
    /// Wrapping integer subtraction.
    Isub,
    /// Wrapping integer multiplication.
    Imul,
    /// Unsigned integer division. Undefined for a zero divisor.
    Udiv,
    /// Signed integer division. Undefined for a zero divisor and for
    /// `INT_MIN / -1`.
    Sdiv,
    /// Unsigned integer remainder. Undefined for a zero divisor.
    Urem,
    /// Signed integer remainder. Undefined for a zero divisor and for
    /// `INT_MIN % -1`.
    Srem,
    /// Bitwise and.
    Band,
    /// Bitwise or.
    Bor,
    /// Bitwise exclusive or.
    Bxor,
    /// Bitwise complement.
    Bnot,
    /// Shift left. Undefined for shift counts >= the lane width.
    Ishl,
    /// Logical shift right. Undefined for shift counts >= the lane width.
    Ushr,
    /// Arithmetic shift right. Undefined for shift counts >= the lane width.
    Sshr,
    /// Count leading zeros; yields the bit width for a zero input.
    Clz,
    /// Count trailing zeros; yields the bit width for a zero input.
    Ctz,
    /// Population count.
    Popcnt,
    /// Integer comparison. Scalar results are 1-bit values carried as `i8`;
    /// vector results are same-shape masks with all-ones lanes for true.
    Icmp,
    /// Floating-point comparison, with the same result convention as `Icmp`.
    Fcmp,
    /// Floating-point addition.
    Fadd,
    /// Floating-point subtraction.
    Fsub,
    /// Floating-point multiplication.
    Fmul,
    /// Floating-point division.
    Fdiv,
    /// Floating-point square root.
    Sqrt,
    /// Flip the sign bit. Never rewrites NaN payloads.
    Fneg,
    /// Clear the sign bit. Never rewrites NaN payloads.
    Fabs,
    /// Combine the magnitude of the first operand with the sign of the
    /// second.
    Fcopysign,
    /// Lanewise minimum with x86 `minps` operand-order semantics:
    /// `x < y ? x : y`, so NaN or equal lanes yield the second operand.
    FminPseudo,
    /// Lanewise maximum with x86 `maxps` operand-order semantics:
    /// `x > y ? x : y`, so NaN or equal lanes yield the second operand.
    FmaxPseudo,
    /// Lanewise signed saturating addition.
    SaddSat,
    /// Lanewise signed saturating subtraction.
    SsubSat,
    /// Zero-extend an integer to a wider type.
    Uextend,
    /// Sign-extend an integer to a wider type.
    Sextend,
    /// Truncate an integer to a narrower type.
    Ireduce,
    /// Reinterpret the bits of a value as another type of the same width.
    Bitcast,
    /// Broadcast a scalar into every lane of a vector.
    Splat,
    /// Extract one lane of a vector as a scalar.
    Extractlane,
    /// Replace one lane of a vector with a scalar.
    Insertlane,
    /// Select 16 bytes out of the concatenation of two `i8x16` vectors.
    Shuffle,
    /// Call an imported runtime routine.
    Call,
    /// Unconditional branch.
    Jump,
    /// Two-way conditional branch on a scalar integer condition.
    Brif,
    /// Abort execution with the given trap code.
    Trap,
    /// Return from the function.
    Return,
}

/// Rounding modes for constrained floating-point operations.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Rounding {
    /// Round to nearest, ties to even. WebAssembly's only rounding mode.
    NearestTiesToEven,
    /// Round toward zero.
    TowardZero,
    /// Round toward negative infinity.
    TowardNegative,
    /// Round toward positive infinity.
    TowardPositive,
}

/// The IEEE 754 environment a constrained floating-point operation must
/// honor. Backends may not apply value-changing transformations (NaN payload
/// rewrites, reassociation, exception-eliding folds) to an operation carrying
/// a strict environment.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FpControl {
    /// The rounding mode in effect.
    pub rounding: Rounding,
    /// Whether floating-point exception state must be preserved exactly.
    pub strict: bool,
}

impl Default for FpControl {
    fn default() -> Self {
        FpControl {
            rounding: Rounding::NearestTiesToEven,
            strict: true,
        }
    }
}

/// A branch destination together with its arguments.
#[derive(Clone, PartialEq, Debug)]
pub struct BlockCall {
    /// The destination block.
    pub block: Block,
    /// Arguments bound to the destination's block parameters.
    pub args: ValueList,
}

impl BlockCall {
    /// Create a block call.
    pub fn new(block: Block, args: &[Value]) -> Self {
        BlockCall {
            block,
            args: args.iter().copied().collect(),
        }
    }
}

/// The payload of an instruction, one variant per operand format.
#[derive(Clone, PartialEq, Debug)]
pub enum InstructionData {
    /// An integer constant.
    UnaryImm {
        /// The opcode.
        opcode: Opcode,
        /// The constant value.
        imm: Imm64,
    },
    /// A single-precision float constant.
    UnaryIeee32 {
        /// The opcode.
        opcode: Opcode,
        /// The constant bit pattern.
        imm: Ieee32,
    },
    /// A double-precision float constant.
    UnaryIeee64 {
        /// The opcode.
        opcode: Opcode,
        /// The constant bit pattern.
        imm: Ieee64,
    },
    /// A vector constant.
    UnaryConst {
        /// The opcode.
        opcode: Opcode,
        /// The constant bytes.
        imm: V128Imm,
    },
    /// A unary operation.
    Unary {
        /// The opcode.
        opcode: Opcode,
        /// The operand.
        arg: Value,
    },
    /// A unary constrained floating-point operation.
    UnaryFp {
        /// The opcode.
        opcode: Opcode,
        /// The operand.
        arg: Value,
        /// The IEEE 754 environment the operation must honor.
        control: FpControl,
    },
    /// A binary operation.
    Binary {
        /// The opcode.
        opcode: Opcode,
        /// The operands, left first.
        args: [Value; 2],
    },
    /// A binary constrained floating-point operation.
    BinaryFp {
        /// The opcode.
        opcode: Opcode,
        /// The operands, left first.
        args: [Value; 2],
        /// The IEEE 754 environment the operation must honor.
        control: FpControl,
    },
    /// An integer comparison.
    IntCompare {
        /// The opcode.
        opcode: Opcode,
        /// The condition code.
        cond: IntCC,
        /// The operands, left first.
        args: [Value; 2],
    },
    /// A floating-point comparison.
    FloatCompare {
        /// The opcode.
        opcode: Opcode,
        /// The condition code.
        cond: FloatCC,
        /// The operands, left first.
        args: [Value; 2],
    },
    /// A lane extraction with a compile-time lane index.
    ExtractLane {
        /// The opcode.
        opcode: Opcode,
        /// The vector operand.
        arg: Value,
        /// The lane to extract.
        lane: u8,
    },
    /// A lane replacement with a compile-time lane index.
    InsertLane {
        /// The opcode.
        opcode: Opcode,
        /// The vector operand, then the replacement scalar.
        args: [Value; 2],
        /// The lane to replace.
        lane: u8,
    },
    /// A byte shuffle of two `i8x16` vectors with compile-time indices.
    Shuffle {
        /// The opcode.
        opcode: Opcode,
        /// The operands, left first.
        args: [Value; 2],
        /// Indices into the 32-byte concatenation of the operands.
        lanes: [u8; 16],
    },
    /// A call to an imported runtime routine.
    Call {
        /// The opcode.
        opcode: Opcode,
        /// The imported routine.
        func_ref: FuncRef,
        /// The call arguments.
        args: ValueList,
    },
    /// An unconditional branch.
    Jump {
        /// The opcode.
        opcode: Opcode,
        /// The destination.
        destination: BlockCall,
    },
    /// A two-way conditional branch. Taken when the condition is non-zero.
    Brif {
        /// The opcode.
        opcode: Opcode,
        /// The scalar integer condition.
        arg: Value,
        /// Then-destination and else-destination.
        blocks: [BlockCall; 2],
    },
    /// A trap.
    Trap {
        /// The opcode.
        opcode: Opcode,
        /// Why the trap fired.
        code: TrapCode,
    },
    /// An instruction with a variable number of arguments and no other
    /// operands (`return`).
    MultiAry {
        /// The opcode.
        opcode: Opcode,
        /// The arguments.
        args: ValueList,
    },
}

impl InstructionData {
    /// The operation performed by this instruction.
    pub fn opcode(&self) -> Opcode {
        use InstructionData::*;
        match self {
            UnaryImm { opcode, .. }
            | UnaryIeee32 { opcode, .. }
            | UnaryIeee64 { opcode, .. }
            | UnaryConst { opcode, .. }
            | Unary { opcode, .. }
            | UnaryFp { opcode, .. }
            | Binary { opcode, .. }
            | BinaryFp { opcode, .. }
            | IntCompare { opcode, .. }
            | FloatCompare { opcode, .. }
            | ExtractLane { opcode, .. }
            | InsertLane { opcode, .. }
            | Shuffle { opcode, .. }
            | Call { opcode, .. }
            | Jump { opcode, .. }
            | Brif { opcode, .. }
            | Trap { opcode, .. }
            | MultiAry { opcode, .. } => *opcode,
        }
    }

    /// Whether this instruction ends its block.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self.opcode(),
            Opcode::Jump | Opcode::Brif | Opcode::Trap | Opcode::Return
        )
    }
}
