//! A builder interface for constructing functions one instruction at a time.

use crate::condcodes::{FloatCC, IntCC};
use crate::entities::{Block, FuncRef, Inst, Value};
use crate::function::Function;
use crate::immediates::{Ieee32, Ieee64, Imm64, V128Imm};
use crate::instructions::{BlockCall, FpControl, InstructionData, Opcode};
use crate::trapcode::TrapCode;
use crate::types::{self, Type};

/// A builder positioned inside a [`Function`], appending instructions to the
/// current block.
pub struct FunctionBuilder<'a> {
    /// The function being built.
    pub func: &'a mut Function,
    position: Option<Block>,
}

impl<'a> FunctionBuilder<'a> {
    /// Create a builder for `func`. The builder starts with no position; use
    /// [`switch_to_block`](Self::switch_to_block) before inserting
    /// instructions.
    pub fn new(func: &'a mut Function) -> Self {
        FunctionBuilder {
            func,
            position: None,
        }
    }

    /// Create a new, empty block.
    pub fn create_block(&mut self) -> Block {
        self.func.create_block()
    }

    /// Append a parameter to `block` and return the value bound to it.
    pub fn append_block_param(&mut self, block: Block, ty: Type) -> Value {
        self.func.append_block_param(block, ty)
    }

    /// The parameters of `block`.
    pub fn block_params(&self, block: Block) -> &[Value] {
        self.func.block_params(block)
    }

    /// Continue insertion at the end of `block`.
    pub fn switch_to_block(&mut self, block: Block) {
        self.position = Some(block);
    }

    /// The block instructions are currently appended to.
    pub fn current_block(&self) -> Option<Block> {
        self.position
    }

    /// Mark `block` as rarely executed, so the backend lays it out off the
    /// hot path. Trap edges are the main user.
    pub fn set_cold_block(&mut self, block: Block) {
        self.func.set_cold(block);
    }

    /// An instruction builder inserting at the current position.
    pub fn ins<'short>(&'short mut self) -> FuncInstBuilder<'short, 'a> {
        FuncInstBuilder { builder: self }
    }
}

/// Inserts one instruction at the builder's current position.
pub struct FuncInstBuilder<'short, 'a> {
    builder: &'short mut FunctionBuilder<'a>,
}

impl<'short, 'a> FuncInstBuilder<'short, 'a> {
    fn build(self, data: InstructionData, result: Option<Type>) -> (Inst, Option<Value>) {
        let block = self
            .builder
            .position
            .expect("the builder must be positioned in a block");
        let inst = self.builder.func.dfg.make_inst(data);
        let value = result.map(|ty| self.builder.func.dfg.attach_result(inst, ty));
        self.builder.func.append_inst(block, inst);
        (inst, value)
    }

    fn value_type(&self, value: Value) -> Type {
        self.builder.func.dfg.value_type(value)
    }

    fn unary(self, opcode: Opcode, result: Type, arg: Value) -> Value {
        self.build(InstructionData::Unary { opcode, arg }, Some(result))
            .1
            .unwrap()
    }

    fn binary(self, opcode: Opcode, a: Value, b: Value) -> Value {
        let ty = self.value_type(a);
        debug_assert_eq!(ty, self.value_type(b), "{opcode:?} operand types differ");
        self.build(InstructionData::Binary { opcode, args: [a, b] }, Some(ty))
            .1
            .unwrap()
    }

    /// An integer constant of type `ty`.
    pub fn iconst(self, ty: Type, imm: impl Into<Imm64>) -> Value {
        debug_assert!(ty.is_int() && !ty.is_vector());
        self.build(
            InstructionData::UnaryImm {
                opcode: Opcode::Iconst,
                imm: imm.into(),
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// A single-precision float constant.
    pub fn f32const(self, imm: impl Into<Ieee32>) -> Value {
        self.build(
            InstructionData::UnaryIeee32 {
                opcode: Opcode::F32const,
                imm: imm.into(),
            },
            Some(types::F32),
        )
        .1
        .unwrap()
    }

    /// A double-precision float constant.
    pub fn f64const(self, imm: impl Into<Ieee64>) -> Value {
        self.build(
            InstructionData::UnaryIeee64 {
                opcode: Opcode::F64const,
                imm: imm.into(),
            },
            Some(types::F64),
        )
        .1
        .unwrap()
    }

    /// A 128-bit vector constant of type `ty`.
    pub fn vconst(self, ty: Type, imm: impl Into<V128Imm>) -> Value {
        debug_assert!(ty.is_vector());
        self.build(
            InstructionData::UnaryConst {
                opcode: Opcode::Vconst,
                imm: imm.into(),
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// Wrapping integer addition.
    pub fn iadd(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Iadd, a, b)
    }

    /// Wrapping integer subtraction.
    pub fn isub(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Isub, a, b)
    }

    /// Wrapping integer multiplication.
    pub fn imul(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Imul, a, b)
    }

    /// Unsigned division. Undefined for a zero divisor.
    pub fn udiv(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Udiv, a, b)
    }

    /// Signed division. Undefined for a zero divisor and `INT_MIN / -1`.
    pub fn sdiv(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Sdiv, a, b)
    }

    /// Unsigned remainder. Undefined for a zero divisor.
    pub fn urem(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Urem, a, b)
    }

    /// Signed remainder. Undefined for a zero divisor and `INT_MIN % -1`.
    pub fn srem(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Srem, a, b)
    }

    /// Bitwise and.
    pub fn band(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Band, a, b)
    }

    /// Bitwise or.
    pub fn bor(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Bor, a, b)
    }

    /// Bitwise exclusive or.
    pub fn bxor(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Bxor, a, b)
    }

    /// Bitwise complement.
    pub fn bnot(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Bnot, ty, a)
    }

    /// Shift left. Undefined for shift counts >= the lane width.
    pub fn ishl(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Ishl, a, b)
    }

    /// Logical shift right. Undefined for shift counts >= the lane width.
    pub fn ushr(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Ushr, a, b)
    }

    /// Arithmetic shift right. Undefined for shift counts >= the lane width.
    pub fn sshr(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Sshr, a, b)
    }

    /// Count leading zeros, yielding the bit width for zero.
    pub fn clz(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Clz, ty, a)
    }

    /// Count trailing zeros, yielding the bit width for zero.
    pub fn ctz(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Ctz, ty, a)
    }

    /// Population count.
    pub fn popcnt(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Popcnt, ty, a)
    }

    /// Integer comparison. Scalar operands yield a 1-bit result carried as
    /// `i8`; vector operands yield a same-shape mask vector.
    pub fn icmp(self, cond: IntCC, a: Value, b: Value) -> Value {
        let ty = self.value_type(a);
        debug_assert_eq!(ty, self.value_type(b));
        let result = if ty.is_vector() { ty.as_int() } else { types::I8 };
        self.build(
            InstructionData::IntCompare {
                opcode: Opcode::Icmp,
                cond,
                args: [a, b],
            },
            Some(result),
        )
        .1
        .unwrap()
    }

    /// Floating-point comparison, with the same result convention as `icmp`.
    pub fn fcmp(self, cond: FloatCC, a: Value, b: Value) -> Value {
        let ty = self.value_type(a);
        debug_assert_eq!(ty, self.value_type(b));
        let result = if ty.is_vector() { ty.as_int() } else { types::I8 };
        self.build(
            InstructionData::FloatCompare {
                opcode: Opcode::Fcmp,
                cond,
                args: [a, b],
            },
            Some(result),
        )
        .1
        .unwrap()
    }

    /// Floating-point addition.
    pub fn fadd(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Fadd, a, b)
    }

    /// Floating-point subtraction.
    pub fn fsub(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Fsub, a, b)
    }

    /// Floating-point multiplication.
    pub fn fmul(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Fmul, a, b)
    }

    /// Floating-point division.
    pub fn fdiv(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Fdiv, a, b)
    }

    fn binary_fp(self, opcode: Opcode, a: Value, b: Value, control: FpControl) -> Value {
        let ty = self.value_type(a);
        debug_assert_eq!(ty, self.value_type(b));
        self.build(
            InstructionData::BinaryFp {
                opcode,
                args: [a, b],
                control,
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// Floating-point addition constrained to the given IEEE environment.
    pub fn fadd_constrained(self, a: Value, b: Value, control: FpControl) -> Value {
        self.binary_fp(Opcode::Fadd, a, b, control)
    }

    /// Floating-point subtraction constrained to the given IEEE environment.
    pub fn fsub_constrained(self, a: Value, b: Value, control: FpControl) -> Value {
        self.binary_fp(Opcode::Fsub, a, b, control)
    }

    /// Floating-point multiplication constrained to the given IEEE
    /// environment.
    pub fn fmul_constrained(self, a: Value, b: Value, control: FpControl) -> Value {
        self.binary_fp(Opcode::Fmul, a, b, control)
    }

    /// Floating-point division constrained to the given IEEE environment.
    pub fn fdiv_constrained(self, a: Value, b: Value, control: FpControl) -> Value {
        self.binary_fp(Opcode::Fdiv, a, b, control)
    }

    /// Floating-point square root.
    pub fn sqrt(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Sqrt, ty, a)
    }

    /// Floating-point square root constrained to the given IEEE environment.
    pub fn sqrt_constrained(self, a: Value, control: FpControl) -> Value {
        let ty = self.value_type(a);
        self.build(
            InstructionData::UnaryFp {
                opcode: Opcode::Sqrt,
                arg: a,
                control,
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// Flip the sign bit.
    pub fn fneg(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Fneg, ty, a)
    }

    /// Clear the sign bit.
    pub fn fabs(self, a: Value) -> Value {
        let ty = self.value_type(a);
        self.unary(Opcode::Fabs, ty, a)
    }

    /// Combine the magnitude of `a` with the sign of `b`.
    pub fn fcopysign(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::Fcopysign, a, b)
    }

    /// Lanewise minimum with x86 `minps` semantics: `x < y ? x : y`.
    pub fn fmin_pseudo(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FminPseudo, a, b)
    }

    /// Lanewise maximum with x86 `maxps` semantics: `x > y ? x : y`.
    pub fn fmax_pseudo(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::FmaxPseudo, a, b)
    }

    /// Lanewise signed saturating addition.
    pub fn sadd_sat(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::SaddSat, a, b)
    }

    /// Lanewise signed saturating subtraction.
    pub fn ssub_sat(self, a: Value, b: Value) -> Value {
        self.binary(Opcode::SsubSat, a, b)
    }

    /// Zero-extend to the wider integer type `ty`.
    pub fn uextend(self, ty: Type, a: Value) -> Value {
        debug_assert!(ty.bits() > self.value_type(a).bits());
        self.unary(Opcode::Uextend, ty, a)
    }

    /// Sign-extend to the wider integer type `ty`.
    pub fn sextend(self, ty: Type, a: Value) -> Value {
        debug_assert!(ty.bits() > self.value_type(a).bits());
        self.unary(Opcode::Sextend, ty, a)
    }

    /// Truncate to the narrower integer type `ty`.
    pub fn ireduce(self, ty: Type, a: Value) -> Value {
        debug_assert!(ty.bits() < self.value_type(a).bits());
        self.unary(Opcode::Ireduce, ty, a)
    }

    /// Reinterpret the bits of `a` as `ty`. The widths must match.
    pub fn bitcast(self, ty: Type, a: Value) -> Value {
        debug_assert_eq!(ty.bits(), self.value_type(a).bits());
        self.unary(Opcode::Bitcast, ty, a)
    }

    /// Broadcast the scalar `a` into every lane of the vector type `ty`.
    pub fn splat(self, ty: Type, a: Value) -> Value {
        debug_assert!(ty.is_vector());
        debug_assert_eq!(ty.lane_type(), self.value_type(a));
        self.unary(Opcode::Splat, ty, a)
    }

    /// Extract lane `lane` of the vector `a` as a scalar.
    pub fn extractlane(self, a: Value, lane: u8) -> Value {
        let ty = self.value_type(a);
        debug_assert!(u32::from(lane) < ty.lane_count());
        self.build(
            InstructionData::ExtractLane {
                opcode: Opcode::Extractlane,
                arg: a,
                lane,
            },
            Some(ty.lane_type()),
        )
        .1
        .unwrap()
    }

    /// Replace lane `lane` of the vector `a` with the scalar `b`.
    pub fn insertlane(self, a: Value, b: Value, lane: u8) -> Value {
        let ty = self.value_type(a);
        debug_assert!(u32::from(lane) < ty.lane_count());
        debug_assert_eq!(ty.lane_type(), self.value_type(b));
        self.build(
            InstructionData::InsertLane {
                opcode: Opcode::Insertlane,
                args: [a, b],
                lane,
            },
            Some(ty),
        )
        .1
        .unwrap()
    }

    /// Select 16 bytes out of the concatenation of `a` and `b` by the
    /// compile-time indices `lanes` (each in `0..32`).
    pub fn shuffle(self, a: Value, b: Value, lanes: [u8; 16]) -> Value {
        debug_assert_eq!(self.value_type(a), types::I8X16);
        debug_assert_eq!(self.value_type(b), types::I8X16);
        debug_assert!(lanes.iter().all(|&l| l < 32));
        self.build(
            InstructionData::Shuffle {
                opcode: Opcode::Shuffle,
                args: [a, b],
                lanes,
            },
            Some(types::I8X16),
        )
        .1
        .unwrap()
    }

    /// Call the imported runtime routine `func_ref`.
    pub fn call(self, func_ref: FuncRef, args: &[Value]) -> Inst {
        let signature = self.builder.func.ext_func(func_ref).signature.clone();
        debug_assert_eq!(signature.params.len(), args.len());
        debug_assert_eq!(signature.returns.len(), 1);
        let result = signature.returns[0];
        self.build(
            InstructionData::Call {
                opcode: Opcode::Call,
                func_ref,
                args: args.iter().copied().collect(),
            },
            Some(result),
        )
        .0
    }

    /// Unconditionally branch to `destination`.
    pub fn jump(self, destination: Block, args: &[Value]) -> Inst {
        self.build(
            InstructionData::Jump {
                opcode: Opcode::Jump,
                destination: BlockCall::new(destination, args),
            },
            None,
        )
        .0
    }

    /// Branch to `block_then` if `c` is non-zero, else to `block_else`.
    pub fn brif(
        self,
        c: Value,
        block_then: Block,
        args_then: &[Value],
        block_else: Block,
        args_else: &[Value],
    ) -> Inst {
        debug_assert!(!self.value_type(c).is_vector());
        self.build(
            InstructionData::Brif {
                opcode: Opcode::Brif,
                arg: c,
                blocks: [
                    BlockCall::new(block_then, args_then),
                    BlockCall::new(block_else, args_else),
                ],
            },
            None,
        )
        .0
    }

    /// Abort execution with `code`.
    pub fn trap(self, code: TrapCode) -> Inst {
        self.build(
            InstructionData::Trap {
                opcode: Opcode::Trap,
                code,
            },
            None,
        )
        .0
    }

    /// Return from the function.
    pub fn return_(self, args: &[Value]) -> Inst {
        self.build(
            InstructionData::MultiAry {
                opcode: Opcode::Return,
                args: args.iter().copied().collect(),
            },
            None,
        )
        .0
    }
}
