//! This module contains the bulk of the interesting code performing the
//! translation between WebAssembly numeric operators and Kestrel IR.
//!
//! The translation is done in one pass, opcode by opcode: each operator pops
//! its arguments off the value stack (top of stack is the right-hand
//! operand) and pushes its result. WebAssembly pins down every numeric edge
//! case, while the IR's native forms leave several of them undefined, so the
//! translator inserts the guards itself:
//!
//! - shift counts are masked to the operand width before the native shift;
//! - division and remainder are preceded by conditional branches into shared,
//!   cold trap blocks;
//! - `rem_s` branches around the native `srem` for the `INT_MIN % -1` case
//!   and joins a constant `0` through a block parameter;
//! - scalar float `min`/`max` and the rounding operators go out of line to
//!   runtime routines with the exact NaN and tie-breaking rules.
//!
//! There is a bit of an impedance mismatch in the v128 operators: wasm gives
//! them a single opaque 128-bit type, while the IR types every vector value
//! with a lane shape. Values are pushed with whatever shape their producer
//! had and re-typed with a (free) `bitcast` to the shape each consumer
//! implies, `I8X16` acting as the canonical shape for constants and
//! shuffles. Hence the `pop1_with_bitcast`/`pop2_with_bitcast` helpers and
//! `type_of` below.

use crate::operators::Operator;
use crate::state::FuncTranslationState;
use crate::{WasmError, WasmResult};
use kestrel_ir::condcodes::{FloatCC, IntCC};
use kestrel_ir::types::*;
use kestrel_ir::{Block, FpControl, FunctionBuilder, LibCall, TrapCode, Value};

/// Translates a wasm numeric operator into Kestrel IR instructions.
pub fn translate_operator(
    op: &Operator,
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
) -> WasmResult<()> {
    log::trace!("translating {op:?}");
    match op {
        /****************************** Nullary Operators ************************************/
        Operator::I32Const { value } => state.push1(builder.ins().iconst(I32, i64::from(*value))),
        Operator::I64Const { value } => state.push1(builder.ins().iconst(I64, *value)),
        Operator::F32Const { value } => state.push1(builder.ins().f32const(*value)),
        Operator::F64Const { value } => state.push1(builder.ins().f64const(*value)),
        Operator::V128Const { value } => {
            // v128.const is typed as I8X16; consumers re-type it via bitcast.
            state.push1(builder.ins().vconst(I8X16, *value))
        }
        /******************************* Unary Operators *************************************/
        Operator::I32Clz | Operator::I64Clz => {
            let arg = state.pop1();
            state.push1(builder.ins().clz(arg));
        }
        Operator::I32Ctz | Operator::I64Ctz => {
            let arg = state.pop1();
            state.push1(builder.ins().ctz(arg));
        }
        Operator::I32Popcnt | Operator::I64Popcnt => {
            let arg = state.pop1();
            state.push1(builder.ins().popcnt(arg));
        }
        Operator::I32Eqz | Operator::I64Eqz => {
            let arg = state.pop1();
            let ty = builder.func.dfg.value_type(arg);
            let zero = builder.ins().iconst(ty, 0);
            let val = builder.ins().icmp(IntCC::Equal, arg, zero);
            state.push1(builder.ins().uextend(I32, val));
        }
        Operator::F32Abs | Operator::F64Abs => {
            let arg = state.pop1();
            state.push1(builder.ins().fabs(arg));
        }
        Operator::F32Neg | Operator::F64Neg => {
            let arg = state.pop1();
            state.push1(builder.ins().fneg(arg));
        }
        Operator::F32Sqrt | Operator::F64Sqrt => {
            let arg = state.pop1();
            state.push1(builder.ins().sqrt_constrained(arg, FpControl::default()));
        }
        // These don't match the IR's native semantics exactly, so call out to
        // runtime implementations.
        Operator::F32Ceil | Operator::F64Ceil => {
            translate_float_intrinsic_unary(LibCall::F32Ceil, LibCall::F64Ceil, builder, state);
        }
        Operator::F32Floor | Operator::F64Floor => {
            translate_float_intrinsic_unary(LibCall::F32Floor, LibCall::F64Floor, builder, state);
        }
        Operator::F32Trunc | Operator::F64Trunc => {
            translate_float_intrinsic_unary(LibCall::F32Trunc, LibCall::F64Trunc, builder, state);
        }
        Operator::F32Nearest | Operator::F64Nearest => {
            translate_float_intrinsic_unary(
                LibCall::F32Nearest,
                LibCall::F64Nearest,
                builder,
                state,
            );
        }
        /****************************** Binary Operators ************************************/
        Operator::I32Add | Operator::I64Add => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().iadd(arg1, arg2));
        }
        Operator::I32Sub | Operator::I64Sub => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().isub(arg1, arg2));
        }
        Operator::I32Mul | Operator::I64Mul => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().imul(arg1, arg2));
        }
        Operator::I32And | Operator::I64And => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().band(arg1, arg2));
        }
        Operator::I32Or | Operator::I64Or => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().bor(arg1, arg2));
        }
        Operator::I32Xor | Operator::I64Xor => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().bxor(arg1, arg2));
        }
        // The native shifts are undefined for counts >= the operand width
        // where wasm wraps them, so explicitly mask the count.
        Operator::I32Shl | Operator::I64Shl => {
            let (arg1, arg2) = state.pop2();
            let count = shift_count_mask(builder, arg2);
            state.push1(builder.ins().ishl(arg1, count));
        }
        Operator::I32ShrS | Operator::I64ShrS => {
            let (arg1, arg2) = state.pop2();
            let count = shift_count_mask(builder, arg2);
            state.push1(builder.ins().sshr(arg1, count));
        }
        Operator::I32ShrU | Operator::I64ShrU => {
            let (arg1, arg2) = state.pop2();
            let count = shift_count_mask(builder, arg2);
            state.push1(builder.ins().ushr(arg1, count));
        }
        Operator::I32Rotl | Operator::I64Rotl => {
            let (arg1, arg2) = state.pop2();
            let val = translate_rotl(builder, arg1, arg2);
            state.push1(val);
        }
        Operator::I32Rotr | Operator::I64Rotr => {
            let (arg1, arg2) = state.pop2();
            let val = translate_rotr(builder, arg1, arg2);
            state.push1(val);
        }
        // Divides insert their trap checks up front to keep the undefined
        // cases out of the native instructions entirely.
        Operator::I32DivS | Operator::I64DivS => {
            let (arg1, arg2) = state.pop2();
            trap_divide_by_zero_or_integer_overflow(builder, state, arg1, arg2);
            state.push1(builder.ins().sdiv(arg1, arg2));
        }
        Operator::I32DivU | Operator::I64DivU => {
            let (arg1, arg2) = state.pop2();
            trap_divide_by_zero(builder, state, arg2);
            state.push1(builder.ins().udiv(arg1, arg2));
        }
        Operator::I32RemS | Operator::I64RemS => {
            let (arg1, arg2) = state.pop2();
            let val = translate_srem(builder, state, arg1, arg2);
            state.push1(val);
        }
        Operator::I32RemU | Operator::I64RemU => {
            let (arg1, arg2) = state.pop2();
            trap_divide_by_zero(builder, state, arg2);
            state.push1(builder.ins().urem(arg1, arg2));
        }
        Operator::F32Add | Operator::F64Add => {
            let (arg1, arg2) = state.pop2();
            state.push1(
                builder
                    .ins()
                    .fadd_constrained(arg1, arg2, FpControl::default()),
            );
        }
        Operator::F32Sub | Operator::F64Sub => {
            let (arg1, arg2) = state.pop2();
            state.push1(
                builder
                    .ins()
                    .fsub_constrained(arg1, arg2, FpControl::default()),
            );
        }
        Operator::F32Mul | Operator::F64Mul => {
            let (arg1, arg2) = state.pop2();
            state.push1(
                builder
                    .ins()
                    .fmul_constrained(arg1, arg2, FpControl::default()),
            );
        }
        Operator::F32Div | Operator::F64Div => {
            let (arg1, arg2) = state.pop2();
            state.push1(
                builder
                    .ins()
                    .fdiv_constrained(arg1, arg2, FpControl::default()),
            );
        }
        Operator::F32Copysign | Operator::F64Copysign => {
            let (arg1, arg2) = state.pop2();
            state.push1(builder.ins().fcopysign(arg1, arg2));
        }
        // Wasm's NaN propagation and tie-breaking rules for min/max don't
        // match the native forms on all targets; one out-of-line
        // implementation keeps them right.
        Operator::F32Min | Operator::F64Min => {
            translate_float_intrinsic_binary(LibCall::F32Min, LibCall::F64Min, builder, state);
        }
        Operator::F32Max | Operator::F64Max => {
            translate_float_intrinsic_binary(LibCall::F32Max, LibCall::F64Max, builder, state);
        }
        /**************************** Comparison Operators **********************************/
        Operator::I32Eq | Operator::I64Eq => translate_icmp(IntCC::Equal, builder, state),
        Operator::I32Ne | Operator::I64Ne => translate_icmp(IntCC::NotEqual, builder, state),
        Operator::I32LtS | Operator::I64LtS => {
            translate_icmp(IntCC::SignedLessThan, builder, state)
        }
        Operator::I32LtU | Operator::I64LtU => {
            translate_icmp(IntCC::UnsignedLessThan, builder, state)
        }
        Operator::I32GtS | Operator::I64GtS => {
            translate_icmp(IntCC::SignedGreaterThan, builder, state)
        }
        Operator::I32GtU | Operator::I64GtU => {
            translate_icmp(IntCC::UnsignedGreaterThan, builder, state)
        }
        Operator::I32LeS | Operator::I64LeS => {
            translate_icmp(IntCC::SignedLessThanOrEqual, builder, state)
        }
        Operator::I32LeU | Operator::I64LeU => {
            translate_icmp(IntCC::UnsignedLessThanOrEqual, builder, state)
        }
        Operator::I32GeS | Operator::I64GeS => {
            translate_icmp(IntCC::SignedGreaterThanOrEqual, builder, state)
        }
        Operator::I32GeU | Operator::I64GeU => {
            translate_icmp(IntCC::UnsignedGreaterThanOrEqual, builder, state)
        }
        Operator::F32Eq | Operator::F64Eq => translate_fcmp(FloatCC::Equal, builder, state),
        Operator::F32Ne | Operator::F64Ne => translate_fcmp(FloatCC::NotEqual, builder, state),
        Operator::F32Lt | Operator::F64Lt => translate_fcmp(FloatCC::LessThan, builder, state),
        Operator::F32Gt | Operator::F64Gt => translate_fcmp(FloatCC::GreaterThan, builder, state),
        Operator::F32Le | Operator::F64Le => {
            translate_fcmp(FloatCC::LessThanOrEqual, builder, state)
        }
        Operator::F32Ge | Operator::F64Ge => {
            translate_fcmp(FloatCC::GreaterThanOrEqual, builder, state)
        }
        /*************************** Vector constructors *************************************/
        Operator::I8x16Splat | Operator::I16x8Splat => {
            let reduced = builder.ins().ireduce(type_of(op).lane_type(), state.pop1());
            let splatted = builder.ins().splat(type_of(op), reduced);
            state.push1(splatted);
        }
        Operator::I32x4Splat
        | Operator::I64x2Splat
        | Operator::F32x4Splat
        | Operator::F64x2Splat => {
            let splatted = builder.ins().splat(type_of(op), state.pop1());
            state.push1(splatted);
        }
        /******************************** Lane access ****************************************/
        Operator::I8x16ExtractLaneS { lane } | Operator::I16x8ExtractLaneS { lane } => {
            check_lane_index(*lane, type_of(op))?;
            let vector = pop1_with_bitcast(state, type_of(op), builder);
            let extracted = builder.ins().extractlane(vector, *lane);
            state.push1(builder.ins().sextend(I32, extracted));
        }
        Operator::I8x16ExtractLaneU { lane } | Operator::I16x8ExtractLaneU { lane } => {
            check_lane_index(*lane, type_of(op))?;
            let vector = pop1_with_bitcast(state, type_of(op), builder);
            let extracted = builder.ins().extractlane(vector, *lane);
            state.push1(builder.ins().uextend(I32, extracted));
        }
        Operator::I32x4ExtractLane { lane }
        | Operator::I64x2ExtractLane { lane }
        | Operator::F32x4ExtractLane { lane }
        | Operator::F64x2ExtractLane { lane } => {
            check_lane_index(*lane, type_of(op))?;
            let vector = pop1_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().extractlane(vector, *lane));
        }
        Operator::I8x16ReplaceLane { lane } | Operator::I16x8ReplaceLane { lane } => {
            check_lane_index(*lane, type_of(op))?;
            let (vector, replacement) = state.pop2();
            let ty = type_of(op);
            let reduced = builder.ins().ireduce(ty.lane_type(), replacement);
            let vector = optionally_bitcast_vector(vector, ty, builder);
            state.push1(builder.ins().insertlane(vector, reduced, *lane));
        }
        Operator::I32x4ReplaceLane { lane }
        | Operator::I64x2ReplaceLane { lane }
        | Operator::F32x4ReplaceLane { lane }
        | Operator::F64x2ReplaceLane { lane } => {
            check_lane_index(*lane, type_of(op))?;
            let (vector, replacement) = state.pop2();
            let vector = optionally_bitcast_vector(vector, type_of(op), builder);
            state.push1(builder.ins().insertlane(vector, replacement, *lane));
        }
        Operator::V8x16Shuffle { lanes } => {
            if let Some(&lane) = lanes.iter().find(|&&l| l >= 32) {
                return Err(WasmError::InvalidWebAssembly {
                    message: format!("shuffle index {lane} does not address the 32 source bytes"),
                });
            }
            let (a, b) = pop2_with_bitcast(state, I8X16, builder);
            state.push1(builder.ins().shuffle(a, b, *lanes));
        }
        /*********************** Lanewise integer arithmetic *********************************/
        Operator::I8x16Add | Operator::I16x8Add | Operator::I32x4Add | Operator::I64x2Add => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().iadd(a, b));
        }
        Operator::I8x16Sub | Operator::I16x8Sub | Operator::I32x4Sub | Operator::I64x2Sub => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().isub(a, b));
        }
        Operator::I8x16Mul | Operator::I16x8Mul | Operator::I32x4Mul => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().imul(a, b));
        }
        Operator::I8x16Neg | Operator::I16x8Neg | Operator::I32x4Neg | Operator::I64x2Neg => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            let zero = builder.ins().vconst(type_of(op), [0; 16]);
            state.push1(builder.ins().isub(zero, a));
        }
        Operator::I8x16AddSaturateS | Operator::I16x8AddSaturateS => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().sadd_sat(a, b));
        }
        Operator::I8x16SubSaturateS | Operator::I16x8SubSaturateS => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().ssub_sat(a, b));
        }
        Operator::I8x16AddSaturateU | Operator::I16x8AddSaturateU => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            let val = translate_uadd_saturated(builder, a, b);
            state.push1(val);
        }
        Operator::I8x16SubSaturateU | Operator::I16x8SubSaturateU => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            let val = translate_usub_saturated(builder, a, b);
            state.push1(val);
        }
        Operator::I8x16Shl | Operator::I16x8Shl | Operator::I32x4Shl | Operator::I64x2Shl => {
            let (a, count) = state.pop2();
            let ty = type_of(op);
            let a = optionally_bitcast_vector(a, ty, builder);
            let count = vector_shift_count(builder, ty, count);
            state.push1(builder.ins().ishl(a, count));
        }
        Operator::I8x16ShrS | Operator::I16x8ShrS | Operator::I32x4ShrS | Operator::I64x2ShrS => {
            let (a, count) = state.pop2();
            let ty = type_of(op);
            let a = optionally_bitcast_vector(a, ty, builder);
            let count = vector_shift_count(builder, ty, count);
            state.push1(builder.ins().sshr(a, count));
        }
        Operator::I8x16ShrU | Operator::I16x8ShrU | Operator::I32x4ShrU | Operator::I64x2ShrU => {
            let (a, count) = state.pop2();
            let ty = type_of(op);
            let a = optionally_bitcast_vector(a, ty, builder);
            let count = vector_shift_count(builder, ty, count);
            state.push1(builder.ins().ushr(a, count));
        }
        /********************** Lanewise integer comparisons *********************************/
        Operator::I8x16Eq | Operator::I16x8Eq | Operator::I32x4Eq => {
            translate_vector_icmp(IntCC::Equal, type_of(op), builder, state)
        }
        Operator::I8x16Ne | Operator::I16x8Ne | Operator::I32x4Ne => {
            translate_vector_icmp(IntCC::NotEqual, type_of(op), builder, state)
        }
        Operator::I8x16LtS | Operator::I16x8LtS | Operator::I32x4LtS => {
            translate_vector_icmp(IntCC::SignedLessThan, type_of(op), builder, state)
        }
        Operator::I8x16LtU | Operator::I16x8LtU | Operator::I32x4LtU => {
            translate_vector_icmp(IntCC::UnsignedLessThan, type_of(op), builder, state)
        }
        Operator::I8x16GtS | Operator::I16x8GtS | Operator::I32x4GtS => {
            translate_vector_icmp(IntCC::SignedGreaterThan, type_of(op), builder, state)
        }
        Operator::I8x16GtU | Operator::I16x8GtU | Operator::I32x4GtU => {
            translate_vector_icmp(IntCC::UnsignedGreaterThan, type_of(op), builder, state)
        }
        Operator::I8x16LeS | Operator::I16x8LeS | Operator::I32x4LeS => {
            translate_vector_icmp(IntCC::SignedLessThanOrEqual, type_of(op), builder, state)
        }
        Operator::I8x16LeU | Operator::I16x8LeU | Operator::I32x4LeU => {
            translate_vector_icmp(IntCC::UnsignedLessThanOrEqual, type_of(op), builder, state)
        }
        Operator::I8x16GeS | Operator::I16x8GeS | Operator::I32x4GeS => {
            translate_vector_icmp(IntCC::SignedGreaterThanOrEqual, type_of(op), builder, state)
        }
        Operator::I8x16GeU | Operator::I16x8GeU | Operator::I32x4GeU => {
            translate_vector_icmp(IntCC::UnsignedGreaterThanOrEqual, type_of(op), builder, state)
        }
        /************************** Boolean reductions ***************************************/
        Operator::I8x16AnyTrue
        | Operator::I16x8AnyTrue
        | Operator::I32x4AnyTrue
        | Operator::I64x2AnyTrue => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            let val = translate_any_true(builder, a);
            state.push1(val);
        }
        Operator::I8x16AllTrue
        | Operator::I16x8AllTrue
        | Operator::I32x4AllTrue
        | Operator::I64x2AllTrue => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            let val = translate_all_true(builder, a);
            state.push1(val);
        }
        /************************ v128 bitwise operators *************************************
         * These operate on the untyped I128X1 view so the operation is
         * independent of whatever lane interpretation the operands carry.
         *************************************************************************************/
        Operator::V128And => {
            let (a, b) = pop2_with_bitcast(state, I128X1, builder);
            state.push1(builder.ins().band(a, b));
        }
        Operator::V128Or => {
            let (a, b) = pop2_with_bitcast(state, I128X1, builder);
            state.push1(builder.ins().bor(a, b));
        }
        Operator::V128Xor => {
            let (a, b) = pop2_with_bitcast(state, I128X1, builder);
            state.push1(builder.ins().bxor(a, b));
        }
        Operator::V128Not => {
            let a = pop1_with_bitcast(state, I128X1, builder);
            state.push1(builder.ins().bnot(a));
        }
        Operator::V128Bitselect => {
            let (true_value, false_value, mask) = state.pop3();
            let true_value = optionally_bitcast_vector(true_value, I128X1, builder);
            let false_value = optionally_bitcast_vector(false_value, I128X1, builder);
            let mask = optionally_bitcast_vector(mask, I128X1, builder);
            let val = translate_bitselect(builder, mask, true_value, false_value);
            state.push1(val);
        }
        /************************ Lanewise float arithmetic **********************************/
        Operator::F32x4Add | Operator::F64x2Add => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fadd(a, b));
        }
        Operator::F32x4Sub | Operator::F64x2Sub => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fsub(a, b));
        }
        Operator::F32x4Mul | Operator::F64x2Mul => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fmul(a, b));
        }
        Operator::F32x4Div | Operator::F64x2Div => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fdiv(a, b));
        }
        // Lanewise min/max keep the platform-specified v128 NaN behavior of
        // x86 minps/maxps.
        Operator::F32x4Min | Operator::F64x2Min => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fmin_pseudo(a, b));
        }
        Operator::F32x4Max | Operator::F64x2Max => {
            let (a, b) = pop2_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fmax_pseudo(a, b));
        }
        Operator::F32x4Neg | Operator::F64x2Neg => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fneg(a));
        }
        Operator::F32x4Abs | Operator::F64x2Abs => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().fabs(a));
        }
        Operator::F32x4Sqrt | Operator::F64x2Sqrt => {
            let a = pop1_with_bitcast(state, type_of(op), builder);
            state.push1(builder.ins().sqrt(a));
        }
        /*********************** Lanewise float comparisons **********************************/
        Operator::F32x4Eq | Operator::F64x2Eq => {
            translate_vector_fcmp(FloatCC::Equal, type_of(op), builder, state)
        }
        Operator::F32x4Ne | Operator::F64x2Ne => {
            translate_vector_fcmp(FloatCC::NotEqual, type_of(op), builder, state)
        }
        Operator::F32x4Lt | Operator::F64x2Lt => {
            translate_vector_fcmp(FloatCC::LessThan, type_of(op), builder, state)
        }
        Operator::F32x4Gt | Operator::F64x2Gt => {
            translate_vector_fcmp(FloatCC::GreaterThan, type_of(op), builder, state)
        }
        Operator::F32x4Le | Operator::F64x2Le => {
            translate_vector_fcmp(FloatCC::LessThanOrEqual, type_of(op), builder, state)
        }
        Operator::F32x4Ge | Operator::F64x2Ge => {
            translate_vector_fcmp(FloatCC::GreaterThanOrEqual, type_of(op), builder, state)
        }
    }
    Ok(())
}

fn translate_icmp(cc: IntCC, builder: &mut FunctionBuilder, state: &mut FuncTranslationState) {
    let (arg1, arg2) = state.pop2();
    let val = builder.ins().icmp(cc, arg1, arg2);
    state.push1(builder.ins().uextend(I32, val));
}

fn translate_fcmp(cc: FloatCC, builder: &mut FunctionBuilder, state: &mut FuncTranslationState) {
    let (arg1, arg2) = state.pop2();
    let val = builder.ins().fcmp(cc, arg1, arg2);
    state.push1(builder.ins().uextend(I32, val));
}

fn translate_vector_icmp(
    cc: IntCC,
    needed_type: Type,
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
) {
    let (a, b) = pop2_with_bitcast(state, needed_type, builder);
    state.push1(builder.ins().icmp(cc, a, b));
}

fn translate_vector_fcmp(
    cc: FloatCC,
    needed_type: Type,
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
) {
    let (a, b) = pop2_with_bitcast(state, needed_type, builder);
    state.push1(builder.ins().fcmp(cc, a, b));
}

/// Mask a scalar shift count to the operand width. Wasm wraps oversized
/// counts; the mask also keeps the optimizer from exploiting the native
/// shift's undefined behavior.
fn shift_count_mask(builder: &mut FunctionBuilder, count: Value) -> Value {
    let ty = builder.func.dfg.value_type(count);
    let bits_minus_one = builder.ins().iconst(ty, i64::from(ty.bits() - 1));
    builder.ins().band(count, bits_minus_one)
}

/// Bring a scalar i32 shift count to the lane type, splat it, and mask every
/// lane by the lane width.
fn vector_shift_count(builder: &mut FunctionBuilder, ty: Type, count: Value) -> Value {
    let lane_ty = ty.lane_type();
    let count_ty = builder.func.dfg.value_type(count);
    let scalar = if lane_ty.bits() < count_ty.bits() {
        builder.ins().ireduce(lane_ty, count)
    } else if lane_ty.bits() > count_ty.bits() {
        builder.ins().uextend(lane_ty, count)
    } else {
        count
    };
    let splatted = builder.ins().splat(ty, scalar);
    let bits_minus_one = builder.ins().iconst(lane_ty, i64::from(ty.lane_bits() - 1));
    let mask = builder.ins().splat(ty, bits_minus_one);
    builder.ins().band(splatted, mask)
}

/// `rotl` as masked shifts: `(x << (c & (n-1))) | (x >> ((n - c) & (n-1)))`.
fn translate_rotl(builder: &mut FunctionBuilder, x: Value, c: Value) -> Value {
    let ty = builder.func.dfg.value_type(x);
    let width = builder.ins().iconst(ty, i64::from(ty.bits()));
    let width_minus_c = builder.ins().isub(width, c);
    let left_count = shift_count_mask(builder, c);
    let left = builder.ins().ishl(x, left_count);
    let right_count = shift_count_mask(builder, width_minus_c);
    let right = builder.ins().ushr(x, right_count);
    builder.ins().bor(left, right)
}

/// `rotr`, symmetric to [`translate_rotl`].
fn translate_rotr(builder: &mut FunctionBuilder, x: Value, c: Value) -> Value {
    let ty = builder.func.dfg.value_type(x);
    let width = builder.ins().iconst(ty, i64::from(ty.bits()));
    let width_minus_c = builder.ins().isub(width, c);
    let left_count = shift_count_mask(builder, width_minus_c);
    let left = builder.ins().ishl(x, left_count);
    let right_count = shift_count_mask(builder, c);
    let right = builder.ins().ushr(x, right_count);
    builder.ins().bor(left, right)
}

/// `rem_s` with the overflow bypass. Wasm defines `INT_MIN rem -1` as `0`,
/// but the native `srem` is undefined there, so branch around it and join
/// the constant zero through a block parameter.
fn translate_srem(
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
    dividend: Value,
    divisor: Value,
) -> Value {
    trap_divide_by_zero(builder, state, divisor);

    let ty = builder.func.dfg.value_type(dividend);
    let int_min = builder.ins().iconst(ty, int_min_value(ty));
    let minus_one = builder.ins().iconst(ty, -1);
    let dividend_ok = builder.ins().icmp(IntCC::NotEqual, dividend, int_min);
    let divisor_ok = builder.ins().icmp(IntCC::NotEqual, divisor, minus_one);
    let no_overflow = builder.ins().bor(dividend_ok, divisor_ok);

    let no_overflow_block = builder.create_block();
    let join = builder.create_block();
    let result = builder.append_block_param(join, ty);
    let zero = builder.ins().iconst(ty, 0);
    builder
        .ins()
        .brif(no_overflow, no_overflow_block, &[], join, &[zero]);

    builder.switch_to_block(no_overflow_block);
    let rem = builder.ins().srem(dividend, divisor);
    builder.ins().jump(join, &[rem]);

    builder.switch_to_block(join);
    result
}

/// Unsigned saturating addition: lanes that wrapped around clamp to all
/// ones, detected by `a > a + b`.
fn translate_uadd_saturated(builder: &mut FunctionBuilder, a: Value, b: Value) -> Value {
    let sum = builder.ins().iadd(a, b);
    let wrapped = builder.ins().icmp(IntCC::UnsignedGreaterThan, a, sum);
    builder.ins().bor(sum, wrapped)
}

/// Unsigned saturating subtraction: `max(a, b) - b`.
fn translate_usub_saturated(builder: &mut FunctionBuilder, a: Value, b: Value) -> Value {
    let a_greater = builder.ins().icmp(IntCC::UnsignedGreaterThan, a, b);
    let max = translate_bitselect(builder, a_greater, a, b);
    builder.ins().isub(max, b)
}

/// `(trueValue AND mask) OR (falseValue AND NOT mask)`.
fn translate_bitselect(
    builder: &mut FunctionBuilder,
    mask: Value,
    true_value: Value,
    false_value: Value,
) -> Value {
    let true_masked = builder.ins().band(true_value, mask);
    let not_mask = builder.ins().bnot(mask);
    let false_masked = builder.ins().band(false_value, not_mask);
    builder.ins().bor(true_masked, false_masked)
}

/// OR-reduce `(lane != 0)` across all lanes, zero-extended to i32.
fn translate_any_true(builder: &mut FunctionBuilder, vector: Value) -> Value {
    let val = translate_bool_reduction(builder, vector, |builder, acc, lane| {
        builder.ins().bor(acc, lane)
    });
    builder.ins().uextend(I32, val)
}

/// AND-reduce `(lane != 0)` across all lanes, zero-extended to i32.
fn translate_all_true(builder: &mut FunctionBuilder, vector: Value) -> Value {
    let val = translate_bool_reduction(builder, vector, |builder, acc, lane| {
        builder.ins().band(acc, lane)
    });
    builder.ins().uextend(I32, val)
}

fn translate_bool_reduction(
    builder: &mut FunctionBuilder,
    vector: Value,
    combine: impl Fn(&mut FunctionBuilder, Value, Value) -> Value,
) -> Value {
    let ty = builder.func.dfg.value_type(vector);
    let zero = builder.ins().iconst(ty.lane_type(), 0);
    let mut result = None;
    for lane in 0..ty.lane_count() as u8 {
        let scalar = builder.ins().extractlane(vector, lane);
        let lane_bool = builder.ins().icmp(IntCC::NotEqual, scalar, zero);
        result = Some(match result {
            Some(acc) => combine(builder, acc, lane_bool),
            None => lane_bool,
        });
    }
    result.expect("vectors have at least one lane")
}

/// Emit a call to the out-of-line runtime routine `libcall`.
fn emit_runtime_intrinsic(
    builder: &mut FunctionBuilder,
    libcall: LibCall,
    args: &[Value],
) -> Value {
    let func_ref = builder.func.import_intrinsic(libcall);
    let call = builder.ins().call(func_ref, args);
    builder.func.dfg.first_result(call)
}

fn translate_float_intrinsic_unary(
    f32_call: LibCall,
    f64_call: LibCall,
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
) {
    let arg = state.pop1();
    let libcall = if builder.func.dfg.value_type(arg) == F32 {
        f32_call
    } else {
        f64_call
    };
    let val = emit_runtime_intrinsic(builder, libcall, &[arg]);
    state.push1(val);
}

fn translate_float_intrinsic_binary(
    f32_call: LibCall,
    f64_call: LibCall,
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
) {
    let (arg1, arg2) = state.pop2();
    let libcall = if builder.func.dfg.value_type(arg1) == F32 {
        f32_call
    } else {
        f64_call
    };
    let val = emit_runtime_intrinsic(builder, libcall, &[arg1, arg2]);
    state.push1(val);
}

/// Get or create the shared trap block for `code` in the current function.
/// The block holds only the trap itself and is marked cold so backends lay
/// it out off the hot path.
fn trap_block(
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
    code: TrapCode,
) -> Block {
    if let Some(&block) = state.trap_blocks.get(&code) {
        return block;
    }
    let current = builder
        .current_block()
        .expect("trap edges are emitted from within a block");
    let block = builder.create_block();
    builder.set_cold_block(block);
    builder.switch_to_block(block);
    builder.ins().trap(code);
    builder.switch_to_block(current);
    state.trap_blocks.insert(code, block);
    block
}

/// Branch into the `code` trap stub when `cond` is non-zero. The
/// continuation becomes the insertion point; the trap edge is the
/// likely-not-taken side.
fn trap_if(
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
    cond: Value,
    code: TrapCode,
) {
    let trap = trap_block(builder, state, code);
    let continuation = builder.create_block();
    builder.ins().brif(cond, trap, &[], continuation, &[]);
    builder.switch_to_block(continuation);
}

fn trap_divide_by_zero(
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
    divisor: Value,
) {
    let ty = builder.func.dfg.value_type(divisor);
    let zero = builder.ins().iconst(ty, 0);
    let is_zero = builder.ins().icmp(IntCC::Equal, divisor, zero);
    trap_if(builder, state, is_zero, TrapCode::IntegerDivisionByZero);
}

fn trap_divide_by_zero_or_integer_overflow(
    builder: &mut FunctionBuilder,
    state: &mut FuncTranslationState,
    dividend: Value,
    divisor: Value,
) {
    trap_divide_by_zero(builder, state, divisor);

    let ty = builder.func.dfg.value_type(dividend);
    let int_min = builder.ins().iconst(ty, int_min_value(ty));
    let minus_one = builder.ins().iconst(ty, -1);
    let min_dividend = builder.ins().icmp(IntCC::Equal, dividend, int_min);
    let minus_one_divisor = builder.ins().icmp(IntCC::Equal, divisor, minus_one);
    let overflow = builder.ins().band(min_dividend, minus_one_divisor);
    trap_if(builder, state, overflow, TrapCode::IntegerOverflow);
}

fn int_min_value(ty: Type) -> i64 {
    match ty {
        I32 => i64::from(i32::MIN),
        I64 => i64::MIN,
        _ => panic!("no INT_MIN for {ty}"),
    }
}

/// Lane immediates are range-checked by validation, but re-check here so a
/// malformed index surfaces as an error instead of a corrupt vector
/// operation.
fn check_lane_index(lane: u8, ty: Type) -> WasmResult<()> {
    if u32::from(lane) < ty.lane_count() {
        Ok(())
    } else {
        Err(WasmError::InvalidWebAssembly {
            message: format!("lane index {lane} is out of range for {ty}"),
        })
    }
}

/// Re-type a vector value if its current type differs from `needed_type`.
/// The bitcast never changes bits; it only restores the lane interpretation
/// an operator implies.
pub(crate) fn optionally_bitcast_vector(
    value: Value,
    needed_type: Type,
    builder: &mut FunctionBuilder,
) -> Value {
    if builder.func.dfg.value_type(value) != needed_type {
        builder.ins().bitcast(needed_type, value)
    } else {
        value
    }
}

/// A helper for popping and bitcasting a single value; since v128 values can
/// lose their type by using the opaque stack type we must re-type the value
/// to avoid IR typing issues.
fn pop1_with_bitcast(
    state: &mut FuncTranslationState,
    needed_type: Type,
    builder: &mut FunctionBuilder,
) -> Value {
    optionally_bitcast_vector(state.pop1(), needed_type, builder)
}

/// A helper for popping and bitcasting two values, as `pop1_with_bitcast`.
fn pop2_with_bitcast(
    state: &mut FuncTranslationState,
    needed_type: Type,
    builder: &mut FunctionBuilder,
) -> (Value, Value) {
    let (a, b) = state.pop2();
    let bitcast_a = optionally_bitcast_vector(a, needed_type, builder);
    let bitcast_b = optionally_bitcast_vector(b, needed_type, builder);
    (bitcast_a, bitcast_b)
}

/// The vector type an operator's lane interpretation implies; operands are
/// bitcast to this before the operation is emitted.
fn type_of(operator: &Operator) -> Type {
    match operator {
        Operator::I8x16Splat
        | Operator::I8x16ExtractLaneS { .. }
        | Operator::I8x16ExtractLaneU { .. }
        | Operator::I8x16ReplaceLane { .. }
        | Operator::I8x16Eq
        | Operator::I8x16Ne
        | Operator::I8x16LtS
        | Operator::I8x16LtU
        | Operator::I8x16GtS
        | Operator::I8x16GtU
        | Operator::I8x16LeS
        | Operator::I8x16LeU
        | Operator::I8x16GeS
        | Operator::I8x16GeU
        | Operator::I8x16Neg
        | Operator::I8x16AnyTrue
        | Operator::I8x16AllTrue
        | Operator::I8x16Shl
        | Operator::I8x16ShrS
        | Operator::I8x16ShrU
        | Operator::I8x16Add
        | Operator::I8x16AddSaturateS
        | Operator::I8x16AddSaturateU
        | Operator::I8x16Sub
        | Operator::I8x16SubSaturateS
        | Operator::I8x16SubSaturateU
        | Operator::I8x16Mul => I8X16,

        Operator::I16x8Splat
        | Operator::I16x8ExtractLaneS { .. }
        | Operator::I16x8ExtractLaneU { .. }
        | Operator::I16x8ReplaceLane { .. }
        | Operator::I16x8Eq
        | Operator::I16x8Ne
        | Operator::I16x8LtS
        | Operator::I16x8LtU
        | Operator::I16x8GtS
        | Operator::I16x8GtU
        | Operator::I16x8LeS
        | Operator::I16x8LeU
        | Operator::I16x8GeS
        | Operator::I16x8GeU
        | Operator::I16x8Neg
        | Operator::I16x8AnyTrue
        | Operator::I16x8AllTrue
        | Operator::I16x8Shl
        | Operator::I16x8ShrS
        | Operator::I16x8ShrU
        | Operator::I16x8Add
        | Operator::I16x8AddSaturateS
        | Operator::I16x8AddSaturateU
        | Operator::I16x8Sub
        | Operator::I16x8SubSaturateS
        | Operator::I16x8SubSaturateU
        | Operator::I16x8Mul => I16X8,

        Operator::I32x4Splat
        | Operator::I32x4ExtractLane { .. }
        | Operator::I32x4ReplaceLane { .. }
        | Operator::I32x4Eq
        | Operator::I32x4Ne
        | Operator::I32x4LtS
        | Operator::I32x4LtU
        | Operator::I32x4GtS
        | Operator::I32x4GtU
        | Operator::I32x4LeS
        | Operator::I32x4LeU
        | Operator::I32x4GeS
        | Operator::I32x4GeU
        | Operator::I32x4Neg
        | Operator::I32x4AnyTrue
        | Operator::I32x4AllTrue
        | Operator::I32x4Shl
        | Operator::I32x4ShrS
        | Operator::I32x4ShrU
        | Operator::I32x4Add
        | Operator::I32x4Sub
        | Operator::I32x4Mul => I32X4,

        Operator::I64x2Splat
        | Operator::I64x2ExtractLane { .. }
        | Operator::I64x2ReplaceLane { .. }
        | Operator::I64x2Neg
        | Operator::I64x2AnyTrue
        | Operator::I64x2AllTrue
        | Operator::I64x2Shl
        | Operator::I64x2ShrS
        | Operator::I64x2ShrU
        | Operator::I64x2Add
        | Operator::I64x2Sub => I64X2,

        Operator::F32x4Splat
        | Operator::F32x4ExtractLane { .. }
        | Operator::F32x4ReplaceLane { .. }
        | Operator::F32x4Eq
        | Operator::F32x4Ne
        | Operator::F32x4Lt
        | Operator::F32x4Gt
        | Operator::F32x4Le
        | Operator::F32x4Ge
        | Operator::F32x4Abs
        | Operator::F32x4Neg
        | Operator::F32x4Sqrt
        | Operator::F32x4Add
        | Operator::F32x4Sub
        | Operator::F32x4Mul
        | Operator::F32x4Div
        | Operator::F32x4Min
        | Operator::F32x4Max => F32X4,

        Operator::F64x2Splat
        | Operator::F64x2ExtractLane { .. }
        | Operator::F64x2ReplaceLane { .. }
        | Operator::F64x2Eq
        | Operator::F64x2Ne
        | Operator::F64x2Lt
        | Operator::F64x2Gt
        | Operator::F64x2Le
        | Operator::F64x2Ge
        | Operator::F64x2Abs
        | Operator::F64x2Neg
        | Operator::F64x2Sqrt
        | Operator::F64x2Add
        | Operator::F64x2Sub
        | Operator::F64x2Mul
        | Operator::F64x2Div
        | Operator::F64x2Min
        | Operator::F64x2Max => F64X2,

        Operator::V128And
        | Operator::V128Or
        | Operator::V128Xor
        | Operator::V128Not
        | Operator::V128Bitselect => I128X1,

        _ => unimplemented!(
            "only vector operators have a lane interpretation; {operator:?} does not"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_ir::immediates::V128Imm;
    use kestrel_ir::{Function, Opcode, Signature};

    fn translate(params: Vec<Type>, ops: &[Operator]) -> Function {
        let mut func = Function::with_name_signature("test", Signature::new(params, vec![]));
        let mut builder = FunctionBuilder::new(&mut func);
        let mut state = FuncTranslationState::new();
        let entry = builder.create_block();
        for ty in builder.func.signature.params.clone() {
            let param = builder.append_block_param(entry, ty);
            state.push1(param);
        }
        builder.switch_to_block(entry);
        for op in ops {
            translate_operator(op, &mut builder, &mut state).unwrap();
        }
        func
    }

    fn opcodes(func: &Function) -> Vec<Opcode> {
        func.blocks()
            .flat_map(|block| func.block_insts(block).iter())
            .map(|&inst| func.dfg[inst].opcode())
            .collect()
    }

    #[test]
    fn shifts_mask_their_count() {
        let func = translate(vec![I32, I32], &[Operator::I32Shl]);
        let ops = opcodes(&func);
        assert!(ops.contains(&Opcode::Band));
        assert!(ops.contains(&Opcode::Ishl));
    }

    #[test]
    fn srem_emits_the_overflow_bypass() {
        let func = translate(vec![I32, I32], &[Operator::I32RemS]);
        // Entry, divide-by-zero trap + continuation, no-overflow block, join.
        assert_eq!(func.blocks().count(), 5);
        let join = func
            .blocks()
            .find(|&b| !func.block_params(b).is_empty() && Some(b) != func.entry_block())
            .expect("srem joins through a block parameter");
        assert_eq!(func.block_params(join).len(), 1);
        assert!(opcodes(&func).contains(&Opcode::Srem));
    }

    #[test]
    fn division_trap_blocks_are_shared_and_cold() {
        let func = translate(
            vec![I32, I32, I32],
            &[Operator::I32DivU, Operator::I32DivU],
        );
        let trap_blocks: Vec<_> = func
            .blocks()
            .filter(|&b| {
                func.block_insts(b)
                    .iter()
                    .any(|&i| func.dfg[i].opcode() == Opcode::Trap)
            })
            .collect();
        // Both divisions guard through the same stub.
        assert_eq!(trap_blocks.len(), 1);
        assert!(func.is_block_cold(trap_blocks[0]));
    }

    #[test]
    fn scalar_min_goes_out_of_line() {
        let func = translate(vec![F32, F32], &[Operator::F32Min]);
        assert!(opcodes(&func).contains(&Opcode::Call));
    }

    #[test]
    fn out_of_range_lane_immediates_are_rejected() {
        let mut func = Function::with_name_signature("test", Signature::new(vec![], vec![]));
        let mut builder = FunctionBuilder::new(&mut func);
        let mut state = FuncTranslationState::new();
        let entry = builder.create_block();
        builder.switch_to_block(entry);

        let vector = Operator::V128Const {
            value: V128Imm([0; 16]),
        };
        translate_operator(&vector, &mut builder, &mut state).unwrap();
        let err = translate_operator(
            &Operator::I8x16ExtractLaneS { lane: 16 },
            &mut builder,
            &mut state,
        );
        assert!(matches!(err, Err(WasmError::InvalidWebAssembly { .. })));

        translate_operator(&vector, &mut builder, &mut state).unwrap();
        let mut lanes = [0u8; 16];
        lanes[5] = 32;
        let err = translate_operator(
            &Operator::V8x16Shuffle { lanes },
            &mut builder,
            &mut state,
        );
        assert!(matches!(err, Err(WasmError::InvalidWebAssembly { .. })));
    }

    #[test]
    fn v128_bitwise_uses_the_untyped_view() {
        let func = translate(vec![I8X16, I8X16], &[Operator::V128And]);
        let band = func
            .blocks()
            .flat_map(|b| func.block_insts(b).iter())
            .find(|&&i| func.dfg[i].opcode() == Opcode::Band)
            .copied()
            .expect("v128.and emits a band");
        let result = func.dfg.first_result(band);
        assert_eq!(func.dfg.value_type(result), I128X1);
    }
}
