//! A reference interpreter for the IR.
//!
//! This exists so tests can check the *semantics* of emitted code instead of
//! just its shape. Points where the IR leaves behavior undefined (shift
//! counts at or above the lane width, `srem` overflow, division by zero) are
//! hard asserts here: a producer that fails to neutralize them fails its
//! tests loudly instead of silently producing some value.

use crate::entities::{Block, Value};
use crate::function::Function;
use crate::instructions::{BlockCall, InstructionData, Opcode, Rounding};
use crate::libcall::LibCall;
use crate::trapcode::TrapCode;
use crate::types::Type;
use smallvec::SmallVec;

/// A concrete value flowing through the interpreter. Vector values are
/// carried as little-endian bytes; their lane interpretation comes from the
/// type of the SSA value they are bound to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataValue {
    /// An 8-bit integer.
    I8(i8),
    /// A 16-bit integer.
    I16(i16),
    /// A 32-bit integer.
    I32(i32),
    /// A 64-bit integer.
    I64(i64),
    /// A single-precision float.
    F32(f32),
    /// A double-precision float.
    F64(f64),
    /// 128 bits of vector data.
    V128([u8; 16]),
}

impl DataValue {
    fn bits64(self) -> u64 {
        match self {
            DataValue::I8(x) => x as u8 as u64,
            DataValue::I16(x) => x as u16 as u64,
            DataValue::I32(x) => x as u32 as u64,
            DataValue::I64(x) => x as u64,
            DataValue::F32(x) => x.to_bits() as u64,
            DataValue::F64(x) => x.to_bits(),
            DataValue::V128(_) => panic!("scalar use of a vector value"),
        }
    }

    fn bits128(self) -> u128 {
        match self {
            DataValue::V128(bytes) => u128::from_le_bytes(bytes),
            other => other.bits64() as u128,
        }
    }

    fn v128(self) -> [u8; 16] {
        match self {
            DataValue::V128(bytes) => bytes,
            other => panic!("vector use of scalar value {other:?}"),
        }
    }
}

/// The result of running a function: its return values, or the trap it hit.
pub type RunResult = Result<SmallVec<[DataValue; 1]>, TrapCode>;

/// Execute `func` with `args` bound to the entry block's parameters.
///
/// `intrinsics` resolves `call` instructions to out-of-line runtime
/// routines.
pub fn run(
    func: &Function,
    args: &[DataValue],
    intrinsics: &dyn Fn(LibCall, &[DataValue]) -> DataValue,
) -> RunResult {
    let entry = func.entry_block().expect("function has no entry block");
    assert_eq!(
        func.block_params(entry).len(),
        args.len(),
        "entry block arity mismatch"
    );

    let mut env: Vec<Option<DataValue>> = vec![None; func.dfg.num_values()];
    for (&param, &arg) in func.block_params(entry).iter().zip(args) {
        env[param.index()] = Some(arg);
    }

    let mut block = entry;
    'blocks: loop {
        for &inst in func.block_insts(block) {
            let data = &func.dfg[inst];
            match data {
                InstructionData::Jump { destination, .. } => {
                    block = branch(func, &mut env, destination);
                    continue 'blocks;
                }
                InstructionData::Brif { arg, blocks, .. } => {
                    let taken = if use_value(&env, *arg).bits64() != 0 {
                        &blocks[0]
                    } else {
                        &blocks[1]
                    };
                    block = branch(func, &mut env, taken);
                    continue 'blocks;
                }
                InstructionData::Trap { code, .. } => return Err(*code),
                InstructionData::MultiAry {
                    opcode: Opcode::Return,
                    args,
                } => {
                    return Ok(args.iter().map(|&v| use_value(&env, v)).collect());
                }
                _ => {
                    let value = func.dfg.first_result(inst);
                    let result = eval(func, &env, func.dfg.value_type(value), data, intrinsics);
                    env[value.index()] = Some(result);
                }
            }
        }
        panic!("{block} has no terminator");
    }
}

fn branch(func: &Function, env: &mut [Option<DataValue>], call: &BlockCall) -> Block {
    let args: SmallVec<[DataValue; 4]> = call.args.iter().map(|&v| use_value(env, v)).collect();
    let params = func.block_params(call.block);
    assert_eq!(params.len(), args.len(), "branch arity mismatch");
    for (&param, arg) in params.iter().zip(args) {
        env[param.index()] = Some(arg);
    }
    call.block
}

fn use_value(env: &[Option<DataValue>], value: Value) -> DataValue {
    env[value.index()].expect("use of a value before its definition")
}

fn eval(
    func: &Function,
    env: &[Option<DataValue>],
    result_ty: Type,
    data: &InstructionData,
    intrinsics: &dyn Fn(LibCall, &[DataValue]) -> DataValue,
) -> DataValue {
    use InstructionData::*;
    let dfg = &func.dfg;
    let val = |v: Value| use_value(env, v);
    let ty_of = |v: Value| dfg.value_type(v);

    match data {
        UnaryImm { imm, .. } => {
            scalar_from_bits(result_ty, imm.bits() as u64 & mask(result_ty.bits()))
        }
        UnaryIeee32 { imm, .. } => DataValue::F32(imm.as_f32()),
        UnaryIeee64 { imm, .. } => DataValue::F64(imm.as_f64()),
        UnaryConst { imm, .. } => DataValue::V128(imm.0),
        Unary { opcode, arg } => {
            let a = val(*arg);
            let aty = ty_of(*arg);
            match opcode {
                Opcode::Bnot => bitwise_unary(aty, a, |x| !x),
                Opcode::Clz => int_unary(aty, a, |x, w| {
                    if x == 0 {
                        w as u64
                    } else {
                        (x.leading_zeros() - (64 - w)) as u64
                    }
                }),
                Opcode::Ctz => int_unary(aty, a, |x, w| {
                    if x == 0 {
                        w as u64
                    } else {
                        x.trailing_zeros() as u64
                    }
                }),
                Opcode::Popcnt => int_unary(aty, a, |x, _| x.count_ones() as u64),
                Opcode::Fneg => float_unary_bits(aty, a, |bits, w| bits ^ (1 << (w - 1))),
                Opcode::Fabs => float_unary_bits(aty, a, |bits, w| bits & !(1 << (w - 1))),
                Opcode::Sqrt => float_unary(aty, a, |x| x.sqrt(), |x| x.sqrt()),
                Opcode::Uextend => scalar_from_bits(result_ty, a.bits64()),
                Opcode::Sextend => scalar_from_bits(
                    result_ty,
                    sext(a.bits64(), aty.bits()) as u64 & mask(result_ty.bits()),
                ),
                Opcode::Ireduce => {
                    scalar_from_bits(result_ty, a.bits64() & mask(result_ty.bits()))
                }
                Opcode::Bitcast => from_bits128(result_ty, a.bits128()),
                Opcode::Splat => {
                    let w = result_ty.lane_bits();
                    assert!(w <= 64, "cannot splat into {result_ty}");
                    let bits = a.bits64() & mask(w);
                    let mut out = [0u8; 16];
                    for i in 0..result_ty.lane_count() as usize {
                        set_lane(&mut out, w, i, bits);
                    }
                    DataValue::V128(out)
                }
                _ => unreachable!("unexpected unary {opcode:?}"),
            }
        }
        UnaryFp {
            opcode: Opcode::Sqrt,
            arg,
            control,
        } => {
            assert_eq!(control.rounding, Rounding::NearestTiesToEven);
            let aty = ty_of(*arg);
            float_unary(aty, val(*arg), |x| x.sqrt(), |x| x.sqrt())
        }
        UnaryFp { opcode, .. } => unreachable!("unexpected constrained unary {opcode:?}"),
        Binary { opcode, args } => {
            let ty = ty_of(args[0]);
            let (a, b) = (val(args[0]), val(args[1]));
            match opcode {
                Opcode::Iadd => int_binary(ty, a, b, |x, y, w| x.wrapping_add(y) & mask(w)),
                Opcode::Isub => int_binary(ty, a, b, |x, y, w| x.wrapping_sub(y) & mask(w)),
                Opcode::Imul => int_binary(ty, a, b, |x, y, w| x.wrapping_mul(y) & mask(w)),
                Opcode::Udiv => int_binary(ty, a, b, |x, y, _| {
                    assert!(y != 0, "udiv by zero is undefined in the IR");
                    x / y
                }),
                Opcode::Urem => int_binary(ty, a, b, |x, y, _| {
                    assert!(y != 0, "urem by zero is undefined in the IR");
                    x % y
                }),
                Opcode::Sdiv => int_binary(ty, a, b, |x, y, w| {
                    assert!(y != 0, "sdiv by zero is undefined in the IR");
                    assert!(
                        !(x == 1 << (w - 1) && y == mask(w)),
                        "sdiv overflow is undefined in the IR"
                    );
                    (sext(x, w).wrapping_div(sext(y, w))) as u64 & mask(w)
                }),
                Opcode::Srem => int_binary(ty, a, b, |x, y, w| {
                    assert!(y != 0, "srem by zero is undefined in the IR");
                    assert!(
                        !(x == 1 << (w - 1) && y == mask(w)),
                        "srem overflow is undefined in the IR"
                    );
                    (sext(x, w).wrapping_rem(sext(y, w))) as u64 & mask(w)
                }),
                Opcode::Band => bitwise_binary(ty, a, b, |x, y| x & y),
                Opcode::Bor => bitwise_binary(ty, a, b, |x, y| x | y),
                Opcode::Bxor => bitwise_binary(ty, a, b, |x, y| x ^ y),
                Opcode::Ishl => shift(ty, a, b, |x, c, w| (x << c) & mask(w)),
                Opcode::Ushr => shift(ty, a, b, |x, c, w| (x & mask(w)) >> c),
                Opcode::Sshr => shift(ty, a, b, |x, c, w| (sext(x, w) >> c) as u64 & mask(w)),
                Opcode::Fadd => float_binary(ty, a, b, |x, y| x + y, |x, y| x + y),
                Opcode::Fsub => float_binary(ty, a, b, |x, y| x - y, |x, y| x - y),
                Opcode::Fmul => float_binary(ty, a, b, |x, y| x * y, |x, y| x * y),
                Opcode::Fdiv => float_binary(ty, a, b, |x, y| x / y, |x, y| x / y),
                Opcode::Fcopysign => {
                    float_binary(ty, a, b, |x, y| x.copysign(y), |x, y| x.copysign(y))
                }
                Opcode::FminPseudo => float_binary(
                    ty,
                    a,
                    b,
                    |x, y| if x < y { x } else { y },
                    |x, y| if x < y { x } else { y },
                ),
                Opcode::FmaxPseudo => float_binary(
                    ty,
                    a,
                    b,
                    |x, y| if x > y { x } else { y },
                    |x, y| if x > y { x } else { y },
                ),
                Opcode::SaddSat => int_binary(ty, a, b, |x, y, w| {
                    sat_signed(sext(x, w) + sext(y, w), w)
                }),
                Opcode::SsubSat => int_binary(ty, a, b, |x, y, w| {
                    sat_signed(sext(x, w) - sext(y, w), w)
                }),
                _ => unreachable!("unexpected binary {opcode:?}"),
            }
        }
        BinaryFp {
            opcode,
            args,
            control,
        } => {
            assert_eq!(control.rounding, Rounding::NearestTiesToEven);
            let ty = ty_of(args[0]);
            let (a, b) = (val(args[0]), val(args[1]));
            match opcode {
                Opcode::Fadd => float_binary(ty, a, b, |x, y| x + y, |x, y| x + y),
                Opcode::Fsub => float_binary(ty, a, b, |x, y| x - y, |x, y| x - y),
                Opcode::Fmul => float_binary(ty, a, b, |x, y| x * y, |x, y| x * y),
                Opcode::Fdiv => float_binary(ty, a, b, |x, y| x / y, |x, y| x / y),
                _ => unreachable!("unexpected constrained binary {opcode:?}"),
            }
        }
        IntCompare { cond, args, .. } => {
            let ty = ty_of(args[0]);
            let (a, b) = (val(args[0]), val(args[1]));
            if ty.is_vector() {
                let w = ty.lane_bits();
                let (av, bv) = (a.v128(), b.v128());
                let mut out = [0u8; 16];
                for i in 0..ty.lane_count() as usize {
                    let t = icmp_bits(*cond, get_lane(&av, w, i), get_lane(&bv, w, i), w);
                    set_lane(&mut out, w, i, if t { mask(w) } else { 0 });
                }
                DataValue::V128(out)
            } else {
                let t = icmp_bits(*cond, a.bits64(), b.bits64(), ty.bits());
                DataValue::I8(t as i8)
            }
        }
        FloatCompare { cond, args, .. } => {
            let ty = ty_of(args[0]);
            let (a, b) = (val(args[0]), val(args[1]));
            if ty.is_vector() {
                let w = ty.lane_bits();
                let (av, bv) = (a.v128(), b.v128());
                let mut out = [0u8; 16];
                for i in 0..ty.lane_count() as usize {
                    let x = lane_float(&av, w, i);
                    let y = lane_float(&bv, w, i);
                    let t = fcmp_bool(*cond, x, y);
                    set_lane(&mut out, w, i, if t { mask(w) } else { 0 });
                }
                DataValue::V128(out)
            } else {
                let x = scalar_float(a);
                let y = scalar_float(b);
                DataValue::I8(fcmp_bool(*cond, x, y) as i8)
            }
        }
        ExtractLane { arg, lane, .. } => {
            let ty = ty_of(*arg);
            let bytes = val(*arg).v128();
            let bits = get_lane(&bytes, ty.lane_bits(), *lane as usize);
            scalar_from_bits(ty.lane_type(), bits)
        }
        InsertLane { args, lane, .. } => {
            let ty = ty_of(args[0]);
            let mut bytes = val(args[0]).v128();
            set_lane(&mut bytes, ty.lane_bits(), *lane as usize, val(args[1]).bits64());
            DataValue::V128(bytes)
        }
        Shuffle { args, lanes, .. } => {
            let mut concat = [0u8; 32];
            concat[..16].copy_from_slice(&val(args[0]).v128());
            concat[16..].copy_from_slice(&val(args[1]).v128());
            let mut out = [0u8; 16];
            for (i, &idx) in lanes.iter().enumerate() {
                out[i] = concat[idx as usize];
            }
            DataValue::V128(out)
        }
        Call { func_ref, args, .. } => {
            let libcall = func.ext_func(*func_ref).libcall;
            let args: SmallVec<[DataValue; 2]> = args.iter().map(|&v| val(v)).collect();
            intrinsics(libcall, &args)
        }
        Jump { .. } | Brif { .. } | Trap { .. } | MultiAry { .. } => {
            unreachable!("control flow is handled by the block loop")
        }
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

fn sext(bits: u64, width: u32) -> i64 {
    ((bits << (64 - width)) as i64) >> (64 - width)
}

fn sat_signed(value: i64, width: u32) -> u64 {
    let max = (1i64 << (width - 1)) - 1;
    let min = -(1i64 << (width - 1));
    value.clamp(min, max) as u64 & mask(width)
}

fn scalar_from_bits(ty: Type, bits: u64) -> DataValue {
    match ty {
        Type::I8 => DataValue::I8(bits as i8),
        Type::I16 => DataValue::I16(bits as i16),
        Type::I32 => DataValue::I32(bits as i32),
        Type::I64 => DataValue::I64(bits as i64),
        Type::F32 => DataValue::F32(f32::from_bits(bits as u32)),
        Type::F64 => DataValue::F64(f64::from_bits(bits)),
        _ => panic!("no scalar representation for {ty}"),
    }
}

fn from_bits128(ty: Type, bits: u128) -> DataValue {
    if ty.is_vector() {
        DataValue::V128(bits.to_le_bytes())
    } else {
        scalar_from_bits(ty, bits as u64)
    }
}

fn get_lane(bytes: &[u8; 16], lane_bits: u32, idx: usize) -> u64 {
    let lane_bytes = (lane_bits / 8) as usize;
    debug_assert!(lane_bytes <= 8);
    let mut x = 0u64;
    for j in (0..lane_bytes).rev() {
        x = (x << 8) | bytes[idx * lane_bytes + j] as u64;
    }
    x
}

fn set_lane(bytes: &mut [u8; 16], lane_bits: u32, idx: usize, bits: u64) {
    let lane_bytes = (lane_bits / 8) as usize;
    debug_assert!(lane_bytes <= 8);
    for j in 0..lane_bytes {
        bytes[idx * lane_bytes + j] = (bits >> (8 * j)) as u8;
    }
}

fn lane_float(bytes: &[u8; 16], lane_bits: u32, idx: usize) -> f64 {
    let bits = get_lane(bytes, lane_bits, idx);
    match lane_bits {
        32 => f32::from_bits(bits as u32) as f64,
        64 => f64::from_bits(bits),
        _ => panic!("no float lanes of {lane_bits} bits"),
    }
}

fn scalar_float(v: DataValue) -> f64 {
    match v {
        DataValue::F32(x) => x as f64,
        DataValue::F64(x) => x,
        other => panic!("float use of {other:?}"),
    }
}

fn int_unary(ty: Type, a: DataValue, f: impl Fn(u64, u32) -> u64) -> DataValue {
    let w = ty.bits();
    debug_assert!(!ty.is_vector());
    scalar_from_bits(ty, f(a.bits64(), w) & mask(w))
}

fn int_binary(ty: Type, a: DataValue, b: DataValue, f: impl Fn(u64, u64, u32) -> u64) -> DataValue {
    if ty.is_vector() {
        let w = ty.lane_bits();
        assert!(w <= 64, "no lanewise arithmetic on {ty}");
        let (av, bv) = (a.v128(), b.v128());
        let mut out = [0u8; 16];
        for i in 0..ty.lane_count() as usize {
            let x = f(get_lane(&av, w, i), get_lane(&bv, w, i), w);
            set_lane(&mut out, w, i, x & mask(w));
        }
        DataValue::V128(out)
    } else {
        let w = ty.bits();
        scalar_from_bits(ty, f(a.bits64(), b.bits64(), w) & mask(w))
    }
}

fn bitwise_unary(ty: Type, a: DataValue, f: impl Fn(u8) -> u8) -> DataValue {
    if ty.is_vector() {
        let mut bytes = a.v128();
        for b in &mut bytes {
            *b = f(*b);
        }
        DataValue::V128(bytes)
    } else {
        let w = ty.bits();
        let bits = a.bits64();
        let mut out = 0u64;
        for j in 0..8 {
            out |= (f((bits >> (8 * j)) as u8) as u64) << (8 * j);
        }
        scalar_from_bits(ty, out & mask(w))
    }
}

fn bitwise_binary(ty: Type, a: DataValue, b: DataValue, f: impl Fn(u8, u8) -> u8) -> DataValue {
    if ty.is_vector() {
        let (av, bv) = (a.v128(), b.v128());
        let mut out = [0u8; 16];
        for i in 0..16 {
            out[i] = f(av[i], bv[i]);
        }
        DataValue::V128(out)
    } else {
        let w = ty.bits();
        let (x, y) = (a.bits64(), b.bits64());
        let mut out = 0u64;
        for j in 0..8 {
            out |= (f((x >> (8 * j)) as u8, (y >> (8 * j)) as u8) as u64) << (8 * j);
        }
        scalar_from_bits(ty, out & mask(w))
    }
}

fn shift(ty: Type, a: DataValue, b: DataValue, f: impl Fn(u64, u32, u32) -> u64) -> DataValue {
    if ty.is_vector() {
        let w = ty.lane_bits();
        assert!(w <= 64, "no lanewise shifts on {ty}");
        let (av, bv) = (a.v128(), b.v128());
        let mut out = [0u8; 16];
        for i in 0..ty.lane_count() as usize {
            let c = get_lane(&bv, w, i) as u32;
            assert!(c < w, "lane shift count {c} is undefined for {ty}");
            set_lane(&mut out, w, i, f(get_lane(&av, w, i), c, w) & mask(w));
        }
        DataValue::V128(out)
    } else {
        let w = ty.bits();
        let c = b.bits64();
        assert!(c < w as u64, "shift count {c} is undefined for {ty}");
        scalar_from_bits(ty, f(a.bits64(), c as u32, w) & mask(w))
    }
}

fn float_unary(ty: Type, a: DataValue, f32_op: impl Fn(f32) -> f32, f64_op: impl Fn(f64) -> f64) -> DataValue {
    if ty.is_vector() {
        let w = ty.lane_bits();
        let av = a.v128();
        let mut out = [0u8; 16];
        for i in 0..ty.lane_count() as usize {
            let bits = get_lane(&av, w, i);
            let r = match w {
                32 => f32_op(f32::from_bits(bits as u32)).to_bits() as u64,
                64 => f64_op(f64::from_bits(bits)).to_bits(),
                _ => panic!("no float lanes of {w} bits"),
            };
            set_lane(&mut out, w, i, r);
        }
        DataValue::V128(out)
    } else {
        match a {
            DataValue::F32(x) => DataValue::F32(f32_op(x)),
            DataValue::F64(x) => DataValue::F64(f64_op(x)),
            other => panic!("float use of {other:?}"),
        }
    }
}

fn float_unary_bits(ty: Type, a: DataValue, f: impl Fn(u64, u32) -> u64) -> DataValue {
    if ty.is_vector() {
        let w = ty.lane_bits();
        let av = a.v128();
        let mut out = [0u8; 16];
        for i in 0..ty.lane_count() as usize {
            set_lane(&mut out, w, i, f(get_lane(&av, w, i), w) & mask(w));
        }
        DataValue::V128(out)
    } else {
        let w = ty.bits();
        scalar_from_bits(ty, f(a.bits64(), w) & mask(w))
    }
}

fn float_binary(
    ty: Type,
    a: DataValue,
    b: DataValue,
    f32_op: impl Fn(f32, f32) -> f32,
    f64_op: impl Fn(f64, f64) -> f64,
) -> DataValue {
    if ty.is_vector() {
        let w = ty.lane_bits();
        let (av, bv) = (a.v128(), b.v128());
        let mut out = [0u8; 16];
        for i in 0..ty.lane_count() as usize {
            let (x, y) = (get_lane(&av, w, i), get_lane(&bv, w, i));
            let r = match w {
                32 => f32_op(f32::from_bits(x as u32), f32::from_bits(y as u32)).to_bits() as u64,
                64 => f64_op(f64::from_bits(x), f64::from_bits(y)).to_bits(),
                _ => panic!("no float lanes of {w} bits"),
            };
            set_lane(&mut out, w, i, r);
        }
        DataValue::V128(out)
    } else {
        match (a, b) {
            (DataValue::F32(x), DataValue::F32(y)) => DataValue::F32(f32_op(x, y)),
            (DataValue::F64(x), DataValue::F64(y)) => DataValue::F64(f64_op(x, y)),
            _ => panic!("float binary on mismatched values"),
        }
    }
}

fn icmp_bits(cond: crate::condcodes::IntCC, x: u64, y: u64, width: u32) -> bool {
    use crate::condcodes::IntCC::*;
    let (sx, sy) = (sext(x, width), sext(y, width));
    match cond {
        Equal => x == y,
        NotEqual => x != y,
        SignedLessThan => sx < sy,
        SignedGreaterThanOrEqual => sx >= sy,
        SignedGreaterThan => sx > sy,
        SignedLessThanOrEqual => sx <= sy,
        UnsignedLessThan => x < y,
        UnsignedGreaterThanOrEqual => x >= y,
        UnsignedGreaterThan => x > y,
        UnsignedLessThanOrEqual => x <= y,
    }
}

fn fcmp_bool(cond: crate::condcodes::FloatCC, x: f64, y: f64) -> bool {
    use crate::condcodes::FloatCC::*;
    match cond {
        Equal => x == y,
        NotEqual => !(x == y),
        LessThan => x < y,
        LessThanOrEqual => x <= y,
        GreaterThan => x > y,
        GreaterThanOrEqual => x >= y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FunctionBuilder;
    use crate::condcodes::IntCC;
    use crate::function::Signature;
    use crate::types::{I32, I8X16};
    use crate::TrapCode;

    fn no_intrinsics(libcall: LibCall, _args: &[DataValue]) -> DataValue {
        panic!("unexpected call to {libcall}");
    }

    #[test]
    fn straight_line_arithmetic() {
        let mut func = Function::with_name_signature("f", Signature::new(vec![], vec![I32]));
        let mut builder = FunctionBuilder::new(&mut func);
        let block = builder.create_block();
        builder.switch_to_block(block);
        let a = builder.ins().iconst(I32, 6);
        let b = builder.ins().iconst(I32, 7);
        let sum = builder.ins().imul(a, b);
        builder.ins().return_(&[sum]);

        let result = run(&func, &[], &no_intrinsics).unwrap();
        assert_eq!(result.as_slice(), &[DataValue::I32(42)]);
    }

    #[test]
    fn branches_and_block_params() {
        // abs(x) via a diamond joining through a block parameter.
        let mut func = Function::with_name_signature("f", Signature::new(vec![I32], vec![I32]));
        let mut builder = FunctionBuilder::new(&mut func);
        let entry = builder.create_block();
        let x = builder.append_block_param(entry, I32);
        let neg = builder.create_block();
        let join = builder.create_block();
        let result = builder.append_block_param(join, I32);
        builder.switch_to_block(entry);
        let zero = builder.ins().iconst(I32, 0);
        let is_neg = builder.ins().icmp(IntCC::SignedLessThan, x, zero);
        builder.ins().brif(is_neg, neg, &[], join, &[x]);
        builder.switch_to_block(neg);
        let negated = builder.ins().isub(zero, x);
        builder.ins().jump(join, &[negated]);
        builder.switch_to_block(join);
        builder.ins().return_(&[result]);

        let run1 = run(&func, &[DataValue::I32(-5)], &no_intrinsics).unwrap();
        assert_eq!(run1.as_slice(), &[DataValue::I32(5)]);
        let run2 = run(&func, &[DataValue::I32(9)], &no_intrinsics).unwrap();
        assert_eq!(run2.as_slice(), &[DataValue::I32(9)]);
    }

    #[test]
    fn traps_surface_their_code() {
        let mut func = Function::with_name_signature("f", Signature::new(vec![], vec![]));
        let mut builder = FunctionBuilder::new(&mut func);
        let block = builder.create_block();
        builder.switch_to_block(block);
        builder.ins().trap(TrapCode::IntegerOverflow);

        assert_eq!(run(&func, &[], &no_intrinsics), Err(TrapCode::IntegerOverflow));
    }

    #[test]
    fn lanewise_addition() {
        let mut func = Function::with_name_signature("f", Signature::new(vec![], vec![I8X16]));
        let mut builder = FunctionBuilder::new(&mut func);
        let block = builder.create_block();
        builder.switch_to_block(block);
        let a = builder.ins().vconst(I8X16, [1u8; 16]);
        let b = builder.ins().vconst(I8X16, [0xFFu8; 16]);
        let sum = builder.ins().iadd(a, b);
        builder.ins().return_(&[sum]);

        // 1 + 255 wraps to 0 in every lane.
        let result = run(&func, &[], &no_intrinsics).unwrap();
        assert_eq!(result.as_slice(), &[DataValue::V128([0u8; 16])]);
    }

    #[test]
    #[should_panic(expected = "shift count")]
    fn overshift_is_undefined() {
        let mut func = Function::with_name_signature("f", Signature::new(vec![], vec![I32]));
        let mut builder = FunctionBuilder::new(&mut func);
        let block = builder.create_block();
        builder.switch_to_block(block);
        let a = builder.ins().iconst(I32, 1);
        let c = builder.ins().iconst(I32, 33);
        let r = builder.ins().ishl(a, c);
        builder.ins().return_(&[r]);
        let _ = run(&func, &[], &no_intrinsics);
    }
}
