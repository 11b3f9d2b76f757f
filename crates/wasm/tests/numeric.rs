//! Semantic tests for the numeric translation: operator sequences are
//! translated to IR and executed by the reference interpreter, with the
//! runtime's out-of-line intrinsics resolved in. The interpreter hard-asserts
//! on the IR's undefined points (overshift, srem overflow, division by
//! zero), so these tests also prove the translator neutralized them.

use kestrel_ir::immediates::{Ieee32, Ieee64, V128Imm};
use kestrel_ir::interp::{self, DataValue};
use kestrel_ir::types::*;
use kestrel_ir::{Function, LibCall, Signature, TrapCode};
use kestrel_wasm::{FuncTranslator, Operator};

fn f32_arg(v: DataValue) -> f32 {
    match v {
        DataValue::F32(x) => x,
        other => panic!("expected an f32, got {other:?}"),
    }
}

fn f64_arg(v: DataValue) -> f64 {
    match v {
        DataValue::F64(x) => x,
        other => panic!("expected an f64, got {other:?}"),
    }
}

fn intrinsics(libcall: LibCall, args: &[DataValue]) -> DataValue {
    use kestrel_runtime::libcalls::*;
    match libcall {
        LibCall::F32Min => DataValue::F32(f32_min(f32_arg(args[0]), f32_arg(args[1]))),
        LibCall::F64Min => DataValue::F64(f64_min(f64_arg(args[0]), f64_arg(args[1]))),
        LibCall::F32Max => DataValue::F32(f32_max(f32_arg(args[0]), f32_arg(args[1]))),
        LibCall::F64Max => DataValue::F64(f64_max(f64_arg(args[0]), f64_arg(args[1]))),
        LibCall::F32Ceil => DataValue::F32(f32_ceil(f32_arg(args[0]))),
        LibCall::F64Ceil => DataValue::F64(f64_ceil(f64_arg(args[0]))),
        LibCall::F32Floor => DataValue::F32(f32_floor(f32_arg(args[0]))),
        LibCall::F64Floor => DataValue::F64(f64_floor(f64_arg(args[0]))),
        LibCall::F32Trunc => DataValue::F32(f32_trunc(f32_arg(args[0]))),
        LibCall::F64Trunc => DataValue::F64(f64_trunc(f64_arg(args[0]))),
        LibCall::F32Nearest => DataValue::F32(f32_nearest(f32_arg(args[0]))),
        LibCall::F64Nearest => DataValue::F64(f64_nearest(f64_arg(args[0]))),
    }
}

/// Translate `ops` into a fresh function returning one value of `ret` and
/// run it.
fn run1(ops: &[Operator], ret: Type) -> Result<DataValue, TrapCode> {
    let mut func = Function::with_name_signature("test", Signature::new(vec![], vec![ret]));
    FuncTranslator::new().translate(ops, &mut func).unwrap();
    interp::run(&func, &[], &intrinsics).map(|values| values[0])
}

fn i32_const(value: i32) -> Operator {
    Operator::I32Const { value }
}

fn i64_const(value: i64) -> Operator {
    Operator::I64Const { value }
}

fn f32_const(value: f32) -> Operator {
    Operator::F32Const {
        value: Ieee32::with_float(value),
    }
}

fn f64_const(value: f64) -> Operator {
    Operator::F64Const {
        value: Ieee64::with_float(value),
    }
}

fn v128_const(bytes: [u8; 16]) -> Operator {
    Operator::V128Const {
        value: V128Imm(bytes),
    }
}

fn bytes_i32(lanes: [i32; 4]) -> [u8; 16] {
    let mut bytes = [0; 16];
    for (i, lane) in lanes.iter().enumerate() {
        bytes[i * 4..][..4].copy_from_slice(&lane.to_le_bytes());
    }
    bytes
}

fn bytes_i16(lanes: [i16; 8]) -> [u8; 16] {
    let mut bytes = [0; 16];
    for (i, lane) in lanes.iter().enumerate() {
        bytes[i * 2..][..2].copy_from_slice(&lane.to_le_bytes());
    }
    bytes
}

fn bytes_i64(lanes: [i64; 2]) -> [u8; 16] {
    let mut bytes = [0; 16];
    for (i, lane) in lanes.iter().enumerate() {
        bytes[i * 8..][..8].copy_from_slice(&lane.to_le_bytes());
    }
    bytes
}

fn bytes_f32(lanes: [f32; 4]) -> [u8; 16] {
    bytes_i32(lanes.map(|l| l.to_bits() as i32))
}

#[track_caller]
fn expect_i32(ops: &[Operator], want: i32) {
    assert_eq!(run1(ops, I32), Ok(DataValue::I32(want)));
}

#[track_caller]
fn expect_i64(ops: &[Operator], want: i64) {
    assert_eq!(run1(ops, I64), Ok(DataValue::I64(want)));
}

#[track_caller]
fn expect_v128(ops: &[Operator], want: [u8; 16]) {
    assert_eq!(run1(ops, I8X16), Ok(DataValue::V128(want)));
}

// ----- Scalar integers --------------------------------------------------

#[test]
fn divide_by_zero_traps() {
    let _ = env_logger::try_init();
    for op in [
        Operator::I32DivS,
        Operator::I32DivU,
        Operator::I32RemS,
        Operator::I32RemU,
    ] {
        let r = run1(&[i32_const(-1), i32_const(0), op], I32);
        assert_eq!(r, Err(TrapCode::IntegerDivisionByZero), "{op:?}");
    }
    let r = run1(&[i64_const(17), i64_const(0), Operator::I64RemS], I64);
    assert_eq!(r, Err(TrapCode::IntegerDivisionByZero));
}

#[test]
fn signed_division_overflow_traps() {
    let _ = env_logger::try_init();
    let r = run1(
        &[i32_const(i32::MIN), i32_const(-1), Operator::I32DivS],
        I32,
    );
    assert_eq!(r, Err(TrapCode::IntegerOverflow));
    let r = run1(
        &[i64_const(i64::MIN), i64_const(-1), Operator::I64DivS],
        I64,
    );
    assert_eq!(r, Err(TrapCode::IntegerOverflow));
}

#[test]
fn signed_remainder_overflow_is_zero() {
    let _ = env_logger::try_init();
    // INT_MIN rem -1 is the one divergence from the native instruction: the
    // result is 0, with no trap.
    expect_i32(&[i32_const(i32::MIN), i32_const(-1), Operator::I32RemS], 0);
    expect_i64(&[i64_const(i64::MIN), i64_const(-1), Operator::I64RemS], 0);
    // The bypass must not disturb ordinary remainders.
    expect_i32(&[i32_const(-7), i32_const(3), Operator::I32RemS], -1);
    expect_i32(&[i32_const(7), i32_const(-3), Operator::I32RemS], 1);
}

#[test]
fn signed_and_unsigned_division() {
    let _ = env_logger::try_init();
    expect_i32(&[i32_const(-7), i32_const(2), Operator::I32DivS], -3);
    expect_i32(&[i32_const(-7), i32_const(2), Operator::I32DivU], 0x7FFF_FFFC);
    expect_i32(&[i32_const(-7), i32_const(2), Operator::I32RemU], 1);
    expect_i64(&[i64_const(100), i64_const(7), Operator::I64DivS], 14);
}

#[test]
fn shift_counts_wrap() {
    let _ = env_logger::try_init();
    expect_i32(&[i32_const(1), i32_const(33), Operator::I32Shl], 2);
    expect_i32(&[i32_const(1), i32_const(32), Operator::I32Shl], 1);
    expect_i64(&[i64_const(1), i64_const(65), Operator::I64Shl], 2);
    expect_i32(
        &[i32_const(i32::MIN), i32_const(33), Operator::I32ShrU],
        0x4000_0000,
    );
    expect_i32(&[i32_const(i32::MIN), i32_const(33), Operator::I32ShrS], i32::MIN / 2);
    expect_i64(&[i64_const(-8), i64_const(64), Operator::I64ShrS], -8);
}

#[test]
fn rotates() {
    let _ = env_logger::try_init();
    // Rotating by the full bit width is the identity.
    expect_i32(&[i32_const(0x12345678), i32_const(32), Operator::I32Rotl], 0x12345678);
    expect_i32(&[i32_const(0x12345678), i32_const(32), Operator::I32Rotr], 0x12345678);
    expect_i64(&[i64_const(-3), i64_const(64), Operator::I64Rotl], -3);
    expect_i32(&[i32_const(0x12345678), i32_const(0), Operator::I32Rotl], 0x12345678);

    expect_i32(
        &[i32_const(0x8000_0001u32 as i32), i32_const(1), Operator::I32Rotl],
        3,
    );
    expect_i32(&[i32_const(1), i32_const(1), Operator::I32Rotr], i32::MIN);
    expect_i64(&[i64_const(1), i64_const(1), Operator::I64Rotr], i64::MIN);
}

#[test]
fn wrapping_arithmetic() {
    let _ = env_logger::try_init();
    expect_i32(&[i32_const(i32::MAX), i32_const(1), Operator::I32Add], i32::MIN);
    expect_i32(&[i32_const(i32::MIN), i32_const(1), Operator::I32Sub], i32::MAX);
    expect_i32(&[i32_const(0x10000), i32_const(0x10000), Operator::I32Mul], 0);
    expect_i64(
        &[i64_const(0x0F0F_0F0F), i64_const(0xF0F0_F0F0), Operator::I64Or],
        0xFFFF_FFFF,
    );
    expect_i32(&[i32_const(0b1100), i32_const(0b1010), Operator::I32And], 0b1000);
    expect_i32(&[i32_const(0b1100), i32_const(0b1010), Operator::I32Xor], 0b0110);
}

#[test]
fn bit_counting_is_defined_on_zero() {
    let _ = env_logger::try_init();
    expect_i32(&[i32_const(0), Operator::I32Clz], 32);
    expect_i32(&[i32_const(0), Operator::I32Ctz], 32);
    expect_i64(&[i64_const(0), Operator::I64Clz], 64);
    expect_i32(&[i32_const(1), Operator::I32Clz], 31);
    expect_i32(&[i32_const(8), Operator::I32Ctz], 3);
    expect_i32(&[i32_const(0xFF), Operator::I32Popcnt], 8);
    expect_i64(&[i64_const(-1), Operator::I64Popcnt], 64);
}

#[test]
fn eqz() {
    let _ = env_logger::try_init();
    expect_i32(&[i32_const(0), Operator::I32Eqz], 1);
    expect_i32(&[i32_const(42), Operator::I32Eqz], 0);
    // i64.eqz still produces an i32.
    expect_i32(&[i64_const(0), Operator::I64Eqz], 1);
    expect_i32(&[i64_const(-1), Operator::I64Eqz], 0);
}

#[test]
fn integer_comparisons() {
    let _ = env_logger::try_init();
    // -1 is large unsigned, small signed.
    expect_i32(&[i32_const(-1), i32_const(0), Operator::I32LtS], 1);
    expect_i32(&[i32_const(-1), i32_const(0), Operator::I32LtU], 0);
    expect_i32(&[i32_const(-1), i32_const(0), Operator::I32GtU], 1);
    expect_i32(&[i32_const(3), i32_const(3), Operator::I32LeS], 1);
    expect_i32(&[i32_const(3), i32_const(3), Operator::I32GeU], 1);
    expect_i32(&[i32_const(3), i32_const(4), Operator::I32Eq], 0);
    expect_i32(&[i32_const(3), i32_const(4), Operator::I32Ne], 1);
    expect_i32(&[i64_const(i64::MIN), i64_const(0), Operator::I64LtS], 1);
    expect_i32(&[i64_const(i64::MIN), i64_const(0), Operator::I64LtU], 0);
}

// ----- Scalar floats ----------------------------------------------------

#[test]
fn nan_comparisons() {
    let _ = env_logger::try_init();
    let nan = f32_const(f32::NAN);
    expect_i32(&[nan, nan, Operator::F32Eq], 0);
    expect_i32(&[nan, nan, Operator::F32Ne], 1);
    expect_i32(&[nan, f32_const(1.0), Operator::F32Lt], 0);
    expect_i32(&[f32_const(1.0), nan, Operator::F32Le], 0);
    expect_i32(&[nan, f32_const(1.0), Operator::F32Ge], 0);

    let dnan = f64_const(f64::NAN);
    expect_i32(&[dnan, dnan, Operator::F64Eq], 0);
    expect_i32(&[dnan, dnan, Operator::F64Ne], 1);
    expect_i32(&[f64_const(1.0), f64_const(2.0), Operator::F64Lt], 1);
}

#[test]
fn float_sign_operations() {
    let _ = env_logger::try_init();
    let r = run1(&[f32_const(-0.0), Operator::F32Abs], F32).unwrap();
    match r {
        DataValue::F32(x) => {
            assert_eq!(x, 0.0);
            assert!(x.is_sign_positive());
        }
        other => panic!("unexpected {other:?}"),
    }

    let r = run1(&[f32_const(0.0), Operator::F32Neg], F32).unwrap();
    match r {
        DataValue::F32(x) => {
            assert_eq!(x, 0.0);
            assert!(x.is_sign_negative());
        }
        other => panic!("unexpected {other:?}"),
    }

    let r = run1(
        &[f64_const(1.5), f64_const(-2.0), Operator::F64Copysign],
        F64,
    )
    .unwrap();
    assert_eq!(r, DataValue::F64(-1.5));
}

#[test]
fn float_arithmetic() {
    let _ = env_logger::try_init();
    assert_eq!(
        run1(&[f32_const(1.5), f32_const(2.25), Operator::F32Add], F32),
        Ok(DataValue::F32(3.75))
    );
    assert_eq!(
        run1(&[f64_const(1.0), f64_const(8.0), Operator::F64Div], F64),
        Ok(DataValue::F64(0.125))
    );
    assert_eq!(
        run1(&[f32_const(2.0), Operator::F32Sqrt], F32),
        Ok(DataValue::F32(2.0f32.sqrt()))
    );
}

#[test]
fn float_min_max_intrinsics() {
    let _ = env_logger::try_init();
    // NaN wins, as the out-of-line routine implements it.
    let r = run1(&[f32_const(f32::NAN), f32_const(1.0), Operator::F32Min], F32).unwrap();
    assert!(f32_arg(r).is_nan());
    let r = run1(&[f64_const(2.0), f64_const(f64::NAN), Operator::F64Max], F64).unwrap();
    assert!(f64_arg(r).is_nan());

    // Signed zeros are ordered.
    let r = run1(&[f32_const(-0.0), f32_const(0.0), Operator::F32Min], F32).unwrap();
    assert!(f32_arg(r).is_sign_negative());
    let r = run1(&[f64_const(-0.0), f64_const(0.0), Operator::F64Max], F64).unwrap();
    assert!(f64_arg(r).is_sign_positive());

    assert_eq!(
        run1(&[f32_const(3.0), f32_const(-7.0), Operator::F32Min], F32),
        Ok(DataValue::F32(-7.0))
    );
}

#[test]
fn float_rounding_intrinsics() {
    let _ = env_logger::try_init();
    assert_eq!(
        run1(&[f32_const(2.5), Operator::F32Nearest], F32),
        Ok(DataValue::F32(2.0))
    );
    assert_eq!(
        run1(&[f64_const(3.5), Operator::F64Nearest], F64),
        Ok(DataValue::F64(4.0))
    );
    assert_eq!(
        run1(&[f32_const(1.1), Operator::F32Ceil], F32),
        Ok(DataValue::F32(2.0))
    );
    assert_eq!(
        run1(&[f64_const(-1.1), Operator::F64Floor], F64),
        Ok(DataValue::F64(-2.0))
    );
    assert_eq!(
        run1(&[f32_const(-1.9), Operator::F32Trunc], F32),
        Ok(DataValue::F32(-1.0))
    );
}

// ----- v128 -------------------------------------------------------------

#[test]
fn saturating_unsigned_arithmetic() {
    let _ = env_logger::try_init();
    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    a[0] = 200;
    b[0] = 100;
    a[1] = 3;
    b[1] = 4;
    let mut want = [0u8; 16];
    want[0] = 255;
    want[1] = 7;
    expect_v128(
        &[v128_const(a), v128_const(b), Operator::I8x16AddSaturateU],
        want,
    );

    let mut a = [0u8; 16];
    let mut b = [0u8; 16];
    a[0] = 10;
    b[0] = 20;
    a[1] = 20;
    b[1] = 10;
    let mut want = [0u8; 16];
    want[0] = 0;
    want[1] = 10;
    expect_v128(
        &[v128_const(a), v128_const(b), Operator::I8x16SubSaturateU],
        want,
    );

    expect_v128(
        &[
            v128_const(bytes_i16([40_000u16 as i16; 8])),
            v128_const(bytes_i16([40_000u16 as i16; 8])),
            Operator::I16x8AddSaturateU,
        ],
        [0xFF; 16],
    );
}

#[test]
fn saturating_signed_arithmetic() {
    let _ = env_logger::try_init();
    let a = [100u8; 16];
    let b = [100u8; 16];
    expect_v128(
        &[v128_const(a), v128_const(b), Operator::I8x16AddSaturateS],
        [127; 16],
    );
    let a = [0x80u8; 16]; // -128 lanes
    let b = [1u8; 16];
    expect_v128(
        &[v128_const(a), v128_const(b), Operator::I8x16SubSaturateS],
        [0x80; 16],
    );
    expect_v128(
        &[
            v128_const(bytes_i16([i16::MIN; 8])),
            v128_const(bytes_i16([100; 8])),
            Operator::I16x8SubSaturateS,
        ],
        bytes_i16([i16::MIN; 8]),
    );
}

#[test]
fn lanewise_integer_arithmetic() {
    let _ = env_logger::try_init();
    expect_v128(
        &[
            v128_const(bytes_i32([1, -2, i32::MAX, 0])),
            v128_const(bytes_i32([1, 2, 1, 0])),
            Operator::I32x4Add,
        ],
        bytes_i32([2, 0, i32::MIN, 0]),
    );
    expect_v128(
        &[
            v128_const(bytes_i32([1, -2, 0, i32::MIN])),
            Operator::I32x4Neg,
        ],
        bytes_i32([-1, 2, 0, i32::MIN]),
    );
    expect_v128(
        &[
            v128_const(bytes_i16([300; 8])),
            v128_const(bytes_i16([300; 8])),
            Operator::I16x8Mul,
        ],
        bytes_i16([(300i32 * 300) as i16; 8]),
    );
    expect_v128(
        &[
            v128_const(bytes_i64([1, -1])),
            v128_const(bytes_i64([-1, 1])),
            Operator::I64x2Sub,
        ],
        bytes_i64([2, -2]),
    );
}

#[test]
fn vector_shift_counts_wrap() {
    let _ = env_logger::try_init();
    expect_v128(
        &[
            v128_const(bytes_i32([1, 2, -4, i32::MIN])),
            i32_const(33),
            Operator::I32x4Shl,
        ],
        bytes_i32([2, 4, -8, 0]),
    );
    expect_v128(
        &[
            v128_const(bytes_i32([-8; 4])),
            i32_const(33),
            Operator::I32x4ShrS,
        ],
        bytes_i32([-4; 4]),
    );
    expect_v128(
        &[v128_const([0x80; 16]), i32_const(9), Operator::I8x16ShrU],
        [0x40; 16],
    );
    expect_v128(
        &[
            v128_const(bytes_i64([1, 1])),
            i32_const(65),
            Operator::I64x2Shl,
        ],
        bytes_i64([2, 2]),
    );
}

#[test]
fn boolean_reductions() {
    let _ = env_logger::try_init();
    let mut one_lane = [0u8; 16];
    one_lane[7] = 1;
    expect_i32(&[v128_const(one_lane), Operator::I8x16AnyTrue], 1);
    expect_i32(&[v128_const(one_lane), Operator::I8x16AllTrue], 0);
    expect_i32(&[v128_const([0; 16]), Operator::I8x16AnyTrue], 0);
    expect_i32(&[v128_const([1; 16]), Operator::I8x16AllTrue], 1);

    // Lane shape matters: one nonzero byte makes one i64 lane true.
    expect_i32(&[v128_const(one_lane), Operator::I64x2AnyTrue], 1);
    expect_i32(
        &[v128_const(bytes_i64([1, 0])), Operator::I64x2AllTrue],
        0,
    );
    expect_i32(
        &[v128_const(bytes_i64([4, -4])), Operator::I64x2AllTrue],
        1,
    );
    expect_i32(
        &[v128_const(bytes_i32([0, 1, 1, 1])), Operator::I32x4AllTrue],
        0,
    );
}

#[test]
fn bitselect() {
    let _ = env_logger::try_init();
    let t = [0xAAu8; 16];
    let f = [0x55u8; 16];
    let mut mask = [0x00u8; 16];
    mask[0] = 0xFF;
    mask[1] = 0x0F;
    let mut want = [0x55u8; 16];
    want[0] = 0xAA;
    want[1] = (0xAA & 0x0F) | (0x55 & 0xF0);
    expect_v128(
        &[
            v128_const(t),
            v128_const(f),
            v128_const(mask),
            Operator::V128Bitselect,
        ],
        want,
    );
}

#[test]
fn v128_bitwise() {
    let _ = env_logger::try_init();
    expect_v128(
        &[
            v128_const([0b1100; 16]),
            v128_const([0b1010; 16]),
            Operator::V128Xor,
        ],
        [0b0110; 16],
    );
    expect_v128(&[v128_const([0xF0; 16]), Operator::V128Not], [0x0F; 16]);
    expect_v128(
        &[
            v128_const([0xF0; 16]),
            v128_const([0x3C; 16]),
            Operator::V128And,
        ],
        [0x30; 16],
    );
    expect_v128(
        &[
            v128_const([0xF0; 16]),
            v128_const([0x3C; 16]),
            Operator::V128Or,
        ],
        [0xFC; 16],
    );
}

#[test]
fn shuffle_indexes_the_concatenation() {
    let _ = env_logger::try_init();
    let left: [u8; 16] = std::array::from_fn(|i| i as u8);
    let right: [u8; 16] = std::array::from_fn(|i| 16 + i as u8);
    let lanes: [u8; 16] = [0, 31, 1, 30, 2, 29, 3, 28, 16, 15, 17, 14, 18, 13, 19, 12];
    expect_v128(
        &[
            v128_const(left),
            v128_const(right),
            Operator::V8x16Shuffle { lanes },
        ],
        lanes,
    );
}

#[test]
fn lane_access_round_trips() {
    let _ = env_logger::try_init();
    // replace then extract returns the inserted scalar, truncated to the
    // lane and then sign- or zero-extended.
    expect_i32(
        &[
            v128_const([0; 16]),
            i32_const(0x180),
            Operator::I8x16ReplaceLane { lane: 3 },
            Operator::I8x16ExtractLaneS { lane: 3 },
        ],
        -128,
    );
    expect_i32(
        &[
            v128_const([0; 16]),
            i32_const(0x180),
            Operator::I8x16ReplaceLane { lane: 3 },
            Operator::I8x16ExtractLaneU { lane: 3 },
        ],
        128,
    );
    expect_i32(
        &[
            v128_const(bytes_i16([0; 8])),
            i32_const(-2),
            Operator::I16x8ReplaceLane { lane: 7 },
            Operator::I16x8ExtractLaneU { lane: 7 },
        ],
        0xFFFE,
    );
    expect_i32(
        &[
            v128_const(bytes_i32([10, 20, 30, 40])),
            Operator::I32x4ExtractLane { lane: 2 },
        ],
        30,
    );
    expect_i64(
        &[
            v128_const(bytes_i64([0, -5])),
            Operator::I64x2ExtractLane { lane: 1 },
        ],
        -5,
    );
}

#[test]
fn splats() {
    let _ = env_logger::try_init();
    expect_v128(&[i32_const(0x10005), Operator::I16x8Splat], bytes_i16([5; 8]));
    expect_v128(&[i32_const(-1), Operator::I32x4Splat], [0xFF; 16]);
    expect_v128(
        &[f32_const(1.0), Operator::F32x4Splat],
        bytes_f32([1.0; 4]),
    );
    expect_v128(&[i64_const(7), Operator::I64x2Splat], bytes_i64([7, 7]));
}

#[test]
fn lanewise_integer_comparisons() {
    let _ = env_logger::try_init();
    // Equal lanes become all-ones masks, others zero.
    expect_v128(
        &[
            v128_const(bytes_i32([1, 2, 3, 4])),
            v128_const(bytes_i32([1, 9, 3, -4])),
            Operator::I32x4Eq,
        ],
        bytes_i32([-1, 0, -1, 0]),
    );
    // -1 compares large unsigned, small signed.
    expect_v128(
        &[
            v128_const(bytes_i32([-1; 4])),
            v128_const(bytes_i32([0; 4])),
            Operator::I32x4LtS,
        ],
        bytes_i32([-1; 4]),
    );
    expect_v128(
        &[
            v128_const(bytes_i32([-1; 4])),
            v128_const(bytes_i32([0; 4])),
            Operator::I32x4LtU,
        ],
        bytes_i32([0; 4]),
    );
    expect_v128(
        &[
            v128_const([1; 16]),
            v128_const([2; 16]),
            Operator::I8x16LeU,
        ],
        [0xFF; 16],
    );
}

#[test]
fn lanewise_float_arithmetic() {
    let _ = env_logger::try_init();
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, 2.0, 3.0, 4.0])),
            v128_const(bytes_f32([0.5, 0.5, 0.5, 0.5])),
            Operator::F32x4Mul,
        ],
        bytes_f32([0.5, 1.0, 1.5, 2.0]),
    );
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, -2.0, 0.0, -0.0])),
            Operator::F32x4Neg,
        ],
        bytes_f32([-1.0, 2.0, -0.0, 0.0]),
    );
    expect_v128(
        &[
            v128_const(bytes_f32([4.0, 9.0, 16.0, 25.0])),
            Operator::F32x4Sqrt,
        ],
        bytes_f32([2.0, 3.0, 4.0, 5.0]),
    );
}

#[test]
fn lanewise_float_min_has_platform_nan_semantics() {
    let _ = env_logger::try_init();
    // minps semantics: on NaN or equality the second operand wins.
    expect_v128(
        &[
            v128_const(bytes_f32([f32::NAN, 5.0, 1.0, -0.0])),
            v128_const(bytes_f32([5.0, f32::NAN, 2.0, 0.0])),
            Operator::F32x4Min,
        ],
        bytes_f32([5.0, f32::NAN, 1.0, 0.0]),
    );
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, 8.0, 0.0, 0.0])),
            v128_const(bytes_f32([2.0, 7.0, 0.0, 0.0])),
            Operator::F32x4Max,
        ],
        bytes_f32([2.0, 8.0, 0.0, 0.0]),
    );
}

#[test]
fn lanewise_float_comparisons() {
    let _ = env_logger::try_init();
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, f32::NAN, 3.0, 4.0])),
            v128_const(bytes_f32([1.0, f32::NAN, 9.0, -4.0])),
            Operator::F32x4Eq,
        ],
        bytes_i32([-1, 0, 0, 0]),
    );
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, f32::NAN, 3.0, 4.0])),
            v128_const(bytes_f32([1.0, f32::NAN, 9.0, -4.0])),
            Operator::F32x4Ne,
        ],
        bytes_i32([0, -1, -1, -1]),
    );
    expect_v128(
        &[
            v128_const(bytes_f32([1.0, 2.0, f32::NAN, -1.0])),
            v128_const(bytes_f32([2.0, 1.0, 1.0, -1.0])),
            Operator::F32x4Lt,
        ],
        bytes_i32([-1, 0, 0, 0]),
    );
}

#[test]
fn every_intrinsic_symbol_resolves() {
    let _ = env_logger::try_init();
    for &libcall in LibCall::all() {
        assert!(
            kestrel_runtime::libcalls::resolve(libcall.symbol()).is_some(),
            "{libcall} must resolve to a runtime routine"
        );
    }
}

// ----- Mixed sequences --------------------------------------------------

#[test]
fn stack_discipline_over_a_longer_sequence() {
    let _ = env_logger::try_init();
    // (10 - 3) * (2 + 1) == 21, exercising operand order through the stack.
    expect_i32(
        &[
            i32_const(10),
            i32_const(3),
            Operator::I32Sub,
            i32_const(2),
            i32_const(1),
            Operator::I32Add,
            Operator::I32Mul,
        ],
        21,
    );
}

#[test]
fn vector_values_retype_freely_between_shapes() {
    let _ = env_logger::try_init();
    // An i32x4 result feeds an i8x16 consumer through a bitcast, not a
    // conversion: the bits are reinterpreted and every byte is incremented.
    let mut want = bytes_i32([2, 4, 6, 8]);
    for byte in &mut want {
        *byte += 1;
    }
    expect_v128(
        &[
            v128_const(bytes_i32([1, 2, 3, 4])),
            v128_const(bytes_i32([1, 2, 3, 4])),
            Operator::I32x4Add,
            v128_const([1; 16]),
            Operator::I8x16Add,
        ],
        want,
    );
}
