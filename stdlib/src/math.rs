//! Integer and fixed-point math primitives. Everything here is
//! deterministic and registered as compile-time-constant, so the compiler
//! may fold calls with constant arguments.

use anyhow::Result;
use ignis_core::bytecode::BaseType;
use ignis_core::module::{FLAG_ALLOW_INLINE_EXECUTION, FLAG_COMPILE_TIME_CONSTANT, NativeFn, ParamInfo, ScriptModule};
use ignis_core::rt::Runtime;
use ignis_core::value::Cell;

use crate::args::arg;

const CONSTANT: u8 = FLAG_ALLOW_INLINE_EXECUTION | FLAG_COMPILE_TIME_CONSTANT;

pub(crate) fn minimum<T: Cell>(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: T = arg(args, 0)?;
    let b: T = arg(args, 1)?;
    Ok(if a < b { a } else { b }.to_cell())
}

pub(crate) fn maximum<T: Cell>(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: T = arg(args, 0)?;
    let b: T = arg(args, 1)?;
    Ok(if a > b { a } else { b }.to_cell())
}

pub(crate) fn clamp<T: Cell>(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: T = arg(args, 0)?;
    let b: T = arg(args, 1)?;
    let c: T = arg(args, 2)?;
    let lower = if a > b { a } else { b };
    Ok(if lower < c { lower } else { c }.to_cell())
}

pub(crate) fn absolute_s8(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: i8 = arg(args, 0)?;
    Ok(a.unsigned_abs().to_cell())
}

pub(crate) fn absolute_s16(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: i16 = arg(args, 0)?;
    Ok(a.unsigned_abs().to_cell())
}

pub(crate) fn absolute_s32(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: i32 = arg(args, 0)?;
    Ok(a.unsigned_abs().to_cell())
}

/// Integer square root, truncating like a C float-to-int cast.
pub(crate) fn sqrt_u32(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let a: u32 = arg(args, 0)?;
    Ok((((a as f32).sqrt()) as u32).to_cell())
}

// Fixed-point trigonometry: 8.8 for the s16 variants, 16.16 for s32.

pub(crate) fn sin_s16(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let x: i16 = arg(args, 0)?;
    Ok((((x as f32 / 256.0).sin() * 256.0).round() as i32 as i16).to_cell())
}

pub(crate) fn sin_s32(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let x: i32 = arg(args, 0)?;
    Ok((((x as f32 / 65536.0).sin() * 65536.0).round() as i32).to_cell())
}

pub(crate) fn cos_s16(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let x: i16 = arg(args, 0)?;
    Ok((((x as f32 / 256.0).cos() * 256.0).round() as i32 as i16).to_cell())
}

pub(crate) fn cos_s32(_rt: &Runtime, args: &[u64]) -> Result<u64> {
    let x: i32 = arg(args, 0)?;
    Ok((((x as f32 / 65536.0).cos() * 65536.0).round() as i32).to_cell())
}

pub(crate) fn register(module: &mut ScriptModule) {
    let widths: [(BaseType, NativeFn, NativeFn, NativeFn); 6] = [
        (BaseType::S8, minimum::<i8>, maximum::<i8>, clamp::<i8>),
        (BaseType::U8, minimum::<u8>, maximum::<u8>, clamp::<u8>),
        (BaseType::S16, minimum::<i16>, maximum::<i16>, clamp::<i16>),
        (BaseType::U16, minimum::<u16>, maximum::<u16>, clamp::<u16>),
        (BaseType::S32, minimum::<i32>, maximum::<i32>, clamp::<i32>),
        (BaseType::U32, minimum::<u32>, maximum::<u32>, clamp::<u32>),
    ];
    for (data_type, min_fn, max_fn, clamp_fn) in widths {
        let pair = [ParamInfo::new("a", data_type), ParamInfo::new("b", data_type)];
        let triple = [
            ParamInfo::new("a", data_type),
            ParamInfo::new("b", data_type),
            ParamInfo::new("c", data_type),
        ];
        module.add_native_function("min", min_fn, &pair, data_type, CONSTANT);
        module.add_native_function("max", max_fn, &pair, data_type, CONSTANT);
        module.add_native_function("clamp", clamp_fn, &triple, data_type, CONSTANT);
    }

    let abs_overloads: [(BaseType, BaseType, NativeFn); 3] = [
        (BaseType::S8, BaseType::U8, absolute_s8),
        (BaseType::S16, BaseType::U16, absolute_s16),
        (BaseType::S32, BaseType::U32, absolute_s32),
    ];
    for (param, ret, func) in abs_overloads {
        module.add_native_function("abs", func, &[ParamInfo::new("a", param)], ret, CONSTANT);
    }

    module.add_native_function(
        "sqrt",
        sqrt_u32,
        &[ParamInfo::new("a", BaseType::U32)],
        BaseType::U32,
        CONSTANT,
    );

    let trig: [(&str, BaseType, NativeFn); 4] = [
        ("sin_s16", BaseType::S16, sin_s16),
        ("sin_s32", BaseType::S32, sin_s32),
        ("cos_s16", BaseType::S16, cos_s16),
        ("cos_s32", BaseType::S32, cos_s32),
    ];
    for (name, data_type, func) in trig {
        module.add_native_function(name, func, &[ParamInfo::new("x", data_type)], data_type, CONSTANT);
    }
}
