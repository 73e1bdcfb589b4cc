//! String access primitives over the runtime's interned string table.
//!
//! Script strings travel as 64-bit hash keys; out-of-range and unresolvable
//! inputs degrade to 0 / the empty result instead of faulting.

use anyhow::Result;
use ignis_core::bytecode::BaseType;
use ignis_core::module::{FLAG_ALLOW_INLINE_EXECUTION, ParamInfo, ScriptModule};
use ignis_core::rt::Runtime;
use ignis_core::strings::StringRef;

use crate::args::arg;

pub(crate) fn string_length(rt: &Runtime, args: &[u64]) -> Result<u64> {
    let key: u64 = arg(args, 0)?;
    let string = rt.string_ref(key);
    Ok(string.as_str().map_or(0, |text| text.len() as u64))
}

pub(crate) fn string_get_character(rt: &Runtime, args: &[u64]) -> Result<u64> {
    let key: u64 = arg(args, 0)?;
    let index: u32 = arg(args, 1)?;
    let string = rt.string_ref(key);
    let Some(text) = string.as_str() else {
        return Ok(0);
    };
    Ok(text.as_bytes().get(index as usize).copied().unwrap_or(0) as u64)
}

pub(crate) fn string_get_sub_string(rt: &Runtime, args: &[u64]) -> Result<u64> {
    let key: u64 = arg(args, 0)?;
    let index: u32 = arg(args, 1)?;
    let length: u32 = arg(args, 2)?;
    let string = rt.string_ref(key);
    let Some(text) = string.as_str() else {
        return Ok(StringRef::invalid().key());
    };
    let bytes = text.as_bytes();
    let start = (index as usize).min(bytes.len());
    let end = start.saturating_add(length as usize).min(bytes.len());
    let part = String::from_utf8_lossy(&bytes[start..end]);
    Ok(rt.add_string(&part))
}

pub(crate) fn get_string_from_hash(rt: &Runtime, args: &[u64]) -> Result<u64> {
    let key: u64 = arg(args, 0)?;
    let string = rt.string_ref(key);
    Ok(if string.is_valid() {
        string.key()
    } else {
        StringRef::invalid().key()
    })
}

pub(crate) fn register(module: &mut ScriptModule) {
    // String references travel as 64-bit hash keys in the cell ABI
    let str_param = |name| ParamInfo::new(name, BaseType::U64);

    module.add_native_function(
        "strlen",
        string_length,
        &[str_param("str")],
        BaseType::U32,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
    module.add_native_function(
        "getchar",
        string_get_character,
        &[str_param("str"), ParamInfo::new("index", BaseType::U32)],
        BaseType::U8,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
    module.add_native_function(
        "substring",
        string_get_sub_string,
        &[
            str_param("str"),
            ParamInfo::new("index", BaseType::U32),
            ParamInfo::new("length", BaseType::U32),
        ],
        BaseType::U64,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
    module.add_native_function(
        "getStringFromHash",
        get_string_from_hash,
        &[ParamInfo::new("hash", BaseType::U64)],
        BaseType::U64,
        FLAG_ALLOW_INLINE_EXECUTION,
    );

    module.add_native_method(
        "string",
        "length",
        string_length,
        &[str_param("str")],
        BaseType::U32,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
    module.add_native_method(
        "string",
        "getCharacter",
        string_get_character,
        &[str_param("str"), ParamInfo::new("index", BaseType::U32)],
        BaseType::U8,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
    module.add_native_method(
        "string",
        "getSubString",
        string_get_sub_string,
        &[
            str_param("str"),
            ParamInfo::new("index", BaseType::U32),
            ParamInfo::new("length", BaseType::U32),
        ],
        BaseType::U64,
        FLAG_ALLOW_INLINE_EXECUTION,
    );
}
