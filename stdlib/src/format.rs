//! The `stringformat` interpreter.
//!
//! Output is built left to right into the runtime's shared format buffer and
//! interned on completion. The directive set is deliberately small: `%s`
//! (string by hash key), `%d`/`%b`/`%x` (decimal/binary/hex), optionally
//! with a minimum digit count (`%04d`, `%012x`), and `%%`. Once the
//! arguments run dry the rest of the format string is appended untouched,
//! escapes included; existing scripts depend on that exact behavior.

use anyhow::Result;
use ignis_core::bytecode::BaseType;
use ignis_core::module::{FLAG_ALLOW_INLINE_EXECUTION, ParamInfo, ScriptModule};
use ignis_core::rt::Runtime;
use ignis_core::strings::StringRef;

use crate::args::arg;

/// Digit writer over the shared output buffer.
struct FormatWriter<'a> {
    out: &'a mut String,
}

impl<'a> FormatWriter<'a> {
    fn new(out: &'a mut String) -> Self {
        Self { out }
    }

    fn add_str(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn add_char(&mut self, c: char) {
        self.out.push(c);
    }

    /// Signed decimal; the sign does not count towards `min_digits`.
    fn add_decimal(&mut self, value: i64, min_digits: usize) {
        if value < 0 {
            self.out.push('-');
        }
        self.add_digits(value.unsigned_abs(), 10, min_digits);
    }

    fn add_binary(&mut self, value: u64, min_digits: usize) {
        self.add_digits(value, 2, min_digits);
    }

    fn add_hex(&mut self, value: u64, min_digits: usize) {
        self.add_digits(value, 16, min_digits);
    }

    fn add_digits(&mut self, mut value: u64, base: u64, min_digits: usize) {
        // 64 binary digits is the worst case
        let mut digits = [0u8; 64];
        let mut count = 0;
        loop {
            let digit = (value % base) as u8;
            digits[count] = if digit < 10 { b'0' + digit } else { b'a' + digit - 10 };
            count += 1;
            value /= base;
            if value == 0 {
                break;
            }
        }
        for _ in count..min_digits {
            self.out.push('0');
        }
        for index in (0..count).rev() {
            self.out.push(digits[index] as char);
        }
    }
}

/// Interprets `fmt` against `args`, appending to `out`.
pub(crate) fn format_into(rt: &Runtime, out: &mut String, fmt: &str, mut args: &[u64]) {
    let mut writer = FormatWriter::new(out);
    let bytes = fmt.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if args.is_empty() {
            // No arguments left: the tail survives verbatim, unprocessed
            // escapes included. Scripts rely on this, never change it.
            writer.add_str(&fmt[i..]);
            break;
        }

        // Copy the run up to the next '%'
        let start = i;
        while i < bytes.len() && bytes[i] != b'%' {
            i += 1;
        }
        if i > start {
            writer.add_str(&fmt[start..i]);
        }
        if i == bytes.len() {
            break;
        }

        let remaining = bytes.len() - i;
        if remaining < 2 {
            writer.add_char('%');
            i += 1;
            continue;
        }

        let mut number_char = 0u8;
        let mut min_digits = 0usize;
        let consumed;
        match bytes[i + 1] {
            b'%' => {
                writer.add_char('%');
                consumed = 2;
            }
            b's' => {
                let key = args[0];
                args = &args[1..];
                match rt.string_ref(key).as_str() {
                    Some(text) => writer.add_str(text),
                    None => writer.add_str("<?>"),
                }
                consumed = 2;
            }
            b'd' | b'b' | b'x' => {
                number_char = bytes[i + 1];
                consumed = 2;
            }
            b'0' if remaining >= 4
                && bytes[i + 2].is_ascii_digit()
                && bytes[i + 2] != b'0'
                && matches!(bytes[i + 3], b'd' | b'b' | b'x') =>
            {
                number_char = bytes[i + 3];
                min_digits = (bytes[i + 2] - b'0') as usize;
                consumed = 4;
            }
            b'0' if remaining >= 5
                && bytes[i + 2].is_ascii_digit()
                && bytes[i + 2] != b'0'
                && bytes[i + 3].is_ascii_digit()
                && matches!(bytes[i + 4], b'd' | b'b' | b'x') =>
            {
                number_char = bytes[i + 4];
                min_digits = ((bytes[i + 2] - b'0') as usize) * 10 + (bytes[i + 3] - b'0') as usize;
                consumed = 5;
            }
            _ => {
                // Not a directive: the '%' goes through verbatim and the
                // next character is handled as a literal
                writer.add_char('%');
                consumed = 1;
            }
        }

        if number_char != 0 {
            let value = args[0];
            args = &args[1..];
            match number_char {
                b'd' => writer.add_decimal(value as i64, min_digits),
                b'b' => writer.add_binary(value, min_digits),
                _ => writer.add_hex(value, min_digits),
            }
        }

        i += consumed;
    }
}

/// `stringformat(fmt, arg1..argK)`: the first cell is the format string's
/// hash key, the rest are the arguments. Returns the interned result's key,
/// or the invalid reference when the format string does not resolve.
pub(crate) fn stringformat(rt: &Runtime, args: &[u64]) -> Result<u64> {
    let key: u64 = arg(args, 0)?;
    let format = rt.string_ref(key);
    let Some(text) = format.as_str() else {
        return Ok(StringRef::invalid().key());
    };
    Ok(rt.with_format_buffer(|buffer| {
        buffer.clear();
        format_into(rt, buffer, text, &args[1..]);
        rt.add_string(buffer)
    }))
}

pub(crate) fn register(module: &mut ScriptModule) {
    const ARG_NAMES: [&str; 8] = ["arg1", "arg2", "arg3", "arg4", "arg5", "arg6", "arg7", "arg8"];
    for arity in 1..=ARG_NAMES.len() {
        let mut params = vec![ParamInfo::new("format", BaseType::U64)];
        for name in &ARG_NAMES[..arity] {
            params.push(ParamInfo::new(name, BaseType::U64));
        }
        module.add_native_function(
            "stringformat",
            stringformat,
            &params,
            BaseType::U64,
            FLAG_ALLOW_INLINE_EXECUTION,
        );
    }
}
