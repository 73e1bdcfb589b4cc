use std::sync::Arc;

use ignis_core::bytecode::BaseType;
use ignis_core::exec::memory::SliceMemory;
use ignis_core::module::ModuleRegistry;
use ignis_core::program::Program;
use ignis_core::rt::Runtime;

use crate::format::stringformat;
use crate::register_standard_library;

fn runtime() -> Runtime {
    Runtime::new(Arc::new(Program::new()), Box::new(SliceMemory::little_endian(0)))
}

fn fmt(rt: &Runtime, format: &str, args: &[u64]) -> String {
    let mut cells = vec![rt.add_string(format)];
    cells.extend_from_slice(args);
    let key = stringformat(rt, &cells).unwrap();
    rt.resolve_string_by_key(key)
        .map(|entry| entry.as_str().to_string())
        .unwrap_or_else(|| panic!("formatted result did not intern"))
}

#[test]
fn decimal_with_minimum_digits() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "Score: %05d pts", &[42]), "Score: 00042 pts");
    assert_eq!(fmt(&rt, "%d", &[42]), "42");
    assert_eq!(fmt(&rt, "%d", &[0]), "0");
}

#[test]
fn decimal_is_signed() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%d", &[(-5i64) as u64]), "-5");
    assert_eq!(fmt(&rt, "%d", &[u64::MAX]), "-1");
    assert_eq!(fmt(&rt, "%d", &[i64::MIN as u64]), "-9223372036854775808");
    // The sign does not count towards the digit minimum
    assert_eq!(fmt(&rt, "%05d", &[(-42i64) as u64]), "-00042");
}

#[test]
fn hex_is_lowercase_and_unsigned() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%x", &[0xDEAD_BEEF]), "deadbeef");
    assert_eq!(fmt(&rt, "%x", &[0]), "0");
    assert_eq!(fmt(&rt, "%08x", &[0xBEEF]), "0000beef");
    assert_eq!(fmt(&rt, "%x", &[(-1i64) as u64]), "ffffffffffffffff");
}

#[test]
fn binary_is_most_significant_bit_first() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%b", &[5]), "101");
    assert_eq!(fmt(&rt, "%08b", &[5]), "00000101");
    assert_eq!(fmt(&rt, "%b", &[0]), "0");
}

#[test]
fn two_digit_minimum_widths() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%012x", &[0xAB]), "0000000000ab");
    assert_eq!(fmt(&rt, "%016b", &[3]), "0000000000000011");
}

#[test]
fn string_directive_resolves_against_the_table() {
    let rt = runtime();
    let x = rt.add_string("X");
    assert_eq!(fmt(&rt, "%x-%s", &[0xABCD, x]), "abcd-X");
    assert_eq!(fmt(&rt, "%x-%s", &[0xABCD, 0x12345]), "abcd-<?>");
}

#[test]
fn exhausted_arguments_preserve_the_tail_verbatim() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%d and %d", &[7]), "7 and %d");
    assert_eq!(fmt(&rt, "%d, %s, %05x tail", &[1]), "1, %s, %05x tail");
}

#[test]
fn percent_escapes() {
    let rt = runtime();
    // An escaped '%' does not consume an argument
    assert_eq!(fmt(&rt, "a%%b%d", &[5]), "a%b5");
    assert_eq!(fmt(&rt, "100%%", &[1]), "100%");
}

#[test]
fn unknown_directives_pass_through() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%q", &[1]), "%q");
    assert_eq!(fmt(&rt, "50%", &[1]), "50%");
    // '0' without a width digit is not a directive either
    assert_eq!(fmt(&rt, "%0d", &[1]), "%0d");
}

#[test]
fn literal_text_without_directives() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "just text", &[1]), "just text");
}

#[test]
fn decimal_round_trips_across_the_i64_range() {
    let rt = runtime();
    for value in [0i64, 1, -1, 42, -42, i64::MAX, i64::MIN, 1_000_000_007, -987_654_321] {
        let rendered = fmt(&rt, "%d", &[value as u64]);
        assert_eq!(rendered.parse::<i64>().unwrap(), value);
    }
}

#[test]
fn unresolved_format_string_yields_the_invalid_ref() {
    let rt = runtime();
    assert_eq!(stringformat(&rt, &[0xF00D, 1]).unwrap(), 0);
}

#[test]
fn the_shared_buffer_is_reused_across_calls() {
    let rt = runtime();
    assert_eq!(fmt(&rt, "%d", &[11]), "11");
    assert_eq!(fmt(&rt, "%d", &[7]), "7");
    assert_eq!(fmt(&rt, "long %s tail", &[rt.add_string("middle")]), "long middle tail");
}

#[test]
fn stringformat_registers_eight_arities() {
    let mut registry = ModuleRegistry::new();
    register_standard_library(&mut registry).unwrap();

    let overloads = registry.functions_by_name("stringformat");
    assert_eq!(overloads.len(), 8);
    for function in overloads {
        assert!(!function.is_compile_time_constant());
    }

    let two_args = registry
        .find_function("stringformat", &[BaseType::U64, BaseType::U64, BaseType::U64])
        .unwrap();
    assert_eq!(two_args.params[0].name, "format");
    assert_eq!(two_args.params[2].name, "arg2");
}
