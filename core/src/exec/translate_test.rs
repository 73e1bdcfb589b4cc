use std::sync::Arc;

use crate::bytecode::{BaseType, Opcode, OpcodeType};
use crate::exec::memory::SliceMemory;
use crate::exec::translate::translation_stats;
use crate::exec::{DefaultOpcodeProvider, FLAG_CALL_IS_BASE_CALL, OpcodeProvider, RuntimeFunction};
use crate::program::Program;
use crate::rt::Runtime;

fn runtime_for(program: Program) -> Runtime {
    Runtime::new(Arc::new(program), Box::new(SliceMemory::little_endian(0x100)))
}

fn push(value: i64) -> Opcode {
    Opcode::new(OpcodeType::PushConstant, BaseType::IntConst, value)
}

#[test]
fn successive_handled_counts_accumulate_backwards() {
    let ops = [
        push(1),
        push(2),
        Opcode::new(OpcodeType::ArithmAdd, BaseType::S32, 0),
        Opcode::untyped(OpcodeType::Jump, 7),
        push(3),
        Opcode::untyped(OpcodeType::Nop, 0),
    ];
    let runtime = runtime_for(Program::new());
    let function = RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    let counts: Vec<u8> = function.opcodes.iter().map(|op| op.successive_handled).collect();
    assert_eq!(counts, vec![3, 2, 1, 0, 2, 1]);
}

#[test]
fn unhandled_opcodes_always_count_zero() {
    let ops = [
        Opcode::untyped(OpcodeType::Jump, 0),
        Opcode::untyped(OpcodeType::Call, 0),
        Opcode::untyped(OpcodeType::Return, 0),
        Opcode::untyped(OpcodeType::ExternalCall, 0),
        Opcode::untyped(OpcodeType::ExternalJump, 0),
        Opcode::untyped(OpcodeType::JumpConditional, 0),
    ];
    let runtime = runtime_for(Program::new());
    let function = RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    for opcode in &function.opcodes {
        assert!(!opcode.exec.is_handled());
        assert_eq!(opcode.successive_handled, 0);
    }
}

#[test]
fn base_call_flag_follows_the_data_type_marker() {
    let runtime = runtime_for(Program::new());
    for opcode_type in [
        OpcodeType::Jump,
        OpcodeType::JumpConditional,
        OpcodeType::Call,
        OpcodeType::Return,
        OpcodeType::ExternalCall,
        OpcodeType::ExternalJump,
    ] {
        let (marked, _) = DefaultOpcodeProvider
            .build_runtime_opcode(&[Opcode::new(opcode_type, BaseType::U8, 0)], &runtime)
            .unwrap();
        assert_eq!(marked.flags & FLAG_CALL_IS_BASE_CALL, FLAG_CALL_IS_BASE_CALL);

        let (plain, consumed) = DefaultOpcodeProvider
            .build_runtime_opcode(&[Opcode::new(opcode_type, BaseType::Void, 0)], &runtime)
            .unwrap();
        assert_eq!(plain.flags & FLAG_CALL_IS_BASE_CALL, 0);
        assert_eq!(consumed, 1);
    }
}

#[test]
fn global_targets_resolve_to_pool_slots_at_translation_time() {
    let mut program = Program::new();
    let id = program.define_global_variable("camera_x", BaseType::U32, 0);
    let runtime = runtime_for(program);
    let slot = runtime.access_global_variable_value(id).unwrap();

    let ops = [Opcode::new(OpcodeType::GetVariableValue, BaseType::U32, id as i64)];
    let function = RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    assert_eq!(function.opcodes[0].parameter, slot as u64);
}

#[test]
fn external_targets_resolve_to_host_addresses_at_translation_time() {
    let mut program = Program::new();
    let id = program.define_external_variable("vblank", BaseType::U8, 0xA0, 1);
    let runtime = runtime_for(program);

    let ops = [Opcode::new(OpcodeType::SetVariableValue, BaseType::U8, id as i64)];
    let function = RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    assert_eq!(function.opcodes[0].parameter, 0xA0);
}

#[test]
fn translator_rejects_malformed_opcodes() {
    let runtime = runtime_for(Program::new());

    // Missing data type on a typed operation
    let bad = [Opcode::new(OpcodeType::ArithmAdd, BaseType::Void, 0)];
    assert!(RuntimeFunction::build(&bad, &DefaultOpcodeProvider, &runtime).is_err());

    // Unknown cast selector
    let bad = [Opcode::new(OpcodeType::CastValue, BaseType::S32, 0x99)];
    assert!(RuntimeFunction::build(&bad, &DefaultOpcodeProvider, &runtime).is_err());

    // Unknown variable class nibble
    let bad = [Opcode::new(OpcodeType::GetVariableValue, BaseType::U32, 0xF000_0000)];
    assert!(RuntimeFunction::build(&bad, &DefaultOpcodeProvider, &runtime).is_err());

    // Empty input to the provider itself
    assert!(DefaultOpcodeProvider.build_runtime_opcode(&[], &runtime).is_err());
}

#[test]
fn translator_rejects_unsupported_external_widths() {
    let mut program = Program::new();
    let id = program.define_external_variable("odd", BaseType::U32, 0x10, 3);
    let runtime = runtime_for(program);
    let bad = [Opcode::new(OpcodeType::GetVariableValue, BaseType::U32, id as i64)];
    assert!(RuntimeFunction::build(&bad, &DefaultOpcodeProvider, &runtime).is_err());
}

#[test]
fn translator_rejects_global_access_to_pool_less_variables() {
    let mut program = Program::new();
    // A user variable id rewritten to claim the global class
    let user = program.define_user_variable("u", BaseType::U32, 0);
    let forged = (user & 0x0FFF_FFFF) | 0x3000_0000;
    let runtime = runtime_for(program);
    let bad = [Opcode::new(OpcodeType::GetVariableValue, BaseType::U32, forged as i64)];
    assert!(RuntimeFunction::build(&bad, &DefaultOpcodeProvider, &runtime).is_err());
}

#[test]
fn translation_is_recorded_in_process_stats() {
    let runtime = runtime_for(Program::new());
    let before = translation_stats();
    let ops = [push(1), Opcode::untyped(OpcodeType::Jump, 0)];
    RuntimeFunction::build(&ops, &DefaultOpcodeProvider, &runtime).unwrap();
    let after = translation_stats();
    assert!(after.functions > before.functions);
    assert!(after.opcodes >= before.opcodes + 2);
    assert!(after.unhandled > before.unhandled);
}

#[test]
fn empty_functions_translate_to_empty_buffers() {
    let runtime = runtime_for(Program::new());
    let function = RuntimeFunction::build(&[], &DefaultOpcodeProvider, &runtime).unwrap();
    assert!(function.is_empty());
    assert_eq!(function.len(), 0);
}
