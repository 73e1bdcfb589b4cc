//! Lowers static opcodes into dispatch-ready runtime opcodes.
//!
//! Specialization on width and signedness happens here, once per function,
//! so the execution loop stays branch-free on type. Global- and
//! external-class variable targets are resolved to stable pool slots and
//! host addresses at the same time.

use anyhow::{Result, anyhow, bail};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;

use super::executors::*;
use super::{Exec, ExecFn, FLAG_CALL_IS_BASE_CALL, RuntimeOpcode};
use crate::bytecode::{BaseType, CastType, Opcode, OpcodeType};
use crate::program::{VariableClass, VariableKind};
use crate::rt::Runtime;

const TRACE_TARGET: &str = "ignis::exec::translate";

/// Turns a slice of static opcodes into one runtime opcode, reporting how
/// many static opcodes were consumed. The default provider consumes exactly
/// one and never fuses; fusing providers may consume several.
pub trait OpcodeProvider {
    fn build_runtime_opcode(&self, opcodes: &[Opcode], runtime: &Runtime) -> Result<(RuntimeOpcode, usize)>;
}

macro_rules! exec_for_data_type {
    ($func:ident, $opcode:expr) => {
        match $opcode.data_type {
            BaseType::S8 => $func::<i8> as ExecFn,
            BaseType::S16 => $func::<i16> as ExecFn,
            BaseType::S32 => $func::<i32> as ExecFn,
            BaseType::S64 => $func::<i64> as ExecFn,
            BaseType::U8 => $func::<u8> as ExecFn,
            BaseType::U16 => $func::<u16> as ExecFn,
            BaseType::U32 => $func::<u32> as ExecFn,
            BaseType::U64 | BaseType::IntConst => $func::<u64> as ExecFn,
            BaseType::Void => bail!(
                "invalid data type {:?} for opcode {:?}",
                $opcode.data_type,
                $opcode.opcode_type
            ),
        }
    };
}

macro_rules! exec_for_signed_data_type {
    ($func:ident, $opcode:expr) => {
        match $opcode.data_type.to_signed() {
            Some(BaseType::S8) => $func::<i8> as ExecFn,
            Some(BaseType::S16) => $func::<i16> as ExecFn,
            Some(BaseType::S32) => $func::<i32> as ExecFn,
            Some(BaseType::S64) => $func::<i64> as ExecFn,
            Some(BaseType::IntConst) => $func::<i64> as ExecFn,
            _ => bail!(
                "invalid data type {:?} for opcode {:?}",
                $opcode.data_type,
                $opcode.opcode_type
            ),
        }
    };
}

macro_rules! exec_for_width {
    ($func:ident, $bytes:expr) => {
        match $bytes {
            1 => $func::<u8> as ExecFn,
            2 => $func::<u16> as ExecFn,
            4 => $func::<u32> as ExecFn,
            8 => $func::<u64> as ExecFn,
            other => bail!("unsupported variable width of {} bytes", other),
        }
    };
}

pub struct DefaultOpcodeProvider;

impl OpcodeProvider for DefaultOpcodeProvider {
    fn build_runtime_opcode(&self, opcodes: &[Opcode], runtime: &Runtime) -> Result<(RuntimeOpcode, usize)> {
        let opcode = opcodes
            .first()
            .ok_or_else(|| anyhow!("no static opcode to translate"))?;

        let mut out = RuntimeOpcode {
            exec: Exec::Unhandled,
            parameter: opcode.parameter as u64,
            flags: 0,
            opcode_type: opcode.opcode_type,
            successive_handled: 0,
        };

        let exec: ExecFn = match opcode.opcode_type {
            OpcodeType::Nop => exec_nop,

            OpcodeType::MoveStack => {
                if opcode.parameter >= 0 {
                    exec_move_stack_positive
                } else if opcode.parameter == -1 {
                    exec_move_stack_m1
                } else {
                    exec_move_stack_negative
                }
            }

            OpcodeType::MoveVarStack => {
                if opcode.parameter >= 0 {
                    exec_move_var_stack_positive
                } else {
                    exec_move_var_stack_negative
                }
            }

            OpcodeType::PushConstant => exec_push_constant,
            OpcodeType::Duplicate => exec_duplicate,
            OpcodeType::Exchange => exec_exchange,

            OpcodeType::GetVariableValue => {
                let id = opcode.parameter as u32;
                match VariableClass::of(id)? {
                    VariableClass::Local => exec_get_variable_value_local,
                    VariableClass::User => exec_get_variable_value_user,
                    VariableClass::Global => {
                        out.parameter = runtime.access_global_variable_value(id)? as u64;
                        exec_for_width!(exec_get_variable_value_global, opcode.data_type.size_in_bytes())
                    }
                    VariableClass::External => {
                        let (address, bytes) = external_target(runtime, id)?;
                        out.parameter = address;
                        exec_for_width!(exec_get_variable_value_external, bytes)
                    }
                }
            }

            OpcodeType::SetVariableValue => {
                let id = opcode.parameter as u32;
                match VariableClass::of(id)? {
                    VariableClass::Local => exec_set_variable_value_local,
                    VariableClass::User => exec_set_variable_value_user,
                    VariableClass::Global => {
                        out.parameter = runtime.access_global_variable_value(id)? as u64;
                        exec_for_width!(exec_set_variable_value_global, opcode.data_type.size_in_bytes())
                    }
                    VariableClass::External => {
                        let (address, bytes) = external_target(runtime, id)?;
                        out.parameter = address;
                        exec_for_width!(exec_set_variable_value_external, bytes)
                    }
                }
            }

            OpcodeType::ReadMemory => {
                if opcode.parameter == 0 {
                    exec_for_data_type!(exec_read_memory, opcode)
                } else {
                    exec_for_data_type!(exec_read_memory_noconsume, opcode)
                }
            }

            OpcodeType::WriteMemory => {
                if opcode.parameter == 0 {
                    exec_for_data_type!(exec_write_memory, opcode)
                } else {
                    exec_for_data_type!(exec_write_memory_exchanged, opcode)
                }
            }

            OpcodeType::CastValue => {
                let cast = CastType::from_code(opcode.parameter as u8)
                    .ok_or_else(|| anyhow!("unrecognized cast type {:#x}", opcode.parameter))?;
                match cast.exec_type() {
                    BaseType::S8 => exec_cast_value::<i8> as ExecFn,
                    BaseType::S16 => exec_cast_value::<i16> as ExecFn,
                    BaseType::S32 => exec_cast_value::<i32> as ExecFn,
                    BaseType::U8 => exec_cast_value::<u8> as ExecFn,
                    BaseType::U16 => exec_cast_value::<u16> as ExecFn,
                    BaseType::U32 => exec_cast_value::<u32> as ExecFn,
                    other => bail!("unrecognized cast exec type {:?}", other),
                }
            }

            OpcodeType::MakeBool => exec_make_bool,

            OpcodeType::ArithmAdd => exec_for_data_type!(exec_arithm_add, opcode),
            OpcodeType::ArithmSub => exec_for_data_type!(exec_arithm_sub, opcode),
            OpcodeType::ArithmMul => exec_for_data_type!(exec_arithm_mul, opcode),
            OpcodeType::ArithmDiv => exec_for_data_type!(exec_arithm_div, opcode),
            OpcodeType::ArithmMod => exec_for_data_type!(exec_arithm_mod, opcode),
            OpcodeType::ArithmAnd => exec_for_data_type!(exec_arithm_and, opcode),
            OpcodeType::ArithmOr => exec_for_data_type!(exec_arithm_or, opcode),
            OpcodeType::ArithmXor => exec_for_data_type!(exec_arithm_xor, opcode),
            OpcodeType::ArithmShl => exec_for_data_type!(exec_arithm_shl, opcode),
            OpcodeType::ArithmShr => exec_for_data_type!(exec_arithm_shr, opcode),

            OpcodeType::CompareEq => exec_for_data_type!(exec_compare_eq, opcode),
            OpcodeType::CompareNeq => exec_for_data_type!(exec_compare_neq, opcode),
            OpcodeType::CompareLt => exec_for_data_type!(exec_compare_lt, opcode),
            OpcodeType::CompareLe => exec_for_data_type!(exec_compare_le, opcode),
            OpcodeType::CompareGt => exec_for_data_type!(exec_compare_gt, opcode),
            OpcodeType::CompareGe => exec_for_data_type!(exec_compare_ge, opcode),

            OpcodeType::ArithmNeg => exec_for_signed_data_type!(exec_arithm_neg, opcode),
            OpcodeType::ArithmNot => exec_for_data_type!(exec_arithm_not, opcode),
            OpcodeType::ArithmBitnot => exec_for_data_type!(exec_arithm_bitnot, opcode),

            OpcodeType::Jump
            | OpcodeType::JumpConditional
            | OpcodeType::Call
            | OpcodeType::Return
            | OpcodeType::ExternalCall
            | OpcodeType::ExternalJump => {
                if opcode.data_type != BaseType::Void {
                    out.flags |= FLAG_CALL_IS_BASE_CALL;
                }
                return Ok((out, 1));
            }
        };

        out.exec = Exec::Handled(exec);
        out.successive_handled = 1;
        Ok((out, 1))
    }
}

fn external_target(runtime: &Runtime, id: u32) -> Result<(u64, usize)> {
    let variable = runtime.program().global_variable_by_id(id)?;
    match variable.kind() {
        VariableKind::External { address, bytes } => Ok((*address, *bytes as usize)),
        _ => bail!("variable {:#010x} is not external", id),
    }
}

/// A function's runtime opcodes, ready for dispatch.
#[derive(Debug)]
pub struct RuntimeFunction {
    pub opcodes: Vec<RuntimeOpcode>,
}

impl RuntimeFunction {
    /// Translates a whole function and accumulates the straight-line batch
    /// counts the outer loop uses to skip per-opcode dispatch.
    pub fn build(static_opcodes: &[Opcode], provider: &dyn OpcodeProvider, runtime: &Runtime) -> Result<Self> {
        let mut opcodes = Vec::with_capacity(static_opcodes.len());
        let mut index = 0;
        while index < static_opcodes.len() {
            let (opcode, consumed) = provider.build_runtime_opcode(&static_opcodes[index..], runtime)?;
            debug_assert!(consumed >= 1);
            opcodes.push(opcode);
            index += consumed;
        }

        for i in (0..opcodes.len().saturating_sub(1)).rev() {
            if opcodes[i].successive_handled != 0 {
                opcodes[i].successive_handled = opcodes[i + 1].successive_handled.saturating_add(1);
            }
        }

        let unhandled = opcodes.iter().filter(|op| !op.exec.is_handled()).count();
        record_translation(opcodes.len(), unhandled);
        debug!(
            target: TRACE_TARGET,
            total = opcodes.len(),
            unhandled,
            "translated function"
        );
        Ok(Self { opcodes })
    }

    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }
}

#[derive(Default)]
struct TranslationMetrics {
    functions: u64,
    opcodes: u64,
    unhandled: u64,
}

static METRICS: Lazy<Mutex<TranslationMetrics>> = Lazy::new(|| Mutex::new(TranslationMetrics::default()));

fn record_translation(opcodes: usize, unhandled: usize) {
    let mut guard = METRICS.lock().expect("translation metrics poisoned");
    guard.functions += 1;
    guard.opcodes += opcodes as u64;
    guard.unhandled += unhandled as u64;
}

/// Process-wide translation counters, for embedder diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationStats {
    pub functions: u64,
    pub opcodes: u64,
    pub unhandled: u64,
}

pub fn translation_stats() -> TranslationStats {
    let guard = METRICS.lock().expect("translation metrics poisoned");
    TranslationStats {
        functions: guard.functions,
        opcodes: guard.opcodes,
        unhandled: guard.unhandled,
    }
}
