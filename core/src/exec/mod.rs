//! The runtime interpreter core: dispatch-ready opcodes, their executors,
//! and the per-thread control-flow state they run against.

pub mod control_flow;
pub mod executors;
pub mod memory;
pub mod translate;

#[cfg(test)]
mod translate_test;

pub use control_flow::ControlFlow;
pub use translate::{DefaultOpcodeProvider, OpcodeProvider, RuntimeFunction};

use anyhow::{Result, bail};
use std::fmt;

use crate::bytecode::OpcodeType;
use crate::rt::Runtime;

/// Executors are pure functions of the execution context and the opcode's
/// inline parameter. They never allocate and never block.
pub type ExecFn = fn(&mut ExecContext<'_>, u64) -> Result<()>;

/// Handler slot of a runtime opcode. Control transfers and anything else the
/// outer dispatch loop owns stay `Unhandled`.
#[derive(Clone, Copy)]
pub enum Exec {
    Handled(ExecFn),
    Unhandled,
}

impl Exec {
    pub fn is_handled(&self) -> bool {
        matches!(self, Exec::Handled(_))
    }
}

impl fmt::Debug for Exec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exec::Handled(_) => f.write_str("Handled(..)"),
            Exec::Unhandled => f.write_str("Unhandled"),
        }
    }
}

/// Set on a translated call/jump/return whose data-type marker was nonzero;
/// consumed by the outer dispatch loop. The remaining flag bits are reserved
/// for that loop as well.
pub const FLAG_CALL_IS_BASE_CALL: u8 = 0x01;

/// One dispatch-ready opcode. Created when a function is first prepared for
/// execution, destroyed with its program or runtime; never persisted.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOpcode {
    pub exec: Exec,
    /// Meaning depends on the opcode: inline constant, stack delta, variable
    /// id, resolved global-pool slot or resolved host address.
    pub parameter: u64,
    pub flags: u8,
    pub opcode_type: OpcodeType,
    /// How many consecutive runtime opcodes starting here (inclusive) are
    /// straight-line executable without a control-flow test. Zero for
    /// unhandled opcodes.
    pub successive_handled: u8,
}

/// Everything an executor may touch: the owning thread's control-flow state
/// plus the runtime's global pool and host memory.
pub struct ExecContext<'a> {
    pub flow: &'a mut ControlFlow,
    pub runtime: &'a mut Runtime,
}

impl<'a> ExecContext<'a> {
    pub fn new(flow: &'a mut ControlFlow, runtime: &'a mut Runtime) -> Self {
        Self { flow, runtime }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// Executed one handled opcode.
    Continue,
    /// Reached a control-transfer opcode the outer loop must execute.
    Boundary,
    /// Ran past the end of the function.
    Finished,
}

/// Minimal dispatch surface over a translated function. Jumps, calls and
/// frame management belong to the embedder: `step`/`run_batch` stop at every
/// control-transfer opcode and the embedder re-positions the interpreter
/// with [`Interpreter::jump_to`].
pub struct Interpreter<'a> {
    function: &'a RuntimeFunction,
    pc: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(function: &'a RuntimeFunction) -> Self {
        Self { function, pc: 0 }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn jump_to(&mut self, pc: usize) {
        self.pc = pc;
    }

    pub fn current(&self) -> Option<&'a RuntimeOpcode> {
        self.function.opcodes.get(self.pc)
    }

    /// Executes the opcode at the current position. Host-memory traps and
    /// executor failures propagate out unchanged.
    pub fn step(&mut self, ctx: &mut ExecContext<'_>) -> Result<StepResult> {
        let Some(opcode) = self.function.opcodes.get(self.pc) else {
            return Ok(StepResult::Finished);
        };
        match opcode.exec {
            Exec::Handled(exec) => {
                exec(ctx, opcode.parameter)?;
                self.pc += 1;
                Ok(StepResult::Continue)
            }
            Exec::Unhandled if opcode.opcode_type.is_control_transfer() => Ok(StepResult::Boundary),
            Exec::Unhandled => bail!("unhandled opcode {:?} reached at runtime", opcode.opcode_type),
        }
    }

    /// Executes the whole straight-line batch starting at the current
    /// position without per-opcode re-dispatch, using the translated
    /// `successive_handled` count.
    pub fn run_batch(&mut self, ctx: &mut ExecContext<'_>) -> Result<StepResult> {
        let Some(opcode) = self.function.opcodes.get(self.pc) else {
            return Ok(StepResult::Finished);
        };
        let count = opcode.successive_handled as usize;
        if count == 0 {
            return self.step(ctx);
        }
        for offset in 0..count {
            let opcode = &self.function.opcodes[self.pc + offset];
            match opcode.exec {
                Exec::Handled(exec) => exec(ctx, opcode.parameter)?,
                Exec::Unhandled => bail!("unhandled opcode {:?} inside straight-line batch", opcode.opcode_type),
            }
        }
        self.pc += count;
        Ok(StepResult::Continue)
    }

    /// Drives batches until the next control-flow boundary or the end of the
    /// function.
    pub fn run(&mut self, ctx: &mut ExecContext<'_>) -> Result<StepResult> {
        loop {
            match self.run_batch(ctx)? {
                StepResult::Continue => {}
                other => return Ok(other),
            }
        }
    }
}
