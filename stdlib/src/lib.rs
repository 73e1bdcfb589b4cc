//! Standard library of the ignis scripting runtime: arithmetic and
//! fixed-point math primitives, string access, and the format-string
//! interpreter, registered as native functions the compiler and dispatch
//! loop resolve by name and parameter types.

pub mod format;
pub mod math;
pub mod string;

#[cfg(test)]
mod format_test;

use anyhow::Result;
use ignis_core::module::{ModuleRegistry, ScriptModule};

/// Register the whole standard library with the given registry.
pub fn register_standard_library(registry: &mut ModuleRegistry) -> Result<()> {
    let mut module = ScriptModule::new("standard");
    math::register(&mut module);
    string::register(&mut module);
    format::register(&mut module);
    registry.register_module(module)
}

pub(crate) mod args {
    use anyhow::{Result, anyhow};
    use ignis_core::value::Cell;

    /// Typed view of the `index`-th argument cell.
    pub fn arg<T: Cell>(args: &[u64], index: usize) -> Result<T> {
        args.get(index)
            .copied()
            .map(T::from_cell)
            .ok_or_else(|| anyhow!("missing argument {}", index))
    }
}
