//! The compiled program as seen by the runtime core: global-variable
//! declarations addressable by id.

use anyhow::{Result, anyhow};
use std::sync::atomic::{AtomicI64, Ordering};

use crate::bytecode::BaseType;
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Bits 31..28 of a variable id select its class.
pub const VARIABLE_CLASS_SHIFT: u32 = 28;

/// Bits 27..0 of a variable id are the index within its class.
pub fn variable_index(id: u32) -> usize {
    (id & 0x0FFF_FFFF) as usize
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VariableClass {
    /// Index into the current frame's local-variable buffer.
    Local = 0x1,
    /// Script-defined global, stored in the program itself.
    User = 0x2,
    /// Engine-managed global, materialized in the runtime's global pool.
    Global = 0x3,
    /// Host variable at a fixed address with a declared byte width.
    External = 0x4,
}

impl VariableClass {
    pub fn of(id: u32) -> Result<Self> {
        Ok(match id >> VARIABLE_CLASS_SHIFT {
            0x1 => VariableClass::Local,
            0x2 => VariableClass::User,
            0x3 => VariableClass::Global,
            0x4 => VariableClass::External,
            other => {
                return Err(anyhow!(
                    "unknown variable class {:#x} in id {:#010x}",
                    other,
                    id
                ));
            }
        })
    }

    pub fn make_id(self, index: u32) -> u32 {
        debug_assert!(index <= 0x0FFF_FFFF);
        ((self as u32) << VARIABLE_CLASS_SHIFT) | index
    }
}

/// Class-specific storage of a non-local variable.
#[derive(Debug)]
pub enum VariableKind {
    /// Value lives in the program; reads and writes go through
    /// [`GlobalVariable::value`] / [`GlobalVariable::set_value`].
    User(AtomicI64),
    /// Value lives in the runtime's global pool, seeded from
    /// `initial_value` when the runtime is built.
    Global { initial_value: i64 },
    /// Value lives in host memory at a fixed address.
    External { address: u64, bytes: u8 },
}

#[derive(Debug)]
pub struct GlobalVariable {
    pub id: u32,
    pub name: String,
    pub data_type: BaseType,
    kind: VariableKind,
}

impl GlobalVariable {
    pub fn kind(&self) -> &VariableKind {
        &self.kind
    }

    pub fn class(&self) -> VariableClass {
        // Ids are minted by `Program`, the class nibble is always valid.
        VariableClass::of(self.id).expect("variable id minted with valid class")
    }

    /// Current value of a user-class variable. Other classes read 0 here;
    /// their storage lives in the runtime pool or in host memory.
    pub fn value(&self) -> i64 {
        match &self.kind {
            VariableKind::User(value) => value.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    /// Writes a user-class variable; no effect on other classes.
    pub fn set_value(&self, value: i64) {
        if let VariableKind::User(cell) = &self.kind {
            cell.store(value, Ordering::Relaxed);
        }
    }
}

/// Global-variable declarations of a compiled program. Shared read-only
/// between runtimes; user-class values are atomics so sharing stays sound
/// under the outer loop's single-writer contract.
#[derive(Debug)]
pub struct Program {
    globals: FastHashMap<u32, GlobalVariable>,
    next_index: u32,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            globals: fast_hash_map_new(),
            next_index: 0,
        }
    }

    fn define(&mut self, class: VariableClass, name: &str, data_type: BaseType, kind: VariableKind) -> u32 {
        let id = class.make_id(self.next_index);
        self.next_index += 1;
        self.globals.insert(
            id,
            GlobalVariable {
                id,
                name: name.to_string(),
                data_type,
                kind,
            },
        );
        id
    }

    pub fn define_user_variable(&mut self, name: &str, data_type: BaseType, initial_value: i64) -> u32 {
        self.define(
            VariableClass::User,
            name,
            data_type,
            VariableKind::User(AtomicI64::new(initial_value)),
        )
    }

    pub fn define_global_variable(&mut self, name: &str, data_type: BaseType, initial_value: i64) -> u32 {
        self.define(
            VariableClass::Global,
            name,
            data_type,
            VariableKind::Global { initial_value },
        )
    }

    pub fn define_external_variable(&mut self, name: &str, data_type: BaseType, address: u64, bytes: u8) -> u32 {
        self.define(
            VariableClass::External,
            name,
            data_type,
            VariableKind::External { address, bytes },
        )
    }

    pub fn global_variable_by_id(&self, id: u32) -> Result<&GlobalVariable> {
        self.globals
            .get(&id)
            .ok_or_else(|| anyhow!("no global variable with id {:#010x}", id))
    }

    pub fn global_variables(&self) -> impl Iterator<Item = &GlobalVariable> {
        self.globals.values()
    }
}
