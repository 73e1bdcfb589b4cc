//! Execution-side state owned by one embedder context.

use anyhow::{Result, anyhow};
use std::sync::{Arc, Mutex};

use crate::exec::memory::MemoryAccess;
use crate::program::{Program, VariableKind};
use crate::strings::{FlyweightString, StringRef, StringTable};
use crate::util::fast_map::{FastHashMap, fast_hash_map_new};

/// Owns the materialized global pool, the interned string table, the shared
/// format buffer and the host memory adapter. The program may be shared
/// read-only across runtimes; a runtime itself belongs to one execution
/// context.
pub struct Runtime {
    program: Arc<Program>,
    /// One slot per global-class variable. Sized at construction and never
    /// reallocated: translated opcodes hold indices into it for the whole
    /// lifetime of the runtime.
    global_pool: Vec<i64>,
    global_slots: FastHashMap<u32, usize>,
    strings: Mutex<StringTable>,
    format_buffer: Mutex<String>,
    memory: Box<dyn MemoryAccess>,
}

impl Runtime {
    pub fn new(program: Arc<Program>, memory: Box<dyn MemoryAccess>) -> Self {
        let mut global_pool = Vec::new();
        let mut global_slots = fast_hash_map_new();
        for variable in program.global_variables() {
            if let VariableKind::Global { initial_value } = variable.kind() {
                global_slots.insert(variable.id, global_pool.len());
                global_pool.push(*initial_value);
            }
        }
        Self {
            program,
            global_pool,
            global_slots,
            strings: Mutex::new(StringTable::new()),
            format_buffer: Mutex::new(String::new()),
            memory,
        }
    }

    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    /// Stable index of a global-class variable's pool slot; valid for the
    /// lifetime of the runtime.
    pub fn access_global_variable_value(&self, id: u32) -> Result<usize> {
        self.global_slots
            .get(&id)
            .copied()
            .ok_or_else(|| anyhow!("variable {:#010x} has no global pool slot", id))
    }

    #[inline]
    pub fn read_global_slot(&self, slot: usize) -> u64 {
        self.global_pool[slot] as u64
    }

    #[inline]
    pub fn write_global_slot(&mut self, slot: usize, value: u64) {
        self.global_pool[slot] = value as i64;
    }

    pub fn memory(&self) -> &dyn MemoryAccess {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> &mut dyn MemoryAccess {
        self.memory.as_mut()
    }

    pub fn resolve_string_by_key(&self, key: u64) -> Option<FlyweightString> {
        self.strings.lock().expect("string table poisoned").resolve(key).cloned()
    }

    /// Reference for `key`, resolved against this runtime's string table;
    /// invalid when the key was never interned here.
    pub fn string_ref(&self, key: u64) -> StringRef {
        StringRef::from_table(&self.strings.lock().expect("string table poisoned"), key)
    }

    pub fn add_string(&self, text: &str) -> u64 {
        self.strings.lock().expect("string table poisoned").intern(text)
    }

    /// Runs `f` with the context's shared format buffer. One formatting call
    /// must finish before the next one starts on the same context.
    pub fn with_format_buffer<R>(&self, f: impl FnOnce(&mut String) -> R) -> R {
        let mut buffer = self.format_buffer.lock().expect("format buffer poisoned");
        f(&mut buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::BaseType;
    use crate::exec::memory::SliceMemory;

    #[test]
    fn global_pool_slots_are_stable_and_seeded() {
        let mut program = Program::new();
        let a = program.define_global_variable("a", BaseType::U32, 11);
        let b = program.define_global_variable("b", BaseType::U8, -2);
        let user = program.define_user_variable("u", BaseType::U32, 0);

        let mut runtime = Runtime::new(Arc::new(program), Box::new(SliceMemory::little_endian(0)));
        let slot_a = runtime.access_global_variable_value(a).unwrap();
        let slot_b = runtime.access_global_variable_value(b).unwrap();
        assert_ne!(slot_a, slot_b);
        assert_eq!(runtime.read_global_slot(slot_a), 11);
        assert_eq!(runtime.read_global_slot(slot_b) as i64, -2);
        assert!(runtime.access_global_variable_value(user).is_err());

        runtime.write_global_slot(slot_a, 0xFFFF);
        assert_eq!(runtime.read_global_slot(slot_a), 0xFFFF);
        assert_eq!(runtime.access_global_variable_value(a).unwrap(), slot_a);
    }

    #[test]
    fn string_interning_round_trips() {
        let runtime = Runtime::new(Arc::new(Program::new()), Box::new(SliceMemory::little_endian(0)));
        let key = runtime.add_string("zone 1");
        let entry = runtime.resolve_string_by_key(key).unwrap();
        assert_eq!(entry.as_str(), "zone 1");
        assert!(runtime.resolve_string_by_key(key ^ 1).is_none());

        let reference = runtime.string_ref(key);
        assert!(reference.is_valid());
        assert_eq!(reference.key(), key);
        assert_eq!(reference.as_str(), Some("zone 1"));
        assert!(!runtime.string_ref(key ^ 1).is_valid());
    }
}
