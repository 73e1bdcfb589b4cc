//! Registration of native functions callable from scripts.
//!
//! Modules attach named, typed functions (and methods on a receiver type)
//! with per-function flag bits the compiler consults: whether the call may
//! be executed inline, and whether it may be constant-folded at compile
//! time.

use anyhow::{Result, anyhow};
use std::collections::HashMap;

use crate::bytecode::BaseType;
use crate::rt::Runtime;

/// The call may be executed inline by the dispatch loop, without a frame.
pub const FLAG_ALLOW_INLINE_EXECUTION: u8 = 0x01;
/// Deterministic; the compiler may fold calls with constant arguments.
pub const FLAG_COMPILE_TIME_CONSTANT: u8 = 0x02;

/// Native functions exchange value cells: arguments and the return value are
/// 64-bit cells re-interpreted per the declared parameter types.
pub type NativeFn = fn(&Runtime, &[u64]) -> Result<u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamInfo {
    pub name: &'static str,
    pub data_type: BaseType,
}

impl ParamInfo {
    pub fn new(name: &'static str, data_type: BaseType) -> Self {
        Self { name, data_type }
    }
}

pub struct NativeFunction {
    pub name: String,
    /// Method receiver type name, `None` for free functions.
    pub receiver: Option<String>,
    pub params: Vec<ParamInfo>,
    pub return_type: BaseType,
    pub flags: u8,
    pub func: NativeFn,
}

impl NativeFunction {
    pub fn is_compile_time_constant(&self) -> bool {
        self.flags & FLAG_COMPILE_TIME_CONSTANT != 0
    }

    pub fn param_types(&self) -> impl Iterator<Item = BaseType> + '_ {
        self.params.iter().map(|p| p.data_type)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("receiver", &self.receiver)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("flags", &self.flags)
            .finish()
    }
}

/// A named group of native functions built by one registration pass.
#[derive(Debug)]
pub struct ScriptModule {
    name: String,
    functions: Vec<NativeFunction>,
}

impl ScriptModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_native_function(
        &mut self,
        name: &str,
        func: NativeFn,
        params: &[ParamInfo],
        return_type: BaseType,
        flags: u8,
    ) {
        self.functions.push(NativeFunction {
            name: name.to_string(),
            receiver: None,
            params: params.to_vec(),
            return_type,
            flags,
            func,
        });
    }

    pub fn add_native_method(
        &mut self,
        receiver: &str,
        name: &str,
        func: NativeFn,
        params: &[ParamInfo],
        return_type: BaseType,
        flags: u8,
    ) {
        self.functions.push(NativeFunction {
            name: name.to_string(),
            receiver: Some(receiver.to_string()),
            params: params.to_vec(),
            return_type,
            flags,
            func,
        });
    }

    pub fn functions(&self) -> &[NativeFunction] {
        &self.functions
    }
}

/// Central registry of every native function visible to the compiler and
/// the dispatch loop. Overloads share a name and differ in parameter types.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    functions: Vec<NativeFunction>,
    by_name: HashMap<String, Vec<usize>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorbs a module's functions. Rejects exact duplicates (same name,
    /// receiver and parameter types).
    pub fn register_module(&mut self, module: ScriptModule) -> Result<()> {
        for function in module.functions {
            let key = registry_key(function.receiver.as_deref(), &function.name);
            let overloads = self.by_name.entry(key).or_default();
            for &index in overloads.iter() {
                let existing = &self.functions[index];
                if existing.params.len() == function.params.len()
                    && existing
                        .param_types()
                        .eq(function.params.iter().map(|p| p.data_type))
                {
                    return Err(anyhow!(
                        "duplicate registration of '{}' with identical parameter types",
                        function.name
                    ));
                }
            }
            overloads.push(self.functions.len());
            self.functions.push(function);
        }
        Ok(())
    }

    pub fn functions_by_name(&self, name: &str) -> Vec<&NativeFunction> {
        self.lookup(registry_key(None, name))
    }

    pub fn methods_of(&self, receiver: &str, name: &str) -> Vec<&NativeFunction> {
        self.lookup(registry_key(Some(receiver), name))
    }

    fn lookup(&self, key: String) -> Vec<&NativeFunction> {
        self.by_name
            .get(&key)
            .map(|indices| indices.iter().map(|&i| &self.functions[i]).collect())
            .unwrap_or_default()
    }

    /// Overload resolution by exact parameter-type match.
    pub fn find_function(&self, name: &str, param_types: &[BaseType]) -> Option<&NativeFunction> {
        self.functions_by_name(name)
            .into_iter()
            .find(|f| f.params.len() == param_types.len() && f.param_types().eq(param_types.iter().copied()))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn registry_key(receiver: Option<&str>, name: &str) -> String {
    match receiver {
        Some(receiver) => format!("{receiver}.{name}"),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(_rt: &Runtime, args: &[u64]) -> Result<u64> {
        Ok(args[0].wrapping_mul(2))
    }

    #[test]
    fn registration_and_overload_lookup() {
        let mut module = ScriptModule::new("test");
        module.add_native_function(
            "double",
            double,
            &[ParamInfo::new("a", BaseType::U32)],
            BaseType::U32,
            FLAG_ALLOW_INLINE_EXECUTION | FLAG_COMPILE_TIME_CONSTANT,
        );
        module.add_native_function(
            "double",
            double,
            &[ParamInfo::new("a", BaseType::S32)],
            BaseType::S32,
            FLAG_ALLOW_INLINE_EXECUTION,
        );

        let mut registry = ModuleRegistry::new();
        registry.register_module(module).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.functions_by_name("double").len(), 2);

        let unsigned = registry.find_function("double", &[BaseType::U32]).unwrap();
        assert!(unsigned.is_compile_time_constant());
        let signed = registry.find_function("double", &[BaseType::S32]).unwrap();
        assert!(!signed.is_compile_time_constant());
        assert!(registry.find_function("double", &[BaseType::U8]).is_none());
    }

    #[test]
    fn duplicate_signatures_are_rejected() {
        let mut registry = ModuleRegistry::new();
        let mut module = ScriptModule::new("a");
        module.add_native_function("f", double, &[ParamInfo::new("a", BaseType::U32)], BaseType::U32, 0);
        registry.register_module(module).unwrap();

        let mut module = ScriptModule::new("b");
        module.add_native_function("f", double, &[ParamInfo::new("x", BaseType::U32)], BaseType::U32, 0);
        assert!(registry.register_module(module).is_err());
    }

    #[test]
    fn methods_are_namespaced_by_receiver() {
        let mut module = ScriptModule::new("test");
        module.add_native_method(
            "string",
            "length",
            double,
            &[ParamInfo::new("str", BaseType::U64)],
            BaseType::U32,
            FLAG_ALLOW_INLINE_EXECUTION,
        );
        let mut registry = ModuleRegistry::new();
        registry.register_module(module).unwrap();

        assert_eq!(registry.methods_of("string", "length").len(), 1);
        assert!(registry.functions_by_name("length").is_empty());
    }
}
