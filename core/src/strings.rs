//! Interned script strings, identified by 64-bit hash keys.

use std::hash::Hasher;
use std::sync::Arc;
use twox_hash::XxHash64;

use crate::util::fast_map::{FastHashMap, fast_hash_map_with_capacity};

/// Hash key of a script string (XxHash64, seed 0).
pub fn string_hash(text: &str) -> u64 {
    let mut hasher = XxHash64::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// A string interned in a [`StringTable`]; cheap to clone and to compare by
/// key.
#[derive(Debug, Clone)]
pub struct FlyweightString {
    key: u64,
    text: Arc<str>,
}

impl FlyweightString {
    pub fn new(text: &str) -> Self {
        Self {
            key: string_hash(text),
            text: Arc::from(text),
        }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Key-addressed store of interned strings. First writer wins on key
/// collisions, matching the flyweight cache this mirrors.
#[derive(Debug)]
pub struct StringTable {
    entries: FastHashMap<u64, FlyweightString>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            entries: fast_hash_map_with_capacity(64),
        }
    }

    pub fn intern(&mut self, text: &str) -> u64 {
        let entry = FlyweightString::new(text);
        let key = entry.key();
        self.entries.entry(key).or_insert(entry);
        key
    }

    pub fn resolve(&self, key: u64) -> Option<&FlyweightString> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reference to a script string: the hash key plus, when it resolved against
/// a runtime's table, the flyweight entry itself. Valid iff resolved.
#[derive(Debug, Clone, Default)]
pub struct StringRef {
    key: u64,
    resolved: Option<FlyweightString>,
}

impl StringRef {
    /// The canonical invalid reference (key 0, never interned).
    pub fn invalid() -> Self {
        Self::default()
    }

    pub fn from_table(table: &StringTable, key: u64) -> Self {
        Self {
            key,
            resolved: table.resolve(key).cloned(),
        }
    }

    pub fn key(&self) -> u64 {
        self.key
    }

    pub fn is_valid(&self) -> bool {
        self.resolved.is_some()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.resolved.as_ref().map(FlyweightString::as_str)
    }
}
