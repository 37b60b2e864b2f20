//! Module sources

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::vm::{VmError, VmResult};

/// Supplies module dumps by id
pub trait ModuleSource: Send + Sync {
    /// Whether a module with this id exists
    fn exists(&self, id: &str) -> bool;

    /// Load the dump text of a module
    fn load(&self, id: &str) -> VmResult<String>;

    /// Value of `__filename` for the module
    fn filename(&self, id: &str) -> String {
        id.to_string()
    }

    /// Value of `__dirname` for the module
    fn dirname(&self, id: &str) -> String {
        match id.rsplit_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => String::new(),
        }
    }
}

/// In-memory module source
#[derive(Debug, Default)]
pub struct MemorySource {
    modules: RwLock<FxHashMap<String, String>>,
}

impl MemorySource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a module
    pub fn insert(&self, id: &str, dump: impl Into<String>) {
        self.modules.write().insert(id.to_string(), dump.into());
    }

    /// Builder form of [`MemorySource::insert`]
    pub fn with_module(self, id: &str, dump: impl Into<String>) -> Self {
        self.insert(id, dump);
        self
    }
}

impl ModuleSource for MemorySource {
    fn exists(&self, id: &str) -> bool {
        self.modules.read().contains_key(id)
    }

    fn load(&self, id: &str) -> VmResult<String> {
        self.modules
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| VmError::ModuleNotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_source() {
        let source = MemorySource::new().with_module("lib/math", "Block");
        assert!(source.exists("lib/math"));
        assert!(!source.exists("math"));
        assert_eq!(source.load("lib/math").unwrap(), "Block");
        assert!(matches!(source.load("math"), Err(VmError::ModuleNotFound { .. })));
        assert_eq!(source.dirname("lib/math"), "lib");
        assert_eq!(source.dirname("main"), "");
        assert_eq!(source.filename("main"), "main");
    }
}
