//! Module cache
//!
//! Maps resolved ids to their [`Module`]. Insertion is check-then-insert
//! under one lock, so concurrent first requires of an id create exactly one
//! module; the lock is never held while a module compiles or runs.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::Module;

#[derive(Debug, Default)]
struct Entries {
    modules: FxHashMap<String, Arc<Module>>,
    hits: usize,
    misses: usize,
}

/// Process-wide module table of one runtime context
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: Mutex<Entries>,
}

impl ModuleCache {
    /// Create a new empty module cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a module, counting the hit or miss
    pub fn get(&self, id: &str) -> Option<Arc<Module>> {
        let mut entries = self.entries.lock();
        match entries.modules.get(id).cloned() {
            Some(module) => {
                entries.hits += 1;
                Some(module)
            }
            None => {
                entries.misses += 1;
                None
            }
        }
    }

    /// Return the module for `id`, inserting `create()` if absent.
    ///
    /// The flag is `true` when this call inserted the module.
    pub fn get_or_insert_with(&self, id: &str, create: impl FnOnce() -> Module) -> (Arc<Module>, bool) {
        let mut entries = self.entries.lock();
        if let Some(module) = entries.modules.get(id) {
            return (module.clone(), false);
        }
        let module = Arc::new(create());
        entries.modules.insert(id.to_string(), module.clone());
        (module, true)
    }

    /// Remove a module from the cache
    pub fn invalidate(&self, id: &str) -> Option<Arc<Module>> {
        self.entries.lock().modules.remove(id)
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.modules.clear();
        entries.hits = 0;
        entries.misses = 0;
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        CacheStats {
            entries: entries.modules.len(),
            hits: entries.hits,
            misses: entries.misses,
        }
    }

    /// Check if an id is in the cache
    pub fn contains(&self, id: &str) -> bool {
        self.entries.lock().modules.contains_key(id)
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.entries.lock().modules.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.lock().modules.is_empty()
    }

    /// Get all cached module ids
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().modules.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    /// Number of cached entries
    pub entries: usize,
    /// Number of cache hits
    pub hits: usize,
    /// Number of cache misses
    pub misses: usize,
}

impl CacheStats {
    /// Get cache hit ratio (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::module::ModuleState;

    fn module(id: &str) -> Module {
        Module::new(id, format!("{}.dump", id), String::new(), false)
    }

    #[test]
    fn test_insert_once() {
        let cache = ModuleCache::new();
        let (first, inserted) = cache.get_or_insert_with("main", || module("main"));
        assert!(inserted);
        let (second, inserted) = cache.get_or_insert_with("main", || panic!("must not create twice"));
        assert!(!inserted);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.state(), ModuleState::Cached);
    }

    #[test]
    fn test_cache_miss() {
        let cache = ModuleCache::new();
        assert!(cache.get("nonexistent").is_none());

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_invalidate() {
        let cache = ModuleCache::new();
        cache.get_or_insert_with("main", || module("main"));
        assert!(cache.contains("main"));
        assert!(cache.invalidate("main").is_some());
        assert!(!cache.contains("main"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_clear() {
        let cache = ModuleCache::new();
        cache.get_or_insert_with("b", || module("b"));
        cache.get_or_insert_with("a", || module("a"));
        assert_eq!(cache.ids(), vec!["a".to_string(), "b".to_string()]);
        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_stats() {
        let cache = ModuleCache::new();
        cache.get_or_insert_with("main", || module("main"));

        // One miss
        let _ = cache.get("other");

        // Two hits
        let _ = cache.get("main");
        let _ = cache.get("main");

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_ratio() - 0.666).abs() < 0.01);
    }
}
