//! Module system components
//!
//! A [`Module`] is created on the first `require` of its id, cached in the
//! context's [`ModuleCache`], compiled at most once and invoked at most once.
//! Sources are supplied by a [`ModuleSource`].

mod cache;
mod source;

pub use cache::{CacheStats, ModuleCache};
pub use source::{MemorySource, ModuleSource};

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::compiler::FunctionProto;
use crate::vm::object::DynamicObject;

/// Lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Registered in the cache, not yet compiled
    Cached,
    /// Entry point lowered, body not (successfully) run
    Compiled,
    /// Body ran to completion, or the native library was populated
    Invoked,
}

/// A required module and its exports
pub struct Module {
    id: String,
    filename: String,
    dirname: String,
    native: bool,
    exports: DynamicObject,
    state: Mutex<ModuleState>,
    entry: Mutex<Option<Arc<FunctionProto>>>,
}

impl Module {
    /// Create a module in the `Cached` state with empty exports
    pub fn new(id: &str, filename: String, dirname: String, native: bool) -> Self {
        Self {
            id: id.to_string(),
            filename,
            dirname,
            native,
            exports: DynamicObject::new(),
            state: Mutex::new(ModuleState::Cached),
            entry: Mutex::new(None),
        }
    }

    /// Resolved id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Source file name passed as `__filename`
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Directory passed as `__dirname`
    pub fn dirname(&self) -> &str {
        &self.dirname
    }

    /// Whether the module is a host-native library
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Live exports object
    pub fn exports(&self) -> &DynamicObject {
        &self.exports
    }

    /// Current lifecycle state
    pub fn state(&self) -> ModuleState {
        *self.state.lock()
    }

    pub(crate) fn set_state(&self, state: ModuleState) {
        *self.state.lock() = state;
    }

    /// Compiled entry point, once compiled
    pub fn entry(&self) -> Option<Arc<FunctionProto>> {
        self.entry.lock().clone()
    }

    pub(crate) fn set_entry(&self, entry: Arc<FunctionProto>) {
        *self.entry.lock() = Some(entry);
        self.set_state(ModuleState::Compiled);
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("native", &self.native)
            .field("state", &self.state())
            .finish()
    }
}
