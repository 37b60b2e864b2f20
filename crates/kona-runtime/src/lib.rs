//! Kona Runtime
//!
//! Binds the Kona engine with the standard library: a [`Runtime`] owns a
//! [`RuntimeContext`] whose modules come from a directory of dump files and
//! whose native libraries are the ones named in [`RuntimeOptions`].
//!
//! # Example
//!
//! ```rust,ignore
//! use kona_runtime::{Runtime, RuntimeOptions};
//!
//! let runtime = Runtime::new(RuntimeOptions::with_base_dir("scripts"))?;
//! let exports = runtime.require("main")?;
//! ```

pub mod error;
pub mod options;
pub mod source;

pub use error::RuntimeError;
pub use options::RuntimeOptions;
pub use source::{FileSystemSource, DUMP_EXTENSION};

use std::path::Path;

use kona_engine::vm::CacheStats;
use kona_engine::{DynamicObject, HostLibrary, RuntimeContext, Value};
use kona_stdlib::ConsoleSink;
use tracing::debug;

/// A configured engine instance
pub struct Runtime {
    options: RuntimeOptions,
    context: RuntimeContext,
}

impl Runtime {
    /// Create a runtime whose console writes to stdout
    pub fn new(options: RuntimeOptions) -> Result<Self, RuntimeError> {
        Self::with_console(options, ConsoleSink::Stdout)
    }

    /// Create a runtime whose console writes to `sink`
    pub fn with_console(options: RuntimeOptions, sink: ConsoleSink) -> Result<Self, RuntimeError> {
        let source = FileSystemSource::new(options.base_dir.clone());
        let context = RuntimeContext::with_options(source, options.context_options());

        for name in &options.native_libraries {
            context.register_library(native_library(name, &sink)?);
        }
        debug!(
            base_dir = %options.base_dir.display(),
            libraries = options.native_libraries.len(),
            "runtime ready"
        );

        Ok(Self { options, context })
    }

    /// Options the runtime was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.options
    }

    /// Underlying engine context
    pub fn context(&self) -> &RuntimeContext {
        &self.context
    }

    /// Exports of module `id`, loading it on first use
    pub fn require(&self, id: &str) -> Result<DynamicObject, RuntimeError> {
        Ok(self.context.require(id)?)
    }

    /// Run dump text as an anonymous module and return its value
    pub fn execute(&self, dump: &str) -> Result<Value, RuntimeError> {
        Ok(self.context.execute(dump)?)
    }

    /// Run a dump file as an anonymous module and return its value
    pub fn execute_file(&self, path: impl AsRef<Path>) -> Result<Value, RuntimeError> {
        let dump = std::fs::read_to_string(path.as_ref())?;
        self.execute(&dump)
    }

    /// Call a script function or construct a host type
    pub fn call(&self, callee: &Value, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(self.context.call(callee, args)?)
    }

    /// Invoke member `name` of `target`
    pub fn call_member(&self, target: &Value, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        Ok(self.context.call_member(target, name, args)?)
    }

    // ========================================================================
    // Module cache diagnostics
    // ========================================================================

    /// Ids of every cached module, sorted
    pub fn loaded_modules(&self) -> Vec<String> {
        self.context.modules().ids()
    }

    /// Module cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.context.modules().stats()
    }

    /// Forget every cached module so the next `require` reads it again.
    ///
    /// Exports objects handed out earlier keep their values but are no
    /// longer what `require` returns.
    pub fn reload(&self) {
        let stats = self.cache_stats();
        debug!(
            entries = stats.entries,
            hit_ratio = stats.hit_ratio(),
            "clearing module cache"
        );
        self.context.modules().clear();
    }
}

fn native_library(name: &str, sink: &ConsoleSink) -> Result<HostLibrary, RuntimeError> {
    match name {
        kona_stdlib::CORLIB => Ok(kona_stdlib::corlib_with_console(sink.clone())),
        other => Err(RuntimeError::UnknownLibrary(other.to_string())),
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .field("context", &self.context)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_library_is_rejected() {
        let options = RuntimeOptions {
            native_libraries: vec!["nope".to_string()],
            ..RuntimeOptions::default()
        };
        match Runtime::new(options) {
            Err(RuntimeError::UnknownLibrary(name)) => assert_eq!(name, "nope"),
            other => panic!("expected an unknown library, got {:?}", other),
        }
    }

    #[test]
    fn test_corlib_registered_by_default() {
        let runtime = Runtime::new(RuntimeOptions::default()).unwrap();
        assert!(runtime.context().library("corlib").is_some());
        assert!(runtime.require("corlib").unwrap().has("Kona"));
    }
}
