//! Runtime context
//!
//! A [`RuntimeContext`] owns everything a running program shares: the
//! canonical dispatch sites, the module cache, the global object that
//! late-bound names and `this` at module level refer to, the registered
//! host libraries and the module source. Handles are cheap to clone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compiler::{lower_module, FunctionProto};
use crate::parser::decode;
use crate::vm::dispatch::DispatchSites;
use crate::vm::function::Function;
use crate::vm::interpreter::{Env, Interpreter};
use crate::vm::module::{Module, ModuleCache, ModuleSource, ModuleState};
use crate::vm::object::DynamicObject;
use crate::vm::reflect::HostLibrary;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Parameters every module body is lowered with, in order
pub const MODULE_PARAMS: [&str; 5] = ["exports", "require", "module", "__filename", "__dirname"];

/// Options for creating a RuntimeContext
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Nested calls allowed before `StackOverflow`
    pub max_call_depth: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self { max_call_depth: 200 }
    }
}

struct ContextInner {
    options: ContextOptions,
    sites: DispatchSites,
    modules: ModuleCache,
    globals: DynamicObject,
    libraries: RwLock<FxHashMap<String, Arc<HostLibrary>>>,
    source: Arc<dyn ModuleSource>,
    root_env: Arc<Env>,
    anonymous: AtomicUsize,
}

/// Shared execution state of one program
#[derive(Clone)]
pub struct RuntimeContext(Arc<ContextInner>);

impl RuntimeContext {
    /// Create a context over `source` with default options
    pub fn new(source: impl ModuleSource + 'static) -> Self {
        Self::with_options(source, ContextOptions::default())
    }

    /// Create a context over `source` with specific options
    pub fn with_options(source: impl ModuleSource + 'static, options: ContextOptions) -> Self {
        Self::with_shared_source(Arc::new(source), options)
    }

    /// Create a context over an already shared source
    pub fn with_shared_source(source: Arc<dyn ModuleSource>, options: ContextOptions) -> Self {
        Self(Arc::new(ContextInner {
            options,
            sites: DispatchSites::new(),
            modules: ModuleCache::new(),
            globals: DynamicObject::new(),
            libraries: RwLock::new(FxHashMap::default()),
            source,
            root_env: Env::root(),
            anonymous: AtomicUsize::new(0),
        }))
    }

    /// Context options
    pub fn options(&self) -> &ContextOptions {
        &self.0.options
    }

    /// Canonical dispatch sites
    pub fn sites(&self) -> &DispatchSites {
        &self.0.sites
    }

    /// Module cache
    pub fn modules(&self) -> &ModuleCache {
        &self.0.modules
    }

    /// Global object consulted by late-bound names
    pub fn globals(&self) -> &DynamicObject {
        &self.0.globals
    }

    /// Register a host library under its id, replacing any previous one
    pub fn register_library(&self, library: HostLibrary) -> Arc<HostLibrary> {
        let library = Arc::new(library);
        debug!(library = library.id(), types = library.types().len(), "registered host library");
        self.0
            .libraries
            .write()
            .insert(library.id().to_string(), library.clone());
        library
    }

    /// Registered library by id
    pub fn library(&self, id: &str) -> Option<Arc<HostLibrary>> {
        self.0.libraries.read().get(id).cloned()
    }

    // ========================================================================
    // Modules
    // ========================================================================

    /// Return the exports of module `id`, loading it on first use.
    ///
    /// A leading `./` is ignored. Later requires of the same id return the
    /// same exports object without running the body again, including while
    /// the body is still running (circular requires).
    pub fn require(&self, id: &str) -> VmResult<DynamicObject> {
        let id = id.strip_prefix("./").unwrap_or(id);
        if let Some(module) = self.0.modules.get(id) {
            return Ok(module.exports().clone());
        }

        let library = self.library(id);
        if library.is_none() && !self.0.source.exists(id) {
            return Err(VmError::ModuleNotFound { id: id.to_string() });
        }

        let (module, inserted) = self.0.modules.get_or_insert_with(id, || match &library {
            Some(_) => Module::new(id, id.to_string(), String::new(), true),
            None => Module::new(id, self.0.source.filename(id), self.0.source.dirname(id), false),
        });
        if !inserted {
            return Ok(module.exports().clone());
        }

        if let Some(library) = library {
            library.populate(module.exports());
            module.set_state(ModuleState::Invoked);
            debug!(module = id, "populated native module");
            return Ok(module.exports().clone());
        }

        let entry = match self.0.source.load(id).and_then(|dump| self.compile(id, &dump)) {
            Ok(entry) => entry,
            Err(err) => {
                debug!(module = id, error = %err, "module failed to compile");
                self.0.modules.invalidate(id);
                return Err(err);
            }
        };
        module.set_entry(entry.clone());
        self.invoke_module(&module, entry)?;
        Ok(module.exports().clone())
    }

    /// Run a dump as a fresh anonymous module and return its body's value
    pub fn execute(&self, dump: &str) -> VmResult<Value> {
        let n = self.0.anonymous.fetch_add(1, Ordering::Relaxed);
        let id = format!("<anonymous:{}>", n);
        let entry = self.compile(&id, dump)?;

        let (module, _) = self
            .0
            .modules
            .get_or_insert_with(&id, || Module::new(&id, id.clone(), String::new(), false));
        module.set_entry(entry.clone());
        self.invoke_module(&module, entry)
    }

    /// Decode and lower a module body
    pub fn compile(&self, name: &str, dump: &str) -> VmResult<Arc<FunctionProto>> {
        let tree = decode(dump)?;
        Ok(lower_module(name, &tree, &MODULE_PARAMS, &self.0.sites)?)
    }

    fn invoke_module(&self, module: &Module, entry: Arc<FunctionProto>) -> VmResult<Value> {
        let exports = module.exports().clone();
        let module_object = DynamicObject::new();
        module_object.set("id", Value::string(module.id()));
        module_object.set("filename", Value::string(module.filename()));
        module_object.set("exports", Value::Object(exports.clone()));

        let args = [
            Value::Object(exports),
            Value::Function(self.require_function()),
            Value::Object(module_object),
            Value::string(module.filename()),
            Value::string(module.dirname()),
        ];

        debug!(module = module.id(), "invoking module");
        let body = Function::script(entry, self.0.root_env.clone());
        let value = Interpreter::new(self).call_function(&body, Value::Object(self.globals().clone()), &args)?;
        module.set_state(ModuleState::Invoked);
        Ok(value)
    }

    /// `require` as seen by scripts; holds the context weakly
    fn require_function(&self) -> Function {
        let context: Weak<ContextInner> = Arc::downgrade(&self.0);
        Function::native("require", Some(1), move |_, args| {
            let inner = context
                .upgrade()
                .ok_or_else(|| VmError::Internal("runtime context was dropped".to_string()))?;
            let id = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| VmError::TypeError("require expects a module id string".to_string()))?;
            RuntimeContext(inner).require(id).map(Value::Object)
        })
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    /// Call a function or construct a type through the shared invoke site
    pub fn call(&self, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let site = self.0.sites.invoke(args.len());
        Interpreter::new(self).invoke(&site, callee, args)
    }

    /// Invoke member `name` of `target` through the shared invoke-member site
    pub fn call_member(&self, target: &Value, name: &str, args: &[Value]) -> VmResult<Value> {
        let site = self.0.sites.invoke_member(name, args.len());
        Interpreter::new(self).invoke_member(&site, target, args)
    }

    /// Read member `name` of `target`
    pub fn get_member(&self, target: &Value, name: &str) -> VmResult<Value> {
        let site = self.0.sites.get_member(name);
        Interpreter::new(self).get_member(&site, target)
    }

    /// Write member `name` of `target`
    pub fn set_member(&self, target: &Value, name: &str, value: Value) -> VmResult<()> {
        let site = self.0.sites.set_member(name);
        Interpreter::new(self).set_member(&site, target, value)
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("options", &self.0.options)
            .field("modules", &self.0.modules.len())
            .field("sites", &self.0.sites.len())
            .finish()
    }
}
