//! Kona Engine
//!
//! This crate turns a textual parse-tree dump of an already-parsed script into
//! an executable program with dynamically-typed semantics:
//! - **Parser**: the indentation-based dump decoder and its printer (`parser` module)
//! - **Compiler**: scope resolution, lowering, and the executable IR (`compiler` module)
//! - **VM**: dispatch sites, host reflection, the interpreter and the module lifecycle (`vm` module)
//!
//! # Example
//!
//! ```rust,ignore
//! use kona_engine::{MemorySource, RuntimeContext, Value};
//!
//! let source = MemorySource::new();
//! source.insert("main", "Block\n  Assign\n    Value \"exports\"\n      Access \"answer\"\n    Value \"42\"");
//!
//! let ctx = RuntimeContext::new(source);
//! let exports = ctx.require("./main")?;
//! assert_eq!(exports.get("answer"), Some(Value::Int(42)));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Core Modules
// ============================================================================

/// Parser module: dump reader, tree model and printer
pub mod parser;

/// Compiler module: scopes, IR and lowering
pub mod compiler;

/// VM module: values, dispatch, reflection, interpreter and modules
pub mod vm;

// ============================================================================
// Re-exports
// ============================================================================

pub use parser::{decode, DecodeError, Node, NodeKind};

pub use compiler::{lower_module, CompileError, FunctionProto, ScopeTree};

pub use vm::{
    Array, BinaryOp, ContextOptions, DispatchSite, DispatchSites, DynamicObject, Function, HostLibrary,
    HostObject, HostType, HostTypeBuilder, MemberKind, MemorySource, Module, ModuleSource,
    ModuleState, ParamKind, RuntimeContext, Shape, SiteKey, SiteStats, UnaryOp, Value, VmError, VmResult,
};
