//! Kona VM Runtime
//!
//! This module provides the execution side of the engine:
//! - Dynamic values and the `DynamicObject` exports model
//! - Canonical dispatch sites with per-shape inline caches
//! - Host reflection (types, members, overload resolution)
//! - The tree-walking interpreter over lowered IR
//! - The module / exports lifecycle behind `require`

pub mod context;
pub mod dispatch;
pub mod function;
pub mod interpreter;
pub mod module;
pub mod object;
pub mod reflect;
pub mod value;

pub use context::{ContextOptions, RuntimeContext};
pub use dispatch::{BinaryOp, DispatchSite, DispatchSites, Rule, SiteKey, SiteStats, UnaryOp};
pub use function::{Function, NativeFn};
pub use interpreter::Env;
pub use module::{CacheStats, MemorySource, Module, ModuleCache, ModuleSource, ModuleState};
pub use object::{Array, DynamicObject};
pub use reflect::{
    HostFn, HostLibrary, HostMember, HostObject, HostType, HostTypeBuilder, HostTypeId,
    MemberKind, ParamKind,
};
pub use value::{Shape, Value};

use crate::compiler::CompileError;
use crate::parser::DecodeError;
use thiserror::Error;

/// VM execution errors
#[derive(Debug, Clone, Error)]
pub enum VmError {
    /// A late-bound name was evaluated and is not defined
    #[error("'{name}' is undefined")]
    UndefinedReference {
        /// The unresolved name
        name: String,
    },

    /// Member access found zero or several candidates of the right kind
    #[error("ambiguous or missing member '{member}' on {target}")]
    AmbiguousOrMissingMember {
        /// Member name
        member: String,
        /// Description of the target's type
        target: String,
    },

    /// Invocation, construction or operator found no applicable candidate
    #[error("no overload of '{member}' on {target} accepts {arg_count} argument(s) of the given types")]
    NoMatchingOverload {
        /// Member name, operator token, or function name
        member: String,
        /// Number of arguments supplied
        arg_count: usize,
        /// Description of the target or operand types
        target: String,
    },

    /// Invoked or constructed a value that is neither a function nor a type
    #[error("{target} is not callable")]
    NotCallable {
        /// Description of the value
        target: String,
    },

    /// Neither a native library nor a source with this id exists
    #[error("module '{id}' not found")]
    ModuleNotFound {
        /// The requested id, leading `./` removed
        id: String,
    },

    /// Operand of the wrong kind for a built-in operation
    #[error("Type error: {0}")]
    TypeError(String),

    /// Integer division or remainder by zero
    #[error("Division by zero")]
    DivideByZero,

    /// Call depth exceeded the configured limit
    #[error("Stack overflow")]
    StackOverflow,

    /// Value raised by a script `throw`
    #[error("Uncaught {message}")]
    Thrown {
        /// Display form of the thrown value
        message: String,
    },

    /// A module source could not be read
    #[error("failed to load module '{id}': {message}")]
    Io {
        /// Module id
        id: String,
        /// Underlying error text
        message: String,
    },

    /// Inconsistent lowered program
    #[error("Internal error: {0}")]
    Internal(String),

    /// Decoding a module's dump failed
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Lowering a module failed
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// VM execution result
pub type VmResult<T> = Result<T, VmError>;
