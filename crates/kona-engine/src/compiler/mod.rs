//! Lowering of decoded trees into executable IR
//!
//! - `scope`: lexical scopes, bindings and temporaries
//! - `ir`: the expression tree the interpreter evaluates
//! - `lower`: tree → IR, with hoisting and the usual desugarings

pub mod ir;
pub mod lower;
pub mod scope;

pub use ir::{Constant, Expr, FunctionProto};
pub use lower::{lower_module, Lowerer};
pub use scope::{Binding, ScopeId, ScopeTree, VariableKind};

use thiserror::Error;

/// Errors raised while lowering a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The node kind is represented in the tree but not lowered
    #[error("unsupported construct '{kind}' at line {line}")]
    UnsupportedConstruct {
        /// Node kind
        kind: String,
        /// Dump line of the node
        line: usize,
    },

    /// Assignment or update to something that cannot hold a value
    #[error("cannot assign to {target} at line {line}")]
    NotAssignable {
        /// Description of the target
        target: String,
        /// Dump line of the node
        line: usize,
    },

    /// Operator token with no lowering
    #[error("unsupported operator '{operator}' at line {line}")]
    UnsupportedOperator {
        /// Operator token
        operator: String,
        /// Dump line of the node
        line: usize,
    },
}

/// Lowering result
pub type CompileResult<T> = Result<T, CompileError>;
