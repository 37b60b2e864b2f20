//! Executable IR
//!
//! Lowered programs are expression trees. Every dynamic operation carries
//! the canonical [`DispatchSite`] it was lowered against, so all occurrences
//! of the same operation share one inline cache.
//!
//! # Structure
//!
//! - `FunctionProto` - a lowered function body plus its frame layout
//! - `Expr` - one expression; statements are expressions whose value is
//!   discarded by the enclosing `Sequence`
//! - `Binding` - frame depth + slot of a resolved variable

use std::sync::Arc;

use crate::compiler::scope::Binding;
use crate::vm::dispatch::DispatchSite;
use crate::vm::value::Value;

/// Literal constant
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double
    Double(f64),
    /// String
    Str(Arc<str>),
}

impl Constant {
    /// Materialize as a runtime value
    pub fn to_value(&self) -> Value {
        match self {
            Constant::Undefined => Value::Undefined,
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Long(l) => Value::Long(*l),
            Constant::Double(d) => Value::Double(*d),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// A lowered function
#[derive(Debug)]
pub struct FunctionProto {
    /// Name taken from the assignment target or object key
    pub name: Option<Arc<str>>,
    /// Declared parameter count
    pub arity: usize,
    /// Frame slot of each parameter, in declaration order
    pub param_slots: Vec<usize>,
    /// Slots in the frame (`arguments`, parameters, locals, temporaries)
    pub frame_size: usize,
    /// Declared locals in initialisation order
    pub locals: Vec<Arc<str>>,
    /// Body; its value is the implicit return value
    pub body: Expr,
}

impl FunctionProto {
    /// Name for diagnostics
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<anonymous>")
    }
}

/// Lowered expression
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal value
    Const(Constant),
    /// Read a resolved variable
    Local(Binding),
    /// Write a resolved variable; yields the value
    SetLocal {
        /// Target slot
        binding: Binding,
        /// Assigned value
        value: Box<Expr>,
    },
    /// Read an unresolved name from the context globals at evaluation time
    LateBound(Arc<str>),
    /// Whether an unresolved name is currently defined in the globals
    LateBoundExists(Arc<str>),
    /// The frame's receiver
    This,
    /// Evaluate in order; yields the last value
    Sequence(Vec<Expr>),
    /// Truthiness test
    Conditional {
        /// Tested expression
        condition: Box<Expr>,
        /// Value when truthy
        then: Box<Expr>,
        /// Value when falsy
        otherwise: Box<Expr>,
    },
    /// Neither `undefined` nor `null`
    IsDefined(Box<Expr>),
    /// `target.name`
    GetMember {
        /// `GetMember` site
        site: Arc<DispatchSite>,
        /// Receiver
        target: Box<Expr>,
    },
    /// `target.name = value`; yields the value
    SetMember {
        /// `SetMember` site
        site: Arc<DispatchSite>,
        /// Receiver
        target: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `target[index]`
    GetIndex {
        /// Indexed value
        target: Box<Expr>,
        /// Index
        index: Box<Expr>,
    },
    /// `target[index] = value`; yields the value
    SetIndex {
        /// Indexed value
        target: Box<Expr>,
        /// Index
        index: Box<Expr>,
        /// Assigned value
        value: Box<Expr>,
    },
    /// `callee(args...)` with the globals as receiver
    Invoke {
        /// `Invoke` site
        site: Arc<DispatchSite>,
        /// Called value
        callee: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `target.name(args...)` with `target` as receiver
    InvokeMember {
        /// `InvokeMember` site
        site: Arc<DispatchSite>,
        /// Receiver
        target: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// `new target(args...)`
    CreateInstance {
        /// `CreateInstance` site
        site: Arc<DispatchSite>,
        /// Constructed type
        target: Box<Expr>,
        /// Arguments
        args: Vec<Expr>,
    },
    /// Binary operator
    Binary {
        /// `BinaryOperation` site
        site: Arc<DispatchSite>,
        /// Left operand
        left: Box<Expr>,
        /// Right operand
        right: Box<Expr>,
    },
    /// Unary operator
    Unary {
        /// `UnaryOperation` site
        site: Arc<DispatchSite>,
        /// Operand
        operand: Box<Expr>,
    },
    /// Fresh empty dynamic object
    NewObject,
    /// Fresh array of the evaluated elements
    NewArray(Vec<Expr>),
    /// Function value closing over the current frame
    Closure(Arc<FunctionProto>),
    /// `item in collection`
    Contains {
        /// Searched-for value
        item: Box<Expr>,
        /// Searched array
        collection: Box<Expr>,
        /// `not in`
        negated: bool,
    },
    /// Leave the current function with a value
    Return(Box<Expr>),
    /// Raise the value as a script error
    Throw(Box<Expr>),
}

impl Expr {
    /// `undefined` constant
    pub fn undefined() -> Self {
        Expr::Const(Constant::Undefined)
    }

    /// Integer constant
    pub fn int(value: i32) -> Self {
        Expr::Const(Constant::Int(value))
    }

    /// Boxed `self`
    pub fn boxed(self) -> Box<Expr> {
        Box::new(self)
    }
}
