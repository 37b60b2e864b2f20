//! Function values

use std::fmt;
use std::sync::Arc;

use crate::compiler::FunctionProto;
use crate::vm::interpreter::Env;
use crate::vm::value::Value;
use crate::vm::VmResult;

/// Native implementation: `(this, arguments) -> result`
pub type NativeFn = Arc<dyn Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync>;

pub(crate) enum Callable {
    /// Lowered function closed over its defining frame
    Script {
        proto: Arc<FunctionProto>,
        env: Arc<Env>,
    },
    /// Host-provided function
    Native {
        name: Arc<str>,
        arity: Option<usize>,
        call: NativeFn,
    },
}

/// A callable value
#[derive(Clone)]
pub struct Function(Arc<Callable>);

impl Function {
    /// Wrap a native implementation. `arity` of `None` accepts any count.
    pub fn native<F>(name: &str, arity: Option<usize>, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(Callable::Native {
            name: Arc::from(name),
            arity,
            call: Arc::new(call),
        }))
    }

    pub(crate) fn script(proto: Arc<FunctionProto>, env: Arc<Env>) -> Self {
        Self(Arc::new(Callable::Script { proto, env }))
    }

    pub(crate) fn callable(&self) -> &Callable {
        &self.0
    }

    /// Function name, `<anonymous>` if it has none
    pub fn name(&self) -> &str {
        match self.callable() {
            Callable::Script { proto, .. } => proto.display_name(),
            Callable::Native { name, .. } => name,
        }
    }

    /// Declared parameter count, if fixed
    pub fn arity(&self) -> Option<usize> {
        match self.callable() {
            Callable::Script { proto, .. } => Some(proto.arity),
            Callable::Native { arity, .. } => *arity,
        }
    }

    /// Whether this is a native function
    pub fn is_native(&self) -> bool {
        matches!(self.callable(), Callable::Native { .. })
    }

    /// Whether both handles refer to the same function
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("native", &self.is_native())
            .finish()
    }
}
