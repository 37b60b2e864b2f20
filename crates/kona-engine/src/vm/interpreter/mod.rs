//! Tree-walking execution of lowered IR
//!
//! Frames are [`Env`] chains: each call gets a fresh environment whose parent
//! is the environment the function closed over, and a [`Binding`] selects
//! an ancestor by depth and a slot within it.

mod core;
mod dispatch;

pub(crate) use self::core::Interpreter;

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::compiler::Binding;
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Variable storage of one function activation
pub struct Env {
    slots: RwLock<Vec<Value>>,
    parent: Option<Arc<Env>>,
}

impl Env {
    /// Empty top-level environment
    pub fn root() -> Arc<Env> {
        Self::new(0, None)
    }

    /// Environment of `size` slots, all `undefined`
    pub fn new(size: usize, parent: Option<Arc<Env>>) -> Arc<Env> {
        Arc::new(Self {
            slots: RwLock::new(vec![Value::Undefined; size]),
            parent,
        })
    }

    /// Number of slots in this frame
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Whether this frame has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }

    fn frame(&self, depth: usize) -> VmResult<&Env> {
        let mut env = self;
        for _ in 0..depth {
            env = env
                .parent
                .as_deref()
                .ok_or_else(|| VmError::Internal(format!("no frame at depth {}", depth)))?;
        }
        Ok(env)
    }

    /// Read the slot `binding` addresses
    pub fn get(&self, binding: Binding) -> VmResult<Value> {
        self.frame(binding.depth)?
            .slots
            .read()
            .get(binding.slot)
            .cloned()
            .ok_or_else(|| VmError::Internal(format!("slot {} out of range", binding.slot)))
    }

    /// Write the slot `binding` addresses
    pub fn set(&self, binding: Binding, value: Value) -> VmResult<()> {
        let frame = self.frame(binding.depth)?;
        let mut slots = frame.slots.write();
        let slot = slots
            .get_mut(binding.slot)
            .ok_or_else(|| VmError::Internal(format!("slot {} out of range", binding.slot)))?;
        *slot = value;
        Ok(())
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("slots", &self.len())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

/// Non-local exit from expression evaluation
#[derive(Debug)]
pub(crate) enum Unwind {
    /// `return` from the innermost function
    Return(Value),
    /// Runtime error
    Error(VmError),
}

impl From<VmError> for Unwind {
    fn from(err: VmError) -> Self {
        Unwind::Error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_chain() {
        let outer = Env::new(2, Some(Env::root()));
        let inner = Env::new(1, Some(outer.clone()));

        inner.set(Binding { depth: 1, slot: 1 }, Value::Int(7)).unwrap();
        assert_eq!(outer.get(Binding { depth: 0, slot: 1 }).unwrap(), Value::Int(7));
        assert_eq!(inner.get(Binding { depth: 0, slot: 0 }).unwrap(), Value::Undefined);
    }

    #[test]
    fn test_env_bad_bindings() {
        let env = Env::new(1, None);
        assert!(matches!(
            env.get(Binding { depth: 1, slot: 0 }),
            Err(VmError::Internal(_))
        ));
        assert!(matches!(
            env.set(Binding { depth: 0, slot: 3 }, Value::Null),
            Err(VmError::Internal(_))
        ));
    }
}
