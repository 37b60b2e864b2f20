//! Expression evaluator

use std::cell::Cell;
use std::sync::Arc;

use super::{Env, Unwind};
use crate::compiler::{Binding, Expr};
use crate::vm::context::RuntimeContext;
use crate::vm::function::{Callable, Function};
use crate::vm::object::{Array, DynamicObject};
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Activation record visible to an expression
pub(super) struct Frame {
    pub(super) env: Arc<Env>,
    pub(super) this: Value,
}

type Eval = Result<Value, Unwind>;

/// Evaluates lowered code against one runtime context
pub(crate) struct Interpreter<'c> {
    pub(super) ctx: &'c RuntimeContext,
    depth: Cell<usize>,
}

impl<'c> Interpreter<'c> {
    pub(crate) fn new(ctx: &'c RuntimeContext) -> Self {
        Self {
            ctx,
            depth: Cell::new(0),
        }
    }

    /// Call `func` with receiver `this`
    pub(crate) fn call_function(&self, func: &Function, this: Value, args: &[Value]) -> VmResult<Value> {
        let depth = self.depth.get() + 1;
        if depth > self.ctx.options().max_call_depth {
            return Err(VmError::StackOverflow);
        }
        self.depth.set(depth);
        let result = self.call_unguarded(func, this, args);
        self.depth.set(depth - 1);
        result
    }

    fn call_unguarded(&self, func: &Function, this: Value, args: &[Value]) -> VmResult<Value> {
        match func.callable() {
            Callable::Native { name, arity, call } => {
                if let Some(arity) = arity {
                    if *arity != args.len() {
                        return Err(arity_mismatch(name, *arity, args.len()));
                    }
                }
                call(&this, args)
            }
            Callable::Script { proto, env } => {
                if proto.arity != args.len() {
                    return Err(arity_mismatch(proto.display_name(), proto.arity, args.len()));
                }

                let env = Env::new(proto.frame_size, Some(env.clone()));
                env.set(Binding { depth: 0, slot: 0 }, Value::from(args.to_vec()))?;
                for (&slot, arg) in proto.param_slots.iter().zip(args) {
                    env.set(Binding { depth: 0, slot }, arg.clone())?;
                }

                let frame = Frame { env, this };
                match self.eval(&proto.body, &frame) {
                    Ok(value) | Err(Unwind::Return(value)) => Ok(value),
                    Err(Unwind::Error(err)) => Err(err),
                }
            }
        }
    }

    fn globals(&self) -> &DynamicObject {
        self.ctx.globals()
    }

    fn eval_all(&self, exprs: &[Expr], frame: &Frame) -> Result<Vec<Value>, Unwind> {
        exprs.iter().map(|expr| self.eval(expr, frame)).collect()
    }

    pub(super) fn eval(&self, expr: &Expr, frame: &Frame) -> Eval {
        match expr {
            Expr::Const(constant) => Ok(constant.to_value()),
            Expr::Local(binding) => Ok(frame.env.get(*binding)?),
            Expr::SetLocal { binding, value } => {
                let value = self.eval(value, frame)?;
                frame.env.set(*binding, value.clone())?;
                Ok(value)
            }
            Expr::LateBound(name) => self.globals().get(name).ok_or_else(|| {
                Unwind::Error(VmError::UndefinedReference {
                    name: name.to_string(),
                })
            }),
            Expr::LateBoundExists(name) => Ok(Value::Bool(
                self.globals().get(name).is_some_and(|v| v.is_defined()),
            )),
            Expr::This => Ok(frame.this.clone()),
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, frame)?;
                }
                Ok(last)
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if self.eval(condition, frame)?.is_truthy() {
                    self.eval(then, frame)
                } else {
                    self.eval(otherwise, frame)
                }
            }
            Expr::IsDefined(inner) => Ok(Value::Bool(self.eval(inner, frame)?.is_defined())),

            Expr::GetMember { site, target } => {
                let target = self.eval(target, frame)?;
                Ok(self.get_member(site, &target)?)
            }
            Expr::SetMember { site, target, value } => {
                let target = self.eval(target, frame)?;
                let value = self.eval(value, frame)?;
                self.set_member(site, &target, value.clone())?;
                Ok(value)
            }
            Expr::GetIndex { target, index } => {
                let target = self.eval(target, frame)?;
                let index = self.eval(index, frame)?;
                Ok(self.get_index(&target, &index)?)
            }
            Expr::SetIndex { target, index, value } => {
                let target = self.eval(target, frame)?;
                let index = self.eval(index, frame)?;
                let value = self.eval(value, frame)?;
                self.set_index(&target, &index, value.clone())?;
                Ok(value)
            }

            Expr::Invoke { site, callee, args } => {
                let callee = self.eval(callee, frame)?;
                let args = self.eval_all(args, frame)?;
                Ok(self.invoke(site, &callee, &args)?)
            }
            Expr::InvokeMember { site, target, args } => {
                let target = self.eval(target, frame)?;
                let args = self.eval_all(args, frame)?;
                Ok(self.invoke_member(site, &target, &args)?)
            }
            Expr::CreateInstance { site, target, args } => {
                let target = self.eval(target, frame)?;
                let args = self.eval_all(args, frame)?;
                Ok(self.create_instance(site, &target, &args)?)
            }
            Expr::Binary { site, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                Ok(self.binary(site, &left, &right)?)
            }
            Expr::Unary { site, operand } => {
                let operand = self.eval(operand, frame)?;
                Ok(self.unary(site, &operand)?)
            }

            Expr::NewObject => Ok(Value::Object(DynamicObject::new())),
            Expr::NewArray(items) => Ok(Value::Array(Array::from_vec(self.eval_all(items, frame)?))),
            Expr::Closure(proto) => Ok(Value::Function(Function::script(
                proto.clone(),
                frame.env.clone(),
            ))),
            Expr::Contains {
                item,
                collection,
                negated,
            } => {
                let item = self.eval(item, frame)?;
                let collection = self.eval(collection, frame)?;
                let found = match &collection {
                    Value::Array(items) => items.to_vec().iter().any(|v| v.strict_equals(&item)),
                    other => {
                        return Err(VmError::TypeError(format!(
                            "cannot search {} with 'in'",
                            other.type_name()
                        ))
                        .into())
                    }
                };
                Ok(Value::Bool(found != *negated))
            }
            Expr::Return(value) => Err(Unwind::Return(self.eval(value, frame)?)),
            Expr::Throw(value) => {
                let value = self.eval(value, frame)?;
                Err(VmError::Thrown {
                    message: value.to_string(),
                }
                .into())
            }
        }
    }

    /// Receiver for plain calls
    pub(super) fn global_this(&self) -> Value {
        Value::Object(self.globals().clone())
    }
}

fn arity_mismatch(name: &str, arity: usize, arg_count: usize) -> VmError {
    VmError::NoMatchingOverload {
        member: name.to_string(),
        arg_count,
        target: format!("function/{}", arity),
    }
}
