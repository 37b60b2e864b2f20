//! Applying dispatch rules
//!
//! Every dynamic operation looks up its site's rule for the operand shapes
//! and then performs it. Member reads and writes key the cache on the
//! receiver alone; calls, construction and operators key it on every
//! operand.

use super::core::Interpreter;
use crate::vm::dispatch::resolve::resolve;
use crate::vm::dispatch::{DispatchSite, Rule};
use crate::vm::value::{Shape, Value};
use crate::vm::{VmError, VmResult};

fn operands(first: &Value, rest: &[Value]) -> Vec<Value> {
    let mut operands = Vec::with_capacity(rest.len() + 1);
    operands.push(first.clone());
    operands.extend_from_slice(rest);
    operands
}

fn unexpected(site: &DispatchSite, rule: &Rule) -> VmError {
    VmError::Internal(format!("site '{}' resolved to {:?}", site.key(), rule))
}

impl<'c> Interpreter<'c> {
    fn rule_for(&self, site: &DispatchSite, operands: &[Value]) -> VmResult<Rule> {
        let shapes: Vec<Shape> = operands.iter().map(Value::shape).collect();
        site.rule(&shapes, || resolve(site.key(), operands))
    }

    fn member_rule(&self, site: &DispatchSite, target: &Value) -> VmResult<Rule> {
        site.rule(&[target.shape()], || resolve(site.key(), std::slice::from_ref(target)))
    }

    fn site_name<'s>(&self, site: &'s DispatchSite) -> VmResult<&'s str> {
        site.member_name()
            .ok_or_else(|| VmError::Internal(format!("site '{}' has no member name", site.key())))
    }

    pub(crate) fn get_member(&self, site: &DispatchSite, target: &Value) -> VmResult<Value> {
        let rule = self.member_rule(site, target)?;
        match (&rule, target) {
            (Rule::Dynamic, Value::Object(obj)) => Ok(obj.get(self.site_name(site)?).unwrap_or(Value::Undefined)),
            (Rule::Member(member), _) => member.get(target),
            _ => Err(unexpected(site, &rule)),
        }
    }

    pub(crate) fn set_member(&self, site: &DispatchSite, target: &Value, value: Value) -> VmResult<()> {
        let rule = self.member_rule(site, target)?;
        match (&rule, target) {
            (Rule::Dynamic, Value::Object(obj)) => {
                obj.set(self.site_name(site)?, value);
                Ok(())
            }
            (Rule::Member(member), _) => member.set(target, value),
            _ => Err(unexpected(site, &rule)),
        }
    }

    pub(crate) fn invoke(&self, site: &DispatchSite, callee: &Value, args: &[Value]) -> VmResult<Value> {
        let rule = self.rule_for(site, &operands(callee, args))?;
        match (&rule, callee) {
            (Rule::Call, Value::Function(func)) => self.call_function(func, self.global_this(), args),
            (Rule::Construct(ctor), _) => ctor.invoke(callee, args),
            _ => Err(unexpected(site, &rule)),
        }
    }

    pub(crate) fn invoke_member(&self, site: &DispatchSite, target: &Value, args: &[Value]) -> VmResult<Value> {
        let rule = self.rule_for(site, &operands(target, args))?;
        match (&rule, target) {
            (Rule::Dynamic, Value::Object(obj)) => {
                let name = self.site_name(site)?;
                match obj.get(name) {
                    Some(Value::Function(func)) => self.call_function(&func, target.clone(), args),
                    Some(callee) => {
                        let call_site = self.ctx.sites().invoke(args.len());
                        self.invoke(&call_site, &callee, args)
                    }
                    None => Err(VmError::AmbiguousOrMissingMember {
                        member: name.to_string(),
                        target: target.type_name(),
                    }),
                }
            }
            (Rule::Member(member), _) => member.invoke(target, args),
            _ => Err(unexpected(site, &rule)),
        }
    }

    pub(super) fn create_instance(&self, site: &DispatchSite, target: &Value, args: &[Value]) -> VmResult<Value> {
        let rule = self.rule_for(site, &operands(target, args))?;
        match &rule {
            Rule::Construct(ctor) => ctor.invoke(target, args),
            _ => Err(unexpected(site, &rule)),
        }
    }

    pub(super) fn binary(&self, site: &DispatchSite, left: &Value, right: &Value) -> VmResult<Value> {
        let operands = [left.clone(), right.clone()];
        match self.rule_for(site, &operands)? {
            Rule::Binary(rule) => rule.apply(left, right),
            rule => Err(unexpected(site, &rule)),
        }
    }

    pub(super) fn unary(&self, site: &DispatchSite, operand: &Value) -> VmResult<Value> {
        match self.rule_for(site, std::slice::from_ref(operand))? {
            Rule::Unary(rule) => rule.apply(operand),
            rule => Err(unexpected(site, &rule)),
        }
    }

    // ========================================================================
    // Indexing
    // ========================================================================

    pub(super) fn get_index(&self, target: &Value, index: &Value) -> VmResult<Value> {
        match target {
            Value::Array(items) => Ok(array_index(index)?
                .and_then(|i| items.get(i))
                .unwrap_or(Value::Undefined)),
            Value::Object(obj) => Ok(obj.get(&index.to_string()).unwrap_or(Value::Undefined)),
            Value::Str(text) => Ok(array_index(index)?
                .and_then(|i| text.chars().nth(i))
                .map(|c| Value::string(c.to_string()))
                .unwrap_or(Value::Undefined)),
            other => Err(VmError::TypeError(format!("cannot index {}", other.type_name()))),
        }
    }

    pub(super) fn set_index(&self, target: &Value, index: &Value, value: Value) -> VmResult<()> {
        match target {
            Value::Array(items) => match array_index(index)? {
                Some(i) => items.set(i, value),
                None => Err(VmError::TypeError(format!("invalid array index {}", index))),
            },
            Value::Object(obj) => {
                obj.set(&index.to_string(), value);
                Ok(())
            }
            other => Err(VmError::TypeError(format!(
                "cannot assign through an index on {}",
                other.type_name()
            ))),
        }
    }
}

/// Integer index as a position; negative indices have none
fn array_index(index: &Value) -> VmResult<Option<usize>> {
    match index.as_i64() {
        Some(i) => Ok(usize::try_from(i).ok()),
        None => Err(VmError::TypeError(format!(
            "index must be an integer, got {}",
            index.type_name()
        ))),
    }
}
