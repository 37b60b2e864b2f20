//! Assignment, conditional and control-transfer lowering

use super::expr::property_key;
use super::{is_identifier, Lowerer};
use crate::compiler::ir::Expr;
use crate::compiler::scope::ScopeId;
use crate::compiler::{CompileError, CompileResult};
use crate::parser::ast::{Node, NodeKind};

/// Properties of an object pattern target (`{a, b: c} = ...`)
pub(super) fn object_pattern(target: &Node) -> Option<&[Node]> {
    match &target.kind {
        NodeKind::Value { base, properties } if properties.is_empty() => match &base.kind {
            NodeKind::Obj { properties } => Some(properties),
            _ => None,
        },
        NodeKind::Obj { properties } => Some(properties),
        _ => None,
    }
}

/// `(key, target)` of one object pattern item; `None` for comments and
/// anything that is not a name or a `key: target` pair
pub(super) fn pattern_item(property: &Node) -> Option<(String, &Node)> {
    match &property.kind {
        NodeKind::Assign { variable, value } => Some((property_key(variable)?, value.as_ref())),
        NodeKind::Value { .. } => Some((property_key(property)?, property)),
        _ => None,
    }
}

/// Name given to a function literal assigned to `target`
fn target_name(target: &Node) -> Option<&str> {
    match &target.kind {
        NodeKind::Value { base, properties } => match properties.last() {
            Some(Node {
                kind: NodeKind::Access { name },
                ..
            }) => name.as_literal(),
            Some(_) => None,
            None => base.as_literal(),
        },
        NodeKind::Literal { value } => Some(value),
        _ => None,
    }
}

impl<'a> Lowerer<'a> {
    pub(super) fn lower_assign(
        &mut self,
        variable: &Node,
        value: &Node,
        scope: ScopeId,
        line: usize,
    ) -> CompileResult<Expr> {
        if let Some(properties) = object_pattern(variable) {
            let source = self.lower(value, scope)?;
            return self.lower_destructuring(properties, source, scope, line);
        }

        let value = self.lower_named(value, target_name(variable), scope)?;
        self.lower_assign_to(variable, value, scope, line)
    }

    /// Store an already-lowered value into `target`; yields the value
    pub(super) fn lower_assign_to(
        &mut self,
        target: &Node,
        value: Expr,
        scope: ScopeId,
        line: usize,
    ) -> CompileResult<Expr> {
        let not_assignable = || CompileError::NotAssignable {
            target: target.name().to_string(),
            line,
        };

        if let Some(name) = target.simple_name() {
            if !is_identifier(name) || name == "this" {
                return Err(not_assignable());
            }
            let binding = self.scopes.resolve_or_declare(scope, name);
            return Ok(Expr::SetLocal {
                binding,
                value: value.boxed(),
            });
        }

        let NodeKind::Value { base, properties } = &target.kind else {
            return Err(not_assignable());
        };
        let Some((last, init)) = properties.split_last() else {
            return Err(not_assignable());
        };

        let receiver = self.lower(base, scope)?;
        let receiver = self.lower_properties(receiver, init, scope, |_, expr| Ok(expr))?;
        match &last.kind {
            NodeKind::Access { name } => {
                let name = name.as_literal().ok_or_else(not_assignable)?;
                Ok(Expr::SetMember {
                    site: self.sites.set_member(name),
                    target: receiver.boxed(),
                    value: value.boxed(),
                })
            }
            NodeKind::Index { index } => Ok(Expr::SetIndex {
                target: receiver.boxed(),
                index: self.lower(index, scope)?.boxed(),
                value: value.boxed(),
            }),
            _ => Err(not_assignable()),
        }
    }

    /// `{a, b: c} = source`: one member read per item off a temporary;
    /// yields the source
    fn lower_destructuring(
        &mut self,
        properties: &[Node],
        source: Expr,
        scope: ScopeId,
        line: usize,
    ) -> CompileResult<Expr> {
        let temp = self.temporary(scope, "ref");
        let mut steps = vec![Expr::SetLocal {
            binding: temp,
            value: source.boxed(),
        }];

        for property in properties {
            if matches!(property.kind, NodeKind::Comment) {
                continue;
            }
            let Some((key, target)) = pattern_item(property) else {
                return Err(Self::unsupported(property));
            };
            if object_pattern(target).is_some() || matches!(target.kind, NodeKind::Arr { .. }) {
                return Err(Self::unsupported(target));
            }
            let read = Expr::GetMember {
                site: self.sites.get_member(&key),
                target: Expr::Local(temp).boxed(),
            };
            steps.push(self.lower_assign_to(target, read, scope, line)?);
        }

        steps.push(Expr::Local(temp));
        Ok(Expr::Sequence(steps))
    }

    pub(super) fn lower_if(
        &mut self,
        condition: &Node,
        body: Option<&Node>,
        else_body: Option<&Node>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let condition = self.lower(condition, scope)?;
        let then = self.lower_branch(body, scope)?;
        let otherwise = self.lower_branch(else_body, scope)?;
        Ok(Expr::Conditional {
            condition: condition.boxed(),
            then: then.boxed(),
            otherwise: otherwise.boxed(),
        })
    }

    fn lower_branch(&mut self, branch: Option<&Node>, scope: ScopeId) -> CompileResult<Expr> {
        let Some(branch) = branch else {
            return Ok(Expr::undefined());
        };
        let shared = self.scopes.shared(scope);
        match &branch.kind {
            NodeKind::Block { expressions } => self.lower_block(expressions, shared),
            _ => self.lower(branch, shared),
        }
    }

    pub(super) fn lower_return(
        &mut self,
        node: &Node,
        expression: Option<&Node>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        if self.function_depth == 0 {
            return Err(Self::unsupported(node));
        }
        let value = match expression {
            Some(expression) => self.lower(expression, scope)?,
            None => Expr::undefined(),
        };
        Ok(Expr::Return(value.boxed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode;

    #[test]
    fn test_pattern_items() {
        let tree = decode("Obj\n  Value \"a\"\n  Assign\n    Value \"b\"\n    Value \"c\"\n  Comment").unwrap();
        let properties = object_pattern(&tree).unwrap();
        let items: Vec<(String, String)> = properties
            .iter()
            .filter_map(pattern_item)
            .map(|(key, target)| (key, target.simple_name().unwrap_or_default().to_string()))
            .collect();
        assert_eq!(
            items,
            vec![("a".to_string(), "a".to_string()), ("b".to_string(), "c".to_string())]
        );
    }

    #[test]
    fn test_target_names() {
        let member = decode("Value \"module\"\n  Access \"exports\"").unwrap();
        assert_eq!(target_name(&member), Some("exports"));
        let local = decode("Value \"square\"").unwrap();
        assert_eq!(target_name(&local), Some("square"));
        let indexed = decode("Value \"list\"\n  Index\n    Value \"0\"").unwrap();
        assert_eq!(target_name(&indexed), None);
    }
}
