//! Expression lowering

use super::{is_identifier, Lowerer};
use crate::compiler::ir::{Constant, Expr};
use crate::compiler::scope::{Binding, ScopeId};
use crate::compiler::{CompileError, CompileResult};
use crate::parser::ast::{Node, NodeKind};
use crate::vm::dispatch::BinaryOp;
use crate::vm::dispatch::UnaryOp;

/// `Bool` keywords that mean true
pub(super) fn bool_literal(text: &str) -> Expr {
    Expr::Const(Constant::Bool(matches!(text, "true" | "yes" | "on")))
}

/// Strip one layer of matching quotes and resolve simple escapes
pub(super) fn string_literal(text: &str) -> Option<String> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    if text.len() < 2 || !text.ends_with(quote) {
        return None;
    }

    let inner = &text[1..text.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// Numeric literal: `i32`, then `i64`, then hexadecimal, then `f64`
pub(super) fn number_literal(text: &str) -> Option<Constant> {
    if let Ok(i) = text.parse::<i32>() {
        return Some(Constant::Int(i));
    }
    if let Ok(l) = text.parse::<i64>() {
        return Some(Constant::Long(l));
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        let l = i64::from_str_radix(hex, 16).ok()?;
        return Some(i32::try_from(l).map(Constant::Int).unwrap_or(Constant::Long(l)));
    }

    let mut chars = text.chars();
    let numeric_start = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    if numeric_start {
        return text.parse::<f64>().ok().map(Constant::Double);
    }
    None
}

/// Object key text: identifier, quoted string, or number
pub(super) fn property_key(node: &Node) -> Option<String> {
    let text = node.simple_name()?;
    if let Some(s) = string_literal(text) {
        return Some(s);
    }
    Some(text.to_string())
}

impl<'a> Lowerer<'a> {
    pub(super) fn lower_literal(&mut self, text: &str, scope: ScopeId, node: &Node) -> CompileResult<Expr> {
        if let Some(constant) = number_literal(text) {
            return Ok(Expr::Const(constant));
        }
        if let Some(s) = string_literal(text) {
            return Ok(Expr::Const(Constant::Str(s.into())));
        }
        match text {
            "this" => return Ok(Expr::This),
            "null" => return Ok(Expr::Const(Constant::Null)),
            "undefined" => return Ok(Expr::undefined()),
            _ => {}
        }
        if !is_identifier(text) {
            return Err(Self::unsupported(node));
        }
        Ok(match self.scopes.resolve(scope, text) {
            Some(binding) => Expr::Local(binding),
            None => Expr::LateBound(text.into()),
        })
    }

    pub(super) fn lower_value(
        &mut self,
        base: &Node,
        properties: &[Node],
        name: Option<&str>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let target = match properties.first() {
            Some(first) if first.soak => self.lower_soak_head(base, scope)?,
            _ => self.lower_named(base, name, scope)?,
        };
        self.lower_properties(target, properties, scope, |_, expr| Ok(expr))
    }

    /// Head of a soaked chain; an undeclared name reads as `undefined`
    /// instead of raising `UndefinedReference`.
    fn lower_soak_head(&mut self, node: &Node, scope: ScopeId) -> CompileResult<Expr> {
        if let Some(name) = self.unresolved_name(node, scope) {
            return Ok(Expr::Conditional {
                condition: Expr::LateBoundExists(name.into()).boxed(),
                then: Expr::LateBound(name.into()).boxed(),
                otherwise: Expr::undefined().boxed(),
            });
        }
        self.lower(node, scope)
    }

    /// Apply a property chain to `target`, then `finish` the result.
    ///
    /// A soaked property (`a?.b`) stores everything before it in a temporary
    /// and short-circuits the rest of the chain, `finish` included, to
    /// `undefined` when that temporary is not defined.
    pub(super) fn lower_properties<F>(
        &mut self,
        mut target: Expr,
        properties: &[Node],
        scope: ScopeId,
        finish: F,
    ) -> CompileResult<Expr>
    where
        F: FnOnce(&mut Self, Expr) -> CompileResult<Expr>,
    {
        for (i, property) in properties.iter().enumerate() {
            if property.soak {
                let temp = self.temporary(scope, "ref");
                let head = self.lower_property(Expr::Local(temp), property, scope)?;
                let rest = self.lower_properties(head, &properties[i + 1..], scope, finish)?;
                return Ok(guard(temp, target, rest));
            }
            target = self.lower_property(target, property, scope)?;
        }
        finish(self, target)
    }

    fn lower_property(&mut self, target: Expr, property: &Node, scope: ScopeId) -> CompileResult<Expr> {
        match &property.kind {
            NodeKind::Access { name } => {
                let name = name.as_literal().ok_or_else(|| Self::unsupported(property))?;
                Ok(Expr::GetMember {
                    site: self.sites.get_member(name),
                    target: target.boxed(),
                })
            }
            NodeKind::Index { index } => Ok(Expr::GetIndex {
                target: target.boxed(),
                index: self.lower(index, scope)?.boxed(),
            }),
            _ => Err(Self::unsupported(property)),
        }
    }

    pub(super) fn lower_all(&mut self, nodes: &[Node], scope: ScopeId) -> CompileResult<Vec<Expr>> {
        nodes.iter().map(|node| self.lower(node, scope)).collect()
    }

    pub(super) fn lower_call(
        &mut self,
        variable: &Node,
        arguments: &[Node],
        soak: bool,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        if let NodeKind::Value { base, properties } = &variable.kind {
            if let Some((last, init)) = properties.split_last() {
                if let NodeKind::Access { name } = &last.kind {
                    let method = name.as_literal().ok_or_else(|| Self::unsupported(last))?;
                    let target = if init.first().map_or(last.soak, |first| first.soak) {
                        self.lower_soak_head(base, scope)?
                    } else {
                        self.lower(base, scope)?
                    };
                    return self.lower_properties(target, init, scope, |this, receiver| {
                        this.lower_member_call(receiver, method, last.soak, soak, arguments, scope)
                    });
                }
            }
        }

        let callee = if soak {
            self.lower_soak_head(variable, scope)?
        } else {
            self.lower(variable, scope)?
        };
        let args = self.lower_all(arguments, scope)?;
        let site = self.sites.invoke(args.len());
        if !soak {
            return Ok(Expr::Invoke {
                site,
                callee: callee.boxed(),
                args,
            });
        }
        let temp = self.temporary(scope, "ref");
        let call = Expr::Invoke {
            site,
            callee: Expr::Local(temp).boxed(),
            args,
        };
        Ok(guard(temp, callee, call))
    }

    /// `receiver.method(args)`; `soak_receiver` guards the receiver,
    /// `soak_call` guards the member itself
    fn lower_member_call(
        &mut self,
        receiver: Expr,
        method: &str,
        soak_receiver: bool,
        soak_call: bool,
        arguments: &[Node],
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let args = self.lower_all(arguments, scope)?;
        let site = self.sites.invoke_member(method, args.len());
        if !soak_receiver && !soak_call {
            return Ok(Expr::InvokeMember {
                site,
                target: receiver.boxed(),
                args,
            });
        }

        let temp = self.temporary(scope, "ref");
        let mut call = Expr::InvokeMember {
            site,
            target: Expr::Local(temp).boxed(),
            args,
        };
        if soak_call {
            call = Expr::Conditional {
                condition: Expr::IsDefined(
                    Expr::GetMember {
                        site: self.sites.get_member(method),
                        target: Expr::Local(temp).boxed(),
                    }
                    .boxed(),
                )
                .boxed(),
                then: call.boxed(),
                otherwise: Expr::undefined().boxed(),
            };
        }
        if soak_receiver {
            return Ok(guard(temp, receiver, call));
        }
        Ok(Expr::Sequence(vec![
            Expr::SetLocal {
                binding: temp,
                value: receiver.boxed(),
            },
            call,
        ]))
    }

    pub(super) fn lower_existence(&mut self, expression: &Node, scope: ScopeId) -> CompileResult<Expr> {
        if let Some(name) = self.unresolved_name(expression, scope) {
            return Ok(Expr::LateBoundExists(name.into()));
        }
        Ok(Expr::IsDefined(self.lower(expression, scope)?.boxed()))
    }

    /// A simple identifier with no lexical binding
    fn unresolved_name<'n>(&self, node: &'n Node, scope: ScopeId) -> Option<&'n str> {
        node.simple_name()
            .filter(|name| is_identifier(name) && number_literal(name).is_none())
            .filter(|name| !matches!(*name, "this" | "null" | "undefined"))
            .filter(|name| self.scopes.resolve(scope, name).is_none())
    }

    pub(super) fn lower_op(
        &mut self,
        node: &Node,
        operator: &str,
        flip: bool,
        first: &Node,
        second: Option<&Node>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let Some(second) = second else {
            return self.lower_unary(node, operator, flip, first, scope);
        };

        if operator == "?" {
            return self.lower_default(first, second, scope);
        }

        let op = BinaryOp::from_token(operator).ok_or_else(|| CompileError::UnsupportedOperator {
            operator: operator.to_string(),
            line: node.line,
        })?;

        if op.is_chainable() && chained_comparison(first).is_some() {
            let (left, temp) = self.lower_capturing(first, scope)?;
            let right = Expr::Binary {
                site: self.sites.binary(op),
                left: Expr::Local(temp).boxed(),
                right: self.lower(second, scope)?.boxed(),
            };
            return Ok(Expr::Binary {
                site: self.sites.binary(BinaryOp::And),
                left: left.boxed(),
                right: right.boxed(),
            });
        }

        Ok(Expr::Binary {
            site: self.sites.binary(op),
            left: self.lower(first, scope)?.boxed(),
            right: self.lower(second, scope)?.boxed(),
        })
    }

    /// Lower a comparison whose right operand is reused by an enclosing
    /// comparison; the operand is stored in a fresh temporary.
    fn lower_capturing(&mut self, node: &Node, scope: ScopeId) -> CompileResult<(Expr, Binding)> {
        let Some((op, first, second)) = chained_comparison(node) else {
            return Err(Self::unsupported(node));
        };

        if chained_comparison(first).is_some() {
            let (inner, inner_temp) = self.lower_capturing(first, scope)?;
            let temp = self.temporary(scope, "ref");
            let comparison = Expr::Binary {
                site: self.sites.binary(op),
                left: Expr::Local(inner_temp).boxed(),
                right: self.capture(second, temp, scope)?.boxed(),
            };
            let combined = Expr::Binary {
                site: self.sites.binary(BinaryOp::And),
                left: inner.boxed(),
                right: comparison.boxed(),
            };
            return Ok((combined, temp));
        }

        let left = self.lower(first, scope)?;
        let temp = self.temporary(scope, "ref");
        let comparison = Expr::Binary {
            site: self.sites.binary(op),
            left: left.boxed(),
            right: self.capture(second, temp, scope)?.boxed(),
        };
        Ok((comparison, temp))
    }

    fn capture(&mut self, node: &Node, temp: Binding, scope: ScopeId) -> CompileResult<Expr> {
        Ok(Expr::SetLocal {
            binding: temp,
            value: self.lower(node, scope)?.boxed(),
        })
    }

    /// `a ? b`
    fn lower_default(&mut self, first: &Node, second: &Node, scope: ScopeId) -> CompileResult<Expr> {
        let fallback = self.lower(second, scope)?;
        if let Some(name) = self.unresolved_name(first, scope) {
            return Ok(Expr::Conditional {
                condition: Expr::LateBoundExists(name.into()).boxed(),
                then: Expr::LateBound(name.into()).boxed(),
                otherwise: fallback.boxed(),
            });
        }

        let value = self.lower(first, scope)?;
        let temp = self.temporary(scope, "ref");
        Ok(Expr::Sequence(vec![
            Expr::SetLocal {
                binding: temp,
                value: value.boxed(),
            },
            Expr::Conditional {
                condition: Expr::IsDefined(Expr::Local(temp).boxed()).boxed(),
                then: Expr::Local(temp).boxed(),
                otherwise: fallback.boxed(),
            },
        ]))
    }

    fn lower_unary(
        &mut self,
        node: &Node,
        operator: &str,
        flip: bool,
        operand: &Node,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        match operator {
            "++" => return self.lower_update(node, operand, BinaryOp::Add, !flip, scope),
            "--" => return self.lower_update(node, operand, BinaryOp::Sub, !flip, scope),
            "new" => return self.lower_new(operand, scope),
            _ => {}
        }

        let op = UnaryOp::from_token(operator).ok_or_else(|| CompileError::UnsupportedOperator {
            operator: operator.to_string(),
            line: node.line,
        })?;
        Ok(Expr::Unary {
            site: self.sites.unary(op),
            operand: self.lower(operand, scope)?.boxed(),
        })
    }

    fn lower_new(&mut self, operand: &Node, scope: ScopeId) -> CompileResult<Expr> {
        let (target, args) = match &operand.kind {
            NodeKind::Call { variable, arguments } => {
                (self.lower(variable, scope)?, self.lower_all(arguments, scope)?)
            }
            _ => (self.lower(operand, scope)?, Vec::new()),
        };
        Ok(Expr::CreateInstance {
            site: self.sites.create_instance(args.len()),
            target: target.boxed(),
            args,
        })
    }

    /// Prefix or postfix `++` / `--`: prefix yields the new value, postfix
    /// the old one
    fn lower_update(
        &mut self,
        node: &Node,
        target: &Node,
        op: BinaryOp,
        prefix: bool,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let not_assignable = || CompileError::NotAssignable {
            target: target.name().to_string(),
            line: node.line,
        };
        let step = self.sites.binary(op);

        if let Some(name) = target.simple_name().filter(|n| is_identifier(n) && *n != "this") {
            let binding = self.scopes.resolve_or_declare(scope, name);
            if prefix {
                return Ok(Expr::SetLocal {
                    binding,
                    value: Expr::Binary {
                        site: step,
                        left: Expr::Local(binding).boxed(),
                        right: Expr::int(1).boxed(),
                    }
                    .boxed(),
                });
            }
            let old = self.temporary(scope, "ref");
            return Ok(Expr::Sequence(vec![
                Expr::SetLocal {
                    binding: old,
                    value: Expr::Local(binding).boxed(),
                },
                Expr::SetLocal {
                    binding,
                    value: Expr::Binary {
                        site: step,
                        left: Expr::Local(old).boxed(),
                        right: Expr::int(1).boxed(),
                    }
                    .boxed(),
                },
                Expr::Local(old),
            ]));
        }

        let NodeKind::Value { base, properties } = &target.kind else {
            return Err(not_assignable());
        };
        let Some((last, init)) = properties.split_last() else {
            return Err(not_assignable());
        };

        let receiver = self.lower(base, scope)?;
        let receiver = self.lower_properties(receiver, init, scope, |_, expr| Ok(expr))?;
        let object = self.temporary(scope, "ref");
        let mut steps = vec![Expr::SetLocal {
            binding: object,
            value: receiver.boxed(),
        }];

        // Reader and writer for the updated slot, both through `object`.
        let (read, write): (Expr, Box<dyn Fn(Expr) -> Expr>) = match &last.kind {
            NodeKind::Access { name } => {
                let name = name.as_literal().ok_or_else(not_assignable)?;
                let get = self.sites.get_member(name);
                let set = self.sites.set_member(name);
                (
                    Expr::GetMember {
                        site: get,
                        target: Expr::Local(object).boxed(),
                    },
                    Box::new(move |value: Expr| Expr::SetMember {
                        site: set.clone(),
                        target: Expr::Local(object).boxed(),
                        value: value.boxed(),
                    }),
                )
            }
            NodeKind::Index { index } => {
                let key = self.temporary(scope, "ref");
                steps.push(Expr::SetLocal {
                    binding: key,
                    value: self.lower(index, scope)?.boxed(),
                });
                (
                    Expr::GetIndex {
                        target: Expr::Local(object).boxed(),
                        index: Expr::Local(key).boxed(),
                    },
                    Box::new(move |value: Expr| Expr::SetIndex {
                        target: Expr::Local(object).boxed(),
                        index: Expr::Local(key).boxed(),
                        value: value.boxed(),
                    }),
                )
            }
            _ => return Err(not_assignable()),
        };

        if prefix {
            steps.push(write(Expr::Binary {
                site: step,
                left: read.boxed(),
                right: Expr::int(1).boxed(),
            }));
        } else {
            let old = self.temporary(scope, "ref");
            steps.push(Expr::SetLocal {
                binding: old,
                value: read.boxed(),
            });
            steps.push(write(Expr::Binary {
                site: step,
                left: Expr::Local(old).boxed(),
                right: Expr::int(1).boxed(),
            }));
            steps.push(Expr::Local(old));
        }
        Ok(Expr::Sequence(steps))
    }

    pub(super) fn lower_object(&mut self, properties: &[Node], scope: ScopeId) -> CompileResult<Expr> {
        let object = self.temporary(scope, "obj");
        let mut steps = vec![Expr::SetLocal {
            binding: object,
            value: Expr::NewObject.boxed(),
        }];

        for property in properties {
            let (key, value) = match &property.kind {
                NodeKind::Comment => continue,
                NodeKind::Assign { variable, value } => {
                    let key = property_key(variable).ok_or_else(|| Self::unsupported(variable))?;
                    let value = self.lower_named(value, Some(key.as_str()), scope)?;
                    (key, value)
                }
                NodeKind::Value { .. } => {
                    let key = property_key(property).ok_or_else(|| Self::unsupported(property))?;
                    (key, self.lower(property, scope)?)
                }
                _ => return Err(Self::unsupported(property)),
            };
            steps.push(Expr::SetMember {
                site: self.sites.set_member(&key),
                target: Expr::Local(object).boxed(),
                value: value.boxed(),
            });
        }

        steps.push(Expr::Local(object));
        Ok(Expr::Sequence(steps))
    }
}

/// `temp = value; temp? ? then : undefined`
pub(super) fn guard(temp: Binding, value: Expr, then: Expr) -> Expr {
    Expr::Sequence(vec![
        Expr::SetLocal {
            binding: temp,
            value: value.boxed(),
        },
        Expr::Conditional {
            condition: Expr::IsDefined(Expr::Local(temp).boxed()).boxed(),
            then: then.boxed(),
            otherwise: Expr::undefined().boxed(),
        },
    ])
}

/// `(op, first, second)` of a chainable comparison
fn chained_comparison(node: &Node) -> Option<(BinaryOp, &Node, &Node)> {
    match &node.kind {
        NodeKind::Op {
            operator,
            first,
            second: Some(second),
            ..
        } => BinaryOp::from_token(operator)
            .filter(|op| op.is_chainable())
            .map(|op| (op, &**first, &**second)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_literals() {
        assert_eq!(number_literal("42"), Some(Constant::Int(42)));
        assert_eq!(number_literal("4294967296"), Some(Constant::Long(4_294_967_296)));
        assert_eq!(number_literal("0xff"), Some(Constant::Int(255)));
        assert_eq!(number_literal("2.5"), Some(Constant::Double(2.5)));
        assert_eq!(number_literal(".5"), Some(Constant::Double(0.5)));
        assert_eq!(number_literal("1e3"), Some(Constant::Double(1000.0)));
        assert_eq!(number_literal("x"), None);
        assert_eq!(number_literal("inf"), None);
        assert_eq!(number_literal("."), None);
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(string_literal("\"hi\"").as_deref(), Some("hi"));
        assert_eq!(string_literal("'a\\nb'").as_deref(), Some("a\nb"));
        assert_eq!(string_literal("\"it\\'s\"").as_deref(), Some("it's"));
        assert_eq!(string_literal("\"open"), None);
        assert_eq!(string_literal("\""), None);
        assert_eq!(string_literal("plain"), None);
    }

    #[test]
    fn test_bool_keywords() {
        assert!(matches!(bool_literal("yes"), Expr::Const(Constant::Bool(true))));
        assert!(matches!(bool_literal("off"), Expr::Const(Constant::Bool(false))));
    }
}
