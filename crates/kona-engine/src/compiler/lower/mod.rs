//! Tree to IR Lowering
//!
//! Walks a decoded tree under a scope context and produces [`Expr`] trees.
//! Dynamic operations are bound to canonical sites from [`DispatchSites`].

mod expr;
mod stmt;

use std::sync::Arc;

use crate::compiler::ir::{Expr, FunctionProto};
use crate::compiler::scope::{Binding, ScopeId, ScopeTree, VariableKind};
use crate::compiler::{CompileError, CompileResult};
use crate::parser::ast::{Node, NodeKind};
use crate::vm::dispatch::DispatchSites;

/// Lower a module body into its entry function.
///
/// The body becomes a function of `params` (in order) under a fresh root
/// scope.
pub fn lower_module(
    name: &str,
    tree: &Node,
    params: &[&str],
    sites: &DispatchSites,
) -> CompileResult<Arc<FunctionProto>> {
    let mut lowerer = Lowerer::new(sites);
    let root = lowerer.scopes.root();
    let scope = lowerer.scopes.function(root);

    let mut param_slots = Vec::with_capacity(params.len());
    for param in params {
        param_slots.push(lowerer.scopes.declare(scope, param, VariableKind::Parameter).slot);
    }

    let body = match &tree.kind {
        NodeKind::Block { expressions } => lowerer.lower_block(expressions, scope)?,
        _ => lowerer.lower(tree, scope)?,
    };

    tracing::debug!(
        module = name,
        frame_size = lowerer.scopes.frame_size(scope),
        sites = sites.len(),
        "lowered module"
    );

    Ok(Arc::new(FunctionProto {
        name: Some(Arc::from(name)),
        arity: params.len(),
        param_slots,
        frame_size: lowerer.scopes.frame_size(scope),
        locals: lowerer.scopes.declared_variables(scope),
        body,
    }))
}

/// Lowering state for one compilation
pub struct Lowerer<'a> {
    /// Scope arena
    scopes: ScopeTree,
    /// Canonical dispatch sites
    sites: &'a DispatchSites,
    /// Function bodies currently being lowered (`return` is only valid inside one)
    function_depth: usize,
}

/// Whether `text` is usable as a variable name
pub(crate) fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

impl<'a> Lowerer<'a> {
    /// Create a lowerer with an empty scope tree
    pub fn new(sites: &'a DispatchSites) -> Self {
        Self {
            scopes: ScopeTree::new(),
            sites,
            function_depth: 0,
        }
    }

    /// Scope arena built so far
    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    fn unsupported(node: &Node) -> CompileError {
        CompileError::UnsupportedConstruct {
            kind: node.name().to_string(),
            line: node.line,
        }
    }

    fn temporary(&mut self, scope: ScopeId, prefix: &str) -> Binding {
        self.scopes.fresh_temporary(scope, prefix).1
    }

    /// Lower a statement list, hoisting its assignment targets first
    pub fn lower_block(&mut self, expressions: &[Node], scope: ScopeId) -> CompileResult<Expr> {
        self.hoist(expressions, scope);

        let mut lowered = Vec::with_capacity(expressions.len());
        for node in expressions {
            if matches!(node.kind, NodeKind::Comment) {
                continue;
            }
            lowered.push(self.lower(node, scope)?);
        }

        Ok(match lowered.len() {
            0 => Expr::undefined(),
            1 => lowered.pop().unwrap_or_else(Expr::undefined),
            _ => Expr::Sequence(lowered),
        })
    }

    /// Declare every simple-name (or object pattern) target of the block's
    /// direct assignments, so closures lowered earlier in the block resolve
    /// them lexically.
    fn hoist(&mut self, expressions: &[Node], scope: ScopeId) {
        for node in expressions {
            let NodeKind::Assign { variable, .. } = &node.kind else {
                continue;
            };
            if let Some(name) = variable.simple_name().filter(|n| is_identifier(n) && *n != "this") {
                self.scopes.resolve_or_declare(scope, name);
            } else if let Some(properties) = stmt::object_pattern(variable) {
                for property in properties {
                    if let Some((_, target)) = stmt::pattern_item(property) {
                        if let Some(name) = target.simple_name().filter(|n| is_identifier(n)) {
                            self.scopes.resolve_or_declare(scope, name);
                        }
                    }
                }
            }
        }
    }

    /// Lower a function literal into a closure
    pub(crate) fn lower_code(
        &mut self,
        params: &[Node],
        body: Option<&Node>,
        name: Option<&str>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        let function = self.scopes.function(scope);

        let mut param_slots = Vec::with_capacity(params.len());
        for param in params {
            let NodeKind::Param { name, value } = &param.kind else {
                return Err(Self::unsupported(param));
            };
            let param_name = name.as_literal().filter(|n| is_identifier(n));
            match (param_name, value) {
                (Some(param_name), None) => {
                    let binding = self.scopes.declare(function, param_name, VariableKind::Parameter);
                    param_slots.push(binding.slot);
                }
                _ => return Err(Self::unsupported(param)),
            }
        }

        self.function_depth += 1;
        let lowered = match body {
            Some(Node {
                kind: NodeKind::Block { expressions },
                ..
            }) => self.lower_block(expressions, function),
            Some(node) => self.lower(node, function),
            None => Ok(Expr::undefined()),
        };
        self.function_depth -= 1;

        Ok(Expr::Closure(Arc::new(FunctionProto {
            name: name.map(Arc::from),
            arity: params.len(),
            param_slots,
            frame_size: self.scopes.frame_size(function),
            locals: self.scopes.declared_variables(function),
            body: lowered?,
        })))
    }

    /// Lower one node
    pub fn lower(&mut self, node: &Node, scope: ScopeId) -> CompileResult<Expr> {
        self.lower_named(node, None, scope)
    }

    /// Lower one node; a function literal is named `name`
    pub(crate) fn lower_named(
        &mut self,
        node: &Node,
        name: Option<&str>,
        scope: ScopeId,
    ) -> CompileResult<Expr> {
        match &node.kind {
            NodeKind::Block { expressions } => self.lower_block(expressions, scope),
            NodeKind::Assign { variable, value } => self.lower_assign(variable, value, scope, node.line),
            NodeKind::Value { base, properties } => self.lower_value(base, properties, name, scope),
            NodeKind::Literal { value } => self.lower_literal(value, scope, node),
            NodeKind::Call { variable, arguments } => {
                self.lower_call(variable, arguments, node.soak, scope)
            }
            NodeKind::Code { params, body } => self.lower_code(params, body.as_deref(), name, scope),
            NodeKind::If {
                condition,
                body,
                else_body,
            } => self.lower_if(condition, body.as_deref(), else_body.as_deref(), scope),
            NodeKind::Op {
                operator,
                flip,
                first,
                second,
            } => self.lower_op(node, operator, *flip, first, second.as_deref(), scope),
            NodeKind::Obj { properties } => self.lower_object(properties, scope),
            NodeKind::Arr { objects } => {
                let mut items = Vec::with_capacity(objects.len());
                for item in objects {
                    if !matches!(item.kind, NodeKind::Comment) {
                        items.push(self.lower(item, scope)?);
                    }
                }
                Ok(Expr::NewArray(items))
            }
            NodeKind::Parens { body } => self.lower_named(body, name, scope),
            NodeKind::Existence { expression } => self.lower_existence(expression, scope),
            NodeKind::In {
                object,
                array,
                negated,
            } => Ok(Expr::Contains {
                item: self.lower(object, scope)?.boxed(),
                collection: self.lower(array, scope)?.boxed(),
                negated: *negated,
            }),
            NodeKind::Throw { expression } => Ok(Expr::Throw(self.lower(expression, scope)?.boxed())),
            NodeKind::Return { expression } => self.lower_return(node, expression.as_deref(), scope),
            NodeKind::Bool { value } => Ok(expr::bool_literal(value)),
            NodeKind::Null => Ok(Expr::Const(crate::compiler::ir::Constant::Null)),
            NodeKind::Undefined | NodeKind::Comment => Ok(Expr::undefined()),
            NodeKind::Access { .. }
            | NodeKind::Index { .. }
            | NodeKind::Param { .. }
            | NodeKind::Class { .. }
            | NodeKind::For { .. }
            | NodeKind::While { .. }
            | NodeKind::Switch { .. }
            | NodeKind::Try { .. }
            | NodeKind::Splat { .. }
            | NodeKind::Slice { .. }
            | NodeKind::Range { .. }
            | NodeKind::Extends { .. } => Err(Self::unsupported(node)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode;

    fn lower_dump(dump: &str) -> CompileResult<Arc<FunctionProto>> {
        let sites = DispatchSites::new();
        let tree = decode(dump).expect("dump decodes");
        lower_module("test", &tree, &["exports"], &sites)
    }

    fn unsupported_kind(dump: &str) -> String {
        match lower_dump(dump) {
            Err(CompileError::UnsupportedConstruct { kind, .. }) => kind,
            other => panic!("expected an unsupported construct, got {:?}", other),
        }
    }

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("value1"));
        assert!(is_identifier("_ref"));
        assert!(is_identifier("$"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("\"text\""));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_module_frame_layout() {
        let proto = lower_dump("Block\n  Assign\n    Value \"x\"\n    Value \"1\"").unwrap();
        assert_eq!(proto.arity, 1);
        assert_eq!(proto.param_slots, vec![1]);
        assert_eq!(proto.frame_size, 3);
        assert_eq!(proto.locals.len(), 1);
        assert_eq!(&*proto.locals[0], "x");
    }

    #[test]
    fn test_unsupported_constructs_are_reported() {
        assert_eq!(
            unsupported_kind("Block\n  While\n    Value \"x\"\n    Block"),
            "While"
        );
        assert_eq!(unsupported_kind("Block\n  Access \"x\""), "Access");
        assert_eq!(unsupported_kind("Block\n  Return\n    Value \"1\""), "Return");
        assert_eq!(
            unsupported_kind("Block\n  Code\n    Param \"a\"\n      Value \"1\"\n    Block"),
            "Param"
        );
    }

    #[test]
    fn test_code_records_arity_and_name() {
        let proto = lower_dump(
            "Block\n  Assign\n    Value \"square\"\n    Code\n      Param \"x\"\n      Block\n        Op *\n          Value \"x\"\n          Value \"x\"",
        )
        .unwrap();
        let Expr::SetLocal { value, .. } = &proto.body else {
            panic!("expected an assignment, got {:?}", proto.body);
        };
        let Expr::Closure(function) = value.as_ref() else {
            panic!("expected a closure, got {:?}", value);
        };
        assert_eq!(function.display_name(), "square");
        assert_eq!(function.arity, 1);
        assert_eq!(function.param_slots, vec![1]);
    }
}
