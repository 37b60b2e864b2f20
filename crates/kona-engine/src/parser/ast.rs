//! Tree node model
//!
//! Every node exclusively owns its children, so a decoded tree is acyclic by
//! construction. `soak` (a trailing `?` on the type token) is orthogonal to
//! the node kind.

use super::DecodeError;

/// A decoded tree node
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// What the node is, with its owned children
    pub kind: NodeKind,
    /// Safe-navigation marker
    pub soak: bool,
    /// Dump line the record was read from (1-based)
    pub line: usize,
}

/// Node kinds, one per dump type token
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Sequence of expressions
    Block {
        /// Statements in order
        expressions: Vec<Node>,
    },
    /// `variable = value`
    Assign {
        /// Assignment target
        variable: Box<Node>,
        /// Assigned expression
        value: Box<Node>,
    },
    /// A base expression followed by a property chain
    Value {
        /// The base expression
        base: Box<Node>,
        /// `Access` / `Index` properties applied left to right
        properties: Vec<Node>,
    },
    /// Raw token text: number, quoted string, or identifier
    Literal {
        /// Token text, one layer of dump quoting removed
        value: String,
    },
    /// `.name` property
    Access {
        /// Member name literal
        name: Box<Node>,
    },
    /// `[index]` property
    Index {
        /// Index expression
        index: Box<Node>,
    },
    /// Call of `variable` with arguments
    Call {
        /// Callee expression
        variable: Box<Node>,
        /// Argument expressions
        arguments: Vec<Node>,
    },
    /// Function literal
    Code {
        /// `Param` nodes
        params: Vec<Node>,
        /// Function body block
        body: Option<Box<Node>>,
    },
    /// Conditional
    If {
        /// Tested expression
        condition: Box<Node>,
        /// Taken branch
        body: Option<Box<Node>>,
        /// Else branch
        else_body: Option<Box<Node>>,
    },
    /// Unary or binary operator application
    Op {
        /// Operator token (`+`, `===`, `++`, `new`, ...)
        operator: String,
        /// Postfix form of `++` / `--`, written `Op ++!` in the dump
        flip: bool,
        /// First operand
        first: Box<Node>,
        /// Second operand, absent for unary operators
        second: Option<Box<Node>>,
    },
    /// Object literal
    Obj {
        /// Properties (`Assign` pairs or shorthand `Value`s)
        properties: Vec<Node>,
    },
    /// Array literal
    Arr {
        /// Elements
        objects: Vec<Node>,
    },
    /// Function parameter
    Param {
        /// Parameter name literal
        name: Box<Node>,
        /// Default value
        value: Option<Box<Node>>,
    },
    /// Parenthesized expression
    Parens {
        /// Wrapped body
        body: Box<Node>,
    },
    /// Postfix `?` existence test
    Existence {
        /// Tested expression
        expression: Box<Node>,
    },
    /// Class definition
    Class {
        /// Class name
        variable: Option<Box<Node>>,
        /// Superclass
        parent: Option<Box<Node>>,
        /// Class body
        body: Option<Box<Node>>,
    },
    /// `for` comprehension
    For {
        /// Loop body
        body: Box<Node>,
        /// Iterated source
        source: Box<Node>,
        /// `when` guard
        guard: Option<Box<Node>>,
    },
    /// `while` loop
    While {
        /// Loop condition
        condition: Box<Node>,
        /// `when` guard
        guard: Option<Box<Node>>,
        /// Loop body
        body: Box<Node>,
    },
    /// `switch` statement
    Switch {
        /// Switched-on expression
        subject: Box<Node>,
        /// Case clauses
        cases: Vec<Node>,
    },
    /// `try` / `catch` / `finally`
    Try {
        /// Protected block
        attempt: Box<Node>,
        /// Catch clause
        recovery: Option<Box<Node>>,
        /// Finally clause
        ensure: Option<Box<Node>>,
    },
    /// `throw expression`
    Throw {
        /// Thrown value
        expression: Box<Node>,
    },
    /// `return [expression]`
    Return {
        /// Returned value
        expression: Option<Box<Node>>,
    },
    /// `name...`
    Splat {
        /// Splatted expression
        name: Box<Node>,
    },
    /// `[a..b]` slice property
    Slice {
        /// Sliced range
        range: Box<Node>,
    },
    /// `[a..b]` range
    Range {
        /// Lower bound
        from: Box<Node>,
        /// Upper bound
        to: Box<Node>,
    },
    /// `child extends parent`
    Extends {
        /// Derived constructor
        child: Box<Node>,
        /// Base constructor
        parent: Box<Node>,
    },
    /// Boolean keyword (`true`, `false`, `yes`, `no`, ...)
    Bool {
        /// Keyword as written
        value: String,
    },
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// `object in array`
    In {
        /// Searched-for value
        object: Box<Node>,
        /// Searched array
        array: Box<Node>,
        /// `In!` form (`not in`)
        negated: bool,
    },
    /// Source comment
    Comment,
}

impl Node {
    /// Create a node with no soak marker
    pub fn new(kind: NodeKind, line: usize) -> Self {
        Self {
            kind,
            soak: false,
            line,
        }
    }

    /// Create a literal node
    pub fn literal(value: impl Into<String>, line: usize) -> Self {
        Self::new(
            NodeKind::Literal {
                value: value.into(),
            },
            line,
        )
    }

    /// Dump type token of this node, without soak or negation markers
    pub fn name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Block { .. } => "Block",
            NodeKind::Assign { .. } => "Assign",
            NodeKind::Value { .. } => "Value",
            NodeKind::Literal { .. } => "Literal",
            NodeKind::Access { .. } => "Access",
            NodeKind::Index { .. } => "Index",
            NodeKind::Call { .. } => "Call",
            NodeKind::Code { .. } => "Code",
            NodeKind::If { .. } => "If",
            NodeKind::Op { .. } => "Op",
            NodeKind::Obj { .. } => "Obj",
            NodeKind::Arr { .. } => "Arr",
            NodeKind::Param { .. } => "Param",
            NodeKind::Parens { .. } => "Parens",
            NodeKind::Existence { .. } => "Existence",
            NodeKind::Class { .. } => "Class",
            NodeKind::For { .. } => "For",
            NodeKind::While { .. } => "While",
            NodeKind::Switch { .. } => "Switch",
            NodeKind::Try { .. } => "Try",
            NodeKind::Throw { .. } => "Throw",
            NodeKind::Return { .. } => "Return",
            NodeKind::Splat { .. } => "Splat",
            NodeKind::Slice { .. } => "Slice",
            NodeKind::Range { .. } => "Range",
            NodeKind::Extends { .. } => "Extends",
            NodeKind::Bool { .. } => "Bool",
            NodeKind::Null => "Null",
            NodeKind::Undefined => "Undefined",
            NodeKind::In { .. } => "In",
            NodeKind::Comment => "Comment",
        }
    }

    /// Child nodes in dump order.
    ///
    /// The operator of an `Op` and the text of a `Literal` / `Bool` are part of
    /// the node itself and are not reported as children.
    pub fn children(&self) -> Vec<&Node> {
        fn push<'a>(out: &mut Vec<&'a Node>, node: &'a Option<Box<Node>>) {
            if let Some(node) = node {
                out.push(node);
            }
        }

        let mut out = Vec::new();
        match &self.kind {
            NodeKind::Block { expressions: items }
            | NodeKind::Obj { properties: items }
            | NodeKind::Arr { objects: items } => out.extend(items.iter()),
            NodeKind::Assign { variable, value } => {
                out.push(variable.as_ref());
                out.push(value.as_ref());
            }
            NodeKind::Value { base, properties } => {
                out.push(base.as_ref());
                out.extend(properties.iter());
            }
            NodeKind::Access { name: single }
            | NodeKind::Index { index: single }
            | NodeKind::Parens { body: single }
            | NodeKind::Existence { expression: single }
            | NodeKind::Throw { expression: single }
            | NodeKind::Splat { name: single }
            | NodeKind::Slice { range: single } => out.push(single.as_ref()),
            NodeKind::Call {
                variable,
                arguments,
            } => {
                out.push(variable.as_ref());
                out.extend(arguments.iter());
            }
            NodeKind::Code { params, body } => {
                out.extend(params.iter());
                push(&mut out, body);
            }
            NodeKind::If {
                condition,
                body,
                else_body,
            } => {
                out.push(condition.as_ref());
                push(&mut out, body);
                push(&mut out, else_body);
            }
            NodeKind::Op { first, second, .. } => {
                out.push(first.as_ref());
                push(&mut out, second);
            }
            NodeKind::Param { name, value } => {
                out.push(name.as_ref());
                push(&mut out, value);
            }
            NodeKind::Class {
                variable,
                parent,
                body,
            } => {
                push(&mut out, variable);
                push(&mut out, parent);
                push(&mut out, body);
            }
            NodeKind::For {
                body,
                source,
                guard,
            } => {
                out.push(body.as_ref());
                out.push(source.as_ref());
                push(&mut out, guard);
            }
            NodeKind::While {
                condition,
                guard,
                body,
            } => {
                out.push(condition.as_ref());
                push(&mut out, guard);
                out.push(body.as_ref());
            }
            NodeKind::Switch { subject, cases } => {
                out.push(subject.as_ref());
                out.extend(cases.iter());
            }
            NodeKind::Try {
                attempt,
                recovery,
                ensure,
            } => {
                out.push(attempt.as_ref());
                push(&mut out, recovery);
                push(&mut out, ensure);
            }
            NodeKind::Return { expression } => push(&mut out, expression),
            NodeKind::Range { from, to } => {
                out.push(from.as_ref());
                out.push(to.as_ref());
            }
            NodeKind::Extends { child, parent } => {
                out.push(child.as_ref());
                out.push(parent.as_ref());
            }
            NodeKind::In { object, array, .. } => {
                out.push(object.as_ref());
                out.push(array.as_ref());
            }
            NodeKind::Literal { .. }
            | NodeKind::Bool { .. }
            | NodeKind::Null
            | NodeKind::Undefined
            | NodeKind::Comment => {}
        }
        out
    }

    /// Literal text, if this is a `Literal`
    pub fn as_literal(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Literal { value } => Some(value),
            _ => None,
        }
    }

    /// Whether this is a `Block`
    pub fn is_block(&self) -> bool {
        matches!(self.kind, NodeKind::Block { .. })
    }

    /// For a `Value` with a literal base and no properties, the literal text
    pub fn simple_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Value { base, properties } if properties.is_empty() => base.as_literal(),
            NodeKind::Literal { value } => Some(value),
            _ => None,
        }
    }
}

// ============================================================================
// Record assembly
// ============================================================================

/// Positional child consumer for one record
struct Parts<'a> {
    token: &'a str,
    line: usize,
    count: usize,
    items: std::iter::Peekable<std::vec::IntoIter<Node>>,
}

impl<'a> Parts<'a> {
    fn new(token: &'a str, line: usize, children: Vec<Node>) -> Self {
        Self {
            token,
            line,
            count: children.len(),
            items: children.into_iter().peekable(),
        }
    }

    fn malformed(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            line: self.line,
            message: format!("{}: {}", self.token, message.into()),
        }
    }

    fn required(&mut self, what: &str) -> Result<Box<Node>, DecodeError> {
        match self.items.next() {
            Some(node) => Ok(Box::new(node)),
            None => Err(self.malformed(format!("missing {}", what))),
        }
    }

    fn optional(&mut self) -> Option<Box<Node>> {
        self.items.next().map(Box::new)
    }

    fn optional_if(&mut self, accept: impl Fn(&Node) -> bool) -> Option<Box<Node>> {
        self.items.next_if(|node| accept(node)).map(Box::new)
    }

    fn rest(self) -> Vec<Node> {
        self.items.collect()
    }

    fn finish(mut self) -> Result<(), DecodeError> {
        let extra = self.items.peek().map(Node::name);
        match extra {
            None => Ok(()),
            Some(name) => Err(self.malformed(format!(
                "unexpected {} child (expected at most {})",
                name,
                self.count - self.items.len()
            ))),
        }
    }
}

/// Build the node for one record from its type token, argument and children.
///
/// A non-empty argument becomes a leading `Literal` child, except for
/// `Literal` and `Bool` which keep it as their own text.
pub(crate) fn assemble(
    token: &str,
    soak: bool,
    argument: Option<String>,
    mut children: Vec<Node>,
    line: usize,
) -> Result<Node, DecodeError> {
    let kind = match token {
        "Literal" => NodeKind::Literal {
            value: argument.unwrap_or_default(),
        },
        "Bool" => NodeKind::Bool {
            value: argument.unwrap_or_default(),
        },
        "Null" => NodeKind::Null,
        "Undefined" => NodeKind::Undefined,
        "Comment" => NodeKind::Comment,
        _ => {
            if let Some(argument) = argument {
                children.insert(0, Node::literal(argument, line));
            }
            structured(token, Parts::new(token, line, children))?
        }
    };

    Ok(Node { kind, soak, line })
}

fn structured(token: &str, mut parts: Parts<'_>) -> Result<NodeKind, DecodeError> {
    let kind = match token {
        "Block" => NodeKind::Block {
            expressions: parts.rest(),
        },
        "Obj" => NodeKind::Obj {
            properties: parts.rest(),
        },
        "Arr" => NodeKind::Arr {
            objects: parts.rest(),
        },
        "Value" => NodeKind::Value {
            base: parts.required("base")?,
            properties: parts.rest(),
        },
        "Call" => NodeKind::Call {
            variable: parts.required("callee")?,
            arguments: parts.rest(),
        },
        "Switch" => NodeKind::Switch {
            subject: parts.required("subject")?,
            cases: parts.rest(),
        },
        "Assign" => {
            let variable = parts.required("variable")?;
            let value = parts.required("value")?;
            parts.finish()?;
            NodeKind::Assign { variable, value }
        }
        "Access" | "Index" | "Parens" | "Existence" | "Throw" | "Splat" | "Slice" => {
            let single = parts.required("operand")?;
            parts.finish()?;
            match token {
                "Access" => NodeKind::Access { name: single },
                "Index" => NodeKind::Index { index: single },
                "Parens" => NodeKind::Parens { body: single },
                "Existence" => NodeKind::Existence { expression: single },
                "Throw" => NodeKind::Throw { expression: single },
                "Splat" => NodeKind::Splat { name: single },
                _ => NodeKind::Slice { range: single },
            }
        }
        "Code" => {
            let mut params = Vec::new();
            while let Some(param) = parts.optional_if(|n| matches!(n.kind, NodeKind::Param { .. })) {
                params.push(*param);
            }
            let body = parts.optional_if(Node::is_block);
            parts.finish()?;
            NodeKind::Code { params, body }
        }
        "If" => {
            let condition = parts.required("condition")?;
            let body = parts.optional();
            let else_body = parts.optional();
            parts.finish()?;
            NodeKind::If {
                condition,
                body,
                else_body,
            }
        }
        "Op" => {
            let operator = parts.required("operator")?;
            let Some(token) = operator.as_literal() else {
                return Err(parts.malformed("operator must be the record argument"));
            };
            let (operator, flip) = match token {
                "++!" | "--!" => (token[..2].to_string(), true),
                _ => (token.to_string(), false),
            };
            let first = parts.required("operand")?;
            let second = parts.optional();
            parts.finish()?;
            NodeKind::Op {
                operator,
                flip,
                first,
                second,
            }
        }
        "Param" => {
            let name = parts.required("name")?;
            let value = parts.optional();
            parts.finish()?;
            NodeKind::Param { name, value }
        }
        "Class" => match parts.count {
            1 => {
                let only = parts.required("body")?;
                if only.is_block() {
                    NodeKind::Class {
                        variable: None,
                        parent: None,
                        body: Some(only),
                    }
                } else {
                    NodeKind::Class {
                        variable: Some(only),
                        parent: None,
                        body: None,
                    }
                }
            }
            2 => NodeKind::Class {
                variable: Some(parts.required("variable")?),
                parent: None,
                body: Some(parts.required("body")?),
            },
            3 => NodeKind::Class {
                variable: Some(parts.required("variable")?),
                parent: Some(parts.required("parent")?),
                body: Some(parts.required("body")?),
            },
            n => return Err(parts.malformed(format!("expected 1 to 3 children, found {}", n))),
        },
        "For" => {
            let body = parts.required("body")?;
            let source = parts.required("source")?;
            let guard = parts.optional();
            parts.finish()?;
            NodeKind::For {
                body,
                source,
                guard,
            }
        }
        "While" => match parts.count {
            2 => NodeKind::While {
                condition: parts.required("condition")?,
                guard: None,
                body: parts.required("body")?,
            },
            3 => NodeKind::While {
                condition: parts.required("condition")?,
                guard: Some(parts.required("guard")?),
                body: parts.required("body")?,
            },
            n => return Err(parts.malformed(format!("expected 2 or 3 children, found {}", n))),
        },
        "Try" => {
            let attempt = parts.required("attempt")?;
            let recovery = parts.optional();
            let ensure = parts.optional();
            parts.finish()?;
            NodeKind::Try {
                attempt,
                recovery,
                ensure,
            }
        }
        "Return" => {
            let expression = parts.optional();
            parts.finish()?;
            NodeKind::Return { expression }
        }
        "Range" | "Extends" | "In" | "In!" => {
            let left = parts.required("left operand")?;
            let right = parts.required("right operand")?;
            parts.finish()?;
            match token {
                "Range" => NodeKind::Range {
                    from: left,
                    to: right,
                },
                "Extends" => NodeKind::Extends {
                    child: left,
                    parent: right,
                },
                _ => NodeKind::In {
                    object: left,
                    array: right,
                    negated: token == "In!",
                },
            }
        }
        _ => {
            return Err(DecodeError::UnsupportedNodeKind {
                kind: token.to_string(),
                line: parts.line,
            })
        }
    };

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(value: &str) -> Node {
        Node::literal(value, 1)
    }

    fn value(name: &str) -> Node {
        assemble("Value", false, Some(name.to_string()), vec![], 1).unwrap()
    }

    #[test]
    fn test_argument_becomes_leading_literal() {
        let node = value("x");
        match node.kind {
            NodeKind::Value { base, properties } => {
                assert_eq!(base.as_literal(), Some("x"));
                assert!(properties.is_empty());
            }
            other => panic!("expected Value, got {:?}", other),
        }
    }

    #[test]
    fn test_op_takes_operator_from_argument() {
        let node = assemble(
            "Op",
            false,
            Some("+".to_string()),
            vec![value("a"), value("b")],
            1,
        )
        .unwrap();
        match node.kind {
            NodeKind::Op {
                operator,
                flip,
                second,
                ..
            } => {
                assert_eq!(operator, "+");
                assert!(!flip);
                assert!(second.is_some());
            }
            other => panic!("expected Op, got {:?}", other),
        }
    }

    #[test]
    fn test_postfix_update_sets_flip() {
        let node = assemble("Op", false, Some("++!".to_string()), vec![value("a")], 1).unwrap();
        assert!(matches!(node.kind, NodeKind::Op { ref operator, flip: true, .. } if operator == "++"));
    }

    #[test]
    fn test_op_without_operator_is_malformed() {
        let err = assemble("Op", false, None, vec![value("a")], 3).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_assign_arity_is_enforced() {
        let err = assemble("Assign", false, None, vec![value("a")], 1).unwrap_err();
        assert!(err.to_string().contains("missing value"));

        let err = assemble(
            "Assign",
            false,
            None,
            vec![value("a"), value("b"), value("c")],
            1,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unexpected Value child"));
    }

    #[test]
    fn test_class_shapes() {
        let body = assemble("Block", false, None, vec![], 1).unwrap();
        let only_body = assemble("Class", false, None, vec![body.clone()], 1).unwrap();
        assert!(matches!(
            only_body.kind,
            NodeKind::Class { variable: None, body: Some(_), .. }
        ));

        let named = assemble("Class", false, Some("Animal".to_string()), vec![], 1).unwrap();
        assert!(matches!(
            named.kind,
            NodeKind::Class { variable: Some(_), body: None, .. }
        ));

        let derived = assemble(
            "Class",
            false,
            None,
            vec![value("Dog"), value("Animal"), body],
            1,
        )
        .unwrap();
        assert!(matches!(
            derived.kind,
            NodeKind::Class { parent: Some(_), .. }
        ));
    }

    #[test]
    fn test_code_splits_params_and_body() {
        let param = assemble("Param", false, Some("x".to_string()), vec![], 1).unwrap();
        let body = assemble("Block", false, None, vec![value("x")], 1).unwrap();
        let code = assemble("Code", false, None, vec![param, body], 1).unwrap();
        match &code.kind {
            NodeKind::Code { params, body } => {
                assert_eq!(params.len(), 1);
                assert!(body.is_some());
            }
            other => panic!("expected Code, got {:?}", other),
        }
        assert_eq!(code.children().len(), 2);
    }

    #[test]
    fn test_negated_in() {
        let node = assemble("In!", false, None, vec![value("a"), value("b")], 1).unwrap();
        assert!(matches!(node.kind, NodeKind::In { negated: true, .. }));
    }

    #[test]
    fn test_literal_and_bool_keep_argument() {
        let node = assemble("Bool", false, Some("true".to_string()), vec![lit("x")], 1).unwrap();
        assert_eq!(node.kind, NodeKind::Bool { value: "true".to_string() });
        assert!(node.children().is_empty());
    }

    #[test]
    fn test_simple_name() {
        assert_eq!(value("count").simple_name(), Some("count"));
        let chained = assemble(
            "Value",
            false,
            Some("a".to_string()),
            vec![assemble("Access", false, Some("b".to_string()), vec![], 1).unwrap()],
            1,
        )
        .unwrap();
        assert_eq!(chained.simple_name(), None);
    }
}
