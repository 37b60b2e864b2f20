//! Operator tokens and their native semantics

use std::fmt;

use crate::vm::value::{Shape, Value};
use crate::vm::{VmError, VmResult};

// ============================================================================
// Operator tokens
// ============================================================================

/// Binary operator dispatched through a `BinaryOperation` site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `===`
    StrictEq,
    /// `!==`
    StrictNe,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Rem,
    /// `||`
    Or,
    /// `&&`
    And,
}

impl BinaryOp {
    /// Map a dump operator token. `==`/`!=` are accepted as aliases of the
    /// strict forms.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "===" | "==" => BinaryOp::StrictEq,
            "!==" | "!=" => BinaryOp::StrictNe,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Rem,
            "||" => BinaryOp::Or,
            "&&" => BinaryOp::And,
            _ => return None,
        })
    }

    /// Canonical token
    pub fn token(self) -> &'static str {
        match self {
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
        }
    }

    /// Ordering comparison (`< <= > >=`)
    pub fn is_comparison(self) -> bool {
        matches!(self, BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge)
    }

    /// Operators that chain: `a < b < c` reads as `a < b && b < c`
    pub fn is_chainable(self) -> bool {
        self.is_comparison() || matches!(self, BinaryOp::StrictEq | BinaryOp::StrictNe)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Unary operator dispatched through a `UnaryOperation` site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
    /// `+`
    Plus,
    /// `~`
    BitNot,
    /// `typeof`
    TypeOf,
}

impl UnaryOp {
    /// Map a dump operator token
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "!" => UnaryOp::Not,
            "-" => UnaryOp::Negate,
            "+" => UnaryOp::Plus,
            "~" => UnaryOp::BitNot,
            "typeof" => UnaryOp::TypeOf,
            _ => return None,
        })
    }

    /// Canonical token
    pub fn token(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
            UnaryOp::Plus => "+",
            UnaryOp::BitNot => "~",
            UnaryOp::TypeOf => "typeof",
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

// ============================================================================
// Resolved operator rules
// ============================================================================

/// Resolved implementation of a binary operator for one pair of shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryRule {
    /// Both operands `int`
    Int(BinaryOp),
    /// Integer operands, at least one `long`
    Long(BinaryOp),
    /// Numeric operands, at least one `double`
    Double(BinaryOp),
    /// `+` with a string on either side
    Concat,
    /// Ordering of two strings
    StrCompare(BinaryOp),
    /// `&&` / `||` on two booleans
    BoolLogic(BinaryOp),
    /// `===` / `!==` on anything
    StrictEquality {
        /// `!==`
        negated: bool,
    },
}

fn is_integer(shape: Shape) -> bool {
    matches!(shape, Shape::Int | Shape::Long)
}

fn is_numeric(shape: Shape) -> bool {
    matches!(shape, Shape::Int | Shape::Long | Shape::Double)
}

fn compare<T: PartialOrd>(op: BinaryOp, a: T, b: T) -> Option<bool> {
    Some(match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Le => a <= b,
        BinaryOp::Gt => a > b,
        BinaryOp::Ge => a >= b,
        _ => return None,
    })
}

fn operand_mismatch() -> VmError {
    VmError::Internal("operand does not match its cached shape".to_string())
}

impl BinaryRule {
    /// Pick the rule for `op` applied to operands of these shapes
    pub fn resolve(op: BinaryOp, left: Shape, right: Shape) -> Option<Self> {
        match op {
            BinaryOp::StrictEq => return Some(BinaryRule::StrictEquality { negated: false }),
            BinaryOp::StrictNe => return Some(BinaryRule::StrictEquality { negated: true }),
            _ => {}
        }

        match (left, right) {
            (Shape::Int, Shape::Int) => Some(BinaryRule::Int(op)),
            (l, r) if is_integer(l) && is_integer(r) => Some(BinaryRule::Long(op)),
            (l, r) if is_numeric(l) && is_numeric(r) => match op {
                BinaryOp::And | BinaryOp::Or => None,
                _ => Some(BinaryRule::Double(op)),
            },
            (Shape::Str, _) | (_, Shape::Str) if op == BinaryOp::Add => Some(BinaryRule::Concat),
            (Shape::Str, Shape::Str) if op.is_comparison() => Some(BinaryRule::StrCompare(op)),
            (Shape::Bool, Shape::Bool) if matches!(op, BinaryOp::And | BinaryOp::Or) => {
                Some(BinaryRule::BoolLogic(op))
            }
            _ => None,
        }
    }

    /// Apply to concrete operands
    pub fn apply(self, left: &Value, right: &Value) -> VmResult<Value> {
        match self {
            BinaryRule::Int(op) => match (left, right) {
                (Value::Int(a), Value::Int(b)) => int_op(op, *a, *b),
                _ => Err(operand_mismatch()),
            },
            BinaryRule::Long(op) => match (left.as_i64(), right.as_i64()) {
                (Some(a), Some(b)) => long_op(op, a, b),
                _ => Err(operand_mismatch()),
            },
            BinaryRule::Double(op) => match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => double_op(op, a, b),
                _ => Err(operand_mismatch()),
            },
            BinaryRule::Concat => Ok(Value::string(format!("{}{}", left, right))),
            BinaryRule::StrCompare(op) => match (left.as_str(), right.as_str()) {
                (Some(a), Some(b)) => compare(op, a, b).map(Value::Bool).ok_or_else(operand_mismatch),
                _ => Err(operand_mismatch()),
            },
            BinaryRule::BoolLogic(op) => match (left.as_bool(), right.as_bool()) {
                (Some(a), Some(b)) => Ok(Value::Bool(if op == BinaryOp::And { a && b } else { a || b })),
                _ => Err(operand_mismatch()),
            },
            BinaryRule::StrictEquality { negated } => {
                Ok(Value::Bool(left.strict_equals(right) != negated))
            }
        }
    }
}

fn int_op(op: BinaryOp, a: i32, b: i32) -> VmResult<Value> {
    Ok(match op {
        BinaryOp::Add => Value::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinaryOp::Div if b == 0 => return Err(VmError::DivideByZero),
        BinaryOp::Div => Value::Int(a.wrapping_div(b)),
        BinaryOp::Rem if b == 0 => return Err(VmError::DivideByZero),
        BinaryOp::Rem => Value::Int(a.wrapping_rem(b)),
        BinaryOp::And => Value::Int(a & b),
        BinaryOp::Or => Value::Int(a | b),
        _ => Value::Bool(compare(op, a, b).ok_or_else(operand_mismatch)?),
    })
}

fn long_op(op: BinaryOp, a: i64, b: i64) -> VmResult<Value> {
    Ok(match op {
        BinaryOp::Add => Value::Long(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Long(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Long(a.wrapping_mul(b)),
        BinaryOp::Div if b == 0 => return Err(VmError::DivideByZero),
        BinaryOp::Div => Value::Long(a.wrapping_div(b)),
        BinaryOp::Rem if b == 0 => return Err(VmError::DivideByZero),
        BinaryOp::Rem => Value::Long(a.wrapping_rem(b)),
        BinaryOp::And => Value::Long(a & b),
        BinaryOp::Or => Value::Long(a | b),
        _ => Value::Bool(compare(op, a, b).ok_or_else(operand_mismatch)?),
    })
}

fn double_op(op: BinaryOp, a: f64, b: f64) -> VmResult<Value> {
    Ok(match op {
        BinaryOp::Add => Value::Double(a + b),
        BinaryOp::Sub => Value::Double(a - b),
        BinaryOp::Mul => Value::Double(a * b),
        BinaryOp::Div => Value::Double(a / b),
        BinaryOp::Rem => Value::Double(a % b),
        _ => Value::Bool(compare(op, a, b).ok_or_else(operand_mismatch)?),
    })
}

/// Resolved implementation of a unary operator for one shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryRule {
    /// Logical negation of truthiness
    Not,
    /// Arithmetic negation
    Negate,
    /// Numeric identity
    Plus,
    /// Bitwise complement of an integer
    BitNot,
    /// `typeof` description
    TypeOf,
}

impl UnaryRule {
    /// Pick the rule for `op` applied to an operand of this shape
    pub fn resolve(op: UnaryOp, operand: Shape) -> Option<Self> {
        match op {
            UnaryOp::Not => Some(UnaryRule::Not),
            UnaryOp::TypeOf => Some(UnaryRule::TypeOf),
            UnaryOp::Negate if is_numeric(operand) => Some(UnaryRule::Negate),
            UnaryOp::Plus if is_numeric(operand) => Some(UnaryRule::Plus),
            UnaryOp::BitNot if is_integer(operand) => Some(UnaryRule::BitNot),
            _ => None,
        }
    }

    /// Apply to a concrete operand
    pub fn apply(self, operand: &Value) -> VmResult<Value> {
        match (self, operand) {
            (UnaryRule::Not, v) => Ok(Value::Bool(!v.is_truthy())),
            (UnaryRule::TypeOf, v) => Ok(Value::string(v.type_of())),
            (UnaryRule::Negate, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
            (UnaryRule::Negate, Value::Long(l)) => Ok(Value::Long(l.wrapping_neg())),
            (UnaryRule::Negate, Value::Double(d)) => Ok(Value::Double(-d)),
            (UnaryRule::Plus, v @ (Value::Int(_) | Value::Long(_) | Value::Double(_))) => Ok(v.clone()),
            (UnaryRule::BitNot, Value::Int(i)) => Ok(Value::Int(!i)),
            (UnaryRule::BitNot, Value::Long(l)) => Ok(Value::Long(!l)),
            _ => Err(operand_mismatch()),
        }
    }
}
