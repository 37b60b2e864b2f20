//! Dynamic values
//!
//! Every value a script can observe. Reference kinds (arrays, objects,
//! functions, host instances) are shared handles; everything else is copied.

use std::fmt;
use std::sync::Arc;

use crate::vm::function::Function;
use crate::vm::object::{Array, DynamicObject};
use crate::vm::reflect::{HostObject, HostType, HostTypeId};

/// A dynamically-typed value
#[derive(Clone)]
pub enum Value {
    /// Missing value
    Undefined,
    /// Explicit null
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// Double-precision float
    Double(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Shared array
    Array(Array),
    /// Shared dynamic object
    Object(DynamicObject),
    /// Script or native function
    Function(Function),
    /// Wrapped host type, resolving static members and constructors
    Type(Arc<HostType>),
    /// Instance of a host type
    Host(HostObject),
}

/// Run-time classification of a value, used as a dispatch cache key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Double
    Double,
    /// String
    Str,
    /// Array
    Array,
    /// Any dynamic object
    Object,
    /// Any function
    Function,
    /// Wrapped host type with this id
    Type(HostTypeId),
    /// Host instance of this type
    Host(HostTypeId),
}

impl Value {
    /// Build a string value
    pub fn string(text: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(text.as_ref()))
    }

    /// Shape of this value
    pub fn shape(&self) -> Shape {
        match self {
            Value::Undefined => Shape::Undefined,
            Value::Null => Shape::Null,
            Value::Bool(_) => Shape::Bool,
            Value::Int(_) => Shape::Int,
            Value::Long(_) => Shape::Long,
            Value::Double(_) => Shape::Double,
            Value::Str(_) => Shape::Str,
            Value::Array(_) => Shape::Array,
            Value::Object(_) => Shape::Object,
            Value::Function(_) => Shape::Function,
            Value::Type(ty) => Shape::Type(ty.id()),
            Value::Host(obj) => Shape::Host(obj.host_type().id()),
        }
    }

    /// Type description used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Long(_) => "long".to_string(),
            Value::Double(_) => "double".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Array(_) => "array".to_string(),
            Value::Object(_) => "object".to_string(),
            Value::Function(_) => "function".to_string(),
            Value::Type(ty) => format!("type {}", ty.full_name()),
            Value::Host(obj) => obj.host_type().full_name().to_string(),
        }
    }

    /// Result of the `typeof` operator
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Long(_) | Value::Double(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) | Value::Type(_) => "function",
            Value::Null | Value::Array(_) | Value::Object(_) | Value::Host(_) => "object",
        }
    }

    /// Neither `undefined` nor `null`
    pub fn is_defined(&self) -> bool {
        !matches!(self, Value::Undefined | Value::Null)
    }

    /// Truthiness used by conditionals and `!`
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Long(l) => *l != 0,
            Value::Double(d) => *d != 0.0 && !d.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// `===` semantics: numbers compare by value across widths, strings by
    /// content, reference kinds by identity
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Type(a), Value::Type(b)) => a.id() == b.id(),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            (Value::Double(_), _) | (_, Value::Double(_)) => {
                match (self.as_f64(), other.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// `Int` payload
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer payload widened to 64 bits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(i64::from(*i)),
            Value::Long(l) => Some(*l),
            _ => None,
        }
    }

    /// Any numeric payload as a double
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(f64::from(*i)),
            Value::Long(l) => Some(*l as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// `Bool` payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// `Str` payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// `Object` payload
    pub fn as_object(&self) -> Option<&DynamicObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// `Array` payload
    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// `Function` payload
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// `Host` payload
    pub fn as_host(&self) -> Option<&HostObject> {
        match self {
            Value::Host(obj) => Some(obj),
            _ => None,
        }
    }

    /// `Type` payload
    pub fn as_type(&self) -> Option<&Arc<HostType>> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }
}

fn format_double(d: f64) -> String {
    if d.is_infinite() {
        let sign = if d > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else {
        d.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Long(l) => write!(f, "{}", l),
            Value::Double(d) => f.write_str(&format_double(*d)),
            Value::Str(s) => f.write_str(s),
            Value::Array(arr) => {
                let items: Vec<String> = arr.to_vec().iter().map(|v| v.to_string()).collect();
                f.write_str(&items.join(","))
            }
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Function(func) => write!(f, "[Function {}]", func.name()),
            Value::Type(ty) => f.write_str(ty.full_name()),
            Value::Host(obj) => f.write_str(&obj.host_type().display(obj)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Int(i) => write!(f, "Int({})", i),
            Value::Long(l) => write!(f, "Long({})", l),
            Value::Double(d) => write!(f, "Double({})", d),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Array(arr) => arr.fmt(f),
            Value::Object(obj) => obj.fmt(f),
            Value::Function(func) => write!(f, "Function({})", func.name()),
            Value::Type(ty) => write!(f, "Type({})", ty.full_name()),
            Value::Host(obj) => write!(f, "Host({})", obj.host_type().full_name()),
        }
    }
}

/// Structural equality: same variant, equal payload, reference kinds by identity
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(_) | Value::Long(_) | Value::Double(_), _) => false,
            _ => self.strict_equals(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i)
    }
}

impl From<i64> for Value {
    fn from(l: i64) -> Self {
        Value::Long(l)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from_vec(items))
    }
}

impl From<DynamicObject> for Value {
    fn from(obj: DynamicObject) -> Self {
        Value::Object(obj)
    }
}

impl From<Function> for Value {
    fn from(func: Function) -> Self {
        Value::Function(func)
    }
}

impl From<HostObject> for Value {
    fn from(obj: HostObject) -> Self {
        Value::Host(obj)
    }
}

impl From<Arc<HostType>> for Value {
    fn from(ty: Arc<HostType>) -> Self {
        Value::Type(ty)
    }
}
