//! Host type descriptors and instances

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::type_builder::HostTypeBuilder;
use crate::vm::value::{Shape, Value};
use crate::vm::{VmError, VmResult};

/// Global counter for host type identities
static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a host type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostTypeId(u64);

impl HostTypeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Declared parameter type of a host member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Accepts every value
    Any,
    /// `bool`
    Bool,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// Double
    Double,
    /// String
    String,
    /// Array
    Array,
    /// Dynamic object
    Object,
    /// Function
    Function,
    /// The host's generic "type" parameter: accepts wrapped-type values
    Type,
    /// Instance of one specific host type
    Host(HostTypeId),
}

impl ParamKind {
    /// Whether an argument of this shape may bind to the parameter.
    ///
    /// Assignability is strict: no numeric widening, and `null` only binds
    /// to `Any`.
    pub fn accepts(self, shape: Shape) -> bool {
        match (self, shape) {
            (ParamKind::Any, _) => true,
            (ParamKind::Bool, Shape::Bool)
            | (ParamKind::Int, Shape::Int)
            | (ParamKind::Long, Shape::Long)
            | (ParamKind::Double, Shape::Double)
            | (ParamKind::String, Shape::Str)
            | (ParamKind::Array, Shape::Array)
            | (ParamKind::Object, Shape::Object)
            | (ParamKind::Function, Shape::Function)
            | (ParamKind::Type, Shape::Type(_)) => true,
            (ParamKind::Host(expected), Shape::Host(actual)) => expected == actual,
            _ => false,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            ParamKind::Any => "any",
            ParamKind::Bool => "bool",
            ParamKind::Int => "int",
            ParamKind::Long => "long",
            ParamKind::Double => "double",
            ParamKind::String => "string",
            ParamKind::Array => "array",
            ParamKind::Object => "object",
            ParamKind::Function => "function",
            ParamKind::Type => "Type",
            ParamKind::Host(_) => "host",
        }
    }
}

/// Kind of a host member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Read/write storage
    Field,
    /// Computed value, optionally writable
    Property,
    /// Invocable member
    Method,
    /// Instance constructor
    Constructor,
}

impl MemberKind {
    /// Field or property
    pub fn is_data(self) -> bool {
        matches!(self, MemberKind::Field | MemberKind::Property)
    }
}

/// Host implementation: `(receiver, arguments) -> result`.
///
/// The receiver is the instance for instance members, the wrapped type for
/// static members and constructors, and the value itself for intrinsics.
pub type HostFn = Arc<dyn Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync>;

/// One member of a host type
pub struct HostMember {
    pub(crate) name: Arc<str>,
    pub(crate) kind: MemberKind,
    pub(crate) is_static: bool,
    pub(crate) params: Vec<ParamKind>,
    pub(crate) invoke: HostFn,
    pub(crate) setter: Option<HostFn>,
}

impl HostMember {
    /// Member name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member kind
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Whether the member belongs to the type rather than its instances
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Declared parameter kinds
    pub fn params(&self) -> &[ParamKind] {
        &self.params
    }

    /// Declared parameter count
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Whether a data member accepts writes
    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    /// Invoke a method or constructor
    pub fn invoke(&self, receiver: &Value, args: &[Value]) -> VmResult<Value> {
        (self.invoke)(receiver, args)
    }

    /// Read a data member
    pub fn get(&self, receiver: &Value) -> VmResult<Value> {
        (self.invoke)(receiver, &[])
    }

    /// Write a data member
    pub fn set(&self, receiver: &Value, value: Value) -> VmResult<()> {
        match &self.setter {
            Some(setter) => setter(receiver, std::slice::from_ref(&value)).map(|_| ()),
            None => Err(VmError::TypeError(format!(
                "member '{}' is read-only",
                self.name
            ))),
        }
    }

    /// Human-readable signature, e.g. `Max(int, int)`
    pub fn signature(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.describe()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

impl fmt::Debug for HostMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMember")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_static", &self.is_static)
            .field("params", &self.params)
            .finish()
    }
}

pub(crate) type DisplayFn = Arc<dyn Fn(&HostObject) -> String + Send + Sync>;

/// Reflection descriptor of a host type
pub struct HostType {
    pub(crate) id: HostTypeId,
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) members: Vec<Arc<HostMember>>,
    pub(crate) display: Option<DisplayFn>,
}

impl HostType {
    /// Start describing a type by its dotted full name
    pub fn builder(full_name: &str) -> HostTypeBuilder {
        HostTypeBuilder::new(full_name)
    }

    /// Type identity
    pub fn id(&self) -> HostTypeId {
        self.id
    }

    /// Last segment of the full name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dotted full name, e.g. `Kona.Text.StringBuilder`
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Everything before the last dot
    pub fn namespace(&self) -> Option<&str> {
        self.full_name.rsplit_once('.').map(|(ns, _)| ns)
    }

    /// Members in declaration order
    pub fn members(&self) -> &[Arc<HostMember>] {
        &self.members
    }

    /// Members with this name, in declaration order
    pub fn members_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Arc<HostMember>> {
        self.members.iter().filter(move |m| &*m.name == name)
    }

    /// Constructors in declaration order
    pub fn constructors(&self) -> impl Iterator<Item = &Arc<HostMember>> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Constructor)
    }

    /// Display form of an instance
    pub fn display(&self, obj: &HostObject) -> String {
        match &self.display {
            Some(display) => display(obj),
            None => self.full_name.clone(),
        }
    }
}

impl fmt::Debug for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostType")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("members", &self.members.len())
            .finish()
    }
}

/// Instance of a host type carrying opaque host state
#[derive(Clone)]
pub struct HostObject {
    ty: Arc<HostType>,
    state: Arc<RwLock<Box<dyn Any + Send + Sync>>>,
}

impl HostObject {
    /// Create an instance of `ty` holding `state`
    pub fn new<T: Any + Send + Sync>(ty: Arc<HostType>, state: T) -> Self {
        Self {
            ty,
            state: Arc::new(RwLock::new(Box::new(state))),
        }
    }

    /// The instance's type
    pub fn host_type(&self) -> &Arc<HostType> {
        &self.ty
    }

    /// Borrow the state as `T`
    pub fn with<T: Any, R>(&self, f: impl FnOnce(&T) -> R) -> VmResult<R> {
        let state = self.state.read();
        match state.downcast_ref::<T>() {
            Some(state) => Ok(f(state)),
            None => Err(self.state_mismatch()),
        }
    }

    /// Mutably borrow the state as `T`
    pub fn with_mut<T: Any, R>(&self, f: impl FnOnce(&mut T) -> R) -> VmResult<R> {
        let mut state = self.state.write();
        match state.downcast_mut::<T>() {
            Some(state) => Ok(f(state)),
            None => Err(self.state_mismatch()),
        }
    }

    /// Whether both handles refer to the same instance
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    fn state_mismatch(&self) -> VmError {
        VmError::TypeError(format!(
            "unexpected state for instance of {}",
            self.ty.full_name()
        ))
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("type", &self.ty.full_name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_param_accepts_wrapped_types_only() {
        let id = HostTypeId::next();
        assert!(ParamKind::Type.accepts(Shape::Type(id)));
        assert!(!ParamKind::Type.accepts(Shape::Host(id)));
        assert!(!ParamKind::Type.accepts(Shape::Str));
    }

    #[test]
    fn test_strict_assignability() {
        assert!(ParamKind::Int.accepts(Shape::Int));
        assert!(!ParamKind::Long.accepts(Shape::Int));
        assert!(!ParamKind::Double.accepts(Shape::Int));
        assert!(!ParamKind::String.accepts(Shape::Null));
        assert!(ParamKind::Any.accepts(Shape::Null));

        let a = HostTypeId::next();
        let b = HostTypeId::next();
        assert!(ParamKind::Host(a).accepts(Shape::Host(a)));
        assert!(!ParamKind::Host(a).accepts(Shape::Host(b)));
    }

    #[test]
    fn test_host_object_state() {
        let ty = HostType::builder("Test.Counter").build();
        let obj = HostObject::new(ty.clone(), 41i32);
        obj.with_mut(|n: &mut i32| *n += 1).unwrap();
        assert_eq!(obj.with(|n: &i32| *n).unwrap(), 42);
        assert!(obj.with(|s: &String| s.len()).is_err());
        assert_eq!(ty.namespace(), Some("Test"));
        assert_eq!(ty.name(), "Counter");
    }
}
