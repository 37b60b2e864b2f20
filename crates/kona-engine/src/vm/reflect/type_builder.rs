//! Fluent construction of host type descriptors

use std::sync::Arc;

use super::types::{DisplayFn, HostFn, HostMember, HostObject, HostType, HostTypeId, MemberKind, ParamKind};
use crate::vm::value::Value;
use crate::vm::{VmError, VmResult};

/// Builder for [`HostType`]
pub struct HostTypeBuilder {
    id: HostTypeId,
    name: String,
    full_name: String,
    members: Vec<Arc<HostMember>>,
    display: Option<DisplayFn>,
}

fn instance<'a>(receiver: &'a Value, member: &str) -> VmResult<&'a HostObject> {
    receiver.as_host().ok_or_else(|| {
        VmError::TypeError(format!(
            "'{}' requires a host instance, got {}",
            member,
            receiver.type_name()
        ))
    })
}

impl HostTypeBuilder {
    pub(crate) fn new(full_name: &str) -> Self {
        let name = full_name.rsplit('.').next().unwrap_or(full_name).to_string();
        Self {
            id: HostTypeId::next(),
            name,
            full_name: full_name.to_string(),
            members: Vec::new(),
            display: None,
        }
    }

    /// Identity the built type will have, for `ParamKind::Host` self references
    pub fn id(&self) -> HostTypeId {
        self.id
    }

    fn push(
        mut self,
        name: &str,
        kind: MemberKind,
        is_static: bool,
        params: &[ParamKind],
        invoke: HostFn,
        setter: Option<HostFn>,
    ) -> Self {
        self.members.push(Arc::new(HostMember {
            name: Arc::from(name),
            kind,
            is_static,
            params: params.to_vec(),
            invoke,
            setter,
        }));
        self
    }

    /// Read/write instance field
    pub fn field<G, S>(self, name: &str, get: G, set: S) -> Self
    where
        G: Fn(&HostObject) -> VmResult<Value> + Send + Sync + 'static,
        S: Fn(&HostObject, Value) -> VmResult<()> + Send + Sync + 'static,
    {
        let getter_name = name.to_string();
        let setter_name = name.to_string();
        let getter: HostFn = Arc::new(move |receiver: &Value, _: &[Value]| get(instance(receiver, &getter_name)?));
        let setter: HostFn = Arc::new(move |receiver: &Value, args: &[Value]| {
            let value = args.first().cloned().unwrap_or(Value::Undefined);
            set(instance(receiver, &setter_name)?, value)?;
            Ok(Value::Undefined)
        });
        self.push(name, MemberKind::Field, false, &[], getter, Some(setter))
    }

    /// Read-only instance property
    pub fn property<G>(self, name: &str, get: G) -> Self
    where
        G: Fn(&HostObject) -> VmResult<Value> + Send + Sync + 'static,
    {
        let member = name.to_string();
        let getter: HostFn = Arc::new(move |receiver: &Value, _: &[Value]| get(instance(receiver, &member)?));
        self.push(name, MemberKind::Property, false, &[], getter, None)
    }

    /// Read-only static property
    pub fn static_property<G>(self, name: &str, get: G) -> Self
    where
        G: Fn() -> VmResult<Value> + Send + Sync + 'static,
    {
        let getter: HostFn = Arc::new(move |_: &Value, _: &[Value]| get());
        self.push(name, MemberKind::Property, true, &[], getter, None)
    }

    /// Instance method
    pub fn method<F>(self, name: &str, params: &[ParamKind], f: F) -> Self
    where
        F: Fn(&HostObject, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let member = name.to_string();
        let invoke: HostFn = Arc::new(move |receiver: &Value, args: &[Value]| f(instance(receiver, &member)?, args));
        self.push(name, MemberKind::Method, false, params, invoke, None)
    }

    /// Static method
    pub fn static_method<F>(self, name: &str, params: &[ParamKind], f: F) -> Self
    where
        F: Fn(&[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let invoke: HostFn = Arc::new(move |_: &Value, args: &[Value]| f(args));
        self.push(name, MemberKind::Method, true, params, invoke, None)
    }

    /// Constructor; `f` receives the type being constructed
    pub fn constructor<F>(self, params: &[ParamKind], f: F) -> Self
    where
        F: Fn(&Arc<HostType>, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        let name = self.name.clone();
        let type_name = self.name.clone();
        let invoke: HostFn = Arc::new(move |receiver: &Value, args: &[Value]| match receiver {
            Value::Type(ty) => f(ty, args),
            other => Err(VmError::TypeError(format!(
                "constructor of {} invoked on {}",
                type_name,
                other.type_name()
            ))),
        });
        self.push(&name, MemberKind::Constructor, true, params, invoke, None)
    }

    /// Property whose receiver is any value, used for built-in descriptors
    pub fn value_property<G>(self, name: &str, get: G) -> Self
    where
        G: Fn(&Value) -> VmResult<Value> + Send + Sync + 'static,
    {
        let getter: HostFn = Arc::new(move |receiver: &Value, _: &[Value]| get(receiver));
        self.push(name, MemberKind::Property, false, &[], getter, None)
    }

    /// Method whose receiver is any value, used for built-in descriptors
    pub fn value_method<F>(self, name: &str, params: &[ParamKind], f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> VmResult<Value> + Send + Sync + 'static,
    {
        self.push(name, MemberKind::Method, false, params, Arc::new(f), None)
    }

    /// Display form of instances
    pub fn display<F>(mut self, f: F) -> Self
    where
        F: Fn(&HostObject) -> String + Send + Sync + 'static,
    {
        self.display = Some(Arc::new(f));
        self
    }

    /// Finish the descriptor
    pub fn build(self) -> Arc<HostType> {
        Arc::new(HostType {
            id: self.id,
            name: self.name,
            full_name: self.full_name,
            members: self.members,
            display: self.display,
        })
    }
}
