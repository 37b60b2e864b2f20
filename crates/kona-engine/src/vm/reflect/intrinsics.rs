//! Built-in descriptors for strings, arrays and wrapped types
//!
//! These let `"abc".Length`, `list.Push(x)` and `Point.FullName` resolve
//! through the ordinary host member path.

use std::sync::Arc;

use once_cell::sync::Lazy;

use super::types::{HostType, ParamKind};
use crate::vm::value::{Shape, Value};
use crate::vm::{VmError, VmResult};

fn text(receiver: &Value) -> VmResult<&str> {
    receiver
        .as_str()
        .ok_or_else(|| VmError::TypeError(format!("expected a string, got {}", receiver.type_name())))
}

fn length(len: usize) -> Value {
    i32::try_from(len)
        .map(Value::Int)
        .unwrap_or(Value::Long(len as i64))
}

/// Members of every string value
pub static STRING: Lazy<Arc<HostType>> = Lazy::new(|| {
    HostType::builder("Kona.String")
        .value_property("Length", |receiver| Ok(length(text(receiver)?.chars().count())))
        .value_method("ToUpper", &[], |receiver, _| {
            Ok(Value::string(text(receiver)?.to_uppercase()))
        })
        .value_method("ToLower", &[], |receiver, _| {
            Ok(Value::string(text(receiver)?.to_lowercase()))
        })
        .value_method("Contains", &[ParamKind::String], |receiver, args| {
            let needle = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(Value::Bool(text(receiver)?.contains(needle)))
        })
        .build()
});

/// Members of every array value
pub static ARRAY: Lazy<Arc<HostType>> = Lazy::new(|| {
    HostType::builder("Kona.Array")
        .value_property("Length", |receiver| match receiver {
            Value::Array(items) => Ok(length(items.len())),
            other => Err(VmError::TypeError(format!(
                "expected an array, got {}",
                other.type_name()
            ))),
        })
        .value_method("Push", &[ParamKind::Any], |receiver, args| match receiver {
            Value::Array(items) => {
                let item = args.first().cloned().unwrap_or(Value::Undefined);
                Ok(length(items.push(item)))
            }
            other => Err(VmError::TypeError(format!(
                "expected an array, got {}",
                other.type_name()
            ))),
        })
        .build()
});

/// Reflection members available on every wrapped type
pub static TYPE: Lazy<Arc<HostType>> = Lazy::new(|| {
    HostType::builder("Kona.Type")
        .value_property("Name", |receiver| match receiver {
            Value::Type(ty) => Ok(Value::string(ty.name())),
            other => Err(VmError::TypeError(format!(
                "expected a type, got {}",
                other.type_name()
            ))),
        })
        .value_property("FullName", |receiver| match receiver {
            Value::Type(ty) => Ok(Value::string(ty.full_name())),
            other => Err(VmError::TypeError(format!(
                "expected a type, got {}",
                other.type_name()
            ))),
        })
        .build()
});

/// Built-in descriptor for values of this shape, if any
pub fn intrinsic_type(shape: Shape) -> Option<&'static Arc<HostType>> {
    match shape {
        Shape::Str => Some(&*STRING),
        Shape::Array => Some(&*ARRAY),
        Shape::Type(_) => Some(&*TYPE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::object::Array;
    use crate::vm::reflect::{select_overload, MemberKind};

    #[test]
    fn test_string_members() {
        let s = Value::string("héllo");
        let len = STRING.members_named("Length").next().unwrap();
        assert_eq!(len.get(&s).unwrap(), Value::Int(5));

        let upper = select_overload(STRING.members_named("ToUpper"), MemberKind::Method, false, &[])
            .unwrap();
        assert_eq!(upper.invoke(&s, &[]).unwrap(), Value::string("HÉLLO"));
    }

    #[test]
    fn test_array_push_returns_length() {
        let arr = Value::Array(Array::from_vec(vec![Value::Int(1)]));
        let push = ARRAY.members_named("Push").next().unwrap();
        assert_eq!(push.invoke(&arr, &[Value::Int(2)]).unwrap(), Value::Int(2));
        assert_eq!(arr.to_string(), "1,2");
    }

    #[test]
    fn test_lookup_by_shape() {
        assert!(intrinsic_type(Shape::Str).is_some());
        assert!(intrinsic_type(Shape::Object).is_none());
        let ty = HostType::builder("A.B").build();
        let full = TYPE.members_named("FullName").next().unwrap();
        assert_eq!(full.get(&Value::Type(ty)).unwrap(), Value::string("A.B"));
    }
}
