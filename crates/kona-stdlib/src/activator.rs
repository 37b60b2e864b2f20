//! Kona.Activator
//!
//! Late-bound construction: `CreateInstance(type, args?)` selects a
//! constructor of `type` by the argument shapes at call time.

use std::sync::Arc;

use kona_engine::vm::reflect::select_overload;
use kona_engine::{HostType, MemberKind, ParamKind, Shape, Value, VmError, VmResult};

/// Construct `ty` with the first constructor accepting `args`
pub fn create_instance(ty: &Arc<HostType>, args: &[Value]) -> VmResult<Value> {
    let shapes: Vec<Shape> = args.iter().map(Value::shape).collect();
    let ctor = select_overload(ty.constructors(), MemberKind::Constructor, true, &shapes)
        .ok_or_else(|| VmError::NoMatchingOverload {
            member: ty.name().to_string(),
            arg_count: args.len(),
            target: ty.full_name().to_string(),
        })?;
    ctor.invoke(&Value::Type(ty.clone()), args)
}

fn type_arg(value: &Value) -> VmResult<&Arc<HostType>> {
    value
        .as_type()
        .ok_or_else(|| VmError::TypeError(format!("CreateInstance expects a type, got {}", value.type_name())))
}

/// Build the `Kona.Activator` descriptor
pub fn activator_type() -> Arc<HostType> {
    HostType::builder("Kona.Activator")
        .static_method("CreateInstance", &[ParamKind::Type], |args| {
            create_instance(type_arg(&args[0])?, &[])
        })
        .static_method("CreateInstance", &[ParamKind::Type, ParamKind::Array], |args| {
            let ctor_args = args[1].as_array().map(|a| a.to_vec()).unwrap_or_default();
            create_instance(type_arg(&args[0])?, &ctor_args)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{point_type, Point};

    #[test]
    fn test_create_instance_picks_constructor() {
        let ty = point_type();
        let point = create_instance(&ty, &[Value::Int(3), Value::Int(4)]).unwrap();
        let state = point.as_host().unwrap().with(|p: &Point| *p).unwrap();
        assert_eq!(state, Point { x: 3, y: 4 });
    }

    #[test]
    fn test_create_instance_without_match() {
        let ty = point_type();
        match create_instance(&ty, &[Value::string("x")]) {
            Err(VmError::NoMatchingOverload { member, arg_count, .. }) => {
                assert_eq!(member, "Point");
                assert_eq!(arg_count, 1);
            }
            other => panic!("expected no matching overload, got {:?}", other),
        }
    }
}
