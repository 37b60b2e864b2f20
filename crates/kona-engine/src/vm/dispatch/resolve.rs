//! Rule resolution on a cache miss

use std::sync::Arc;

use super::{BinaryRule, Rule, SiteKey, UnaryRule};
use crate::vm::reflect::intrinsics::{self, intrinsic_type};
use crate::vm::reflect::{select_overload, single_data_member, HostMember, HostType, MemberKind, MemberLookup};
use crate::vm::value::{Shape, Value};
use crate::vm::{VmError, VmResult};

/// Resolve `key` for `operands` (receiver or callee first, then arguments)
pub(crate) fn resolve(key: &SiteKey, operands: &[Value]) -> VmResult<Rule> {
    let (first, rest) = operands
        .split_first()
        .ok_or_else(|| VmError::Internal(format!("site '{}' dispatched without operands", key)))?;

    match key {
        SiteKey::GetMember { name } => member(first, name, false),
        SiteKey::SetMember { name } => member(first, name, true),
        SiteKey::InvokeMember { name, .. } => invoke_member(first, name, rest),
        SiteKey::Invoke { .. } => invoke(first, rest),
        SiteKey::CreateInstance { .. } => match first {
            Value::Type(ty) => construct(ty, rest),
            other => Err(VmError::NotCallable {
                target: other.type_name(),
            }),
        },
        SiteKey::BinaryOperation { op } => {
            let right = rest.first().unwrap_or(&Value::Undefined);
            BinaryRule::resolve(*op, first.shape(), right.shape())
                .map(Rule::Binary)
                .ok_or_else(|| VmError::NoMatchingOverload {
                    member: op.token().to_string(),
                    arg_count: 2,
                    target: format!("{} and {}", first.type_name(), right.type_name()),
                })
        }
        SiteKey::UnaryOperation { op } => UnaryRule::resolve(*op, first.shape())
            .map(Rule::Unary)
            .ok_or_else(|| VmError::NoMatchingOverload {
                member: op.token().to_string(),
                arg_count: 1,
                target: first.type_name(),
            }),
    }
}

fn missing(name: &str, target: &Value) -> VmError {
    VmError::AmbiguousOrMissingMember {
        member: name.to_string(),
        target: target.type_name(),
    }
}

fn found(lookup: MemberLookup) -> Option<Arc<HostMember>> {
    match lookup {
        MemberLookup::Found(member) => Some(member),
        MemberLookup::Missing | MemberLookup::Ambiguous(_) => None,
    }
}

fn member(target: &Value, name: &str, writable: bool) -> VmResult<Rule> {
    let resolved = match target {
        Value::Object(_) => return Ok(Rule::Dynamic),
        Value::Host(obj) => found(single_data_member(obj.host_type().members(), name, false, writable)),
        Value::Type(ty) => found(single_data_member(ty.members(), name, true, writable))
            .or_else(|| found(single_data_member(intrinsics::TYPE.members(), name, false, writable))),
        other => intrinsic_type(other.shape())
            .and_then(|ty| found(single_data_member(ty.members(), name, false, writable))),
    };
    resolved.map(Rule::Member).ok_or_else(|| missing(name, target))
}

fn overload(
    ty: &HostType,
    target: &Value,
    name: &str,
    kind: MemberKind,
    is_static: bool,
    args: &[Value],
) -> VmResult<Arc<HostMember>> {
    let shapes: Vec<Shape> = args.iter().map(Value::shape).collect();
    if let Some(member) = select_overload(ty.members_named(name), kind, is_static, &shapes) {
        return Ok(member);
    }

    let declared = ty
        .members_named(name)
        .any(|m| m.kind() == kind && m.is_static() == is_static);
    if !declared {
        return Err(missing(name, target));
    }
    Err(VmError::NoMatchingOverload {
        member: name.to_string(),
        arg_count: args.len(),
        target: ty.full_name().to_string(),
    })
}

fn invoke_member(target: &Value, name: &str, args: &[Value]) -> VmResult<Rule> {
    let member = match target {
        Value::Object(_) => return Ok(Rule::Dynamic),
        Value::Host(obj) => overload(obj.host_type(), target, name, MemberKind::Method, false, args)?,
        Value::Type(ty) => overload(ty, target, name, MemberKind::Method, true, args)?,
        other => match intrinsic_type(other.shape()) {
            Some(ty) => overload(ty, target, name, MemberKind::Method, false, args)?,
            None => return Err(missing(name, target)),
        },
    };
    Ok(Rule::Member(member))
}

fn invoke(callee: &Value, args: &[Value]) -> VmResult<Rule> {
    match callee {
        Value::Function(_) => Ok(Rule::Call),
        Value::Type(ty) => construct(ty, args),
        other => Err(VmError::NotCallable {
            target: other.type_name(),
        }),
    }
}

fn construct(ty: &Arc<HostType>, args: &[Value]) -> VmResult<Rule> {
    let shapes: Vec<Shape> = args.iter().map(Value::shape).collect();
    select_overload(ty.constructors(), MemberKind::Constructor, true, &shapes)
        .map(Rule::Construct)
        .ok_or_else(|| VmError::NoMatchingOverload {
            member: ty.name().to_string(),
            arg_count: args.len(),
            target: ty.full_name().to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::dispatch::{BinaryOp, DispatchSites, UnaryOp};
    use crate::vm::object::DynamicObject;
    use crate::vm::reflect::{HostObject, ParamKind};

    struct Cell(i32);

    fn cell_type() -> Arc<HostType> {
        HostType::builder("Test.Cell")
            .constructor(&[], |ty, _| Ok(HostObject::new(ty.clone(), Cell(0)).into()))
            .constructor(&[ParamKind::Int], |ty, args| {
                let v = args[0].as_int().unwrap_or_default();
                Ok(HostObject::new(ty.clone(), Cell(v)).into())
            })
            .field(
                "Value",
                |obj| obj.with(|c: &Cell| Value::Int(c.0)),
                |obj, v| obj.with_mut(|c: &mut Cell| c.0 = v.as_int().unwrap_or_default()),
            )
            .property("Twice", |obj| obj.with(|c: &Cell| Value::Int(c.0 * 2)))
            .property("Twice", |obj| obj.with(|c: &Cell| Value::Int(c.0 * 2)))
            .method("Add", &[ParamKind::Int], |obj, args| {
                let n = args[0].as_int().unwrap_or_default();
                obj.with_mut(|c: &mut Cell| {
                    c.0 += n;
                    Value::Int(c.0)
                })
            })
            .static_property("Zero", || Ok(Value::Int(0)))
            .build()
    }

    fn instance(ty: &Arc<HostType>) -> Value {
        match construct(ty, &[Value::Int(5)]).unwrap() {
            Rule::Construct(ctor) => ctor.invoke(&Value::Type(ty.clone()), &[Value::Int(5)]).unwrap(),
            other => panic!("unexpected rule {:?}", other),
        }
    }

    #[test]
    fn test_dynamic_objects_resolve_dynamically() {
        let target = Value::Object(DynamicObject::new());
        let key = SiteKey::GetMember { name: "anything".into() };
        assert!(matches!(resolve(&key, &[target]).unwrap(), Rule::Dynamic));
    }

    #[test]
    fn test_host_member_lookup() {
        let ty = cell_type();
        let cell = instance(&ty);

        let get = SiteKey::GetMember { name: "Value".into() };
        match resolve(&get, &[cell.clone()]).unwrap() {
            Rule::Member(m) => assert_eq!(m.get(&cell).unwrap(), Value::Int(5)),
            other => panic!("unexpected rule {:?}", other),
        }

        let ambiguous = SiteKey::GetMember { name: "Twice".into() };
        assert!(matches!(
            resolve(&ambiguous, &[cell.clone()]),
            Err(VmError::AmbiguousOrMissingMember { .. })
        ));

        let read_only = SiteKey::SetMember { name: "Zero".into() };
        assert!(matches!(
            resolve(&read_only, &[Value::Type(ty.clone()), Value::Int(1)]),
            Err(VmError::AmbiguousOrMissingMember { .. })
        ));
    }

    #[test]
    fn test_invoke_member_overloads() {
        let ty = cell_type();
        let cell = instance(&ty);

        let add = SiteKey::InvokeMember { name: "Add".into(), arg_count: 1 };
        assert!(matches!(resolve(&add, &[cell.clone(), Value::Int(1)]).unwrap(), Rule::Member(_)));

        let err = resolve(&add, &[cell.clone(), Value::string("x")]).unwrap_err();
        match err {
            VmError::NoMatchingOverload { member, arg_count, .. } => {
                assert_eq!(member, "Add");
                assert_eq!(arg_count, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }

        let unknown = SiteKey::InvokeMember { name: "Nope".into(), arg_count: 0 };
        assert!(matches!(
            resolve(&unknown, &[cell]),
            Err(VmError::AmbiguousOrMissingMember { .. })
        ));
    }

    #[test]
    fn test_types_construct_and_expose_intrinsics() {
        let ty = cell_type();
        let invoke = SiteKey::Invoke { arg_count: 0 };
        assert!(matches!(
            resolve(&invoke, &[Value::Type(ty.clone())]).unwrap(),
            Rule::Construct(_)
        ));

        let create = SiteKey::CreateInstance { arg_count: 1 };
        assert!(matches!(
            resolve(&create, &[Value::Type(ty.clone()), Value::string("x")]),
            Err(VmError::NoMatchingOverload { .. })
        ));

        let full_name = SiteKey::GetMember { name: "FullName".into() };
        match resolve(&full_name, &[Value::Type(ty.clone())]).unwrap() {
            Rule::Member(m) => assert_eq!(m.get(&Value::Type(ty)).unwrap(), Value::string("Test.Cell")),
            other => panic!("unexpected rule {:?}", other),
        }

        assert!(matches!(
            resolve(&invoke, &[Value::Int(3)]),
            Err(VmError::NotCallable { .. })
        ));
    }

    #[test]
    fn test_operator_errors_name_the_operator() {
        let sites = DispatchSites::new();
        let minus = sites.binary(BinaryOp::Sub);
        let err = resolve(minus.key(), &[Value::string("a"), Value::Bool(true)]).unwrap_err();
        match err {
            VmError::NoMatchingOverload { member, arg_count, target } => {
                assert_eq!(member, "-");
                assert_eq!(arg_count, 2);
                assert_eq!(target, "string and bool");
            }
            other => panic!("unexpected error {:?}", other),
        }

        let negate = sites.unary(UnaryOp::Negate);
        assert!(resolve(negate.key(), &[Value::Null]).is_err());
    }
}
