//! Kona.Drawing.Point

use std::sync::Arc;

use kona_engine::{HostObject, HostType, ParamKind, Value};

/// Integer coordinate pair
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

/// Build the `Kona.Drawing.Point` descriptor
pub fn point_type() -> Arc<HostType> {
    HostType::builder("Kona.Drawing.Point")
        .constructor(&[], |ty, _| Ok(HostObject::new(ty.clone(), Point::default()).into()))
        .constructor(&[ParamKind::Int, ParamKind::Int], |ty, args| {
            let point = Point {
                x: args[0].as_int().unwrap_or_default(),
                y: args[1].as_int().unwrap_or_default(),
            };
            Ok(HostObject::new(ty.clone(), point).into())
        })
        .field(
            "X",
            |obj| obj.with(|p: &Point| Value::Int(p.x)),
            |obj, value| {
                let x = value.as_int().unwrap_or_default();
                obj.with_mut(|p: &mut Point| p.x = x)
            },
        )
        .field(
            "Y",
            |obj| obj.with(|p: &Point| Value::Int(p.y)),
            |obj, value| {
                let y = value.as_int().unwrap_or_default();
                obj.with_mut(|p: &mut Point| p.y = y)
            },
        )
        .property("IsEmpty", |obj| obj.with(|p: &Point| Value::Bool(*p == Point::default())))
        .method("Offset", &[ParamKind::Int, ParamKind::Int], |obj, args| {
            let (dx, dy) = (args[0].as_int().unwrap_or_default(), args[1].as_int().unwrap_or_default());
            obj.with_mut(|p: &mut Point| {
                p.x = p.x.wrapping_add(dx);
                p.y = p.y.wrapping_add(dy);
            })?;
            Ok(Value::Undefined)
        })
        .display(|obj| {
            obj.with(|p: &Point| format!("{{X={},Y={}}}", p.x, p.y))
                .unwrap_or_default()
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_fields_and_display() {
        let ty = point_type();
        let ctor = ty.constructors().nth(1).unwrap().clone();
        let point = ctor
            .invoke(&Value::Type(ty.clone()), &[Value::Int(1), Value::Int(2)])
            .unwrap();
        assert_eq!(point.to_string(), "{X=1,Y=2}");

        let x = ty.members_named("X").next().unwrap().clone();
        x.set(&point, Value::Int(7)).unwrap();
        assert_eq!(x.get(&point).unwrap(), Value::Int(7));

        let empty = ty.members_named("IsEmpty").next().unwrap().clone();
        assert_eq!(empty.get(&point).unwrap(), Value::Bool(false));
    }
}
