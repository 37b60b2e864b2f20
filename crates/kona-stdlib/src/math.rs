//! Kona.Math
//!
//! Static numeric helpers. Overloads are per operand kind; an `Int` call
//! never widens to the `Double` overload.

use std::sync::Arc;

use kona_engine::{HostType, ParamKind, Value, VmError, VmResult};

fn int(value: &Value) -> i32 {
    value.as_int().unwrap_or_default()
}

fn long(value: &Value) -> i64 {
    value.as_i64().unwrap_or_default()
}

fn double(value: &Value) -> f64 {
    value.as_f64().unwrap_or_default()
}

/// Absolute value of an int, failing on `i32::MIN`
pub fn abs_int(x: i32) -> VmResult<i32> {
    x.checked_abs()
        .ok_or_else(|| VmError::TypeError(format!("Abs overflows for {}", x)))
}

/// Square root
pub fn sqrt(x: f64) -> f64 {
    x.sqrt()
}

/// Raise base to power exp
pub fn pow(base: f64, exp: f64) -> f64 {
    base.powf(exp)
}

/// Build the `Kona.Math` descriptor
pub fn math_type() -> Arc<HostType> {
    use ParamKind::{Double, Int, Long};

    HostType::builder("Kona.Math")
        .static_property("PI", || Ok(Value::Double(std::f64::consts::PI)))
        .static_property("E", || Ok(Value::Double(std::f64::consts::E)))
        .static_method("Max", &[Int, Int], |args| Ok(Value::Int(int(&args[0]).max(int(&args[1])))))
        .static_method("Max", &[Long, Long], |args| Ok(Value::Long(long(&args[0]).max(long(&args[1])))))
        .static_method("Max", &[Double, Double], |args| {
            Ok(Value::Double(double(&args[0]).max(double(&args[1]))))
        })
        .static_method("Min", &[Int, Int], |args| Ok(Value::Int(int(&args[0]).min(int(&args[1])))))
        .static_method("Min", &[Long, Long], |args| Ok(Value::Long(long(&args[0]).min(long(&args[1])))))
        .static_method("Min", &[Double, Double], |args| {
            Ok(Value::Double(double(&args[0]).min(double(&args[1]))))
        })
        .static_method("Abs", &[Int], |args| abs_int(int(&args[0])).map(Value::Int))
        .static_method("Abs", &[Double], |args| Ok(Value::Double(double(&args[0]).abs())))
        .static_method("Sqrt", &[Int], |args| Ok(Value::Double(sqrt(f64::from(int(&args[0]))))))
        .static_method("Sqrt", &[Double], |args| Ok(Value::Double(sqrt(double(&args[0])))))
        .static_method("Pow", &[Double, Double], |args| {
            Ok(Value::Double(pow(double(&args[0]), double(&args[1]))))
        })
        .static_method("Floor", &[Double], |args| Ok(Value::Double(double(&args[0]).floor())))
        .static_method("Round", &[Double], |args| Ok(Value::Double(double(&args[0]).round())))
        .build()
}
