//! Kona.Text.StringBuilder

use std::sync::Arc;

use kona_engine::{HostObject, HostType, ParamKind, Value};

/// Mutable string buffer backing a `StringBuilder` instance
#[derive(Debug, Default)]
pub struct StringBuilder {
    buffer: String,
}

impl StringBuilder {
    /// Builder starting with `initial`
    pub fn new(initial: &str) -> Self {
        Self {
            buffer: initial.to_string(),
        }
    }

    /// Append `text`
    pub fn append(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Whether nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Current contents
    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

/// Append `text` to `obj` and hand back the same instance for chaining
fn append(obj: &HostObject, text: String) -> kona_engine::VmResult<Value> {
    obj.with_mut(|sb: &mut StringBuilder| sb.append(&text))?;
    Ok(Value::Host(obj.clone()))
}

/// Build the `Kona.Text.StringBuilder` descriptor
pub fn string_builder_type() -> Arc<HostType> {
    HostType::builder("Kona.Text.StringBuilder")
        .constructor(&[], |ty, _| {
            Ok(HostObject::new(ty.clone(), StringBuilder::default()).into())
        })
        .constructor(&[ParamKind::String], |ty, args| {
            let initial = args[0].as_str().unwrap_or_default();
            Ok(HostObject::new(ty.clone(), StringBuilder::new(initial)).into())
        })
        .property("Length", |obj| {
            obj.with(|sb: &StringBuilder| Value::Int(i32::try_from(sb.len()).unwrap_or(i32::MAX)))
        })
        .method("Append", &[ParamKind::String], |obj, args| {
            append(obj, args[0].as_str().unwrap_or_default().to_string())
        })
        .method("Append", &[ParamKind::Int], |obj, args| append(obj, args[0].to_string()))
        .method("Append", &[ParamKind::Any], |obj, args| append(obj, args[0].to_string()))
        .method("AppendLine", &[ParamKind::String], |obj, args| {
            append(obj, format!("{}\n", args[0].as_str().unwrap_or_default()))
        })
        .method("Clear", &[], |obj, _| {
            obj.with_mut(|sb: &mut StringBuilder| sb.buffer.clear())?;
            Ok(Value::Host(obj.clone()))
        })
        .method("ToString", &[], |obj, _| {
            obj.with(|sb: &StringBuilder| Value::string(sb.as_str()))
        })
        .display(|obj| {
            obj.with(|sb: &StringBuilder| sb.as_str().to_string())
                .unwrap_or_default()
        })
        .build()
}
