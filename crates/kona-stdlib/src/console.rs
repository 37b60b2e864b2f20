//! Kona.Console
//!
//! Static `Write`/`WriteLine` methods. Output goes to a [`ConsoleSink`] so
//! embedders and tests can capture what scripts print.

use std::sync::Arc;

use kona_engine::{HostType, ParamKind, Value, VmResult};
use parking_lot::Mutex;

/// Destination of console output
#[derive(Debug, Clone, Default)]
pub enum ConsoleSink {
    /// Process stdout
    #[default]
    Stdout,
    /// In-memory buffer
    Buffer(Arc<Mutex<String>>),
}

impl ConsoleSink {
    /// New buffer sink plus a handle to read what was written
    pub fn buffer() -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        (ConsoleSink::Buffer(buffer.clone()), buffer)
    }

    /// Write `text` without a trailing newline
    pub fn write(&self, text: &str) {
        match self {
            ConsoleSink::Stdout => print!("{}", text),
            ConsoleSink::Buffer(buffer) => buffer.lock().push_str(text),
        }
    }

    /// Write `text` followed by a newline
    pub fn write_line(&self, text: &str) {
        match self {
            ConsoleSink::Stdout => println!("{}", text),
            ConsoleSink::Buffer(buffer) => {
                let mut buffer = buffer.lock();
                buffer.push_str(text);
                buffer.push('\n');
            }
        }
    }
}

/// Substitute `{0}` in `format` with `arg`
pub fn format_one(format: &str, arg: &Value) -> String {
    format.replace("{0}", &arg.to_string())
}

fn printed(sink: &ConsoleSink, text: String, newline: bool) -> VmResult<Value> {
    if newline {
        sink.write_line(&text);
    } else {
        sink.write(&text);
    }
    Ok(Value::Undefined)
}

/// Build the `Kona.Console` descriptor writing to `sink`
pub fn console_type(sink: ConsoleSink) -> Arc<HostType> {
    let (empty, line, formatted, write, write_formatted) =
        (sink.clone(), sink.clone(), sink.clone(), sink.clone(), sink);
    HostType::builder("Kona.Console")
        .static_method("WriteLine", &[], move |_| printed(&empty, String::new(), true))
        .static_method("WriteLine", &[ParamKind::Any], move |args| {
            printed(&line, args[0].to_string(), true)
        })
        .static_method("WriteLine", &[ParamKind::String, ParamKind::Any], move |args| {
            let format = args[0].as_str().unwrap_or_default();
            printed(&formatted, format_one(format, &args[1]), true)
        })
        .static_method("Write", &[ParamKind::Any], move |args| {
            printed(&write, args[0].to_string(), false)
        })
        .static_method("Write", &[ParamKind::String, ParamKind::Any], move |args| {
            let format = args[0].as_str().unwrap_or_default();
            printed(&write_formatted, format_one(format, &args[1]), false)
        })
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_call(ty: &HostType, name: &str, args: &[Value]) -> Value {
        let shapes: Vec<_> = args.iter().map(Value::shape).collect();
        let member = kona_engine::vm::reflect::select_overload(
            ty.members_named(name),
            kona_engine::MemberKind::Method,
            true,
            &shapes,
        )
        .unwrap();
        member.invoke(&Value::Undefined, args).unwrap()
    }

    #[test]
    fn test_buffer_sink_collects_lines() {
        let (sink, buffer) = ConsoleSink::buffer();
        let ty = console_type(sink);

        static_call(&ty, "Write", &[Value::string("a")]);
        static_call(&ty, "WriteLine", &[Value::Int(1)]);
        static_call(&ty, "WriteLine", &[]);
        static_call(&ty, "WriteLine", &[Value::string("x={0}"), Value::Double(2.5)]);

        assert_eq!(&*buffer.lock(), "a1\n\nx=2.5\n");
    }

    #[test]
    fn test_format_one() {
        assert_eq!(format_one("{0} and {0}", &Value::Bool(true)), "true and true");
        assert_eq!(format_one("plain", &Value::Null), "plain");
    }
}
