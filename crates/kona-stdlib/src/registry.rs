//! Assembly of the `corlib` host library
//!
//! Every type lives under the `Kona` namespace, so `populate` produces the
//! tree `Kona.{Console, Math, Activator, Text.StringBuilder, Drawing.Point}`.

use kona_engine::HostLibrary;
use tracing::debug;

use crate::console::ConsoleSink;
use crate::{activator, console, drawing, math, text};

/// Module id under which the library is registered
pub const CORLIB: &str = "corlib";

/// Build `corlib` with console output going to stdout
pub fn corlib() -> HostLibrary {
    corlib_with_console(ConsoleSink::Stdout)
}

/// Build `corlib` with console output going to `sink`
pub fn corlib_with_console(sink: ConsoleSink) -> HostLibrary {
    let library = HostLibrary::new(CORLIB)
        .with_type(console::console_type(sink))
        .with_type(math::math_type())
        .with_type(text::string_builder_type())
        .with_type(drawing::point_type())
        .with_type(activator::activator_type());
    debug!(types = library.types().len(), "assembled corlib");
    library
}

#[cfg(test)]
mod tests {
    use super::*;
    use kona_engine::{DynamicObject, Value};

    #[test]
    fn test_corlib_exports_every_type() {
        let library = corlib();
        assert_eq!(library.id(), "corlib");
        for name in [
            "Kona.Console",
            "Kona.Math",
            "Kona.Text.StringBuilder",
            "Kona.Drawing.Point",
            "Kona.Activator",
        ] {
            assert!(library.find(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_namespace_tree() {
        let exports = DynamicObject::new();
        corlib().populate(&exports);

        let kona = exports.get("Kona").and_then(|v| v.as_object().cloned()).unwrap();
        assert!(matches!(kona.get("Math"), Some(Value::Type(_))));
        let text = kona.get("Text").and_then(|v| v.as_object().cloned()).unwrap();
        assert!(matches!(text.get("StringBuilder"), Some(Value::Type(_))));
    }
}
