//! Host-native libraries
//!
//! A library is a named set of host types. Requiring its id yields an exports
//! object holding a namespace tree: `Kona.Text.StringBuilder` becomes
//! `exports.Kona.Text.StringBuilder`, a wrapped-type value.

use std::sync::Arc;

use super::types::HostType;
use crate::vm::object::DynamicObject;
use crate::vm::value::Value;

/// Named collection of host types
#[derive(Debug, Clone)]
pub struct HostLibrary {
    id: String,
    types: Vec<Arc<HostType>>,
}

impl HostLibrary {
    /// Create an empty library
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            types: Vec::new(),
        }
    }

    /// Add a type
    pub fn with_type(mut self, ty: Arc<HostType>) -> Self {
        self.types.push(ty);
        self
    }

    /// Add a type
    pub fn add_type(&mut self, ty: Arc<HostType>) {
        self.types.push(ty);
    }

    /// Library id used with `require`
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Exported types
    pub fn types(&self) -> &[Arc<HostType>] {
        &self.types
    }

    /// Look up an exported type by full name
    pub fn find(&self, full_name: &str) -> Option<&Arc<HostType>> {
        self.types.iter().find(|ty| ty.full_name() == full_name)
    }

    /// Insert every type into `exports` under its dotted namespace path
    pub fn populate(&self, exports: &DynamicObject) {
        for ty in &self.types {
            let mut namespace = exports.clone();
            let mut segments = ty.full_name().split('.').peekable();
            while let Some(segment) = segments.next() {
                if segments.peek().is_none() {
                    namespace.set(segment, Value::Type(ty.clone()));
                    break;
                }
                namespace = match namespace.get(segment) {
                    Some(Value::Object(inner)) => inner,
                    _ => {
                        let inner = DynamicObject::new();
                        namespace.set(segment, Value::Object(inner.clone()));
                        inner
                    }
                };
            }
        }
    }
}
