//! Runtime configuration
//!
//! Options can be built in code or read from TOML:
//!
//! ```toml
//! base_dir = "scripts"
//! native_libraries = ["corlib"]
//! max_call_depth = 500
//! ```

use std::path::{Path, PathBuf};

use kona_engine::ContextOptions;
use serde::Deserialize;

use crate::error::RuntimeError;

/// Options for creating a [`Runtime`](crate::Runtime)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
    /// Directory module ids are resolved against
    pub base_dir: PathBuf,
    /// Native libraries registered at startup
    pub native_libraries: Vec<String>,
    /// Nested calls allowed before `StackOverflow`
    pub max_call_depth: usize,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            native_libraries: vec![kona_stdlib::CORLIB.to_string()],
            max_call_depth: ContextOptions::default().max_call_depth,
        }
    }
}

impl RuntimeOptions {
    /// Options rooted at `base_dir`, everything else default
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    /// Parse options from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, RuntimeError> {
        Ok(toml::from_str(text)?)
    }

    /// Read options from a TOML file.
    ///
    /// A relative `base_dir` is taken relative to the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RuntimeError> {
        let path = path.as_ref();
        let mut options = Self::from_toml_str(&std::fs::read_to_string(path)?)?;
        if options.base_dir.is_relative() {
            if let Some(parent) = path.parent() {
                options.base_dir = parent.join(&options.base_dir);
            }
        }
        Ok(options)
    }

    /// Engine options derived from these
    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            max_call_depth: self.max_call_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RuntimeOptions::default();
        assert_eq!(options.base_dir, PathBuf::from("."));
        assert_eq!(options.native_libraries, vec!["corlib".to_string()]);
        assert_eq!(options.max_call_depth, 200);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options = RuntimeOptions::from_toml_str("max_call_depth = 32").unwrap();
        assert_eq!(options.max_call_depth, 32);
        assert_eq!(options.native_libraries, vec!["corlib".to_string()]);
        assert_eq!(options.context_options().max_call_depth, 32);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(matches!(
            RuntimeOptions::from_toml_str("stack = 1"),
            Err(RuntimeError::Config(_))
        ));
    }
}
