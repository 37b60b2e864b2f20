//! Runtime error types.

use kona_engine::vm::VmError;

/// Errors that can occur while configuring, loading, or executing.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Malformed runtime configuration
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// File I/O error
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// VM execution error, including decode and compile failures
    #[error("Runtime error: {0}")]
    Vm(#[from] VmError),

    /// A configured native library that the runtime does not provide
    #[error("unknown native library '{0}'")]
    UnknownLibrary(String),
}
