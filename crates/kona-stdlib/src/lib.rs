//! Kona Standard Library
//!
//! Host types exported by the built-in `corlib` native module. Scripts reach
//! them through `require("corlib")`, e.g. `corlib.Kona.Math.Max(1, 2)`.

#![warn(missing_docs)]

pub mod activator;
pub mod console;
pub mod drawing;
pub mod math;
pub mod registry;
pub mod text;

pub use console::ConsoleSink;
pub use registry::{corlib, corlib_with_console, CORLIB};
