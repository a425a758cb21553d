//! ctbind - Python ctypes bindings for native libraries
//!
//! This crate turns a table of exported native function signatures into a
//! self-contained Python module that loads the library, declares every
//! function's ctypes signature and wraps each call in the library's
//! status-code/error-message convention.

pub mod bindings;
pub mod core;
pub mod ops;
pub mod util;

pub use bindings::{CtypesEmitter, EmitError, EmitOptions, ForeignType, ResolveError};
pub use crate::core::{Argument, FunctionEntry, FunctionTable, Tag, TypeDescriptor};
pub use util::config::Config;
