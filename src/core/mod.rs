//! Core data model.
//!
//! Type descriptors and function tables as produced by the signature
//! extractor and consumed by the binding generator.

pub mod descriptor;
pub mod function;

pub use descriptor::{Tag, TypeDescriptor};
pub use function::{Argument, FunctionEntry, FunctionTable};
