//! Python ctypes binding generation.
//!
//! This module maps native type descriptors to ctypes type expressions and
//! assembles them into a loadable Python module.

pub mod base;
pub mod emitter;
pub mod errors;
pub mod pointer;

pub use base::{resolve_base_type, Scalar};
pub use emitter::{
    ArrayConversion, BindingPlan, CtypesEmitter, EmitOptions, FunctionPlan, ParamPlan,
    DEFAULT_FREE_FUNCTION, DEFAULT_SYMBOL_PREFIX,
};
pub use errors::{EmitError, ResolveError};
pub use pointer::{pointer_policy, resolve_return_type, resolve_type, ForeignType, PointerPolicy};
