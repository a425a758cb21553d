//! Pointer type resolution.
//!
//! Pointer descriptors go through an ordered list of rules. The first rule
//! that applies decides how the pointer chain is rendered; descriptors no
//! rule claims get their scalar resolved and wrapped once per level.

use std::fmt;

use crate::core::descriptor::{Tag, TypeDescriptor};

use super::base::{resolve_base_type, Scalar};
use super::errors::ResolveError;

/// Pointer bases with no dereferenceable element type on the host side.
const OPAQUE_BASES: &[&str] = &["void", "intptr_t", "uintptr_t"];

/// A ctypes type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ForeignType {
    /// A plain scalar
    Scalar(Scalar),
    /// `ct.c_void_p`
    OpaquePointer,
    /// `ct.c_char_p`, a NUL-terminated string
    StringPointer,
    /// `ct.POINTER(inner)`
    Pointer(Box<ForeignType>),
}

impl ForeignType {
    /// Wrap this type in one pointer level.
    pub fn pointer_to(self) -> Self {
        ForeignType::Pointer(Box::new(self))
    }
}

impl fmt::Display for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignType::Scalar(scalar) => write!(f, "{}", scalar),
            ForeignType::OpaquePointer => f.write_str("ct.c_void_p"),
            ForeignType::StringPointer => f.write_str("ct.c_char_p"),
            ForeignType::Pointer(inner) => write!(f, "ct.POINTER({})", inner),
        }
    }
}

/// How a pointer descriptor is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPolicy {
    /// The whole chain becomes one opaque pointer, whatever the depth.
    Flatten,
    /// The innermost level becomes an opaque pointer.
    DecayToOpaque,
    /// The innermost level becomes a string pointer.
    DecayToString,
    /// Resolve the scalar and wrap it once per level.
    Wrap,
}

struct PointerRule {
    policy: PointerPolicy,
    applies: fn(&TypeDescriptor) -> bool,
}

/// Evaluated top-down; first match wins.
const POINTER_RULES: &[PointerRule] = &[
    PointerRule {
        policy: PointerPolicy::Flatten,
        applies: is_handle_or_buffer,
    },
    PointerRule {
        policy: PointerPolicy::DecayToOpaque,
        applies: has_opaque_base,
    },
    PointerRule {
        policy: PointerPolicy::DecayToString,
        applies: has_char_base,
    },
];

fn is_handle_or_buffer(desc: &TypeDescriptor) -> bool {
    desc.has_tag(Tag::OpaqueHandle) || desc.has_tag(Tag::ArrayBuffer)
}

fn has_opaque_base(desc: &TypeDescriptor) -> bool {
    OPAQUE_BASES.contains(&normalized_base(desc).as_str())
}

fn has_char_base(desc: &TypeDescriptor) -> bool {
    normalized_base(desc) == "char"
}

fn normalized_base(desc: &TypeDescriptor) -> String {
    desc.base_type.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Select the rendering policy for a pointer descriptor.
///
/// Only meaningful when `pointer_level > 0`.
pub fn pointer_policy(desc: &TypeDescriptor) -> PointerPolicy {
    POINTER_RULES
        .iter()
        .find(|rule| (rule.applies)(desc))
        .map_or(PointerPolicy::Wrap, |rule| rule.policy)
}

/// Resolve a full descriptor to a ctypes type expression.
///
/// Scalar failures are annotated with the descriptor's original spelling.
pub fn resolve_type(desc: &TypeDescriptor) -> Result<ForeignType, ResolveError> {
    let scalar = || {
        resolve_base_type(&desc.base_type)
            .map(ForeignType::Scalar)
            .map_err(|e| e.in_type(&desc.full_type))
    };

    if desc.pointer_level == 0 {
        return scalar();
    }

    let (core, remaining) = match pointer_policy(desc) {
        PointerPolicy::Flatten => return Ok(ForeignType::OpaquePointer),
        PointerPolicy::DecayToOpaque => (ForeignType::OpaquePointer, desc.pointer_level - 1),
        PointerPolicy::DecayToString => (ForeignType::StringPointer, desc.pointer_level - 1),
        PointerPolicy::Wrap => (scalar()?, desc.pointer_level),
    };

    Ok((0..remaining).fold(core, |inner, _| inner.pointer_to()))
}

/// Resolve a return type; bare `void` means "no return value".
pub fn resolve_return_type(desc: &TypeDescriptor) -> Result<Option<ForeignType>, ResolveError> {
    if desc.is_void() {
        return Ok(None);
    }
    resolve_type(desc).map(Some)
}
