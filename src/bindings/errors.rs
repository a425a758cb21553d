//! Binding generation error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::Diagnostic;

/// Error while mapping a native type to a ctypes type.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum ResolveError {
    #[error("don't know how to map type `{spelling}`")]
    #[diagnostic(
        code(ctbind::resolve::unknown_type),
        help("Only C scalar spellings, fixed-width integer aliases and pointers to them are supported")
    )]
    UnknownType { spelling: String },

    #[error("no ctypes integer of width {width} for `{spelling}`")]
    #[diagnostic(
        code(ctbind::resolve::unsupported_width),
        help("Fixed-width integers must be 8, 16, 32 or 64 bits wide")
    )]
    UnsupportedWidth { spelling: String, width: u32 },

    #[error("failed to parse type `{full_type}`")]
    #[diagnostic(code(ctbind::resolve::in_type))]
    InType {
        full_type: String,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    /// Wrap this error with the full spelling it occurred in.
    pub fn in_type(self, full_type: impl Into<String>) -> Self {
        ResolveError::InType {
            full_type: full_type.into(),
            source: Box::new(self),
        }
    }

    /// The scalar spelling that could not be resolved.
    pub fn spelling(&self) -> &str {
        match self {
            ResolveError::UnknownType { spelling } => spelling,
            ResolveError::UnsupportedWidth { spelling, .. } => spelling,
            ResolveError::InType { source, .. } => source.spelling(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let ResolveError::InType { source, .. } = self {
            diag = diag.with_context(source.to_string());
        }

        match self.root() {
            ResolveError::UnsupportedWidth { .. } => diag
                .with_suggestion("Use one of int8_t, int16_t, int32_t, int64_t or their unsigned forms"),
            _ => diag
                .with_suggestion("Tag the pointer with `opaque-pointer-as-handle` to pass it as a raw address")
                .with_suggestion("Replace the typedef with its underlying C scalar type in the function table"),
        }
    }

    fn root(&self) -> &ResolveError {
        match self {
            ResolveError::InType { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Error while emitting a binding module.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to convert return value for function `{function}`")]
    ReturnType {
        function: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to convert argument `{argument}` for function `{function}`")]
    Argument {
        function: String,
        argument: String,
        #[source]
        source: ResolveError,
    },

    #[error("failed to determine the array element type of `{argument}` for function `{function}`")]
    ElementType {
        function: String,
        argument: String,
        #[source]
        source: ResolveError,
    },

    #[error("`{name}` in function `{function}` cannot be used as a Python name")]
    InvalidIdentifier { function: String, name: String },

    #[error("`{name}` is not a valid native symbol name")]
    InvalidSymbol { name: String },

    #[error("failed to write bindings")]
    Io(#[from] std::io::Error),
}

impl EmitError {
    /// Name of the function the error occurred in, if any.
    pub fn function(&self) -> Option<&str> {
        match self {
            EmitError::ReturnType { function, .. }
            | EmitError::Argument { function, .. }
            | EmitError::ElementType { function, .. }
            | EmitError::InvalidIdentifier { function, .. } => Some(function),
            EmitError::InvalidSymbol { .. } | EmitError::Io(_) => None,
        }
    }

    /// The underlying resolution failure, if any.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            EmitError::ReturnType { source, .. }
            | EmitError::Argument { source, .. }
            | EmitError::ElementType { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            EmitError::InvalidIdentifier { name, .. } => Diagnostic::error(self.to_string())
                .with_context("names must be ASCII identifiers, not Python keywords, and not shadow the generated module's own names")
                .with_suggestion(format!("Rename `{}` in the function table", name)),
            EmitError::InvalidSymbol { .. } => Diagnostic::error(self.to_string())
                .with_suggestion("Check the symbol prefix and free function settings"),
            EmitError::Io(e) => Diagnostic::error(self.to_string()).with_context(e.to_string()),
            _ => {
                let mut diag = Diagnostic::error(self.to_string());
                if let Some(source) = self.resolve_error() {
                    let inner = source.to_diagnostic();
                    diag = diag.with_context(inner.message);
                    for ctx in inner.context {
                        diag = diag.with_context(ctx);
                    }
                    for suggestion in inner.suggestions {
                        diag = diag.with_suggestion(suggestion);
                    }
                }
                diag
            }
        }
    }
}
