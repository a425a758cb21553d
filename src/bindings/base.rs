//! Scalar type resolution.
//!
//! Maps a C scalar spelling (pointer syntax already removed) to exactly one
//! ctypes scalar. Unknown spellings are an error, never a guess.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::errors::ResolveError;

/// `int32_t`, `uint8_t`, ...
static FIXED_WIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(u)?int([0-9]+)_t$").expect("fixed-width pattern is valid"));

/// A ctypes scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    /// Fixed-width integer (`ct.c_int32`, `ct.c_uint8`, ...)
    Fixed { bits: u32, signed: bool },

    Int,
    Char,
    Float,
    Double,
    Long,
    Short,
    Size,
    SSize,
    Bool,
    LongLong,
    LongDouble,

    /// `signed char`
    Byte,
    /// `unsigned char`
    UByte,

    /// `intptr_t`/`uintptr_t` used as a value
    PointerSized,
}

impl Scalar {
    /// The ctypes expression for this scalar.
    pub fn as_ctypes(&self) -> String {
        let name = match self {
            Scalar::Fixed { bits, signed } => {
                return format!("ct.c_{}int{}", if *signed { "" } else { "u" }, bits);
            }
            Scalar::Int => "int",
            Scalar::Char => "char",
            Scalar::Float => "float",
            Scalar::Double => "double",
            Scalar::Long => "long",
            Scalar::Short => "short",
            Scalar::Size => "size_t",
            Scalar::SSize => "ssize_t",
            Scalar::Bool => "bool",
            Scalar::LongLong => "longlong",
            Scalar::LongDouble => "longdouble",
            Scalar::Byte => "byte",
            Scalar::UByte => "ubyte",
            Scalar::PointerSized => "void_p",
        };
        format!("ct.c_{}", name)
    }

    /// The NumPy dtype expression matching this scalar.
    pub fn numpy_dtype(&self) -> String {
        match self {
            Scalar::Fixed { bits, signed } => {
                format!("np.{}int{}", if *signed { "" } else { "u" }, bits)
            }
            other => format!("np.dtype({})", other.as_ctypes()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_ctypes())
    }
}

/// Resolve a scalar spelling to its ctypes type.
///
/// Whitespace is normalized and matching is case-sensitive. Leading
/// `signed`/`unsigned` words are stripped and the rest resolved again, so
/// `unsigned int` resolves to the same type as `int`. Only `char` and the
/// fixed-width aliases keep their signedness.
pub fn resolve_base_type(name: &str) -> Result<Scalar, ResolveError> {
    let words: Vec<&str> = name.split_whitespace().collect();
    resolve_words(&words).ok_or_else(|| ResolveError::UnknownType {
        spelling: words.join(" "),
    })?
}

fn resolve_words(words: &[&str]) -> Option<Result<Scalar, ResolveError>> {
    if let [word] = words {
        if let Some(fixed) = fixed_width(word) {
            return Some(fixed);
        }
        if let Some(scalar) = primitive(word) {
            return Some(Ok(scalar));
        }
    }

    match words {
        ["long", "long"] => Some(Ok(Scalar::LongLong)),
        ["long", "double"] => Some(Ok(Scalar::LongDouble)),
        ["signed", "char"] => Some(Ok(Scalar::Byte)),
        ["unsigned", "char"] => Some(Ok(Scalar::UByte)),
        ["intptr_t"] | ["uintptr_t"] => Some(Ok(Scalar::PointerSized)),
        ["signed", rest @ ..] | ["unsigned", rest @ ..] if !rest.is_empty() => {
            resolve_words(rest)
        }
        _ => None,
    }
}

fn fixed_width(word: &str) -> Option<Result<Scalar, ResolveError>> {
    let caps = FIXED_WIDTH.captures(word)?;
    let signed = caps.get(1).is_none();
    let unsupported = |width| ResolveError::UnsupportedWidth {
        spelling: word.to_string(),
        width,
    };

    Some(match caps[2].parse::<u32>() {
        Ok(bits @ (8 | 16 | 32 | 64)) => Ok(Scalar::Fixed { bits, signed }),
        Ok(width) => Err(unsupported(width)),
        Err(_) => Err(ResolveError::UnknownType {
            spelling: word.to_string(),
        }),
    })
}

fn primitive(word: &str) -> Option<Scalar> {
    match word {
        "int" => Some(Scalar::Int),
        "char" => Some(Scalar::Char),
        "float" => Some(Scalar::Float),
        "double" => Some(Scalar::Double),
        "long" => Some(Scalar::Long),
        "short" => Some(Scalar::Short),
        "size_t" => Some(Scalar::Size),
        "ssize_t" => Some(Scalar::SSize),
        "bool" => Some(Scalar::Bool),
        _ => None,
    }
}
