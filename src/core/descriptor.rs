//! Native type descriptors.
//!
//! A [`TypeDescriptor`] describes one occurrence of a native type in an
//! exported signature: the scalar spelling with pointer syntax removed, how
//! many pointer levels wrap it, and the semantic tags the extractor attached.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualifiers dropped when parsing a spelling; they carry no ABI meaning here.
const QUALIFIERS: &[&str] = &["const", "volatile", "restrict"];

/// Semantic markers attached to a descriptor by the signature extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// Treat the whole pointer chain as a raw handle.
    #[serde(rename = "opaque-pointer-as-handle", alias = "void_p")]
    OpaqueHandle,

    /// The pointer is a numeric array buffer passed by address.
    #[serde(rename = "numeric-array-buffer", alias = "numpy")]
    ArrayBuffer,

    /// The array buffer may be non-contiguous.
    #[serde(rename = "allow-non-contiguous-buffer", alias = "non_contig")]
    AllowNonContiguous,
}

impl Tag {
    /// Canonical tag name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::OpaqueHandle => "opaque-pointer-as-handle",
            Tag::ArrayBuffer => "numeric-array-buffer",
            Tag::AllowNonContiguous => "allow-non-contiguous-buffer",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "opaque-pointer-as-handle" | "void_p" => Ok(Tag::OpaqueHandle),
            "numeric-array-buffer" | "numpy" => Ok(Tag::ArrayBuffer),
            "allow-non-contiguous-buffer" | "non_contig" => Ok(Tag::AllowNonContiguous),
            _ => Err(format!(
                "unknown tag '{}'; expected 'opaque-pointer-as-handle', \
                 'numeric-array-buffer', or 'allow-non-contiguous-buffer'",
                s
            )),
        }
    }
}

/// One native type occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorRepr")]
pub struct TypeDescriptor {
    /// Scalar spelling with pointer syntax removed (e.g. `unsigned char`)
    pub base_type: String,

    /// Number of pointer indirections applied to `base_type`
    pub pointer_level: usize,

    /// Semantic tags; absent tags are the default behavior
    pub tags: BTreeSet<Tag>,

    /// Original spelling, only used in diagnostics
    pub full_type: String,
}

impl TypeDescriptor {
    /// Create a descriptor from its parts, synthesizing `full_type`.
    pub fn new(base_type: impl Into<String>, pointer_level: usize) -> Self {
        let base_type = base_type.into();
        let full_type = synthesize_spelling(&base_type, pointer_level);
        TypeDescriptor {
            base_type,
            pointer_level,
            tags: BTreeSet::new(),
            full_type,
        }
    }

    /// Parse a C spelling such as `const char * const *`.
    ///
    /// Every `*` adds a pointer level and qualifiers are dropped. The
    /// remaining words become the whitespace-normalized base type.
    pub fn parse(spelling: &str) -> Self {
        let pointer_level = spelling.matches('*').count();
        let base_type = spelling
            .split(|c: char| c == '*' || c.is_whitespace())
            .filter(|word| !word.is_empty() && !QUALIFIERS.contains(word))
            .collect::<Vec<_>>()
            .join(" ");

        TypeDescriptor {
            base_type,
            pointer_level,
            tags: BTreeSet::new(),
            full_type: spelling.trim().to_string(),
        }
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: Tag) -> Self {
        self.tags.insert(tag);
        self
    }

    /// Check whether a tag is present.
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Whether this is a pointer passed as a NumPy array buffer.
    ///
    /// The tag has no effect on a non-pointer.
    pub fn is_array_buffer(&self) -> bool {
        self.pointer_level > 0 && self.has_tag(Tag::ArrayBuffer)
    }

    /// Check if this is the bare `void` type, i.e. "no value".
    pub fn is_void(&self) -> bool {
        self.pointer_level == 0 && self.base_type.trim() == "void"
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_type)
    }
}

fn synthesize_spelling(base_type: &str, pointer_level: usize) -> String {
    if pointer_level == 0 {
        base_type.to_string()
    } else {
        format!("{}{}", base_type, "*".repeat(pointer_level))
    }
}

/// Accepted input forms for a descriptor.
#[derive(Deserialize)]
#[serde(untagged)]
enum DescriptorRepr {
    Explicit {
        base_type: String,
        #[serde(default)]
        pointer_level: usize,
        #[serde(default)]
        tags: Vec<String>,
        #[serde(default)]
        full_type: Option<String>,
    },
    Spelled {
        #[serde(rename = "type")]
        spelling: String,
        #[serde(default)]
        tags: Vec<String>,
    },
    Bare(String),
}

/// Tags are parsed after the input form is chosen so that an unknown tag is
/// reported by name.
fn parse_tags(tags: &[String]) -> Result<BTreeSet<Tag>, String> {
    tags.iter().map(|tag| tag.parse()).collect()
}

impl TryFrom<DescriptorRepr> for TypeDescriptor {
    type Error = String;

    fn try_from(repr: DescriptorRepr) -> Result<Self, Self::Error> {
        let desc = match repr {
            DescriptorRepr::Explicit {
                base_type,
                pointer_level,
                tags,
                full_type,
            } => {
                let full_type =
                    full_type.unwrap_or_else(|| synthesize_spelling(&base_type, pointer_level));
                TypeDescriptor {
                    base_type,
                    pointer_level,
                    tags: parse_tags(&tags)?,
                    full_type,
                }
            }
            DescriptorRepr::Spelled { spelling, tags } => {
                let mut desc = TypeDescriptor::parse(&spelling);
                desc.tags = parse_tags(&tags)?;
                desc
            }
            DescriptorRepr::Bare(spelling) => TypeDescriptor::parse(&spelling),
        };
        Ok(desc)
    }
}
