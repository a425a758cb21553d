//! Exported function signatures.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::descriptor::TypeDescriptor;

/// A named function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Parameter name as seen by the host language
    pub name: String,

    /// Parameter type
    #[serde(rename = "type")]
    pub ty: TypeDescriptor,
}

impl Argument {
    /// Create a new argument.
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Argument {
            name: name.into(),
            ty,
        }
    }
}

/// Signature of one exported function. The name is the key in
/// [`FunctionTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionEntry {
    /// Return type
    pub return_type: TypeDescriptor,

    /// Arguments in call order
    #[serde(default)]
    pub args: Vec<Argument>,
}

impl FunctionEntry {
    /// Create a new entry with no arguments.
    pub fn new(return_type: TypeDescriptor) -> Self {
        FunctionEntry {
            return_type,
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn with_arg(mut self, arg: Argument) -> Self {
        self.args.push(arg);
        self
    }
}

/// All exported functions of a library, keyed by name.
///
/// Iteration is always lexicographic by name, independent of the order in
/// which entries were inserted or extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionTable {
    functions: BTreeMap<String, FunctionEntry>,
}

impl FunctionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read function table: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("failed to parse function table: {}", path.display()))
    }

    /// Parse a table from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, name: impl Into<String>, entry: FunctionEntry) {
        self.functions.insert(name.into(), entry);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_function(mut self, name: impl Into<String>, entry: FunctionEntry) -> Self {
        self.insert(name, entry);
        self
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    /// Iterate entries in lexicographic name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FunctionEntry)> {
        self.functions.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of functions.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Whether any argument of any function is an array buffer, i.e. whether
    /// the generated module needs NumPy.
    pub fn uses_array_buffers(&self) -> bool {
        self.functions
            .values()
            .flat_map(|f| &f.args)
            .any(|arg| arg.ty.is_array_buffer())
    }
}
