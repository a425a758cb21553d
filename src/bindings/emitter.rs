//! Python ctypes module generation.
//!
//! Emission runs in two phases. Planning resolves every signature in the
//! table (in parallel) and fails on the first broken function in name order.
//! Rendering turns a finished plan into module text and cannot fail, so a
//! resolution error never produces partial output.

use std::io::Write;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::core::descriptor::Tag;
use crate::core::function::{FunctionEntry, FunctionTable};

use super::base::resolve_base_type;
use super::errors::EmitError;
use super::pointer::{resolve_return_type, resolve_type, ForeignType};

/// Default prefix of every exported native symbol.
pub const DEFAULT_SYMBOL_PREFIX: &str = "py_";

/// Default deallocation entry point for error messages.
pub const DEFAULT_FREE_FUNCTION: &str = "free_error_message";

const PYTHON_KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Module-level names the generated code relies on.
const RESERVED_NAMES: &[&str] = &["catch_errors", "ct", "lib", "np", "np2ct", "os"];

/// Options controlling the generated module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// File name prefix used to find the shared library next to the module
    pub library_prefix: String,

    /// Prefix of every exported native symbol
    pub symbol_prefix: String,

    /// Native function releasing error messages
    pub free_function: String,
}

impl EmitOptions {
    /// Create options for the given library prefix.
    pub fn new(library_prefix: impl Into<String>) -> Self {
        EmitOptions {
            library_prefix: library_prefix.into(),
            symbol_prefix: DEFAULT_SYMBOL_PREFIX.to_string(),
            free_function: DEFAULT_FREE_FUNCTION.to_string(),
        }
    }

    /// Set the native symbol prefix.
    pub fn with_symbol_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.symbol_prefix = prefix.into();
        self
    }

    /// Set the error-message deallocation function.
    pub fn with_free_function(mut self, name: impl Into<String>) -> Self {
        self.free_function = name.into();
        self
    }
}

/// Conversion applied to an array-buffer argument before the call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayConversion {
    /// Expected NumPy dtype expression
    pub dtype: String,
    /// Whether the buffer must be contiguous
    pub contiguous: bool,
}

/// A wrapper parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPlan {
    pub name: String,
    pub conversion: Option<ArrayConversion>,
}

impl ParamPlan {
    /// The expression forwarded to the native call.
    pub fn call_expr(&self) -> String {
        match &self.conversion {
            None => self.name.clone(),
            Some(conv) if conv.contiguous => format!("np2ct({}, {})", self.name, conv.dtype),
            Some(conv) => format!("np2ct({}, {}, contiguous=False)", self.name, conv.dtype),
        }
    }
}

/// A fully resolved function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionPlan {
    /// Python-visible name
    pub name: String,
    /// Native symbol name
    pub symbol: String,
    /// `None` when the function returns nothing
    pub restype: Option<ForeignType>,
    /// Declared argument types, without the trailing error slots
    pub argtypes: Vec<ForeignType>,
    pub params: Vec<ParamPlan>,
}

impl FunctionPlan {
    /// Whether any parameter needs the array conversion helper.
    pub fn uses_array_buffers(&self) -> bool {
        self.params.iter().any(|p| p.conversion.is_some())
    }

    /// One-line human readable signature.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .zip(&self.argtypes)
            .map(|(p, ty)| format!("{}: {}", p.name, ty))
            .collect();
        let restype = self
            .restype
            .as_ref()
            .map_or_else(|| "None".to_string(), |ty| ty.to_string());
        format!("{}({}) -> {}", self.name, params.join(", "), restype)
    }
}

/// Every function of a table, resolved and ordered by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    pub functions: Vec<FunctionPlan>,
    /// Whether the array conversion helper is emitted
    pub array_helper: bool,
}

/// Generator for Python ctypes binding modules.
#[derive(Debug, Clone)]
pub struct CtypesEmitter {
    options: EmitOptions,
}

impl CtypesEmitter {
    /// Create a new emitter.
    pub fn new(options: EmitOptions) -> Self {
        CtypesEmitter { options }
    }

    /// Resolve one function.
    pub fn plan_function(&self, name: &str, entry: &FunctionEntry) -> Result<FunctionPlan, EmitError> {
        let restype = resolve_return_type(&entry.return_type).map_err(|source| {
            EmitError::ReturnType {
                function: name.to_string(),
                source,
            }
        })?;

        let mut argtypes = Vec::with_capacity(entry.args.len());
        let mut params = Vec::with_capacity(entry.args.len());
        for arg in &entry.args {
            let ty = resolve_type(&arg.ty).map_err(|source| EmitError::Argument {
                function: name.to_string(),
                argument: arg.name.clone(),
                source,
            })?;

            let conversion = if arg.ty.is_array_buffer() {
                let element = resolve_base_type(&arg.ty.base_type).map_err(|source| {
                    EmitError::ElementType {
                        function: name.to_string(),
                        argument: arg.name.clone(),
                        source: source.in_type(&arg.ty.full_type),
                    }
                })?;
                Some(ArrayConversion {
                    dtype: element.numpy_dtype(),
                    contiguous: !arg.ty.has_tag(Tag::AllowNonContiguous),
                })
            } else {
                None
            };

            argtypes.push(ty);
            params.push(ParamPlan {
                name: arg.name.clone(),
                conversion,
            });
        }

        for candidate in std::iter::once(name).chain(entry.args.iter().map(|a| a.name.as_str())) {
            if !is_python_name(candidate) {
                return Err(EmitError::InvalidIdentifier {
                    function: name.to_string(),
                    name: candidate.to_string(),
                });
            }
        }

        let symbol = format!("{}{}", self.options.symbol_prefix, name);
        if !is_python_identifier(&symbol) {
            return Err(EmitError::InvalidSymbol { name: symbol });
        }

        let plan = FunctionPlan {
            name: name.to_string(),
            symbol,
            restype,
            argtypes,
            params,
        };
        debug!("resolved {}", plan.signature());
        Ok(plan)
    }

    /// Resolve every function independently, in name order.
    pub fn plan_all(&self, table: &FunctionTable) -> Vec<Result<FunctionPlan, EmitError>> {
        let entries: Vec<(&str, &FunctionEntry)> = table.iter().collect();
        entries
            .par_iter()
            .map(|&(name, entry)| self.plan_function(name, entry))
            .collect()
    }

    /// Validate the settings shared by every function.
    pub fn check_options(&self) -> Result<(), EmitError> {
        if !is_python_identifier(&self.options.free_function) {
            return Err(EmitError::InvalidSymbol {
                name: self.options.free_function.clone(),
            });
        }
        Ok(())
    }

    /// Resolve the whole table, failing on the first broken function.
    pub fn plan(&self, table: &FunctionTable) -> Result<BindingPlan, EmitError> {
        self.check_options()?;

        let functions = self
            .plan_all(table)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;
        let array_helper = table.uses_array_buffers();

        Ok(BindingPlan {
            functions,
            array_helper,
        })
    }

    /// Generate the complete module text.
    pub fn render(&self, table: &FunctionTable) -> Result<String, EmitError> {
        let plan = self.plan(table)?;
        let output = self.render_plan(&plan);
        info!(
            "generated bindings for {} functions ({} bytes)",
            plan.functions.len(),
            output.len()
        );
        Ok(output)
    }

    /// Generate the module and write it to `out`.
    ///
    /// Nothing is written unless every signature resolves.
    pub fn emit<W: Write>(&self, table: &FunctionTable, out: &mut W) -> Result<(), EmitError> {
        let output = self.render(table)?;
        out.write_all(output.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Render an already resolved plan.
    pub fn render_plan(&self, plan: &BindingPlan) -> String {
        let mut output = self.preamble();

        if plan.array_helper {
            output.push_str(ARRAY_HELPER);
        }

        for func in &plan.functions {
            output.push_str(&declaration(func));
        }

        for func in &plan.functions {
            output.push_str(&wrapper(func));
        }

        output.push('\n');
        output
    }

    fn preamble(&self) -> String {
        let prefix = python_string(&self.options.library_prefix);
        let free = &self.options.free_function;

        format!(
            r#"# DO NOT MODIFY: this file is generated by ctbind

import os
import ctypes as ct

def catch_errors(f):
    def wrapper(*args):
        errcode = ct.c_int32(0)
        errmsg = ct.c_char_p(0)
        output = f(*args, ct.byref(errcode), ct.byref(errmsg))
        if errcode.value != 0:
            try:
                if errmsg.value is not None:
                    msg = errmsg.value.decode('utf-8', 'replace')
                else:
                    msg = 'native call failed with status ' + str(errcode.value)
            finally:
                lib.{free}(errmsg)
            raise RuntimeError(msg)
        return output
    return wrapper

dirname = os.path.dirname(os.path.abspath(__file__))
contents = os.listdir(dirname)
lib = None
for x in sorted(contents):
    if x.startswith({prefix}) and not x.endswith("py"):
        lib = ct.CDLL(os.path.join(dirname, x))
        break

if lib is None:
    raise ImportError("failed to find the " + {prefix} + ".* module")

lib.{free}.restype = None
lib.{free}.argtypes = [ ct.POINTER(ct.c_char_p) ]"#
        )
    }
}

const ARRAY_HELPER: &str = r#"

import numpy as np
def np2ct(x, expected, contiguous=True):
    if not isinstance(x, np.ndarray):
        raise ValueError('expected a NumPy array')
    if x.dtype != expected:
        raise ValueError('expected a NumPy array of type ' + str(expected) + ', got ' + str(x.dtype))
    if contiguous:
        if not x.flags.c_contiguous and not x.flags.f_contiguous:
            raise ValueError('only contiguous NumPy arrays are supported')
    return x.ctypes.data"#;

fn declaration(func: &FunctionPlan) -> String {
    let restype = func
        .restype
        .as_ref()
        .map_or_else(|| "None".to_string(), |ty| ty.to_string());

    let argtypes: Vec<String> = func
        .argtypes
        .iter()
        .map(|ty| ty.to_string())
        .chain([
            "ct.POINTER(ct.c_int32)".to_string(),
            "ct.POINTER(ct.c_char_p)".to_string(),
        ])
        .collect();

    format!(
        "\n\nlib.{sym}.restype = {restype}\nlib.{sym}.argtypes = [\n    {args}\n]",
        sym = func.symbol,
        restype = restype,
        args = argtypes.join(",\n    ")
    )
}

fn wrapper(func: &FunctionPlan) -> String {
    let names: Vec<&str> = func.params.iter().map(|p| p.name.as_str()).collect();
    let forwarded: Vec<String> = func.params.iter().map(ParamPlan::call_expr).collect();

    format!(
        "\n\ndef {name}({params}):\n    return catch_errors(lib.{sym})({args})",
        name = func.name,
        params = names.join(", "),
        sym = func.symbol,
        args = forwarded.join(", ")
    )
}

/// ASCII identifier rules, minus keywords.
fn is_python_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !PYTHON_KEYWORDS.contains(&name)
}

/// A usable function or parameter name in the generated module.
fn is_python_name(name: &str) -> bool {
    is_python_identifier(name) && !RESERVED_NAMES.contains(&name)
}

/// Single-quoted Python string literal.
fn python_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::TypeDescriptor;
    use crate::core::function::Argument;

    fn emitter() -> CtypesEmitter {
        CtypesEmitter::new(EmitOptions::new("libdemo"))
    }

    fn scalar_table() -> FunctionTable {
        FunctionTable::new()
            .with_function("beta", FunctionEntry::new(TypeDescriptor::new("void", 0)))
            .with_function(
                "alpha",
                FunctionEntry::new(TypeDescriptor::new("int", 0))
                    .with_arg(Argument::new("x", TypeDescriptor::new("int", 0))),
            )
    }

    fn buffer_arg(name: &str) -> Argument {
        Argument::new(name, TypeDescriptor::new("double", 1).with_tag(Tag::ArrayBuffer))
    }

    #[test]
    fn test_declarations_in_name_order() {
        let output = emitter().render(&scalar_table()).unwrap();

        let alpha = output.find("lib.py_alpha.restype").unwrap();
        let beta = output.find("lib.py_beta.restype").unwrap();
        assert!(alpha < beta);

        let alpha_def = output.find("def alpha(").unwrap();
        let beta_def = output.find("def beta(").unwrap();
        assert!(beta < alpha_def);
        assert!(alpha_def < beta_def);
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let reversed = FunctionTable::new()
            .with_function(
                "alpha",
                FunctionEntry::new(TypeDescriptor::new("int", 0))
                    .with_arg(Argument::new("x", TypeDescriptor::new("int", 0))),
            )
            .with_function("beta", FunctionEntry::new(TypeDescriptor::new("void", 0)));

        assert_eq!(
            emitter().render(&scalar_table()).unwrap(),
            emitter().render(&reversed).unwrap()
        );
    }

    #[test]
    fn test_declaration_text() {
        let output = emitter().render(&scalar_table()).unwrap();

        assert!(output.contains(
            "\n\nlib.py_alpha.restype = ct.c_int\n\
             lib.py_alpha.argtypes = [\n    \
             ct.c_int,\n    \
             ct.POINTER(ct.c_int32),\n    \
             ct.POINTER(ct.c_char_p)\n]"
        ));
        assert!(output.contains("lib.py_beta.restype = None\n"));
        assert!(output.contains(
            "lib.py_beta.argtypes = [\n    ct.POINTER(ct.c_int32),\n    ct.POINTER(ct.c_char_p)\n]"
        ));
        assert!(output.contains("\n\ndef alpha(x):\n    return catch_errors(lib.py_alpha)(x)"));
        assert!(output.contains("\n\ndef beta():\n    return catch_errors(lib.py_beta)()"));
        assert!(output.ends_with(")\n"));
    }

    #[test]
    fn test_void_pointer_return_is_not_none() {
        let table = FunctionTable::new().with_function(
            "create",
            FunctionEntry::new(TypeDescriptor::new("void", 1)),
        );
        let output = emitter().render(&table).unwrap();
        assert!(output.contains("lib.py_create.restype = ct.c_void_p\n"));
    }

    #[test]
    fn test_preamble() {
        let output = emitter().render(&FunctionTable::new()).unwrap();

        assert!(output.starts_with("# DO NOT MODIFY"));
        assert!(output.contains("if x.startswith('libdemo') and not x.endswith(\"py\"):"));
        assert!(output.contains("raise ImportError(\"failed to find the \" + 'libdemo' + \".* module\")"));
        assert!(output.contains("lib.free_error_message(errmsg)"));
        // A failure without a message still raises RuntimeError.
        assert!(output.contains("if errmsg.value is not None:\n"));
        assert!(output.contains(
            "msg = 'native call failed with status ' + str(errcode.value)\n"
        ));
        assert!(output.contains(
            "            finally:\n                lib.free_error_message(errmsg)\n            raise RuntimeError(msg)"
        ));
        assert!(output.contains("lib.free_error_message.argtypes = [ ct.POINTER(ct.c_char_p) ]"));
        assert!(!output.contains("np2ct"));
    }

    #[test]
    fn test_custom_symbols() {
        let emitter = CtypesEmitter::new(
            EmitOptions::new("libdemo")
                .with_symbol_prefix("demo_")
                .with_free_function("demo_free"),
        );
        let output = emitter.render(&scalar_table()).unwrap();

        assert!(output.contains("lib.demo_alpha.restype"));
        assert!(output.contains("catch_errors(lib.demo_alpha)(x)"));
        assert!(output.contains("lib.demo_free(errmsg)"));
        assert!(!output.contains("py_alpha"));
    }

    #[test]
    fn test_array_helper_gating() {
        let mut table = scalar_table();
        let output = emitter().render(&table).unwrap();
        assert!(!output.contains("def np2ct("));
        assert!(!output.contains("import numpy"));

        table.insert(
            "fill",
            FunctionEntry::new(TypeDescriptor::new("void", 0)).with_arg(buffer_arg("values")),
        );
        table.insert(
            "sum",
            FunctionEntry::new(TypeDescriptor::new("double", 0))
                .with_arg(buffer_arg("values"))
                .with_arg(Argument::new("n", TypeDescriptor::new("size_t", 0))),
        );
        let output = emitter().render(&table).unwrap();
        assert_eq!(output.matches("def np2ct(").count(), 1);
        assert_eq!(output.matches("import numpy as np").count(), 1);

        // Helper comes before any declaration.
        assert!(output.find("def np2ct(").unwrap() < output.find("lib.py_alpha").unwrap());
    }

    #[test]
    fn test_array_arguments_are_converted() {
        let table = FunctionTable::new().with_function(
            "scale",
            FunctionEntry::new(TypeDescriptor::new("void", 0))
                .with_arg(buffer_arg("values"))
                .with_arg(Argument::new(
                    "counts",
                    TypeDescriptor::new("int32_t", 1)
                        .with_tag(Tag::ArrayBuffer)
                        .with_tag(Tag::AllowNonContiguous),
                ))
                .with_arg(Argument::new("factor", TypeDescriptor::new("double", 0))),
        );
        let output = emitter().render(&table).unwrap();

        assert!(output.contains(
            "def scale(values, counts, factor):\n    return catch_errors(lib.py_scale)(\
             np2ct(values, np.dtype(ct.c_double)), \
             np2ct(counts, np.int32, contiguous=False), \
             factor)"
        ));
        assert!(output.contains(
            "lib.py_scale.argtypes = [\n    ct.c_void_p,\n    ct.c_void_p,\n    ct.c_double,"
        ));
    }

    #[test]
    fn test_tagged_scalar_argument_passes_through() {
        let table = FunctionTable::new().with_function(
            "scale",
            FunctionEntry::new(TypeDescriptor::new("void", 0)).with_arg(Argument::new(
                "factor",
                TypeDescriptor::new("double", 0).with_tag(Tag::ArrayBuffer),
            )),
        );
        let plan = emitter().plan(&table).unwrap();
        assert!(!plan.array_helper);
        assert!(!plan.functions[0].uses_array_buffers());

        let output = emitter().render_plan(&plan);
        assert!(output.contains("    ct.c_double,\n"));
        assert!(output.contains("catch_errors(lib.py_scale)(factor)"));
        assert!(!output.contains("np2ct"));
        assert!(!output.contains("import numpy"));
    }

    #[test]
    fn test_untagged_pointer_argument_passes_through() {
        let table = FunctionTable::new().with_function(
            "greet",
            FunctionEntry::new(TypeDescriptor::new("void", 0))
                .with_arg(Argument::new("name", TypeDescriptor::parse("const char*"))),
        );
        let output = emitter().render(&table).unwrap();
        assert!(output.contains("    ct.c_char_p,\n"));
        assert!(output.contains("catch_errors(lib.py_greet)(name)"));
    }

    #[test]
    fn test_resolution_failure_names_function() {
        let mut table = scalar_table();
        table.insert(
            "wide",
            FunctionEntry::new(TypeDescriptor::new("void", 0))
                .with_arg(Argument::new("s", TypeDescriptor::parse("const wchar_t*"))),
        );

        let err = emitter().render(&table).unwrap_err();
        assert!(matches!(err, EmitError::Argument { .. }));
        assert_eq!(err.function(), Some("wide"));
        assert_eq!(err.resolve_error().unwrap().spelling(), "wchar_t");

        let mut out = Vec::new();
        assert!(emitter().emit(&table, &mut out).is_err());
        assert!(out.is_empty());
    }

    #[test]
    fn test_return_failure() {
        let table = FunctionTable::new()
            .with_function("get", FunctionEntry::new(TypeDescriptor::new("wchar_t", 0)));
        let err = emitter().render(&table).unwrap_err();
        assert!(matches!(err, EmitError::ReturnType { .. }));
        assert!(err.to_string().contains("`get`"));
    }

    #[test]
    fn test_first_failure_in_name_order() {
        let table = FunctionTable::new()
            .with_function("zz", FunctionEntry::new(TypeDescriptor::new("wchar_t", 0)))
            .with_function("aa", FunctionEntry::new(TypeDescriptor::new("char16_t", 0)));

        for _ in 0..8 {
            let err = emitter().render(&table).unwrap_err();
            assert_eq!(err.function(), Some("aa"));
        }
    }

    #[test]
    fn test_array_element_must_resolve() {
        let table = FunctionTable::new().with_function(
            "raw",
            FunctionEntry::new(TypeDescriptor::new("void", 0)).with_arg(Argument::new(
                "data",
                TypeDescriptor::new("void", 1).with_tag(Tag::ArrayBuffer),
            )),
        );
        let err = emitter().render(&table).unwrap_err();
        assert!(matches!(err, EmitError::ElementType { .. }));
    }

    #[test]
    fn test_invalid_names() {
        for (func, arg) in [("class", "x"), ("ok", "lambda"), ("ok", "lib"), ("2fast", "x"), ("ok", "")] {
            let table = FunctionTable::new().with_function(
                func,
                FunctionEntry::new(TypeDescriptor::new("void", 0))
                    .with_arg(Argument::new(arg, TypeDescriptor::new("int", 0))),
            );
            let err = emitter().render(&table).unwrap_err();
            assert!(
                matches!(err, EmitError::InvalidIdentifier { .. }),
                "{}({}) should be rejected",
                func,
                arg
            );
        }
    }

    #[test]
    fn test_invalid_free_function() {
        let emitter = CtypesEmitter::new(EmitOptions::new("libdemo").with_free_function("free-me"));
        let err = emitter.render(&FunctionTable::new()).unwrap_err();
        assert!(matches!(err, EmitError::InvalidSymbol { .. }));
        assert!(emitter.check_options().is_err());
    }

    #[test]
    fn test_prefix_is_escaped() {
        let emitter = CtypesEmitter::new(EmitOptions::new("it's\\lib"));
        let output = emitter.render(&FunctionTable::new()).unwrap();
        assert!(output.contains(r"x.startswith('it\'s\\lib')"));
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut table = scalar_table();
        table.insert(
            "fill",
            FunctionEntry::new(TypeDescriptor::new("void", 0)).with_arg(buffer_arg("values")),
        );

        let first = emitter().render(&table).unwrap();
        let second = emitter().render(&table).unwrap();
        assert_eq!(first, second);

        let mut written = Vec::new();
        emitter().emit(&table, &mut written).unwrap();
        assert_eq!(written, first.into_bytes());
    }

    #[test]
    fn test_signature() {
        let plan = emitter()
            .plan_function(
                "alpha",
                &FunctionEntry::new(TypeDescriptor::new("int", 0))
                    .with_arg(Argument::new("x", TypeDescriptor::new("char", 1))),
            )
            .unwrap();
        assert_eq!(plan.signature(), "alpha(x: ct.c_char_p) -> ct.c_int");
    }
}
