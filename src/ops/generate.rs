//! Binding generation operations.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::bindings::{CtypesEmitter, EmitError, EmitOptions, FunctionPlan};
use crate::core::function::FunctionTable;
use crate::util::fs::write_atomic;

/// Options for generating a binding module.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path to the function table (JSON)
    pub table: PathBuf,

    /// Path of the generated Python module
    pub output: PathBuf,

    /// Emitter settings
    pub emit: EmitOptions,
}

impl GenerateOptions {
    /// Create new generation options.
    pub fn new(table: impl Into<PathBuf>, output: impl Into<PathBuf>, emit: EmitOptions) -> Self {
        GenerateOptions {
            table: table.into(),
            output: output.into(),
            emit,
        }
    }
}

/// Outcome of a successful generation.
#[derive(Debug, Clone)]
pub struct GenerateResult {
    /// Path of the written module
    pub output: PathBuf,

    /// Number of wrapped functions
    pub functions: usize,

    /// Whether the NumPy helper was emitted
    pub array_helper: bool,

    /// Size of the module in bytes
    pub bytes: usize,
}

/// Load a function table and write its binding module.
///
/// The output file is only touched once the whole module has been rendered.
pub fn generate(opts: &GenerateOptions) -> Result<GenerateResult> {
    let table = FunctionTable::load(&opts.table)?;
    debug!(
        "loaded {} functions from {}",
        table.len(),
        opts.table.display()
    );

    let result = generate_table(&table, &opts.output, &opts.emit)?;
    info!(
        "wrote {} ({} functions)",
        result.output.display(),
        result.functions
    );
    Ok(result)
}

/// Write the binding module for an in-memory table.
pub fn generate_table(
    table: &FunctionTable,
    output: &Path,
    emit: &EmitOptions,
) -> Result<GenerateResult> {
    let emitter = CtypesEmitter::new(emit.clone());
    let plan = emitter.plan(table)?;
    let module = emitter.render_plan(&plan);

    write_atomic(output, module.as_bytes())?;

    Ok(GenerateResult {
        output: output.to_path_buf(),
        functions: plan.functions.len(),
        array_helper: plan.array_helper,
        bytes: module.len(),
    })
}

/// Resolution status of every function in a table.
#[derive(Debug)]
pub struct CheckReport {
    /// Functions that resolved, in name order
    pub resolved: Vec<FunctionPlan>,

    /// Every failure, in name order
    pub failures: Vec<EmitError>,

    /// Problem with the settings shared by every function
    pub options_error: Option<EmitError>,
}

impl CheckReport {
    /// Whether generation with the same settings would succeed.
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty() && self.options_error.is_none()
    }
}

/// Resolve a whole table, collecting every failure instead of stopping at
/// the first one.
pub fn check(table: &FunctionTable, emit: &EmitOptions) -> CheckReport {
    let emitter = CtypesEmitter::new(emit.clone());
    let mut report = CheckReport {
        resolved: Vec::new(),
        failures: Vec::new(),
        options_error: emitter.check_options().err(),
    };

    for result in emitter.plan_all(table) {
        match result {
            Ok(plan) => report.resolved.push(plan),
            Err(e) => report.failures.push(e),
        }
    }

    report
}
