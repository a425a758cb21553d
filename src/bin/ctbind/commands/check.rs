//! `ctbind check` command

use anyhow::Result;

use crate::cli::CheckArgs;
use ctbind::bindings::{EmitOptions, DEFAULT_FREE_FUNCTION, DEFAULT_SYMBOL_PREFIX};
use ctbind::core::FunctionTable;
use ctbind::ops::check;
use ctbind::util::config::Config;
use ctbind::util::diagnostic::{self, Diagnostic};

pub fn execute(args: CheckArgs, color: bool) -> Result<()> {
    let mut config = super::load_merged_config(args.config.as_deref())?;
    let mut overrides = Config::default();
    overrides.bindings.symbol_prefix = args.symbol_prefix;
    overrides.bindings.free_function = args.free_function;
    config.merge(overrides);

    let table = FunctionTable::load(&args.table)?;
    if table.is_empty() {
        let diag = Diagnostic::warning("function table is empty")
            .with_location(&args.table)
            .with_context("the generated module would only load the library");
        diagnostic::emit(&diag, color);
    }

    // The library prefix only affects the preamble, which check never renders.
    let bindings = &config.bindings;
    let emit = EmitOptions::new(bindings.library_prefix.clone().unwrap_or_default())
        .with_symbol_prefix(
            bindings
                .symbol_prefix
                .as_deref()
                .unwrap_or(DEFAULT_SYMBOL_PREFIX),
        )
        .with_free_function(
            bindings
                .free_function
                .as_deref()
                .unwrap_or(DEFAULT_FREE_FUNCTION),
        );
    let report = check(&table, &emit);

    if let Some(ref e) = report.options_error {
        diagnostic::emit(&e.to_diagnostic(), color);
    }

    for plan in &report.resolved {
        println!("  ok  {}", plan.signature());
    }

    for failure in &report.failures {
        let diag = failure.to_diagnostic().with_location(&args.table);
        diagnostic::emit(&diag, color);
    }

    println!();
    println!(
        "{} functions: {} ok, {} failed",
        table.len(),
        report.resolved.len(),
        report.failures.len()
    );

    if !report.is_ok() {
        std::process::exit(1);
    }

    Ok(())
}
