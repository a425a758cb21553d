//! `ctbind generate` command

use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::cli::GenerateArgs;
use ctbind::bindings::EmitError;
use ctbind::ops::{generate, GenerateOptions};
use ctbind::util::config::Config;
use ctbind::util::diagnostic::{self, suggestions};

/// Output path used when neither the command line nor config sets one.
const DEFAULT_OUTPUT: &str = "bindings.py";

pub fn execute(args: GenerateArgs, color: bool) -> Result<()> {
    let mut config = super::load_merged_config(args.config.as_deref())?;

    // Command line flags win over every config file.
    let mut overrides = Config::default();
    overrides.bindings.library_prefix = args.prefix;
    overrides.bindings.output = args.output;
    overrides.bindings.symbol_prefix = args.symbol_prefix;
    overrides.bindings.free_function = args.free_function;
    config.merge(overrides);

    let Some(emit) = config.emit_options() else {
        bail!(
            "no library prefix configured\n\nhelp: {}",
            suggestions::NO_PREFIX
        );
    };
    let output = config
        .bindings
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let opts = GenerateOptions::new(&args.table, &output, emit);
    match generate(&opts) {
        Ok(result) => {
            println!(
                "Generated Python bindings: {} ({} functions{})",
                result.output.display(),
                result.functions,
                if result.array_helper {
                    ", requires numpy"
                } else {
                    ""
                }
            );
            Ok(())
        }
        Err(e) => match e.downcast_ref::<EmitError>() {
            Some(emit_err) => {
                let diag = emit_err
                    .to_diagnostic()
                    .with_location(&args.table)
                    .with_suggestion(suggestions::CHECK_TABLE);
                diagnostic::emit(&diag, color);
                std::process::exit(1);
            }
            None => Err(e),
        },
    }
}
