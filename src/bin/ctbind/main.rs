//! ctbind CLI - generate Python ctypes bindings for native libraries

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ctbind=debug")
    } else {
        EnvFilter::new("ctbind=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = cli.use_color();
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, color),
        Commands::Check(args) => commands::check::execute(args, color),
        Commands::Resolve(args) => commands::resolve::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
