//! CLI definitions using clap.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use ctbind::Tag;

/// ctbind - Generate Python ctypes bindings for native libraries
#[derive(Parser)]
#[command(name = "ctbind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Whether diagnostics should be colored.
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stderr().is_terminal()
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a Python binding module from a function table
    Generate(GenerateArgs),

    /// Resolve every signature in a function table and report failures
    Check(CheckArgs),

    /// Show the ctypes type for a single C type spelling
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct GenerateArgs {
    /// Function table (JSON) produced by the signature extractor
    #[arg(short, long)]
    pub table: PathBuf,

    /// Output path of the generated module
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// File name prefix of the shared library to load
    #[arg(long, env = "CTBIND_LIBRARY_PREFIX")]
    pub prefix: Option<String>,

    /// Prefix of exported native symbols
    #[arg(long)]
    pub symbol_prefix: Option<String>,

    /// Native function releasing error messages
    #[arg(long)]
    pub free_function: Option<String>,

    /// Additional config file, applied over global and project config
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Function table (JSON) produced by the signature extractor
    #[arg(short, long)]
    pub table: PathBuf,

    /// Prefix of exported native symbols
    #[arg(long)]
    pub symbol_prefix: Option<String>,

    /// Native function releasing error messages
    #[arg(long)]
    pub free_function: Option<String>,

    /// Additional config file, applied over global and project config
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// C type spelling, e.g. "const char*"
    pub spelling: String,

    /// Tags to attach (opaque-pointer-as-handle, numeric-array-buffer, allow-non-contiguous-buffer)
    #[arg(long = "tag")]
    pub tags: Vec<Tag>,

    /// Resolve as a return type (bare void means no value)
    #[arg(long)]
    pub returns: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
