//! High-level operations.
//!
//! This module contains the implementation of ctbind commands.

pub mod generate;

pub use generate::{check, generate, generate_table, CheckReport, GenerateOptions, GenerateResult};
