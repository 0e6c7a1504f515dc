//! CLI module
//!
//! Command-line interface for running conversions.
//!
//! # Commands
//!
//! - `entities` - Convert nodes, ways and relations from OSM XML or PBF
//! - `changesets` - Convert a changeset dump
//! - `schema` - Print the output schema

mod commands;
mod runner;

pub use commands::{parallelism_flag, Cli, Commands, ConvertArgs, OutputFormat};
pub use runner::Runner;
