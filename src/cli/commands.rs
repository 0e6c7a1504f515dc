//! CLI commands and argument parsing

use crate::config::{CompressionKind, ConvertConfig};
use crate::encoder::Parallelism;
use crate::source::InputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Convert OpenStreetMap data into Parquet
#[derive(Parser, Debug)]
#[command(name = "osm2parquet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Conversion config file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for summaries and schemas
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert nodes, ways and relations from OSM XML or PBF
    Entities {
        /// Input file, or `-` for stdin
        input: String,

        /// Output Parquet file
        output: PathBuf,

        /// Input encoding; guessed from the file extension by default
        #[arg(long, value_enum)]
        input_format: Option<InputFormat>,

        /// Input is a full-history file; adds the `visible` column
        #[arg(long)]
        history: bool,

        /// Encoding workers (dedicated pool)
        #[arg(long, conflicts_with = "parallel")]
        workers: Option<usize>,

        /// Encode on all cores
        #[arg(long)]
        parallel: bool,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Convert a changeset XML dump
    Changesets {
        /// Input file, or `-` for stdin
        input: String,

        /// Output Parquet file
        output: PathBuf,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Print the Arrow schema of the output
    Schema {
        /// Entity schema with the `visible` column
        #[arg(long, conflicts_with = "changesets")]
        history: bool,

        /// Changeset schema
        #[arg(long)]
        changesets: bool,
    },
}

/// Options shared by the conversion commands
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Rows per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Column compression codec
    #[arg(long)]
    pub compression: Option<CompressionKind>,
}

impl ConvertArgs {
    /// Override config values given on the command line
    pub fn apply(&self, config: &mut ConvertConfig) {
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(compression) = self.compression {
            config.parquet.compression = compression;
        }
    }
}

/// Parallelism selected by `--workers` / `--parallel`, if any
pub fn parallelism_flag(workers: Option<usize>, parallel: bool) -> Option<Parallelism> {
    match (workers, parallel) {
        (Some(n), _) => Some(Parallelism::Workers(n)),
        (None, true) => Some(Parallelism::Unbounded),
        (None, false) => None,
    }
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entities() {
        let cli = Cli::parse_from([
            "osm2parquet",
            "entities",
            "in.osm",
            "out.parquet",
            "--history",
            "--workers",
            "4",
            "--batch-size",
            "512",
            "--compression",
            "zstd",
        ]);
        let Commands::Entities {
            input,
            input_format,
            history,
            workers,
            parallel,
            options,
            ..
        } = cli.command
        else {
            panic!("expected entities command");
        };
        assert_eq!(input, "in.osm");
        assert!(history);
        assert_eq!(input_format, None);
        assert_eq!(parallelism_flag(workers, parallel), Some(Parallelism::Workers(4)));

        let mut config = ConvertConfig::default();
        options.apply(&mut config);
        assert_eq!(config.batch_size, 512);
        assert_eq!(config.parquet.compression, CompressionKind::Zstd);
    }

    #[test]
    fn test_parse_input_format() {
        let cli = Cli::parse_from([
            "osm2parquet",
            "entities",
            "-",
            "out.parquet",
            "--input-format",
            "pbf",
        ]);
        assert!(matches!(
            cli.command,
            Commands::Entities {
                input_format: Some(InputFormat::Pbf),
                ..
            }
        ));
    }

    #[test]
    fn test_workers_conflict_with_parallel() {
        let result = Cli::try_parse_from([
            "osm2parquet",
            "entities",
            "-",
            "out.parquet",
            "--workers",
            "2",
            "--parallel",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_schema() {
        let cli = Cli::parse_from(["osm2parquet", "schema", "--changesets", "-f", "pretty"]);
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert!(matches!(
            cli.command,
            Commands::Schema {
                history: false,
                changesets: true
            }
        ));
    }
}
