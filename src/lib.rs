// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # osm2parquet
//!
//! Encode OpenStreetMap entities and changesets into typed, columnar
//! Arrow batches and write them as Parquet.
//!
//! ## Features
//!
//! - **Entity schema**: nodes, ways and relations in one table, with
//!   `tags` as a map, `nds` and `members` as lists of structs
//! - **History**: optional `visible` column for full-history input
//! - **Exact coordinates**: `Decimal128` with scale 7, never a float
//!   approximation
//! - **Parallel encoding**: many workers fill one shared row batch
//! - **Changesets**: a separate flat schema for changeset dumps
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use osm2parquet::{convert::convert_entities_file, config::ConvertConfig, Result};
//!
//! fn main() -> Result<()> {
//!     let config = ConvertConfig::from_yaml("parallelism: unbounded")?;
//!     let summary = convert_entities_file("extract.osm", "extract.parquet", &config)?;
//!     println!("{} rows in {} batches", summary.rows, summary.batches);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐    ┌─────────────────┐    ┌───────────┐    ┌────────────┐
//! │   Source   │ →  │  EntityEncoder  │ →  │  RowBatch │ →  │  BatchSink │
//! │ XML / PBF  │    │ gate + workers  │    │ columns + │    │ Parquet    │
//! │ changesets │    │ flush control   │    │ children  │    │ memory     │
//! └────────────┘    └─────────────────┘    └───────────┘    └────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Domain records: entities, metadata, changesets
pub mod types;

/// Fixed-point coordinates
pub mod decimal;

/// Output schema descriptors
pub mod schema;

/// Columnar row batches
pub mod batch;

/// Row encoders and flush control
pub mod encoder;

/// Batch sinks (Parquet, memory)
pub mod sink;

/// OSM XML and PBF record sources
pub mod source;

/// Conversion configuration
pub mod config;

/// Source → encoder → sink pipelines
pub mod convert;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::ConvertConfig;
pub use convert::{convert_changesets, convert_entities, ConvertSummary};
pub use encoder::{ChangesetEncoder, EntityEncoder, Parallelism};
pub use schema::{ChangesetSchema, EntitySchema};
pub use sink::{BatchSink, MemorySink, ParquetSink};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
