//! Conversion pipelines
//!
//! Wire a record source, an encoder and a sink together and report what
//! was written.

use crate::config::ConvertConfig;
use crate::encoder::{ChangesetEncoder, EncodeStats, EntityEncoder};
use crate::error::{Error, Result};
use crate::schema::{ChangesetSchema, EntitySchema};
use crate::sink::{BatchSink, ParquetSink, ParquetSinkConfig};
use crate::source::{open_input, ChangesetXmlReader, InputFormat, OsmXmlReader, PbfReader};
use crate::types::{Bounds, Changeset, Entity};
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Schema version of the OSM data model written to every file
pub const OSM_SCHEMA_VERSION: &str = "0.6";

/// Value of the `writer` footer key
pub const WRITER: &str = concat!("osm2parquet ", env!("CARGO_PKG_VERSION"));

/// Outcome of a conversion run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertSummary {
    pub nodes: u64,
    pub ways: u64,
    pub relations: u64,
    pub changesets: u64,
    /// Rows appended to the sink
    pub rows: u64,
    /// Batches appended to the sink, including the final one
    pub batches: u64,
    pub elapsed: Duration,
}

impl ConvertSummary {
    fn new(stats: EncodeStats, elapsed: Duration) -> Self {
        Self {
            nodes: stats.nodes,
            ways: stats.ways,
            relations: stats.relations,
            changesets: stats.changesets,
            rows: stats.rows,
            batches: stats.batches,
            elapsed,
        }
    }

    /// Records encoded across all kinds
    pub fn records(&self) -> u64 {
        self.nodes + self.ways + self.relations + self.changesets
    }
}

/// Encode entities from `records` into `sink`
///
/// The sink is closed on success. On error it is left as is; the output is
/// not usable.
pub fn convert_entities<I, S>(records: I, sink: S, config: &ConvertConfig) -> Result<ConvertSummary>
where
    I: Iterator<Item = Result<Entity>> + Send,
    S: BatchSink + Send,
{
    config.validate()?;
    let started = Instant::now();

    let encoder = EntityEncoder::new(EntitySchema::new(config.history), sink, config.batch_size);
    encoder.encode_parallel(records, config.parallelism)?;
    let stats = encoder.finish()?;

    let summary = ConvertSummary::new(stats, started.elapsed());
    info!(
        nodes = summary.nodes,
        ways = summary.ways,
        relations = summary.relations,
        batches = summary.batches,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Entity conversion complete"
    );
    Ok(summary)
}

/// Encode changesets from `records` into `sink`
pub fn convert_changesets<I, S>(records: I, sink: S, config: &ConvertConfig) -> Result<ConvertSummary>
where
    I: Iterator<Item = Result<Changeset>>,
    S: BatchSink,
{
    config.validate()?;
    if config.parallelism.is_parallel() {
        debug!("Changesets are encoded sequentially; ignoring parallelism");
    }
    let started = Instant::now();

    let mut encoder = ChangesetEncoder::new(sink, config.batch_size);
    encoder.encode_all(records)?;
    let stats = encoder.finish()?;

    let summary = ConvertSummary::new(stats, started.elapsed());
    info!(
        changesets = summary.changesets,
        batches = summary.batches,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Changeset conversion complete"
    );
    Ok(summary)
}

/// Convert an OSM XML or PBF file (or `-` for stdin) into a Parquet file
pub fn convert_entities_file(
    input: &str,
    output: impl AsRef<Path>,
    config: &ConvertConfig,
) -> Result<ConvertSummary> {
    config.validate()?;
    let output = output.as_ref();
    let format = config.input_format_for(input);

    info!(
        input,
        output = %output.display(),
        format = ?format,
        history = config.history,
        parallelism = ?config.parallelism,
        "Converting entities"
    );

    match format {
        InputFormat::Xml => {
            let reader = OsmXmlReader::new(open_input(input)?)?;
            let bounds = reader.bounds();
            write_entities(reader, bounds, output, config)
        }
        InputFormat::Pbf => {
            let reader = PbfReader::new(open_input(input)?)?;
            let bounds = reader.bounds();
            write_entities(reader, bounds, output, config)
        }
    }
}

fn write_entities<I>(
    records: I,
    bounds: Option<Bounds>,
    output: &Path,
    config: &ConvertConfig,
) -> Result<ConvertSummary>
where
    I: Iterator<Item = Result<Entity>> + Send,
{
    let schema = EntitySchema::new(config.history);
    let sink_config = file_metadata(config, config.history, bounds);
    let sink = ParquetSink::create(output, schema.arrow_schema(), &sink_config)?;
    convert_entities(records, sink, config)
}

/// Convert a changeset XML dump (or `-` for stdin) into a Parquet file
pub fn convert_changesets_file(
    input: &str,
    output: impl AsRef<Path>,
    config: &ConvertConfig,
) -> Result<ConvertSummary> {
    config.validate()?;
    if config.input_format == Some(InputFormat::Pbf) {
        return Err(Error::config("Changeset dumps are only read as XML"));
    }
    let output = output.as_ref();
    let reader = ChangesetXmlReader::new(open_input(input)?)?;

    info!(input, output = %output.display(), "Converting changesets");

    let sink_config = file_metadata(config, false, None);
    let sink = ParquetSink::create(output, ChangesetSchema::new().arrow_schema(), &sink_config)?;
    convert_changesets(reader, sink, config)
}

/// Sink settings with the standard footer keys; these win over user pairs
fn file_metadata(config: &ConvertConfig, history: bool, bounds: Option<Bounds>) -> ParquetSinkConfig {
    let mut sink_config = config
        .sink_config()
        .with_metadata("osm_schema_version", OSM_SCHEMA_VERSION)
        .with_metadata("history", history.to_string())
        .with_metadata("writer", WRITER);
    if let Some(bounds) = bounds {
        sink_config = sink_config.with_metadata("bbox", bounds.to_bbox_string());
    }
    sink_config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Coordinate;
    use crate::encoder::Parallelism;
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_convert_entities_into_memory() {
        let config = ConvertConfig {
            batch_size: 2,
            ..ConvertConfig::default()
        };
        let records = vec![
            Ok(Entity::node(1, 1.0, 2.0)),
            Ok(Entity::way(2, vec![1])),
            Ok(Entity::node(3, 1.5, 2.5)),
        ];
        let mut sink = MemorySink::new();
        let summary = convert_entities(records.into_iter(), &mut sink, &config).unwrap();

        assert_eq!(summary.nodes, 2);
        assert_eq!(summary.ways, 1);
        assert_eq!(summary.records(), 3);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.batches, 2);
        assert_eq!(sink.total_rows(), 3);
        assert_eq!(sink.close_count(), 1);
    }

    #[test]
    fn test_convert_entities_in_parallel() {
        let config = ConvertConfig {
            batch_size: 8,
            parallelism: Parallelism::Workers(2),
            ..ConvertConfig::default()
        };
        let records = (0..50).map(|id| Ok(Entity::way(id, vec![id, id + 1])));
        let mut sink = MemorySink::new();
        let summary = convert_entities(records, &mut sink, &config).unwrap();
        assert_eq!(summary.ways, 50);
        assert_eq!(sink.total_rows(), 50);
    }

    #[test]
    fn test_convert_rejects_invalid_config() {
        let config = ConvertConfig {
            batch_size: 0,
            ..ConvertConfig::default()
        };
        let err = convert_entities(std::iter::empty(), MemorySink::new(), &config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_convert_changesets_into_memory() {
        let records = (1..=3).map(|id| Ok(Changeset::new(id)));
        let mut sink = MemorySink::new();
        let summary = convert_changesets(records, &mut sink, &ConvertConfig::default()).unwrap();
        assert_eq!(summary.changesets, 3);
        assert_eq!(summary.batches, 1);
        assert_eq!(sink.batches()[0].num_columns(), 13);
    }

    #[test]
    fn test_changesets_reject_pbf_input() {
        let config = ConvertConfig {
            input_format: Some(InputFormat::Pbf),
            ..ConvertConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("changesets.parquet");
        let err = convert_changesets_file("changesets.osm.pbf", &output, &config).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_file_metadata() {
        let mut config = ConvertConfig::default();
        config
            .metadata
            .insert("history".to_string(), "overridden".to_string());
        config
            .metadata
            .insert("source".to_string(), "test".to_string());

        let bounds = Bounds {
            min_lat: Coordinate::parse("1").unwrap(),
            min_lon: Coordinate::parse("2").unwrap(),
            max_lat: Coordinate::parse("3").unwrap(),
            max_lon: Coordinate::parse("4").unwrap(),
        };
        let sink_config = file_metadata(&config, true, Some(bounds));
        let lookup = |key: &str| {
            sink_config
                .metadata()
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        assert_eq!(lookup("history").as_deref(), Some("true"));
        assert_eq!(lookup("source").as_deref(), Some("test"));
        assert_eq!(lookup("osm_schema_version").as_deref(), Some("0.6"));
        assert_eq!(lookup("writer").as_deref(), Some(WRITER));
        assert_eq!(
            lookup("bbox").as_deref(),
            Some("2.0000000,1.0000000,4.0000000,3.0000000")
        );
    }
}
