//! Conversion configuration
//!
//! Settings for a conversion run, loaded from YAML and overridable from the
//! command line.
//!
//! ```yaml
//! batch_size: 1024
//! history: false
//! input_format: pbf
//! parallelism:
//!   workers: 4
//! parquet:
//!   compression: zstd
//!   row_group_size: 1048576
//! metadata:
//!   source: planet-2024-01-01
//! ```

use crate::batch::DEFAULT_BATCH_SIZE;
use crate::encoder::Parallelism;
use crate::error::{Error, Result, ResultExt};
use crate::sink::ParquetSinkConfig;
use crate::source::InputFormat;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertConfig {
    /// Rows per batch handed to the sink
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Add the `visible` column for full-history input
    #[serde(default)]
    pub history: bool,

    /// Entity input encoding; guessed from the file name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<InputFormat>,

    /// How entity records are scheduled onto workers
    #[serde(default)]
    pub parallelism: Parallelism,

    /// Parquet writer settings
    #[serde(default)]
    pub parquet: ParquetConfig,

    /// Extra key/value pairs for the file footer
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            history: false,
            input_format: None,
            parallelism: Parallelism::default(),
            parquet: ParquetConfig::default(),
            metadata: BTreeMap::new(),
        }
    }
}

impl ConvertConfig {
    /// Load and validate a YAML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                Error::Io(e)
            }
        })?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML config
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::invalid_value("batch_size", "must be at least 1"));
        }
        if self.parallelism == Parallelism::Workers(0) {
            return Err(Error::invalid_value("parallelism.workers", "must be at least 1"));
        }
        if self.parquet.row_group_size == 0 {
            return Err(Error::invalid_value(
                "parquet.row_group_size",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// Format to read `input` as
    pub fn input_format_for(&self, input: &str) -> InputFormat {
        self.input_format.unwrap_or_else(|| InputFormat::detect(input))
    }

    /// Sink settings with the configured footer metadata
    pub fn sink_config(&self) -> ParquetSinkConfig {
        let mut sink = ParquetSinkConfig::new()
            .with_compression(self.parquet.compression.into())
            .with_row_group_size(self.parquet.row_group_size)
            .with_dictionary(self.parquet.dictionary)
            .with_statistics(self.parquet.statistics);
        for (key, value) in &self.metadata {
            sink = sink.with_metadata(key, value);
        }
        sink
    }
}

// ============================================================================
// Parquet Config
// ============================================================================

/// Parquet writer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParquetConfig {
    #[serde(default)]
    pub compression: CompressionKind,

    /// Maximum rows per row group
    #[serde(default = "default_row_group_size")]
    pub row_group_size: usize,

    #[serde(default = "default_true")]
    pub dictionary: bool,

    #[serde(default = "default_true")]
    pub statistics: bool,
}

fn default_row_group_size() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            compression: CompressionKind::default(),
            row_group_size: default_row_group_size(),
            dictionary: true,
            statistics: true,
        }
    }
}

/// Column compression codec
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    #[default]
    Snappy,
    Zstd,
    Gzip,
    None,
}

impl From<CompressionKind> for Compression {
    fn from(kind: CompressionKind) -> Self {
        match kind {
            CompressionKind::Snappy => Compression::SNAPPY,
            CompressionKind::Zstd => Compression::ZSTD(ZstdLevel::default()),
            CompressionKind::Gzip => Compression::GZIP(GzipLevel::default()),
            CompressionKind::None => Compression::UNCOMPRESSED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = ConvertConfig::from_yaml("{}").unwrap();
        assert_eq!(config, ConvertConfig::default());
        assert_eq!(config.batch_size, 1024);
        assert_eq!(config.parallelism, Parallelism::Sequential);
        assert_eq!(config.parquet.compression, CompressionKind::Snappy);
        assert_eq!(config.parquet.row_group_size, 1_048_576);
    }

    #[test]
    fn test_input_format() {
        let config = ConvertConfig::default();
        assert_eq!(config.input_format_for("planet.osm.pbf"), InputFormat::Pbf);
        assert_eq!(config.input_format_for("planet.osm"), InputFormat::Xml);
        assert_eq!(config.input_format_for("-"), InputFormat::Xml);

        let config = ConvertConfig::from_yaml("input_format: pbf").unwrap();
        assert_eq!(config.input_format, Some(InputFormat::Pbf));
        assert_eq!(config.input_format_for("-"), InputFormat::Pbf);
    }

    #[test]
    fn test_full_config() {
        let yaml = r"
batch_size: 256
history: true
parallelism:
  workers: 4
parquet:
  compression: zstd
  row_group_size: 5000
  dictionary: false
metadata:
  source: planet
";
        let config = ConvertConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.batch_size, 256);
        assert!(config.history);
        assert_eq!(config.parallelism, Parallelism::Workers(4));
        assert_eq!(config.parquet.compression, CompressionKind::Zstd);
        assert!(!config.parquet.dictionary);
        assert!(config.parquet.statistics);

        let sink = config.sink_config();
        assert_eq!(sink.row_group_size(), 5000);
        assert!(matches!(sink.compression(), Compression::ZSTD(_)));
        assert_eq!(
            sink.metadata(),
            &[("source".to_string(), "planet".to_string())]
        );
    }

    #[test]
    fn test_unit_parallelism() {
        let config = ConvertConfig::from_yaml("parallelism: unbounded").unwrap();
        assert_eq!(config.parallelism, Parallelism::Unbounded);
    }

    #[test]
    fn test_rejects_zero_values() {
        let err = ConvertConfig::from_yaml("batch_size: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { ref field, .. } if field == "batch_size"));

        let err = ConvertConfig::from_yaml("parallelism:\n  workers: 0").unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = ConvertConfig::from_yaml("batchsize: 10").unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_load_names_file_on_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convert.yaml");
        fs::write(&path, "batch_size: [1, 2]").unwrap();

        let err = ConvertConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Other(_)));
        assert!(err.to_string().contains("convert.yaml"));
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("convert.yaml");
        fs::write(&path, "batch_size: 0").unwrap();
        let err = ConvertConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConvertConfig::load("/no/such/config.yaml").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
