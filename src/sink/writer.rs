//! Parquet file writer
//!
//! Writes Arrow RecordBatches to a Parquet file.

use super::BatchSink;
use crate::error::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration for the Parquet sink
#[derive(Debug, Clone)]
pub struct ParquetSinkConfig {
    compression: Compression,
    row_group_size: usize,
    dictionary_enabled: bool,
    statistics_enabled: bool,
    metadata: Vec<(String, String)>,
}

impl Default for ParquetSinkConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024, // 1M rows
            dictionary_enabled: true,
            statistics_enabled: true,
            metadata: Vec::new(),
        }
    }
}

impl ParquetSinkConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set compression algorithm
    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    /// Enable or disable statistics
    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    /// Add a key/value pair to the file footer
    ///
    /// A later pair with the same key replaces the earlier one.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| *k == key) {
            Some(existing) => existing.1 = value,
            None => self.metadata.push((key, value)),
        }
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    /// Build writer properties
    fn build_properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size);

        if !self.dictionary_enabled {
            builder = builder.set_dictionary_enabled(false);
        }

        if !self.statistics_enabled {
            builder =
                builder.set_statistics_enabled(parquet::file::properties::EnabledStatistics::None);
        }

        if !self.metadata.is_empty() {
            let pairs = self
                .metadata
                .iter()
                .map(|(k, v)| KeyValue::new(k.clone(), v.clone()))
                .collect();
            builder = builder.set_key_value_metadata(Some(pairs));
        }

        builder.build()
    }
}

/// Sink writing one Parquet file
pub struct ParquetSink {
    /// Arrow writer; `None` once closed
    writer: Option<ArrowWriter<File>>,
    path: PathBuf,
    rows_written: usize,
    batches_written: usize,
}

impl ParquetSink {
    /// Create the file and write its header
    pub fn create(
        path: impl AsRef<Path>,
        schema: SchemaRef,
        config: &ParquetSinkConfig,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| Error::Output {
            message: format!("Failed to create file {}: {e}", path.display()),
        })?;

        let props = config.build_properties();
        let writer = ArrowWriter::try_new(file, schema, Some(props)).map_err(|e| Error::Output {
            message: format!("Failed to create Parquet writer: {e}"),
        })?;

        Ok(Self {
            writer: Some(writer),
            path,
            rows_written: 0,
            batches_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the number of rows written so far
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn batches_written(&self) -> usize {
        self.batches_written
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

impl BatchSink for ParquetSink {
    fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::output("Parquet sink is already closed"))?;

        if batch.num_rows() == 0 {
            return Ok(());
        }

        writer.write(batch).map_err(|e| Error::Output {
            message: format!("Failed to write batch: {e}"),
        })?;

        self.rows_written += batch.num_rows();
        self.batches_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };

        writer.close().map_err(|e| Error::Output {
            message: format!("Failed to close Parquet writer: {e}"),
        })?;
        debug!(
            path = %self.path.display(),
            rows = self.rows_written,
            "closed Parquet file"
        );
        Ok(())
    }
}
