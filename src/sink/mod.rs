//! Batch sinks
//!
//! A sink persists completed row batches. The encoders only ever append
//! whole batches and close the sink at the end of a run.
//!
//! # Overview
//!
//! - `BatchSink` - append/close contract
//! - `ParquetSink` - writes a Parquet file with configurable compression,
//!   row-group size and footer key/value metadata
//! - `MemorySink` - keeps batches in memory

mod memory;
mod writer;

pub use memory::MemorySink;
pub use writer::{ParquetSink, ParquetSinkConfig};

use crate::error::Result;
use arrow::record_batch::RecordBatch;

/// Destination for completed row batches
pub trait BatchSink {
    /// Persist one batch; may block on I/O
    fn append(&mut self, batch: &RecordBatch) -> Result<()>;

    /// Finalize the output
    fn close(&mut self) -> Result<()>;
}

impl<S: BatchSink + ?Sized> BatchSink for &mut S {
    fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        (**self).append(batch)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

impl<S: BatchSink + ?Sized> BatchSink for Box<S> {
    fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        (**self).append(batch)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
