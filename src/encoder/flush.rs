//! Batch hand-off to the sink

use crate::error::Result;
use crate::sink::BatchSink;
use arrow::record_batch::RecordBatch;
use tracing::debug;

/// Appends completed batches to a sink and counts what went out
#[derive(Debug)]
pub struct FlushController<S> {
    sink: S,
    batches: u64,
    rows: u64,
    closed: bool,
}

impl<S: BatchSink> FlushController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            batches: 0,
            rows: 0,
            closed: false,
        }
    }

    /// Append one batch
    pub fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        self.sink.append(batch)?;
        self.batches += 1;
        self.rows += batch.num_rows() as u64;
        debug!(
            batch = self.batches,
            rows = batch.num_rows(),
            total_rows = self.rows,
            "Flushed row batch"
        );
        Ok(())
    }

    /// Close the sink
    pub fn close(&mut self) -> Result<()> {
        self.sink.close()?;
        self.closed = true;
        Ok(())
    }

    pub fn batches_appended(&self) -> u64 {
        self.batches
    }

    pub fn rows_appended(&self) -> u64 {
        self.rows
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
