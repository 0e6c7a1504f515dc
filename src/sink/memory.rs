//! In-memory sink

use super::BatchSink;
use crate::error::Result;
use arrow::record_batch::RecordBatch;

/// Sink that keeps every appended batch
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<RecordBatch>,
    closes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches in append order, empty ones included
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn into_batches(self) -> Vec<RecordBatch> {
        self.batches
    }

    pub fn total_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    /// Number of times `close` was called
    pub fn close_count(&self) -> usize {
        self.closes
    }

    pub fn is_closed(&self) -> bool {
        self.closes > 0
    }
}

impl BatchSink for MemorySink {
    fn append(&mut self, batch: &RecordBatch) -> Result<()> {
        self.batches.push(batch.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        Ok(())
    }
}
