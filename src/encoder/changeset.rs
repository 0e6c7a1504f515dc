//! Changeset encoder

use super::{EncodeStats, FlushController};
use crate::batch::ChangesetBatch;
use crate::decimal::{Axis, Coordinate};
use crate::error::{Error, Result};
use crate::schema::ChangesetSchema;
use crate::sink::BatchSink;
use crate::types::Changeset;
use tracing::debug;

/// Encodes changesets into a row batch on a single thread
pub struct ChangesetEncoder<S> {
    batch: ChangesetBatch,
    flush: FlushController<S>,
    encoded: u64,
}

impl<S: BatchSink> ChangesetEncoder<S> {
    pub fn new(sink: S, capacity: usize) -> Self {
        Self {
            batch: ChangesetBatch::new(ChangesetSchema::new(), capacity),
            flush: FlushController::new(sink),
            encoded: 0,
        }
    }

    /// Encode one changeset as a row; the row that fills the batch flushes it
    pub fn encode(&mut self, changeset: &Changeset) -> Result<()> {
        check_bounds(changeset)?;
        self.flush_if_needed()?;
        let (row, tags) = self
            .batch
            .try_allocate_row(changeset.tags.len())
            .map_err(|e| Error::invariant(format!("{e} right after flushing")))?;

        let c = self.batch.columns_mut();
        c.id.set(row, changeset.id);
        c.created_at
            .set_opt(row, changeset.created_at.map(|t| t.timestamp_millis()));
        c.closed_at
            .set_opt(row, changeset.closed_at.map(|t| t.timestamp_millis()));
        c.open.set(row, changeset.open);
        c.num_changes.set(row, changeset.num_changes);
        c.user.set_opt_str(row, changeset.user.as_deref());
        c.uid.set_opt(row, changeset.uid);
        c.min_lat
            .set_opt(row, changeset.min_lat.map(|v| v.to_decimal128()));
        c.max_lat
            .set_opt(row, changeset.max_lat.map(|v| v.to_decimal128()));
        c.min_lon
            .set_opt(row, changeset.min_lon.map(|v| v.to_decimal128()));
        c.max_lon
            .set_opt(row, changeset.max_lon.map(|v| v.to_decimal128()));
        c.comments_count.set(row, changeset.comments_count);

        let entries = self.batch.tags_mut().buffer_mut();
        for (index, (key, value)) in tags.indices().zip(&changeset.tags) {
            entries.set(index, key, value);
        }

        self.encoded += 1;
        self.flush_if_needed()?;
        Ok(())
    }

    /// Encode every record of a source
    pub fn encode_all<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Changeset>>,
    {
        for record in records {
            self.encode(&record?)?;
        }
        Ok(())
    }

    /// Append and reset the batch if it is full
    pub fn flush_if_needed(&mut self) -> Result<bool> {
        if !self.batch.is_full() {
            return Ok(false);
        }
        self.flush_batch()?;
        Ok(true)
    }

    /// Append whatever rows remain, even none, and close the sink
    pub fn finish(&mut self) -> Result<EncodeStats> {
        self.flush_batch()?;
        self.flush.close()?;
        let stats = self.stats();
        debug!(
            rows = stats.rows,
            batches = stats.batches,
            "Changeset encoder finished"
        );
        Ok(stats)
    }

    pub fn stats(&self) -> EncodeStats {
        EncodeStats {
            changesets: self.encoded,
            batches: self.flush.batches_appended(),
            rows: self.flush.rows_appended(),
            ..EncodeStats::default()
        }
    }

    pub fn batch(&self) -> &ChangesetBatch {
        &self.batch
    }

    pub fn into_sink(self) -> S {
        self.flush.into_sink()
    }

    fn flush_batch(&mut self) -> Result<()> {
        let record_batch = self.batch.to_record_batch()?;
        self.flush.append(&record_batch)?;
        self.batch.reset();
        Ok(())
    }
}

/// Reject a bounding box the decimal columns cannot hold
fn check_bounds(changeset: &Changeset) -> Result<()> {
    let corners: [(&str, Option<Coordinate>, Axis); 4] = [
        ("min_lat", changeset.min_lat, Axis::Latitude),
        ("max_lat", changeset.max_lat, Axis::Latitude),
        ("min_lon", changeset.min_lon, Axis::Longitude),
        ("max_lon", changeset.max_lon, Axis::Longitude),
    ];
    for (name, value, axis) in corners {
        if let Some(value) = value.filter(|v| !v.is_within(axis)) {
            return Err(Error::decode(format!(
                "Changeset {} has {name} {value} outside of ±{}",
                changeset.id,
                axis.limit_degrees()
            )));
        }
    }
    Ok(())
}
