//! Row batches
//!
//! Fixed-capacity columnar buffers that the encoders fill one row at a time
//! and the flush controller hands to a sink as Arrow `RecordBatch`es.
//!
//! # Overview
//!
//! - `Column` / `DecimalColumn` - one slot per row for fixed-width values
//! - `ChildTable` - offset/length table plus a shared, growing child buffer
//!   for the `tags`, `nds` and `members` columns
//! - `RowBatch` - the entity batch, safe to fill from several threads
//! - `ChangesetBatch` - the single-writer changeset batch

mod changeset;
mod child;
mod column;
mod row_batch;

pub use changeset::{ChangesetBatch, ChangesetColumns};
pub use child::{
    ChildBuffer, ChildColumn, ChildRange, ChildTable, MemberEntries, NodeRefEntries, TagEntries,
};
pub use column::{Column, DecimalColumn};
pub use row_batch::{
    BatchFull, ChildCounts, EntityColumns, RowBatch, RowSlot, DEFAULT_BATCH_SIZE,
};

#[cfg(test)]
mod tests;
