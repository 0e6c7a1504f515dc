//! Entity row batch
//!
//! # Locking
//!
//! The batch owns one named lock per concern:
//!
//! - `rows` - the row counter. Allocating a row and reserving its ranges in
//!   every child table happen while this lock is held, so a row never
//!   exists without its child reservations.
//! - `scalars` - the fixed-width columns.
//! - `tags`, `nds`, `members` - one per child table, so rows of different
//!   entity types populate their children independently.
//!
//! Locks are always taken in the order `rows` → column locks. A reserved
//! range belongs to the allocating writer until the next `reset`. Callers
//! must keep `reset` and `to_record_batch` from running while allocated
//! rows are still being populated; `EntityEncoder` does this with its
//! writer gate.

use super::child::{ChildColumn, ChildRange, ChildTable, MemberEntries, NodeRefEntries, TagEntries};
use super::column::{Column, DecimalColumn};
use crate::decimal::{COORDINATE_SCALE, LAT_PRECISION, LON_PRECISION};
use crate::error::Result;
use crate::schema::{EntityColumn, EntitySchema};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

/// Default number of rows per batch
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Signal that the batch has no free row; flush before allocating again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("row batch is full")]
pub struct BatchFull;

/// Children a row will write, per child column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildCounts {
    pub tags: usize,
    pub nds: usize,
    pub members: usize,
}

/// An allocated row with its reserved child ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSlot {
    pub row: usize,
    pub tags: ChildRange,
    pub nds: ChildRange,
    pub members: ChildRange,
}

/// Fixed-width columns of the entity table
#[derive(Debug)]
pub struct EntityColumns {
    pub id: Column<i64>,
    pub entity_type: Column<&'static str>,
    pub lat: DecimalColumn,
    pub lon: DecimalColumn,
    pub changeset: Column<i64>,
    /// Milliseconds since the epoch, UTC
    pub timestamp: Column<i64>,
    pub uid: Column<i64>,
    pub user: Column<String>,
    pub version: Column<i64>,
    pub visible: Column<bool>,
}

impl EntityColumns {
    fn new(capacity: usize) -> Self {
        Self {
            id: Column::new(capacity),
            entity_type: Column::new(capacity),
            lat: DecimalColumn::new(capacity, LAT_PRECISION, COORDINATE_SCALE),
            lon: DecimalColumn::new(capacity, LON_PRECISION, COORDINATE_SCALE),
            changeset: Column::new(capacity),
            timestamp: Column::new(capacity),
            uid: Column::new(capacity),
            user: Column::new(capacity),
            version: Column::new(capacity),
            visible: Column::new(capacity),
        }
    }
}

/// Fixed-capacity columnar buffer for entity rows
#[derive(Debug)]
pub struct RowBatch {
    schema: EntitySchema,
    capacity: usize,
    rows: Mutex<usize>,
    scalars: Mutex<EntityColumns>,
    tags: Mutex<ChildTable<TagEntries>>,
    nds: Mutex<ChildTable<NodeRefEntries>>,
    members: Mutex<ChildTable<MemberEntries>>,
}

impl RowBatch {
    /// Create a batch of `capacity` rows for `schema`
    pub fn new(schema: EntitySchema, capacity: usize) -> Self {
        assert!(capacity > 0, "row batch capacity must be positive");
        Self {
            schema,
            capacity,
            rows: Mutex::new(0),
            scalars: Mutex::new(EntityColumns::new(capacity)),
            tags: Mutex::new(ChildTable::new(capacity)),
            nds: Mutex::new(ChildTable::new(capacity)),
            members: Mutex::new(ChildTable::new(capacity)),
        }
    }

    pub fn schema(&self) -> &EntitySchema {
        &self.schema
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of allocated rows
    pub fn len(&self) -> usize {
        *self.rows.lock()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Allocate the next row and reserve its child ranges
    ///
    /// Every child column gets a range, empty ones included, so each row's
    /// offset is defined. Never flushes; on `BatchFull` the caller flushes
    /// and retries.
    pub fn try_allocate_row(&self, counts: ChildCounts) -> std::result::Result<RowSlot, BatchFull> {
        let mut size = self.rows.lock();
        if *size >= self.capacity {
            return Err(BatchFull);
        }
        let row = *size;
        *size += 1;

        let tags = self.tags.lock().reserve(row, counts.tags);
        let nds = self.nds.lock().reserve(row, counts.nds);
        let members = self.members.lock().reserve(row, counts.members);

        Ok(RowSlot {
            row,
            tags,
            nds,
            members,
        })
    }

    /// Ensure a child buffer can take `additional` more entries
    pub fn grow_child_buffer(&self, column: ChildColumn, additional: usize) {
        let _rows = self.rows.lock();
        match column {
            ChildColumn::Tags => self.tags.lock().grow(additional),
            ChildColumn::Nds => self.nds.lock().grow(additional),
            ChildColumn::Members => self.members.lock().grow(additional),
        }
    }

    /// Zero the row and child counters; storage is kept for reuse
    pub fn reset(&self) {
        let mut size = self.rows.lock();
        *size = 0;
        self.tags.lock().reset();
        self.nds.lock().reset();
        self.members.lock().reset();
    }

    /// Reserved entries in a child column
    pub fn child_count(&self, column: ChildColumn) -> usize {
        match column {
            ChildColumn::Tags => self.tags.lock().child_count(),
            ChildColumn::Nds => self.nds.lock().child_count(),
            ChildColumn::Members => self.members.lock().child_count(),
        }
    }

    /// Range reserved for `row` in a child column
    pub fn child_range(&self, column: ChildColumn, row: usize) -> ChildRange {
        match column {
            ChildColumn::Tags => self.tags.lock().range(row),
            ChildColumn::Nds => self.nds.lock().range(row),
            ChildColumn::Members => self.members.lock().range(row),
        }
    }

    /// Fixed-width columns
    pub fn scalars(&self) -> MutexGuard<'_, EntityColumns> {
        self.scalars.lock()
    }

    /// `tags` child table
    pub fn tags(&self) -> MutexGuard<'_, ChildTable<TagEntries>> {
        self.tags.lock()
    }

    /// `nds` child table
    pub fn nds(&self) -> MutexGuard<'_, ChildTable<NodeRefEntries>> {
        self.nds.lock()
    }

    /// `members` child table
    pub fn members(&self) -> MutexGuard<'_, ChildTable<MemberEntries>> {
        self.members.lock()
    }

    /// Convert the allocated rows into an Arrow batch
    ///
    /// Does not reset the batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let size = self.rows.lock();
        let len = *size;

        let scalars = self.scalars.lock();
        let tags = self.tags.lock().to_map_array(len)?;
        let nds = self.nds.lock().to_list_array(len)?;
        let members = self.members.lock().to_list_array(len)?;

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(self.schema.columns().len());
        for column in self.schema.columns() {
            let array = match column {
                EntityColumn::Id => scalars.id.to_int64_array(len),
                EntityColumn::Type => scalars.entity_type.to_string_array(len),
                EntityColumn::Tags => tags.clone(),
                EntityColumn::Lat => scalars.lat.to_array(len)?,
                EntityColumn::Lon => scalars.lon.to_array(len)?,
                EntityColumn::Nds => nds.clone(),
                EntityColumn::Members => members.clone(),
                EntityColumn::Changeset => scalars.changeset.to_int64_array(len),
                EntityColumn::Timestamp => scalars.timestamp.to_timestamp_array(len),
                EntityColumn::Uid => scalars.uid.to_int64_array(len),
                EntityColumn::User => scalars.user.to_string_array(len),
                EntityColumn::Version => scalars.version.to_int64_array(len),
                EntityColumn::Visible => scalars.visible.to_boolean_array(len),
            };
            columns.push(array);
        }

        Ok(RecordBatch::try_new(self.schema.arrow_schema(), columns)?)
    }
}
