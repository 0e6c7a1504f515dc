//! Changeset row batch
//!
//! Changesets are encoded by a single writer, so this batch is owned
//! mutably instead of guarding its columns with locks.

use super::child::{ChildRange, ChildTable, TagEntries};
use super::column::{Column, DecimalColumn};
use super::row_batch::BatchFull;
use crate::decimal::{COORDINATE_SCALE, LAT_PRECISION, LON_PRECISION};
use crate::error::Result;
use crate::schema::{ChangesetColumn, ChangesetSchema};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;

/// Fixed-width columns of the changeset table
#[derive(Debug)]
pub struct ChangesetColumns {
    pub id: Column<i64>,
    pub created_at: Column<i64>,
    pub closed_at: Column<i64>,
    pub open: Column<bool>,
    pub num_changes: Column<i64>,
    pub user: Column<String>,
    pub uid: Column<i64>,
    pub min_lat: DecimalColumn,
    pub max_lat: DecimalColumn,
    pub min_lon: DecimalColumn,
    pub max_lon: DecimalColumn,
    pub comments_count: Column<i64>,
}

impl ChangesetColumns {
    fn new(capacity: usize) -> Self {
        Self {
            id: Column::new(capacity),
            created_at: Column::new(capacity),
            closed_at: Column::new(capacity),
            open: Column::new(capacity),
            num_changes: Column::new(capacity),
            user: Column::new(capacity),
            uid: Column::new(capacity),
            min_lat: DecimalColumn::new(capacity, LAT_PRECISION, COORDINATE_SCALE),
            max_lat: DecimalColumn::new(capacity, LAT_PRECISION, COORDINATE_SCALE),
            min_lon: DecimalColumn::new(capacity, LON_PRECISION, COORDINATE_SCALE),
            max_lon: DecimalColumn::new(capacity, LON_PRECISION, COORDINATE_SCALE),
            comments_count: Column::new(capacity),
        }
    }
}

/// Fixed-capacity columnar buffer for changeset rows
#[derive(Debug)]
pub struct ChangesetBatch {
    schema: ChangesetSchema,
    capacity: usize,
    size: usize,
    columns: ChangesetColumns,
    tags: ChildTable<TagEntries>,
}

impl ChangesetBatch {
    pub fn new(schema: ChangesetSchema, capacity: usize) -> Self {
        assert!(capacity > 0, "row batch capacity must be positive");
        Self {
            schema,
            capacity,
            size: 0,
            columns: ChangesetColumns::new(capacity),
            tags: ChildTable::new(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn is_full(&self) -> bool {
        self.size >= self.capacity
    }

    /// Allocate the next row and reserve `tag_count` tag entries for it
    pub fn try_allocate_row(
        &mut self,
        tag_count: usize,
    ) -> std::result::Result<(usize, ChildRange), BatchFull> {
        if self.is_full() {
            return Err(BatchFull);
        }
        let row = self.size;
        self.size += 1;
        Ok((row, self.tags.reserve(row, tag_count)))
    }

    pub fn columns(&self) -> &ChangesetColumns {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut ChangesetColumns {
        &mut self.columns
    }

    pub fn tags(&self) -> &ChildTable<TagEntries> {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut ChildTable<TagEntries> {
        &mut self.tags
    }

    pub fn reset(&mut self) {
        self.size = 0;
        self.tags.reset();
    }

    /// Convert the allocated rows into an Arrow batch
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let len = self.size;
        let c = &self.columns;

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.schema.columns().len());
        for column in self.schema.columns() {
            let array = match column {
                ChangesetColumn::Id => c.id.to_int64_array(len),
                ChangesetColumn::CreatedAt => c.created_at.to_timestamp_array(len),
                ChangesetColumn::ClosedAt => c.closed_at.to_timestamp_array(len),
                ChangesetColumn::Open => c.open.to_boolean_array(len),
                ChangesetColumn::NumChanges => c.num_changes.to_int64_array(len),
                ChangesetColumn::User => c.user.to_string_array(len),
                ChangesetColumn::Uid => c.uid.to_int64_array(len),
                ChangesetColumn::MinLat => c.min_lat.to_array(len)?,
                ChangesetColumn::MaxLat => c.max_lat.to_array(len)?,
                ChangesetColumn::MinLon => c.min_lon.to_array(len)?,
                ChangesetColumn::MaxLon => c.max_lon.to_array(len)?,
                ChangesetColumn::CommentsCount => c.comments_count.to_int64_array(len),
                ChangesetColumn::Tags => self.tags.to_map_array(len)?,
            };
            arrays.push(array);
        }

        Ok(RecordBatch::try_new(self.schema.arrow_schema(), arrays)?)
    }
}
