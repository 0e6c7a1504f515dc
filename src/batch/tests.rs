//! Tests for row batches

use super::*;
use crate::schema::{ChangesetSchema, EntitySchema};
use arrow::array::{Array, AsArray, Decimal128Array, Int64Array, StringArray};
use arrow::datatypes::Int64Type;
use pretty_assertions::assert_eq;

fn counts(tags: usize, nds: usize, members: usize) -> ChildCounts {
    ChildCounts {
        tags,
        nds,
        members,
    }
}

/// Populate the non-nullable scalar columns of `row`
fn fill_required(batch: &RowBatch, row: usize, id: i64) {
    let mut scalars = batch.scalars();
    scalars.id.set(row, id);
    scalars.entity_type.set(row, "node");
    scalars.changeset.set(row, 1);
    scalars.version.set(row, 1);
    scalars.visible.set(row, true);
}

// ============================================================================
// Column Tests
// ============================================================================

#[test]
fn test_column_set_and_null() {
    let mut column: Column<i64> = Column::new(4);
    assert_eq!(column.capacity(), 4);
    assert!(column.is_null(0));

    column.set(0, 42);
    column.set_opt(1, None);
    assert_eq!(column.get(0), Some(&42));
    assert!(column.is_null(1));

    column.set_null(0);
    assert!(column.is_null(0));
}

#[test]
fn test_string_column_reuses_slot() {
    let mut column: Column<String> = Column::new(2);
    column.set_str(0, "a rather long editor name");
    column.set_str(0, "bob");
    column.set_opt_str(1, None);

    let array = column.to_string_array(2);
    let strings = array.as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(strings.value(0), "bob");
    assert!(strings.is_null(1));
}

#[test]
fn test_decimal_column_precision() {
    let mut lat = DecimalColumn::new(2, 9, 7);
    lat.set(0, 471_234_567);
    lat.set_null(1);

    let array = lat.to_array(2).unwrap();
    let decimals = array.as_any().downcast_ref::<Decimal128Array>().unwrap();
    assert_eq!(decimals.value(0), 471_234_567);
    assert_eq!(decimals.value_as_string(0), "47.1234567");
    assert!(decimals.is_null(1));

    // 1000 degrees does not fit in precision 9
    let mut overflow = DecimalColumn::new(1, 9, 7);
    overflow.set(0, 10_000_000_000);
    assert!(overflow.to_array(1).is_err());
}

// ============================================================================
// Child Table Tests
// ============================================================================

#[test]
fn test_child_table_reserve_tiles_ranges() {
    let mut table: ChildTable<NodeRefEntries> = ChildTable::new(3);

    let a = table.reserve(0, 2);
    let b = table.reserve(1, 0);
    let c = table.reserve(2, 3);

    assert_eq!(a, ChildRange { offset: 0, len: 2 });
    assert_eq!(b, ChildRange { offset: 2, len: 0 });
    assert_eq!(c, ChildRange { offset: 2, len: 3 });
    assert_eq!(table.child_count(), 5);
    assert_eq!(c.end(), table.child_count());

    let offsets = table.offset_buffer(3).unwrap();
    assert_eq!(offsets.iter().copied().collect::<Vec<i32>>(), vec![0, 2, 2, 5]);
}

#[test]
fn test_child_table_grow_never_shrinks() {
    let mut table: ChildTable<TagEntries> = ChildTable::new(2);
    table.grow(10);
    assert_eq!(table.buffer().allocated(), 10);

    // Doubling covers a small request
    table.reserve(0, 10);
    table.grow(1);
    assert_eq!(table.buffer().allocated(), 20);

    // Extending covers a large one
    table.grow(100);
    assert_eq!(table.buffer().allocated(), 110);

    table.reset();
    assert_eq!(table.child_count(), 0);
    assert_eq!(table.buffer().allocated(), 110);
}

#[test]
fn test_child_table_detects_gap() {
    let mut table: ChildTable<NodeRefEntries> = ChildTable::new(2);
    table.reserve(0, 2);
    table.reserve(1, 1);

    // Only the first row is live: the second row's child is unaccounted for
    let err = table.offset_buffer(1).unwrap_err();
    assert!(matches!(err, crate::Error::BatchInvariant { .. }));
}

// ============================================================================
// Row Batch Tests
// ============================================================================

#[test]
fn test_allocate_until_full() {
    let batch = RowBatch::new(EntitySchema::standard(), 2);

    assert_eq!(batch.try_allocate_row(counts(0, 0, 0)).unwrap().row, 0);
    assert_eq!(batch.try_allocate_row(counts(0, 0, 0)).unwrap().row, 1);
    assert!(batch.is_full());
    assert_eq!(batch.try_allocate_row(counts(0, 0, 0)), Err(BatchFull));
    assert_eq!(batch.len(), 2);
}

#[test]
fn test_allocate_reserves_every_child_column() {
    let batch = RowBatch::new(EntitySchema::standard(), 4);

    let first = batch.try_allocate_row(counts(2, 3, 0)).unwrap();
    let second = batch.try_allocate_row(counts(1, 0, 4)).unwrap();

    assert_eq!(first.tags, ChildRange { offset: 0, len: 2 });
    assert_eq!(first.nds, ChildRange { offset: 0, len: 3 });
    assert_eq!(first.members, ChildRange { offset: 0, len: 0 });

    assert_eq!(second.tags, ChildRange { offset: 2, len: 1 });
    assert_eq!(second.nds, ChildRange { offset: 3, len: 0 });
    assert_eq!(second.members, ChildRange { offset: 0, len: 4 });

    assert_eq!(batch.child_count(ChildColumn::Tags), 3);
    assert_eq!(batch.child_count(ChildColumn::Nds), 3);
    assert_eq!(batch.child_count(ChildColumn::Members), 4);
    assert_eq!(batch.child_range(ChildColumn::Members, 1), second.members);
}

#[test]
fn test_reset_keeps_storage() {
    let batch = RowBatch::new(EntitySchema::standard(), 2);
    batch.try_allocate_row(counts(5, 0, 0)).unwrap();
    batch.try_allocate_row(counts(0, 7, 0)).unwrap();

    batch.reset();

    assert_eq!(batch.len(), 0);
    assert_eq!(batch.child_count(ChildColumn::Tags), 0);
    assert_eq!(batch.child_count(ChildColumn::Nds), 0);
    assert!(batch.tags().buffer().allocated() >= 5);
    assert!(batch.nds().buffer().allocated() >= 7);
    assert_eq!(batch.try_allocate_row(counts(0, 0, 0)).unwrap().row, 0);
}

#[test]
fn test_grow_child_buffer() {
    let batch = RowBatch::new(EntitySchema::standard(), 1);
    batch.grow_child_buffer(ChildColumn::Members, 16);
    assert_eq!(batch.members().buffer().allocated(), 16);
    assert_eq!(batch.child_count(ChildColumn::Members), 0);
}

#[test]
fn test_empty_batch_converts() {
    let batch = RowBatch::new(EntitySchema::history(), 8);
    let record_batch = batch.to_record_batch().unwrap();
    assert_eq!(record_batch.num_rows(), 0);
    assert_eq!(record_batch.num_columns(), 13);
}

#[test]
fn test_to_record_batch_children() {
    let batch = RowBatch::new(EntitySchema::standard(), 4);

    let slot = batch.try_allocate_row(counts(1, 2, 0)).unwrap();
    fill_required(&batch, slot.row, 10);
    batch.tags().buffer_mut().set(slot.tags.offset, "name", "Main St");
    {
        let mut nds = batch.nds();
        nds.buffer_mut().set(slot.nds.offset, 100);
        nds.buffer_mut().set(slot.nds.offset + 1, 101);
    }

    let slot = batch.try_allocate_row(counts(0, 0, 1)).unwrap();
    fill_required(&batch, slot.row, 11);
    batch
        .members()
        .buffer_mut()
        .set(slot.members.offset, "way", 10, "outer");

    let record_batch = batch.to_record_batch().unwrap();
    assert_eq!(record_batch.num_rows(), 2);

    let ids = record_batch
        .column(0)
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(ids.values().to_vec(), vec![10, 11]);

    let tags = record_batch.column(2).as_map();
    assert_eq!(tags.value_offsets(), &[0, 1, 1]);
    assert_eq!(tags.keys().as_string::<i32>().value(0), "name");
    assert_eq!(tags.values().as_string::<i32>().value(0), "Main St");

    let nds = record_batch.column(5).as_list::<i32>();
    assert_eq!(nds.value_offsets(), &[0, 2, 2]);
    let refs = nds.values().as_struct().column(0).as_primitive::<Int64Type>();
    assert_eq!(refs.values().to_vec(), vec![100, 101]);

    let members = record_batch.column(6).as_list::<i32>();
    assert_eq!(members.value_offsets(), &[0, 0, 1]);
    let member = members.values().as_struct();
    assert_eq!(member.column(0).as_string::<i32>().value(0), "way");
    assert_eq!(member.column(2).as_string::<i32>().value(0), "outer");

    // Coordinates were never set and come back null
    assert_eq!(record_batch.column(3).null_count(), 2);
}

// ============================================================================
// Changeset Batch Tests
// ============================================================================

#[test]
fn test_changeset_batch_allocate_and_reset() {
    let mut batch = ChangesetBatch::new(ChangesetSchema::new(), 2);

    let (row, range) = batch.try_allocate_row(2).unwrap();
    assert_eq!(row, 0);
    assert_eq!(range, ChildRange { offset: 0, len: 2 });

    let (row, range) = batch.try_allocate_row(1).unwrap();
    assert_eq!(row, 1);
    assert_eq!(range.offset, 2);

    assert!(batch.is_full());
    assert_eq!(batch.try_allocate_row(0), Err(BatchFull));

    batch.reset();
    assert!(batch.is_empty());
    assert_eq!(batch.tags().child_count(), 0);
}
