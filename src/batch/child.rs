//! Variable-cardinality children
//!
//! A `ChildTable` locates each row's children inside one flat buffer shared
//! by all rows of the batch: row `r` owns entries
//! `[offsets[r], offsets[r] + lengths[r])`. Ranges are handed out in row
//! order, so across the live rows they tile `[0, child_count)` exactly.

use crate::error::{Error, Result};
use crate::schema::{
    member_fields, member_item_field, node_ref_fields, node_ref_item_field, tag_entries_field,
    tag_entry_fields,
};
use arrow::array::{ArrayRef, Int64Array, ListArray, MapArray, StringArray, StructArray};
use arrow::buffer::OffsetBuffer;
use std::ops::Range;
use std::sync::Arc;

/// Identifies one of the variable-cardinality columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildColumn {
    Tags,
    Nds,
    Members,
}

/// A row's reserved range in a child buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChildRange {
    pub offset: usize,
    pub len: usize,
}

impl ChildRange {
    /// One past the last reserved entry
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn indices(&self) -> Range<usize> {
        self.offset..self.end()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Flat storage behind a list- or map-typed column
pub trait ChildBuffer: Default {
    /// Number of allocated entries
    fn allocated(&self) -> usize;

    /// Grow to `len` allocated entries
    fn resize(&mut self, len: usize);
}

/// Offset/length bookkeeping plus the child buffer it indexes
#[derive(Debug)]
pub struct ChildTable<B> {
    offsets: Vec<usize>,
    lengths: Vec<usize>,
    child_count: usize,
    buffer: B,
}

impl<B: ChildBuffer> ChildTable<B> {
    /// Create a table for `rows` row slots
    pub fn new(rows: usize) -> Self {
        Self {
            offsets: vec![0; rows],
            lengths: vec![0; rows],
            child_count: 0,
            buffer: B::default(),
        }
    }

    /// High-water mark of reserved entries
    pub fn child_count(&self) -> usize {
        self.child_count
    }

    /// Make room for `additional` entries past `child_count`
    ///
    /// Doubles the allocation when that is enough, otherwise extends it to
    /// the exact size needed. Never shrinks.
    pub fn grow(&mut self, additional: usize) {
        let needed = self.child_count + additional;
        let allocated = self.buffer.allocated();
        if needed > allocated {
            self.buffer.resize(needed.max(allocated * 2));
        }
    }

    /// Reserve `count` entries for `row` at the current end
    pub fn reserve(&mut self, row: usize, count: usize) -> ChildRange {
        self.grow(count);
        let offset = self.child_count;
        self.offsets[row] = offset;
        self.lengths[row] = count;
        self.child_count += count;
        ChildRange { offset, len: count }
    }

    /// Range previously reserved for `row`
    pub fn range(&self, row: usize) -> ChildRange {
        ChildRange {
            offset: self.offsets[row],
            len: self.lengths[row],
        }
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut B {
        &mut self.buffer
    }

    /// Forget all reservations, keeping the allocation
    pub fn reset(&mut self) {
        self.child_count = 0;
    }

    /// Arrow offsets for the first `rows` rows
    ///
    /// Fails if the ranges leave a gap, overlap, or do not end at
    /// `child_count`.
    pub fn offset_buffer(&self, rows: usize) -> Result<OffsetBuffer<i32>> {
        let mut offsets = Vec::with_capacity(rows + 1);
        let mut expected = 0usize;
        offsets.push(0i32);

        for row in 0..rows {
            if self.offsets[row] != expected {
                return Err(Error::invariant(format!(
                    "row {row} starts at child {} but the previous row ended at {expected}",
                    self.offsets[row]
                )));
            }
            expected += self.lengths[row];
            let end = i32::try_from(expected)
                .map_err(|_| Error::invariant("child buffer too large for i32 offsets"))?;
            offsets.push(end);
        }

        if expected != self.child_count {
            return Err(Error::invariant(format!(
                "rows cover {expected} children but {} are reserved",
                self.child_count
            )));
        }

        Ok(OffsetBuffer::new(offsets.into()))
    }
}

// ============================================================================
// Tags
// ============================================================================

/// Key/value entries of the `tags` map column
#[derive(Debug, Default)]
pub struct TagEntries {
    keys: Vec<String>,
    values: Vec<String>,
}

impl TagEntries {
    /// Write one entry, reusing the slot's previous allocations
    pub fn set(&mut self, index: usize, key: &str, value: &str) {
        let k = &mut self.keys[index];
        k.clear();
        k.push_str(key);
        let v = &mut self.values[index];
        v.clear();
        v.push_str(value);
    }

    pub fn key(&self, index: usize) -> &str {
        &self.keys[index]
    }

    pub fn value(&self, index: usize) -> &str {
        &self.values[index]
    }
}

impl ChildBuffer for TagEntries {
    fn allocated(&self) -> usize {
        self.keys.len()
    }

    fn resize(&mut self, len: usize) {
        self.keys.resize_with(len, String::new);
        self.values.resize_with(len, String::new);
    }
}

impl ChildTable<TagEntries> {
    /// Build the `map<string, string>` array for the first `rows` rows
    pub fn to_map_array(&self, rows: usize) -> Result<ArrayRef> {
        let offsets = self.offset_buffer(rows)?;
        let count = self.child_count;
        let keys: StringArray = self.buffer.keys[..count].iter().map(Some).collect();
        let values: StringArray = self.buffer.values[..count].iter().map(Some).collect();

        let entries = StructArray::try_new(
            tag_entry_fields(),
            vec![Arc::new(keys) as ArrayRef, Arc::new(values) as ArrayRef],
            None,
        )?;
        let map = MapArray::try_new(tag_entries_field(), offsets, entries, None, false)?;
        Ok(Arc::new(map))
    }
}

// ============================================================================
// Node references
// ============================================================================

/// Entries of the `nds` list column
#[derive(Debug, Default)]
pub struct NodeRefEntries {
    refs: Vec<i64>,
}

impl NodeRefEntries {
    pub fn set(&mut self, index: usize, node_ref: i64) {
        self.refs[index] = node_ref;
    }

    pub fn get(&self, index: usize) -> i64 {
        self.refs[index]
    }
}

impl ChildBuffer for NodeRefEntries {
    fn allocated(&self) -> usize {
        self.refs.len()
    }

    fn resize(&mut self, len: usize) {
        self.refs.resize(len, 0);
    }
}

impl ChildTable<NodeRefEntries> {
    /// Build the `list<struct<ref>>` array for the first `rows` rows
    pub fn to_list_array(&self, rows: usize) -> Result<ArrayRef> {
        let offsets = self.offset_buffer(rows)?;
        let refs = Int64Array::from(self.buffer.refs[..self.child_count].to_vec());

        let items = StructArray::try_new(node_ref_fields(), vec![Arc::new(refs) as ArrayRef], None)?;
        let list = ListArray::try_new(node_ref_item_field(), offsets, Arc::new(items), None)?;
        Ok(Arc::new(list))
    }
}

// ============================================================================
// Members
// ============================================================================

/// Entries of the `members` list column
#[derive(Debug, Default)]
pub struct MemberEntries {
    types: Vec<&'static str>,
    refs: Vec<i64>,
    roles: Vec<String>,
}

impl MemberEntries {
    pub fn set(&mut self, index: usize, member_type: &'static str, member_ref: i64, role: &str) {
        self.types[index] = member_type;
        self.refs[index] = member_ref;
        let r = &mut self.roles[index];
        r.clear();
        r.push_str(role);
    }

    /// `(type, ref, role)` of one entry
    pub fn get(&self, index: usize) -> (&str, i64, &str) {
        (self.types[index], self.refs[index], &self.roles[index])
    }
}

impl ChildBuffer for MemberEntries {
    fn allocated(&self) -> usize {
        self.refs.len()
    }

    fn resize(&mut self, len: usize) {
        self.types.resize(len, "");
        self.refs.resize(len, 0);
        self.roles.resize_with(len, String::new);
    }
}

impl ChildTable<MemberEntries> {
    /// Build the `list<struct<type, ref, role>>` array for the first `rows` rows
    pub fn to_list_array(&self, rows: usize) -> Result<ArrayRef> {
        let offsets = self.offset_buffer(rows)?;
        let count = self.child_count;
        let types: StringArray = self.buffer.types[..count].iter().copied().map(Some).collect();
        let refs = Int64Array::from(self.buffer.refs[..count].to_vec());
        let roles: StringArray = self.buffer.roles[..count].iter().map(Some).collect();

        let items = StructArray::try_new(
            member_fields(),
            vec![
                Arc::new(types) as ArrayRef,
                Arc::new(refs) as ArrayRef,
                Arc::new(roles) as ArrayRef,
            ],
            None,
        )?;
        let list = ListArray::try_new(member_item_field(), offsets, Arc::new(items), None)?;
        Ok(Arc::new(list))
    }
}
