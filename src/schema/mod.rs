//! Schema descriptors
//!
//! Immutable descriptions of the output columns, built once per run and
//! shared by reference with the row batches and encoders.
//!
//! # Layouts
//!
//! - `EntitySchema` - nodes, ways and relations in one table, optionally
//!   with the history `visible` column
//! - `ChangesetSchema` - the flat changeset table

mod changeset;
mod entity;

pub use changeset::{ChangesetColumn, ChangesetSchema};
pub use entity::{EntityColumn, EntitySchema};

use arrow::datatypes::{DataType, Field, FieldRef, Fields, TimeUnit};
use std::sync::Arc;

/// Timezone attached to every timestamp column
pub const TIMESTAMP_TZ: &str = "UTC";

/// Millisecond timestamps in UTC
pub fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(TIMESTAMP_TZ.into()))
}

/// Fields of one `tags` map entry
pub fn tag_entry_fields() -> Fields {
    Fields::from(vec![
        Field::new("keys", DataType::Utf8, false),
        Field::new("values", DataType::Utf8, true),
    ])
}

/// Entries field of the `tags` map column
pub fn tag_entries_field() -> FieldRef {
    Arc::new(Field::new(
        "entries",
        DataType::Struct(tag_entry_fields()),
        false,
    ))
}

/// `map<string, string>` type of the `tags` column
pub fn tags_type() -> DataType {
    DataType::Map(tag_entries_field(), false)
}

/// Fields of one `nds` element
pub fn node_ref_fields() -> Fields {
    Fields::from(vec![Field::new("ref", DataType::Int64, false)])
}

/// Item field of the `nds` list column
pub fn node_ref_item_field() -> FieldRef {
    Arc::new(Field::new(
        "item",
        DataType::Struct(node_ref_fields()),
        true,
    ))
}

/// Fields of one `members` element
pub fn member_fields() -> Fields {
    Fields::from(vec![
        Field::new("type", DataType::Utf8, false),
        Field::new("ref", DataType::Int64, false),
        Field::new("role", DataType::Utf8, false),
    ])
}

/// Item field of the `members` list column
pub fn member_item_field() -> FieldRef {
    Arc::new(Field::new("item", DataType::Struct(member_fields()), true))
}

#[cfg(test)]
mod tests;
