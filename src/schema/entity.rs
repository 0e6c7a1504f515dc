//! Entity table schema

use super::{member_item_field, node_ref_item_field, tags_type, timestamp_type};
use crate::decimal::{COORDINATE_SCALE, LAT_PRECISION, LON_PRECISION};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::fmt;
use std::sync::Arc;

/// A column of the entity table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityColumn {
    Id,
    Type,
    Tags,
    Lat,
    Lon,
    Nds,
    Members,
    Changeset,
    Timestamp,
    Uid,
    User,
    Version,
    Visible,
}

impl EntityColumn {
    /// Columns of the standard (non-history) layout, in order
    pub const STANDARD: [EntityColumn; 12] = [
        EntityColumn::Id,
        EntityColumn::Type,
        EntityColumn::Tags,
        EntityColumn::Lat,
        EntityColumn::Lon,
        EntityColumn::Nds,
        EntityColumn::Members,
        EntityColumn::Changeset,
        EntityColumn::Timestamp,
        EntityColumn::Uid,
        EntityColumn::User,
        EntityColumn::Version,
    ];

    /// Columns of the history layout, in order
    pub const HISTORY: [EntityColumn; 13] = [
        EntityColumn::Id,
        EntityColumn::Type,
        EntityColumn::Tags,
        EntityColumn::Lat,
        EntityColumn::Lon,
        EntityColumn::Nds,
        EntityColumn::Members,
        EntityColumn::Changeset,
        EntityColumn::Timestamp,
        EntityColumn::Uid,
        EntityColumn::User,
        EntityColumn::Version,
        EntityColumn::Visible,
    ];

    /// Column name in the output file
    pub fn name(self) -> &'static str {
        match self {
            EntityColumn::Id => "id",
            EntityColumn::Type => "type",
            EntityColumn::Tags => "tags",
            EntityColumn::Lat => "lat",
            EntityColumn::Lon => "lon",
            EntityColumn::Nds => "nds",
            EntityColumn::Members => "members",
            EntityColumn::Changeset => "changeset",
            EntityColumn::Timestamp => "timestamp",
            EntityColumn::Uid => "uid",
            EntityColumn::User => "user",
            EntityColumn::Version => "version",
            EntityColumn::Visible => "visible",
        }
    }

    /// Arrow type of the column
    pub fn data_type(self) -> DataType {
        match self {
            EntityColumn::Id
            | EntityColumn::Changeset
            | EntityColumn::Uid
            | EntityColumn::Version => DataType::Int64,
            EntityColumn::Type | EntityColumn::User => DataType::Utf8,
            EntityColumn::Tags => tags_type(),
            EntityColumn::Lat => DataType::Decimal128(LAT_PRECISION, COORDINATE_SCALE),
            EntityColumn::Lon => DataType::Decimal128(LON_PRECISION, COORDINATE_SCALE),
            EntityColumn::Nds => DataType::List(node_ref_item_field()),
            EntityColumn::Members => DataType::List(member_item_field()),
            EntityColumn::Timestamp => timestamp_type(),
            EntityColumn::Visible => DataType::Boolean,
        }
    }

    /// Whether the column may hold nulls
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            EntityColumn::Lat
                | EntityColumn::Lon
                | EntityColumn::Timestamp
                | EntityColumn::Uid
                | EntityColumn::User
        )
    }

    /// Arrow field of the column
    pub fn field(self) -> Field {
        Field::new(self.name(), self.data_type(), self.is_nullable())
    }
}

impl fmt::Display for EntityColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema of the entity table
///
/// The layout is fixed at construction; clones share the same Arrow schema.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    history: bool,
    arrow: SchemaRef,
}

impl EntitySchema {
    /// Create the standard or history layout
    pub fn new(history: bool) -> Self {
        let columns: &[EntityColumn] = if history {
            &EntityColumn::HISTORY
        } else {
            &EntityColumn::STANDARD
        };
        let fields: Vec<Field> = columns.iter().map(|c| c.field()).collect();

        Self {
            history,
            arrow: Arc::new(Schema::new(fields)),
        }
    }

    /// Layout without the `visible` column
    pub fn standard() -> Self {
        Self::new(false)
    }

    /// Layout with the `visible` column
    pub fn history() -> Self {
        Self::new(true)
    }

    /// Whether this is the history layout
    pub fn is_history(&self) -> bool {
        self.history
    }

    /// Ordered columns of this layout
    pub fn columns(&self) -> &'static [EntityColumn] {
        if self.history {
            &EntityColumn::HISTORY
        } else {
            &EntityColumn::STANDARD
        }
    }

    /// Position of a column, if present in this layout
    pub fn index_of(&self, column: EntityColumn) -> Option<usize> {
        self.columns().iter().position(|c| *c == column)
    }

    /// The Arrow schema
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.arrow)
    }
}

impl Default for EntitySchema {
    fn default() -> Self {
        Self::standard()
    }
}
