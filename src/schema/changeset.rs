//! Changeset table schema

use super::{tags_type, timestamp_type};
use crate::decimal::{COORDINATE_SCALE, LAT_PRECISION, LON_PRECISION};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use std::sync::Arc;

/// A column of the changeset table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangesetColumn {
    Id,
    CreatedAt,
    ClosedAt,
    Open,
    NumChanges,
    User,
    Uid,
    MinLat,
    MaxLat,
    MinLon,
    MaxLon,
    CommentsCount,
    Tags,
}

impl ChangesetColumn {
    /// All columns, in order
    pub const ALL: [ChangesetColumn; 13] = [
        ChangesetColumn::Id,
        ChangesetColumn::CreatedAt,
        ChangesetColumn::ClosedAt,
        ChangesetColumn::Open,
        ChangesetColumn::NumChanges,
        ChangesetColumn::User,
        ChangesetColumn::Uid,
        ChangesetColumn::MinLat,
        ChangesetColumn::MaxLat,
        ChangesetColumn::MinLon,
        ChangesetColumn::MaxLon,
        ChangesetColumn::CommentsCount,
        ChangesetColumn::Tags,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ChangesetColumn::Id => "id",
            ChangesetColumn::CreatedAt => "created_at",
            ChangesetColumn::ClosedAt => "closed_at",
            ChangesetColumn::Open => "open",
            ChangesetColumn::NumChanges => "num_changes",
            ChangesetColumn::User => "user",
            ChangesetColumn::Uid => "uid",
            ChangesetColumn::MinLat => "min_lat",
            ChangesetColumn::MaxLat => "max_lat",
            ChangesetColumn::MinLon => "min_lon",
            ChangesetColumn::MaxLon => "max_lon",
            ChangesetColumn::CommentsCount => "comments_count",
            ChangesetColumn::Tags => "tags",
        }
    }

    pub fn data_type(self) -> DataType {
        match self {
            ChangesetColumn::Id
            | ChangesetColumn::NumChanges
            | ChangesetColumn::Uid
            | ChangesetColumn::CommentsCount => DataType::Int64,
            ChangesetColumn::CreatedAt | ChangesetColumn::ClosedAt => timestamp_type(),
            ChangesetColumn::Open => DataType::Boolean,
            ChangesetColumn::User => DataType::Utf8,
            ChangesetColumn::MinLat | ChangesetColumn::MaxLat => {
                DataType::Decimal128(LAT_PRECISION, COORDINATE_SCALE)
            }
            ChangesetColumn::MinLon | ChangesetColumn::MaxLon => {
                DataType::Decimal128(LON_PRECISION, COORDINATE_SCALE)
            }
            ChangesetColumn::Tags => tags_type(),
        }
    }

    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            ChangesetColumn::CreatedAt
                | ChangesetColumn::ClosedAt
                | ChangesetColumn::User
                | ChangesetColumn::Uid
                | ChangesetColumn::MinLat
                | ChangesetColumn::MaxLat
                | ChangesetColumn::MinLon
                | ChangesetColumn::MaxLon
        )
    }

    pub fn field(self) -> Field {
        Field::new(self.name(), self.data_type(), self.is_nullable())
    }
}

/// Schema of the changeset table
#[derive(Debug, Clone)]
pub struct ChangesetSchema {
    arrow: SchemaRef,
}

impl ChangesetSchema {
    pub fn new() -> Self {
        let fields: Vec<Field> = ChangesetColumn::ALL.iter().map(|c| c.field()).collect();
        Self {
            arrow: Arc::new(Schema::new(fields)),
        }
    }

    pub fn columns(&self) -> &'static [ChangesetColumn] {
        &ChangesetColumn::ALL
    }

    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.arrow)
    }
}

impl Default for ChangesetSchema {
    fn default() -> Self {
        Self::new()
    }
}
