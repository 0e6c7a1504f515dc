//! Domain records consumed by the encoders
//!
//! This module contains the OSM entity model (nodes, ways, relations),
//! the per-revision metadata shared by all entities, and the changeset
//! record which is encoded into its own, flatter schema.

use crate::decimal::Coordinate;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Type Aliases
// ============================================================================

/// Tag mapping of an entity or changeset; keys are unique
pub type Tags = BTreeMap<String, String>;

// ============================================================================
// Entity Type
// ============================================================================

/// Kind of an OSM entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Node,
    Way,
    Relation,
}

impl EntityType {
    /// Lower-case label as written to the `type` column
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Node => "node",
            EntityType::Way => "way",
            EntityType::Relation => "relation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Revision metadata carried by every entity
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    /// Changeset that produced this revision
    pub changeset: i64,
    /// Time of the revision, if known
    pub timestamp: Option<DateTime<Utc>>,
    /// Editor id, if known
    pub uid: Option<i64>,
    /// Editor display name, if known
    pub user: Option<String>,
    /// Revision counter
    pub version: i64,
    /// False when the revision is a deletion (history files only)
    pub visible: bool,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            changeset: 0,
            timestamp: None,
            uid: None,
            user: None,
            version: 0,
            visible: true,
        }
    }
}

impl Metadata {
    /// Create metadata for a given version and changeset
    pub fn new(version: i64, changeset: i64) -> Self {
        Self {
            version,
            changeset,
            ..Self::default()
        }
    }

    /// Set the revision timestamp
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the editor id and name
    #[must_use]
    pub fn with_user(mut self, uid: i64, user: impl Into<String>) -> Self {
        self.uid = Some(uid);
        self.user = Some(user.into());
        self
    }

    /// Set the visibility flag
    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

// ============================================================================
// Relation Members
// ============================================================================

/// Type of a relation member
///
/// Upstream values that do not name one of the three entity kinds are kept
/// as `Unrecognized` so the encoder can reject them instead of the decoder
/// silently dropping the member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    Node,
    Way,
    Relation,
    Unrecognized(String),
}

impl MemberType {
    /// Map a numeric member type code from the binary exchange format
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => MemberType::Node,
            1 => MemberType::Way,
            2 => MemberType::Relation,
            other => MemberType::Unrecognized(other.to_string()),
        }
    }

    /// Known entity type of this member, if any
    pub fn entity_type(&self) -> Option<EntityType> {
        match self {
            MemberType::Node => Some(EntityType::Node),
            MemberType::Way => Some(EntityType::Way),
            MemberType::Relation => Some(EntityType::Relation),
            MemberType::Unrecognized(_) => None,
        }
    }
}

impl FromStr for MemberType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "node" => MemberType::Node,
            "way" => MemberType::Way,
            "relation" => MemberType::Relation,
            other => MemberType::Unrecognized(other.to_string()),
        })
    }
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberType::Unrecognized(label) => f.write_str(label),
            known => f.write_str(known.entity_type().map_or("", EntityType::as_str)),
        }
    }
}

/// A relation member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub member_type: MemberType,
    pub id: i64,
    pub role: String,
}

impl Member {
    /// Create a new member
    pub fn new(member_type: MemberType, id: i64, role: impl Into<String>) -> Self {
        Self {
            member_type,
            id,
            role: role.into(),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A node revision
///
/// `lat`/`lon` are `None` when the revision carries no position, which is
/// the case for deletions in history files.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub tags: Tags,
    pub meta: Metadata,
    pub lat: Option<Coordinate>,
    pub lon: Option<Coordinate>,
}

/// A way revision
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    pub id: i64,
    pub tags: Tags,
    pub meta: Metadata,
    /// Ordered node references
    pub node_refs: Vec<i64>,
}

/// A relation revision
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub id: i64,
    pub tags: Tags,
    pub meta: Metadata,
    /// Ordered members
    pub members: Vec<Member>,
}

/// One revision of a node, way or relation
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Node(Node),
    Way(Way),
    Relation(Relation),
}

impl Entity {
    /// Create a node from floating-point degrees with default metadata
    ///
    /// Non-finite values leave the position unset.
    pub fn node(id: i64, lat: f64, lon: f64) -> Self {
        let position = |degrees: f64| Coordinate::from_degrees(degrees).ok();
        Self::node_at(id, position(lat), position(lon))
    }

    /// Create a node from decimal coordinates with default metadata
    pub fn node_at(id: i64, lat: Option<Coordinate>, lon: Option<Coordinate>) -> Self {
        Entity::Node(Node {
            id,
            tags: Tags::new(),
            meta: Metadata::default(),
            lat,
            lon,
        })
    }

    /// Create a way with default metadata
    pub fn way(id: i64, node_refs: Vec<i64>) -> Self {
        Entity::Way(Way {
            id,
            tags: Tags::new(),
            meta: Metadata::default(),
            node_refs,
        })
    }

    /// Create a relation with default metadata
    pub fn relation(id: i64, members: Vec<Member>) -> Self {
        Entity::Relation(Relation {
            id,
            tags: Tags::new(),
            meta: Metadata::default(),
            members,
        })
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags_mut().insert(key.into(), value.into());
        self
    }

    /// Replace the metadata
    #[must_use]
    pub fn with_meta(mut self, meta: Metadata) -> Self {
        *self.meta_mut() = meta;
        self
    }

    pub fn id(&self) -> i64 {
        match self {
            Entity::Node(n) => n.id,
            Entity::Way(w) => w.id,
            Entity::Relation(r) => r.id,
        }
    }

    pub fn entity_type(&self) -> EntityType {
        match self {
            Entity::Node(_) => EntityType::Node,
            Entity::Way(_) => EntityType::Way,
            Entity::Relation(_) => EntityType::Relation,
        }
    }

    pub fn tags(&self) -> &Tags {
        match self {
            Entity::Node(n) => &n.tags,
            Entity::Way(w) => &w.tags,
            Entity::Relation(r) => &r.tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut Tags {
        match self {
            Entity::Node(n) => &mut n.tags,
            Entity::Way(w) => &mut w.tags,
            Entity::Relation(r) => &mut r.tags,
        }
    }

    pub fn meta(&self) -> &Metadata {
        match self {
            Entity::Node(n) => &n.meta,
            Entity::Way(w) => &w.meta,
            Entity::Relation(r) => &r.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Metadata {
        match self {
            Entity::Node(n) => &mut n.meta,
            Entity::Way(w) => &mut w.meta,
            Entity::Relation(r) => &mut r.meta,
        }
    }
}

// ============================================================================
// Bounds
// ============================================================================

/// Bounding box declared by an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min_lat: Coordinate,
    pub min_lon: Coordinate,
    pub max_lat: Coordinate,
    pub max_lon: Coordinate,
}

impl Bounds {
    /// Render as `minlon,minlat,maxlon,maxlat` for file metadata
    pub fn to_bbox_string(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

// ============================================================================
// Changeset
// ============================================================================

/// An edit session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Changeset {
    pub id: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub open: bool,
    pub num_changes: i64,
    pub user: Option<String>,
    pub uid: Option<i64>,
    /// Bounding box; absent on changesets without edits
    pub min_lat: Option<Coordinate>,
    pub max_lat: Option<Coordinate>,
    pub min_lon: Option<Coordinate>,
    pub max_lon: Option<Coordinate>,
    pub comments_count: i64,
    pub tags: Tags,
}

impl Changeset {
    /// Create an empty changeset with the given id
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
