//! Encoder types
//!
//! Run statistics and the parallelism setting shared by the entity and
//! changeset encoders.

use crate::types::EntityType;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// How entity records are scheduled onto encoding workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parallelism {
    /// Encode on the calling thread
    #[default]
    Sequential,
    /// Encode on a dedicated pool of `n` workers
    Workers(usize),
    /// Encode on the global pool, one worker per core
    Unbounded,
}

impl Parallelism {
    /// Check whether records may be encoded concurrently
    pub fn is_parallel(&self) -> bool {
        !matches!(self, Parallelism::Sequential)
    }
}

/// Statistics from an encoding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EncodeStats {
    /// Node rows encoded
    pub nodes: u64,
    /// Way rows encoded
    pub ways: u64,
    /// Relation rows encoded
    pub relations: u64,
    /// Changeset rows encoded
    pub changesets: u64,
    /// Batches appended to the sink
    pub batches: u64,
    /// Rows appended to the sink
    pub rows: u64,
}

impl EncodeStats {
    /// Create new stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Records encoded across all kinds
    pub fn records(&self) -> u64 {
        self.nodes + self.ways + self.relations + self.changesets
    }
}

/// Per-kind row counters updated by concurrent writers
#[derive(Debug, Default)]
pub(crate) struct EntityCounters {
    nodes: AtomicU64,
    ways: AtomicU64,
    relations: AtomicU64,
}

impl EntityCounters {
    pub(crate) fn record(&self, entity_type: EntityType) {
        let counter = match entity_type {
            EntityType::Node => &self.nodes,
            EntityType::Way => &self.ways,
            EntityType::Relation => &self.relations,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> EncodeStats {
        EncodeStats {
            nodes: self.nodes.load(Ordering::Relaxed),
            ways: self.ways.load(Ordering::Relaxed),
            relations: self.relations.load(Ordering::Relaxed),
            ..EncodeStats::default()
        }
    }
}
