//! Row encoders
//!
//! Turns domain records into rows of a columnar batch and hands full
//! batches to a sink.
//!
//! # Overview
//!
//! - `EntityEncoder` - encodes nodes, ways and relations; safe to share
//!   between threads
//! - `ChangesetEncoder` - single-writer encoder for changesets
//! - `FlushController` - appends batches to the sink and counts them
//! - `Parallelism` - how `encode_parallel` schedules records
//!
//! # Writer gate
//!
//! `EntityEncoder` holds a `RwLock<()>` next to its batch. Writers take it
//! shared from row allocation until the row is populated; flushing takes it
//! exclusively. A flush therefore never converts or resets a batch while an
//! allocated row is still being written.

mod changeset;
mod flush;
mod parallel;
mod types;

pub use changeset::ChangesetEncoder;
pub use flush::FlushController;
pub use types::{EncodeStats, Parallelism};

use crate::batch::{BatchFull, ChildCounts, RowBatch, RowSlot};
use crate::decimal::{Axis, Coordinate};
use crate::error::{Error, Result};
use crate::schema::EntitySchema;
use crate::sink::BatchSink;
use crate::types::Entity;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};
use types::EntityCounters;

/// Encodes entities into a shared row batch
pub struct EntityEncoder<S> {
    gate: RwLock<()>,
    batch: RowBatch,
    flush: Mutex<FlushController<S>>,
    counters: EntityCounters,
    aborted: AtomicBool,
}

impl<S: BatchSink> EntityEncoder<S> {
    /// Create an encoder writing `capacity`-row batches to `sink`
    pub fn new(schema: EntitySchema, sink: S, capacity: usize) -> Self {
        Self {
            gate: RwLock::new(()),
            batch: RowBatch::new(schema, capacity),
            flush: Mutex::new(FlushController::new(sink)),
            counters: EntityCounters::default(),
            aborted: AtomicBool::new(false),
        }
    }

    /// Encode one entity as a row
    ///
    /// The row that fills the batch triggers the flush. Returns
    /// `Error::Aborted` once any earlier call failed fatally.
    pub fn encode(&self, entity: &Entity) -> Result<()> {
        if self.aborted.load(Ordering::Acquire) {
            return Err(Error::Aborted);
        }
        let row = PreparedRow::new(entity).map_err(|e| self.abort(e))?;
        let counts = row.child_counts();

        loop {
            let written = {
                let _writing = self.gate.read();
                match self.batch.try_allocate_row(counts) {
                    Ok(slot) => {
                        self.write_row(slot, &row);
                        true
                    }
                    Err(BatchFull) => false,
                }
            };
            if written {
                break;
            }
            // Another writer filled the batch first
            self.flush_if_needed()?;
        }

        self.counters.record(entity.entity_type());
        if self.batch.is_full() {
            self.flush_if_needed()?;
        }
        Ok(())
    }

    /// Encode every record of a sequential source
    pub fn encode_all<I>(&self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<Entity>>,
    {
        for record in records {
            self.encode(&record?)?;
        }
        Ok(())
    }

    /// Append and reset the batch if it is full
    ///
    /// Returns whether a batch was appended. Concurrent callers that find
    /// the batch already flushed return `false`.
    pub fn flush_if_needed(&self) -> Result<bool> {
        let _exclusive = self.gate.write();
        if !self.batch.is_full() {
            return Ok(false);
        }
        self.flush_locked().map_err(|e| self.abort(e))?;
        Ok(true)
    }

    /// Append whatever rows remain, even none, and close the sink
    pub fn finish(&self) -> Result<EncodeStats> {
        let _exclusive = self.gate.write();
        self.flush_locked().map_err(|e| self.abort(e))?;
        self.flush.lock().close().map_err(|e| self.abort(e))?;
        let stats = self.stats();
        debug!(
            rows = stats.rows,
            batches = stats.batches,
            "Entity encoder finished"
        );
        Ok(stats)
    }

    /// Rows encoded so far and batches appended
    pub fn stats(&self) -> EncodeStats {
        let flush = self.flush.lock();
        EncodeStats {
            batches: flush.batches_appended(),
            rows: flush.rows_appended(),
            ..self.counters.snapshot()
        }
    }

    /// The batch currently being filled
    pub fn batch(&self) -> &RowBatch {
        &self.batch
    }

    /// Check whether a fatal error stopped this encoder
    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }

    pub fn into_sink(self) -> S {
        self.flush.into_inner().into_sink()
    }

    /// Caller holds the gate exclusively
    fn flush_locked(&self) -> Result<()> {
        let record_batch = self.batch.to_record_batch()?;
        self.flush.lock().append(&record_batch)?;
        self.batch.reset();
        Ok(())
    }

    fn abort(&self, err: Error) -> Error {
        if err.is_fatal() && !self.aborted.swap(true, Ordering::AcqRel) {
            error!(error = %err, "Entity encoding aborted");
        }
        err
    }

    /// Caller holds the gate shared and owns `slot`
    fn write_row(&self, slot: RowSlot, row: &PreparedRow<'_>) {
        let entity = row.entity;
        let meta = entity.meta();
        let r = slot.row;

        {
            let mut cols = self.batch.scalars();
            cols.id.set(r, entity.id());
            cols.entity_type.set(r, entity.entity_type().as_str());
            cols.lat.set_opt(r, row.lat);
            cols.lon.set_opt(r, row.lon);
            cols.changeset.set(r, meta.changeset);
            cols.timestamp
                .set_opt(r, meta.timestamp.map(|t| t.timestamp_millis()));
            cols.uid.set_opt(r, meta.uid);
            cols.user.set_opt_str(r, meta.user.as_deref());
            cols.version.set(r, meta.version);
            cols.visible.set(r, meta.visible);
        }

        if !slot.tags.is_empty() {
            let mut tags = self.batch.tags();
            let entries = tags.buffer_mut();
            for (index, (key, value)) in slot.tags.indices().zip(entity.tags()) {
                entries.set(index, key, value);
            }
        }

        match entity {
            Entity::Node(_) => {}
            Entity::Way(way) => {
                if !slot.nds.is_empty() {
                    let mut nds = self.batch.nds();
                    let entries = nds.buffer_mut();
                    for (index, node_ref) in slot.nds.indices().zip(&way.node_refs) {
                        entries.set(index, *node_ref);
                    }
                }
            }
            Entity::Relation(relation) => {
                if !slot.members.is_empty() {
                    let mut members = self.batch.members();
                    let entries = members.buffer_mut();
                    let typed = relation.members.iter().zip(&row.member_types);
                    for (index, (member, member_type)) in slot.members.indices().zip(typed) {
                        entries.set(index, *member_type, member.id, &member.role);
                    }
                }
            }
        }
    }
}

/// Values of a row computed before it is allocated
struct PreparedRow<'a> {
    entity: &'a Entity,
    lat: Option<i128>,
    lon: Option<i128>,
    member_types: Vec<&'static str>,
}

impl<'a> PreparedRow<'a> {
    fn new(entity: &'a Entity) -> Result<Self> {
        let mut row = Self {
            entity,
            lat: None,
            lon: None,
            member_types: Vec::new(),
        };

        match entity {
            Entity::Node(node) => {
                row.lat = coordinate(node.lat, Axis::Latitude, node.id)?;
                row.lon = coordinate(node.lon, Axis::Longitude, node.id)?;
            }
            Entity::Way(_) => {}
            Entity::Relation(relation) => {
                row.member_types = relation
                    .members
                    .iter()
                    .map(|member| {
                        member
                            .member_type
                            .entity_type()
                            .map(|t| t.as_str())
                            .ok_or_else(|| Error::UnsupportedMemberType {
                                relation_id: relation.id,
                                member_type: member.member_type.to_string(),
                            })
                    })
                    .collect::<Result<_>>()?;
            }
        }

        Ok(row)
    }

    fn child_counts(&self) -> ChildCounts {
        ChildCounts {
            tags: self.entity.tags().len(),
            nds: match self.entity {
                Entity::Way(way) => way.node_refs.len(),
                _ => 0,
            },
            members: self.member_types.len(),
        }
    }
}

/// Unscaled decimal for a node coordinate
fn coordinate(value: Option<Coordinate>, axis: Axis, id: i64) -> Result<Option<i128>> {
    match value {
        None => Ok(None),
        Some(c) if c.is_within(axis) => Ok(Some(c.to_decimal128())),
        Some(c) => Err(Error::decode(format!(
            "Node {id} has {axis} {c} outside of ±{}",
            axis.limit_degrees()
        ))),
    }
}
