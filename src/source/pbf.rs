//! OSM PBF entity reader

use crate::decimal::Coordinate;
use crate::error::{Error, Result};
use crate::types::{Bounds, Entity, Member, MemberType, Metadata, Node, Relation, Tags, Way};
use chrono::{DateTime, Utc};
use osmpbf::{
    BlobDecode, BlobReader, DenseNodeInfo, Element, HeaderBBox, Info, PrimitiveBlock,
    RelMemberType,
};
use std::collections::VecDeque;
use std::io::Read;
use tracing::{debug, trace};

/// Streams nodes, ways and relations out of an OSM PBF file
///
/// Decodes one data block at a time and yields its entities in block
/// order. After the first error the reader yields nothing more.
pub struct PbfReader<R: Read + Send> {
    blobs: BlobReader<R>,
    bounds: Option<Bounds>,
    pending: VecDeque<Entity>,
    blocks: u64,
    done: bool,
}

impl<R: Read + Send> PbfReader<R> {
    /// Open a file and read its header block
    pub fn new(reader: R) -> Result<Self> {
        let mut this = Self {
            blobs: BlobReader::new(reader),
            bounds: None,
            pending: VecDeque::new(),
            blocks: 0,
            done: false,
        };

        match this.blobs.next() {
            None => this.done = true,
            Some(Err(e)) => {
                return Err(Error::decode(format!(
                    "This does not appear to be an OSM PBF file: {e}"
                )));
            }
            Some(Ok(blob)) => match blob.decode()? {
                BlobDecode::OsmHeader(header) => {
                    this.bounds = header.bbox().map(|bbox| parse_bounds(&bbox)).transpose()?;
                }
                BlobDecode::OsmData(block) => this.read_block(&block)?,
                BlobDecode::Unknown(kind) => {
                    trace!(kind, "Skipping unknown blob");
                }
            },
        }
        Ok(this)
    }

    /// Bounding box declared in the file header, if any
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn next_entity(&mut self) -> Result<Option<Entity>> {
        loop {
            if let Some(entity) = self.pending.pop_front() {
                return Ok(Some(entity));
            }
            let Some(blob) = self.blobs.next() else {
                debug!(blocks = self.blocks, "Finished reading PBF blocks");
                return Ok(None);
            };
            match blob?.decode()? {
                BlobDecode::OsmData(block) => self.read_block(&block)?,
                BlobDecode::OsmHeader(_) => {
                    return Err(Error::decode("Unexpected second OSMHeader block"));
                }
                BlobDecode::Unknown(kind) => {
                    trace!(kind, "Skipping unknown blob");
                }
            }
        }
    }

    fn read_block(&mut self, block: &PrimitiveBlock) -> Result<()> {
        for element in block.elements() {
            self.pending.push_back(read_element(element)?);
        }
        self.blocks += 1;
        Ok(())
    }
}

impl<R: Read + Send> Iterator for PbfReader<R> {
    type Item = Result<Entity>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entity() {
            Ok(Some(entity)) => Some(Ok(entity)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl From<RelMemberType> for MemberType {
    fn from(kind: RelMemberType) -> Self {
        match kind {
            RelMemberType::Node => MemberType::Node,
            RelMemberType::Way => MemberType::Way,
            RelMemberType::Relation => MemberType::Relation,
        }
    }
}

fn read_element(element: Element<'_>) -> Result<Entity> {
    let entity = match element {
        Element::Node(node) => {
            let meta = info_metadata(&node.info())?;
            let (lat, lon) = position(&meta, node.decimicro_lat(), node.decimicro_lon());
            Entity::Node(Node {
                id: node.id(),
                tags: collect_tags(node.tags()),
                meta,
                lat,
                lon,
            })
        }
        Element::DenseNode(node) => {
            let meta = match node.info() {
                Some(info) => dense_metadata(info)?,
                None => Metadata::default(),
            };
            let (lat, lon) = position(&meta, node.decimicro_lat(), node.decimicro_lon());
            Entity::Node(Node {
                id: node.id(),
                tags: collect_tags(node.tags()),
                meta,
                lat,
                lon,
            })
        }
        Element::Way(way) => Entity::Way(Way {
            id: way.id(),
            tags: collect_tags(way.tags()),
            meta: info_metadata(&way.info())?,
            node_refs: way.refs().collect(),
        }),
        Element::Relation(relation) => {
            let members = relation
                .members()
                .map(|member| {
                    let role = member.role()?.to_string();
                    Ok(Member {
                        member_type: member.member_type.into(),
                        id: member.member_id,
                        role,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Entity::Relation(Relation {
                id: relation.id(),
                tags: collect_tags(relation.tags()),
                meta: info_metadata(&relation.info())?,
                members,
            })
        }
    };
    Ok(entity)
}

/// Coordinates in 1e-7 degree units; deleted revisions carry no position
fn position(meta: &Metadata, lat: i32, lon: i32) -> (Option<Coordinate>, Option<Coordinate>) {
    if !meta.visible {
        return (None, None);
    }
    (
        Some(Coordinate::from_units(i64::from(lat))),
        Some(Coordinate::from_units(i64::from(lon))),
    )
}

fn collect_tags<'a>(tags: impl Iterator<Item = (&'a str, &'a str)>) -> Tags {
    tags.map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn info_metadata(info: &Info<'_>) -> Result<Metadata> {
    let user = info.user().transpose()?;
    Ok(Metadata {
        changeset: info.changeset().unwrap_or(0),
        timestamp: info
            .milli_timestamp()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        uid: info.uid().and_then(known_uid),
        user: user.filter(|name| !name.is_empty()).map(str::to_string),
        version: info.version().map_or(0, i64::from),
        visible: info.visible(),
    })
}

fn dense_metadata(info: &DenseNodeInfo<'_>) -> Result<Metadata> {
    let user = info.user()?;
    Ok(Metadata {
        changeset: info.changeset(),
        timestamp: DateTime::<Utc>::from_timestamp_millis(info.milli_timestamp()),
        uid: known_uid(info.uid()),
        user: (!user.is_empty()).then(|| user.to_string()),
        version: i64::from(info.version()),
        visible: info.visible(),
    })
}

/// Writers store anonymous edits with a negative uid
fn known_uid(uid: i32) -> Option<i64> {
    (uid >= 0).then_some(i64::from(uid))
}

fn parse_bounds(bbox: &HeaderBBox) -> Result<Bounds> {
    Ok(Bounds {
        min_lat: Coordinate::from_degrees(bbox.bottom)?,
        min_lon: Coordinate::from_degrees(bbox.left)?,
        max_lat: Coordinate::from_degrees(bbox.top)?,
        max_lon: Coordinate::from_degrees(bbox.right)?,
    })
}
