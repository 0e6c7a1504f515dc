//! OSM XML entity reader

use super::xml::{XmlElement, XmlEvent, XmlTokenizer};
use super::{parse_opt, parse_timestamp, required_i64};
use crate::decimal::Coordinate;
use crate::error::{Error, Result};
use crate::types::{Bounds, Entity, Member, MemberType, Metadata, Node, Relation, Tags, Way};
use std::io::BufRead;
use tracing::trace;

const ROOT: &str = "osm";

/// Streams nodes, ways and relations out of an OSM XML document
///
/// Yields records in document order. After the first error the reader
/// yields nothing more.
#[derive(Debug)]
pub struct OsmXmlReader<R> {
    tokenizer: XmlTokenizer<R>,
    bounds: Option<Bounds>,
    pending: Option<XmlEvent>,
    done: bool,
}

impl<R: BufRead> OsmXmlReader<R> {
    /// Open a document and read up to its first record
    ///
    /// Fails when the root element is not `osm`.
    pub fn new(reader: R) -> Result<Self> {
        let mut tokenizer = XmlTokenizer::new(reader);
        match tokenizer.next_event()? {
            XmlEvent::Start(root) if root.name == ROOT => {}
            XmlEvent::Empty(root) if root.name == ROOT => {
                return Ok(Self {
                    tokenizer,
                    bounds: None,
                    pending: None,
                    done: true,
                });
            }
            _ => return Err(Error::decode("This does not appear to be an OSM XML file")),
        }

        let mut this = Self {
            tokenizer,
            bounds: None,
            pending: None,
            done: false,
        };

        // bounds precede the first entity
        loop {
            match this.tokenizer.next_event()? {
                XmlEvent::Empty(el) if el.name == "bounds" => {
                    this.bounds = Some(parse_bounds(&el)?);
                }
                XmlEvent::Start(el) if el.name == "bounds" => {
                    this.bounds = Some(parse_bounds(&el)?);
                    this.tokenizer.skip_element()?;
                }
                event => {
                    this.pending = Some(event);
                    break;
                }
            }
        }
        Ok(this)
    }

    /// Bounding box declared by the document, if any
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    fn next_entity(&mut self) -> Result<Option<Entity>> {
        loop {
            let event = match self.pending.take() {
                Some(event) => event,
                None => self.tokenizer.next_event()?,
            };
            match event {
                XmlEvent::Start(el) => {
                    if let Some(entity) = self.read_entity(&el, true)? {
                        return Ok(Some(entity));
                    }
                }
                XmlEvent::Empty(el) => {
                    if let Some(entity) = self.read_entity(&el, false)? {
                        return Ok(Some(entity));
                    }
                }
                XmlEvent::End(name) if name == ROOT => return Ok(None),
                XmlEvent::End(name) => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        format!("unexpected </{name}>"),
                    ));
                }
                XmlEvent::Eof => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        "unexpected end of input before </osm>",
                    ));
                }
            }
        }
    }

    /// Read one top-level element; `None` for elements that are not entities
    fn read_entity(&mut self, el: &XmlElement, has_children: bool) -> Result<Option<Entity>> {
        let entity = match el.name.as_str() {
            "node" => {
                let (lat, lon) = (node_coordinate(el, "lat")?, node_coordinate(el, "lon")?);
                let mut node = Node {
                    id: required_i64(el, "id")?,
                    tags: Tags::new(),
                    meta: parse_metadata(el)?,
                    lat,
                    lon,
                };
                if has_children {
                    self.read_children(&el.name, &mut node.tags, |_| Ok(()))?;
                }
                Entity::Node(node)
            }
            "way" => {
                let mut way = Way {
                    id: required_i64(el, "id")?,
                    tags: Tags::new(),
                    meta: parse_metadata(el)?,
                    node_refs: Vec::new(),
                };
                if has_children {
                    let refs = &mut way.node_refs;
                    self.read_children(&el.name, &mut way.tags, |child| {
                        if child.name == "nd" {
                            refs.push(required_i64(child, "ref")?);
                        }
                        Ok(())
                    })?;
                }
                Entity::Way(way)
            }
            "relation" => {
                let mut relation = Relation {
                    id: required_i64(el, "id")?,
                    tags: Tags::new(),
                    meta: parse_metadata(el)?,
                    members: Vec::new(),
                };
                if has_children {
                    let members = &mut relation.members;
                    self.read_children(&el.name, &mut relation.tags, |child| {
                        if child.name == "member" {
                            members.push(parse_member(child)?);
                        }
                        Ok(())
                    })?;
                }
                Entity::Relation(relation)
            }
            other => {
                trace!(element = other, "Skipping element");
                if has_children {
                    self.tokenizer.skip_element()?;
                }
                return Ok(None);
            }
        };
        Ok(Some(entity))
    }

    /// Consume children up to `</parent>`, collecting tags and passing every
    /// other child to `on_child`
    fn read_children<F>(&mut self, parent: &str, tags: &mut Tags, mut on_child: F) -> Result<()>
    where
        F: FnMut(&XmlElement) -> Result<()>,
    {
        loop {
            match self.tokenizer.next_event()? {
                XmlEvent::Empty(child) => {
                    if child.name == "tag" {
                        insert_tag(&child, tags)?;
                    } else {
                        on_child(&child)?;
                    }
                }
                XmlEvent::Start(child) => {
                    if child.name == "tag" {
                        insert_tag(&child, tags)?;
                    } else {
                        on_child(&child)?;
                    }
                    self.tokenizer.skip_element()?;
                }
                XmlEvent::End(name) if name == parent => return Ok(()),
                XmlEvent::End(name) => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        format!("expected </{parent}>, found </{name}>"),
                    ));
                }
                XmlEvent::Eof => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        format!("unexpected end of input inside <{parent}>"),
                    ));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for OsmXmlReader<R> {
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

/// Add a `<tag k v>` child to `tags`
pub(crate) fn insert_tag(el: &XmlElement, tags: &mut Tags) -> Result<()> {
    let key = el
        .attr("k")
        .ok_or_else(|| Error::decode("<tag> is missing attribute 'k'"))?;
    let value = el.attr("v").unwrap_or_default();
    tags.insert(key.to_string(), value.to_string());
    Ok(())
}

fn parse_metadata(el: &XmlElement) -> Result<Metadata> {
    let timestamp = el.attr("timestamp").and_then(|raw| parse_timestamp(el, raw));
    Ok(Metadata {
        changeset: parse_opt(el, "changeset")?.unwrap_or(0),
        timestamp,
        uid: parse_opt(el, "uid")?,
        user: el.attr("user").map(str::to_string),
        version: parse_opt(el, "version")?.unwrap_or(0),
        visible: el.attr("visible") != Some("false"),
    })
}

/// Node coordinate parsed from its decimal text; `None` when absent
fn node_coordinate(el: &XmlElement, name: &str) -> Result<Option<Coordinate>> {
    el.attr(name)
        .map(|raw| {
            Coordinate::parse(raw).map_err(|_| {
                Error::decode(format!("<{}> has invalid {name} '{raw}'", el.name))
            })
        })
        .transpose()
}

fn parse_member(el: &XmlElement) -> Result<Member> {
    let member_type = el
        .attr("type")
        .ok_or_else(|| Error::decode("<member> is missing attribute 'type'"))?;
    Ok(Member {
        // unknown types are rejected by the encoder, not here
        member_type: member_type
            .parse::<MemberType>()
            .unwrap_or_else(|never| match never {}),
        id: required_i64(el, "ref")?,
        role: el.attr("role").unwrap_or_default().to_string(),
    })
}

fn parse_bounds(el: &XmlElement) -> Result<Bounds> {
    let coordinate = |name: &str| -> Result<Coordinate> {
        let raw = el
            .attr(name)
            .ok_or_else(|| Error::decode(format!("<bounds> is missing attribute '{name}'")))?;
        Coordinate::parse(raw)
    };
    Ok(Bounds {
        min_lat: coordinate("minlat")?,
        min_lon: coordinate("minlon")?,
        max_lat: coordinate("maxlat")?,
        max_lon: coordinate("maxlon")?,
    })
}
