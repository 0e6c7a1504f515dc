//! Changeset dump reader

use super::osm::insert_tag;
use super::xml::{XmlElement, XmlEvent, XmlTokenizer};
use super::{parse_opt, parse_timestamp, required_i64};
use crate::decimal::{Axis, Coordinate};
use crate::error::{Error, Result};
use crate::types::Changeset;
use std::io::BufRead;

/// Streams changesets out of a changeset XML dump
#[derive(Debug)]
pub struct ChangesetXmlReader<R> {
    tokenizer: XmlTokenizer<R>,
    done: bool,
}

impl<R: BufRead> ChangesetXmlReader<R> {
    /// Open a dump; fails when the root element is not `osm`
    pub fn new(reader: R) -> Result<Self> {
        let mut tokenizer = XmlTokenizer::new(reader);
        let done = match tokenizer.next_event()? {
            XmlEvent::Start(root) if root.name == "osm" => false,
            XmlEvent::Empty(root) if root.name == "osm" => true,
            _ => {
                return Err(Error::decode(
                    "This does not appear to be an OSM changeset XML file",
                ))
            }
        };
        Ok(Self { tokenizer, done })
    }

    fn next_changeset(&mut self) -> Result<Option<Changeset>> {
        loop {
            match self.tokenizer.next_event()? {
                XmlEvent::Empty(el) if el.name == "changeset" => {
                    return parse_changeset(&el).map(Some);
                }
                XmlEvent::Start(el) if el.name == "changeset" => {
                    let mut changeset = parse_changeset(&el)?;
                    self.read_tags(&mut changeset)?;
                    return Ok(Some(changeset));
                }
                XmlEvent::Empty(_) => {}
                XmlEvent::Start(_) => self.tokenizer.skip_element()?,
                XmlEvent::End(name) if name == "osm" => return Ok(None),
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

    /// Collect `<tag>` children; `<discussion>` and anything else is skipped
    fn read_tags(&mut self, changeset: &mut Changeset) -> Result<()> {
        loop {
            match self.tokenizer.next_event()? {
                XmlEvent::Empty(child) if child.name == "tag" => {
                    insert_tag(&child, &mut changeset.tags)?;
                }
                XmlEvent::Empty(_) => {}
                XmlEvent::Start(child) => {
                    if child.name == "tag" {
                        insert_tag(&child, &mut changeset.tags)?;
                    }
                    self.tokenizer.skip_element()?;
                }
                XmlEvent::End(name) if name == "changeset" => return Ok(()),
                XmlEvent::End(name) => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        format!("expected </changeset>, found </{name}>"),
                    ));
                }
                XmlEvent::Eof => {
                    return Err(Error::xml(
                        self.tokenizer.position(),
                        "unexpected end of input inside <changeset>",
                    ));
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for ChangesetXmlReader<R> {
    type Item = Result<Changeset>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_changeset() {
            Ok(Some(changeset)) => Some(Ok(changeset)),
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

fn parse_changeset(el: &XmlElement) -> Result<Changeset> {
    let id = required_i64(el, "id")?;
    let coordinate = |name: &str, axis: Axis| -> Result<Option<Coordinate>> {
        let Some(raw) = el.attr(name) else {
            return Ok(None);
        };
        let value = Coordinate::parse(raw)?;
        if !value.is_within(axis) {
            return Err(Error::decode(format!(
                "Changeset {id} has {name} {value} outside of ±{}",
                axis.limit_degrees()
            )));
        }
        Ok(Some(value))
    };

    Ok(Changeset {
        id,
        created_at: el
            .attr("created_at")
            .and_then(|raw| parse_timestamp(el, raw)),
        closed_at: el
            .attr("closed_at")
            .and_then(|raw| parse_timestamp(el, raw)),
        open: el.attr("open") == Some("true"),
        num_changes: parse_opt(el, "num_changes")?.unwrap_or(0),
        user: el.attr("user").map(str::to_string),
        // anonymous edits carry no usable uid
        uid: el.attr("uid").and_then(|raw| raw.trim().parse().ok()),
        min_lat: coordinate("min_lat", Axis::Latitude)?,
        max_lat: coordinate("max_lat", Axis::Latitude)?,
        min_lon: coordinate("min_lon", Axis::Longitude)?,
        max_lon: coordinate("max_lon", Axis::Longitude)?,
        comments_count: parse_opt(el, "comments_count")?.unwrap_or(0),
        tags: Default::default(),
    })
}
