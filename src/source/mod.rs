//! Record sources
//!
//! Readers that turn OSM XML and PBF files into the domain records
//! consumed by the encoders.
//!
//! # Overview
//!
//! - `OsmXmlReader` - nodes, ways and relations from an `.osm` file,
//!   snapshot or full history
//! - `PbfReader` - nodes, ways and relations from an `.osm.pbf` file
//! - `ChangesetXmlReader` - changesets from a changeset dump
//! - `XmlTokenizer` - the pull tokenizer both XML readers share
//! - `open_input` - file path or `-` for stdin

mod changeset;
mod osm;
mod pbf;
mod xml;

pub use changeset::ChangesetXmlReader;
pub use osm::OsmXmlReader;
pub use pbf::PbfReader;
pub use xml::{unescape, XmlElement, XmlEvent, XmlTokenizer};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

/// Encoding of an entity input file
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// OSM XML (`.osm`, `.osh`)
    #[default]
    Xml,
    /// OSM PBF (`.osm.pbf`, `.osh.pbf`)
    Pbf,
}

impl InputFormat {
    /// Guess the format from the file name; stdin is read as XML
    pub fn detect(path: &str) -> Self {
        let is_pbf = Path::new(path)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pbf"));
        if is_pbf {
            InputFormat::Pbf
        } else {
            InputFormat::Xml
        }
    }
}

/// Buffered input shared with encoding workers
pub type Input = Box<dyn BufRead + Send>;

/// Open a file for reading, or stdin when `path` is `-`
pub fn open_input(path: &str) -> Result<Input> {
    if path == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    if !Path::new(path).exists() {
        return Err(Error::FileNotFound {
            path: path.to_string(),
        });
    }
    let file = File::open(path)?;
    Ok(Box::new(BufReader::with_capacity(1 << 16, file)))
}

/// Parse a mandatory integer attribute
pub(crate) fn required_i64(el: &XmlElement, name: &str) -> Result<i64> {
    parse_opt(el, name)?.ok_or_else(|| {
        Error::decode(format!("<{}> is missing attribute '{name}'", el.name))
    })
}

/// Parse an optional attribute; present but malformed values are errors
pub(crate) fn parse_opt<T: FromStr>(el: &XmlElement, name: &str) -> Result<Option<T>> {
    el.attr(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|_| {
                Error::decode(format!("<{}> has invalid {name} '{raw}'", el.name))
            })
        })
        .transpose()
}

/// Parse an ISO-8601 timestamp; malformed values are logged and dropped
pub(crate) fn parse_timestamp(el: &XmlElement, raw: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(timestamp) => Some(timestamp.with_timezone(&Utc)),
        Err(e) => {
            warn!(
                element = %el.name,
                id = el.attr("id").unwrap_or_default(),
                value = raw,
                error = %e,
                "Ignoring unparsable timestamp"
            );
            None
        }
    }
}
