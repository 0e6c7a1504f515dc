//! Minimal pull tokenizer for OSM XML
//!
//! Yields start, empty and end elements with unescaped attributes. Text,
//! comments, processing instructions, CDATA and DOCTYPE declarations are
//! skipped; OSM files keep all data in attributes.

use crate::error::{Error, Result};
use std::io::BufRead;

/// An element tag with its attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl XmlElement {
    /// Value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A markup event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// `<name ...>`
    Start(XmlElement),
    /// `<name .../>`
    Empty(XmlElement),
    /// `</name>`
    End(String),
    /// End of input
    Eof,
}

/// Streaming tokenizer over a buffered reader
#[derive(Debug)]
pub struct XmlTokenizer<R> {
    reader: R,
    buf: Vec<u8>,
    position: usize,
}

impl<R: BufRead> XmlTokenizer<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(256),
            position: 0,
        }
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.position
    }

    /// Read the next element event
    pub fn next_event(&mut self) -> Result<XmlEvent> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(b'<', &mut self.buf)?;
            self.position += read;
            if self.buf.last() != Some(&b'<') {
                return Ok(XmlEvent::Eof);
            }

            let start = self.position;
            self.read_markup()?;
            let markup = std::str::from_utf8(&self.buf)
                .map_err(|e| Error::xml(start, format!("invalid UTF-8: {e}")))?;

            if markup.starts_with('?') || markup.starts_with('!') {
                continue;
            }
            return parse_markup(markup, start);
        }
    }

    /// Skip everything up to and including the end tag of an element whose
    /// start tag was just read
    pub fn skip_element(&mut self) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.next_event()? {
                XmlEvent::Start(_) => depth += 1,
                XmlEvent::End(_) => depth -= 1,
                XmlEvent::Empty(_) => {}
                XmlEvent::Eof => {
                    return Err(Error::xml(self.position, "unexpected end of input"));
                }
            }
        }
        Ok(())
    }

    /// Fill `buf` with the markup after `<`, without the closing `>`
    fn read_markup(&mut self) -> Result<()> {
        let start = self.position;
        self.buf.clear();
        loop {
            let read = self.reader.read_until(b'>', &mut self.buf)?;
            self.position += read;
            if read == 0 || self.buf.last() != Some(&b'>') {
                return Err(Error::xml(start, "unterminated markup"));
            }
            if markup_complete(&self.buf) {
                self.buf.pop();
                return Ok(());
            }
        }
    }
}

/// Check whether the `>` ending `buf` closes the markup
fn markup_complete(buf: &[u8]) -> bool {
    if buf.starts_with(b"!--") {
        return buf.len() >= 6 && buf.ends_with(b"-->");
    }
    if buf.starts_with(b"![CDATA[") {
        return buf.ends_with(b"]]>");
    }
    if buf.starts_with(b"?") {
        return buf.ends_with(b"?>");
    }
    // a `>` inside a quoted value, or inside a DOCTYPE internal subset,
    // does not end the markup
    let declaration = buf.starts_with(b"!");
    let mut quote = None;
    let mut depth = 0usize;
    let mut i = 0;
    while i < buf.len() {
        let byte = buf[i];
        match quote {
            Some(open) if open == byte => quote = None,
            Some(_) => {}
            None => match byte {
                b'"' | b'\'' => quote = Some(byte),
                b'[' if declaration => depth += 1,
                b']' if declaration => depth = depth.saturating_sub(1),
                b'<' if declaration && buf[i..].starts_with(b"<!--") => {
                    match find(&buf[i + 4..], b"-->") {
                        Some(end) => i += 4 + end + 2,
                        None => return false,
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    quote.is_none() && depth == 0
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_markup(markup: &str, position: usize) -> Result<XmlEvent> {
    if let Some(name) = markup.strip_prefix('/') {
        return Ok(XmlEvent::End(name.trim().to_string()));
    }

    let (body, empty) = match markup.strip_suffix('/') {
        Some(body) => (body, true),
        None => (markup, false),
    };
    let element = parse_tag(body, position)?;
    Ok(if empty {
        XmlEvent::Empty(element)
    } else {
        XmlEvent::Start(element)
    })
}

fn parse_tag(body: &str, position: usize) -> Result<XmlElement> {
    let name_end = body
        .find(|c: char| c.is_ascii_whitespace())
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return Err(Error::xml(position, "missing element name"));
    }

    let mut attributes = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let eq = rest
            .find('=')
            .ok_or_else(|| Error::xml(position, format!("malformed attribute in <{name}>")))?;
        let key = rest[..eq].trim();
        let after = rest[eq + 1..].trim_start();

        let quote = after
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| Error::xml(position, format!("unquoted attribute '{key}'")))?;
        let close = after[1..]
            .find(quote)
            .ok_or_else(|| Error::xml(position, format!("unterminated attribute '{key}'")))?;

        let value = unescape(&after[1..=close], position)?;
        attributes.push((key.to_string(), value));
        rest = after[close + 2..].trim_start();
    }

    Ok(XmlElement {
        name: name.to_string(),
        attributes,
    })
}

/// Replace predefined and numeric character references
pub fn unescape(text: &str, position: usize) -> Result<String> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let semi = rest[amp..]
            .find(';')
            .ok_or_else(|| Error::xml(position, "unterminated character reference"))?;
        let entity = &rest[amp + 1..amp + semi];
        let decoded = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    Error::xml(position, format!("unknown character reference '&{entity};'"))
                })?
            }
        };
        out.push(decoded);
        rest = &rest[amp + semi + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
