#![forbid(unsafe_code)]

//! Streaming document reader.
//!
//! The reader pulls one `File` section at a time so large documents never
//! need to be held in memory at once:
//!
//! ```
//! use fstr_doc::DocumentReader;
//!
//! let xml = r#"<StringTable Locale="en-US">
//!     <File SourcePath="menu.rs">
//!         <String Name="menu.open" Hash="0">Open {file}</String>
//!     </File>
//! </StringTable>"#;
//!
//! let mut reader = DocumentReader::from_text(xml).unwrap();
//! assert_eq!(reader.header().locale, "en-US");
//! let section = reader.next_section().unwrap().unwrap();
//! assert_eq!(section.entries[0].text, "Open {file}");
//! assert!(reader.next_section().unwrap().is_none());
//! ```

use std::io::BufRead;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{DocumentError, Location, Result};
use crate::hash::content_hash;
use crate::model::{Entry, EntryKind, FILE, FileSection, Header, ROOT, SourceInfo};

/// Reads an interchange document section by section.
pub struct DocumentReader<R> {
    reader: Reader<R>,
    header: Header,
    section: Option<String>,
    finished: bool,
}

impl<'s> DocumentReader<&'s [u8]> {
    /// Read a document held in memory.
    pub fn from_text(text: &'s str) -> Result<Self> {
        Self::new(text.as_bytes())
    }
}

impl<R: BufRead> DocumentReader<R> {
    /// Start reading, consuming everything up to and including the root
    /// element.
    pub fn new(input: R) -> Result<Self> {
        let mut this = Self {
            reader: Reader::from_reader(input),
            header: Header::default(),
            section: None,
            finished: false,
        };
        this.read_root()?;
        Ok(this)
    }

    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Byte offset of the reader in the input.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn location(&self) -> Location {
        Location {
            position: self.position(),
            section: self.section.clone(),
        }
    }

    fn next_event<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>> {
        buf.clear();
        self.reader
            .read_event_into(buf)
            .map_err(|source| DocumentError::Xml {
                at: self.location(),
                source,
            })
    }

    fn read_root(&mut self) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            match self.next_event(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == ROOT.as_bytes() => {
                    self.header = self.parse_header(&e)?;
                    return Ok(());
                }
                Event::Empty(e) if e.name().as_ref() == ROOT.as_bytes() => {
                    self.header = self.parse_header(&e)?;
                    self.finished = true;
                    return Ok(());
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(self.unexpected_element(e.name().as_ref()));
                }
                Event::Text(e) => self.expect_blank(&e)?,
                Event::Eof | Event::End(_) => return Err(DocumentError::MissingRoot),
                Event::CData(e) => return Err(self.unexpected_text(&e)),
                _ => {}
            }
        }
    }

    /// Read the next `File` section, or `None` once the root closes.
    pub fn next_section(&mut self) -> Result<Option<FileSection>> {
        if self.finished {
            return Ok(None);
        }
        let result = self.read_section();
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    fn read_section(&mut self) -> Result<Option<FileSection>> {
        let mut buf = Vec::new();
        loop {
            match self.next_event(&mut buf)? {
                Event::Start(e) if e.name().as_ref() == FILE.as_bytes() => {
                    let source = self.parse_source(&e)?;
                    self.section = Some(source.path.clone());
                    let section = self.read_entries(source)?;
                    self.section = None;
                    debug!(
                        target: "fstr.doc",
                        file = %section.source.path,
                        entries = section.entries.len(),
                        "read file section"
                    );
                    return Ok(Some(section));
                }
                Event::Empty(e) if e.name().as_ref() == FILE.as_bytes() => {
                    let source = self.parse_source(&e)?;
                    return Ok(Some(FileSection::new(source)));
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(self.unexpected_element(e.name().as_ref()));
                }
                Event::End(e) if e.name().as_ref() == ROOT.as_bytes() => return Ok(None),
                Event::End(e) => return Err(self.mismatched_end(ROOT, e.name().as_ref())),
                Event::Text(e) => self.expect_blank(&e)?,
                Event::CData(e) => return Err(self.unexpected_text(&e)),
                Event::Eof => return Err(self.unexpected_eof(ROOT)),
                _ => {}
            }
        }
    }

    fn read_entries(&mut self, source: SourceInfo) -> Result<FileSection> {
        let mut section = FileSection::new(source);
        let mut comment: Option<String> = None;
        let mut buf = Vec::new();
        loop {
            match self.next_event(&mut buf)? {
                Event::Comment(e) => {
                    let text = self.utf8(&e)?;
                    comment = Some(text.trim().to_owned());
                }
                Event::Start(e) => {
                    let (kind, key, hash, attributes) = self.parse_entry_start(&e)?;
                    let text = self.read_entry_text(kind)?;
                    section.entries.push(Entry {
                        hash: hash.unwrap_or_else(|| content_hash(&text)),
                        key,
                        text,
                        kind,
                        attributes,
                        comment: comment.take(),
                    });
                }
                Event::Empty(e) => {
                    let (kind, key, hash, attributes) = self.parse_entry_start(&e)?;
                    section.entries.push(Entry {
                        hash: hash.unwrap_or_else(|| content_hash("")),
                        key,
                        text: String::new(),
                        kind,
                        attributes,
                        comment: comment.take(),
                    });
                }
                Event::End(e) if e.name().as_ref() == FILE.as_bytes() => return Ok(section),
                Event::End(e) => return Err(self.mismatched_end(FILE, e.name().as_ref())),
                Event::Text(e) => self.expect_blank(&e)?,
                Event::CData(e) => return Err(self.unexpected_text(&e)),
                Event::Eof => return Err(self.unexpected_eof(FILE)),
                _ => {}
            }
        }
    }

    fn read_entry_text(&mut self, kind: EntryKind) -> Result<String> {
        let element = kind.element_name();
        let mut text = String::new();
        let mut buf = Vec::new();
        loop {
            match self.next_event(&mut buf)? {
                Event::Text(e) => {
                    let unescaped = e.unescape().map_err(|source| DocumentError::Xml {
                        at: self.location(),
                        source,
                    })?;
                    text.push_str(&unescaped);
                }
                Event::CData(e) => text.push_str(self.utf8(&e)?),
                Event::End(e) if e.name().as_ref() == element.as_bytes() => return Ok(text),
                Event::End(e) => return Err(self.mismatched_end(element, e.name().as_ref())),
                Event::Start(e) | Event::Empty(e) => {
                    return Err(self.unexpected_element(e.name().as_ref()));
                }
                Event::Eof => return Err(self.unexpected_eof(element)),
                _ => {}
            }
        }
    }

    fn parse_header(&self, e: &BytesStart<'_>) -> Result<Header> {
        let mut header = Header::default();
        for (name, value) in self.attributes(e)? {
            match name.as_str() {
                "GeneratedUtc" => header.generated_utc = Some(self.timestamp(value)?),
                "Locale" => header.locale = value,
                _ => {}
            }
        }
        Ok(header)
    }

    fn parse_source(&self, e: &BytesStart<'_>) -> Result<SourceInfo> {
        let mut path = None;
        let mut source = SourceInfo::default();
        for (name, value) in self.attributes(e)? {
            match name.as_str() {
                "SourcePath" => path = Some(value),
                "SourceModifiedUtc" => source.modified_utc = Some(self.timestamp(value)?),
                "SourceCommitHash" if !value.trim().is_empty() => source.commit_hash = Some(value),
                _ => {}
            }
        }
        source.path = path.ok_or_else(|| DocumentError::MissingAttribute {
            at: self.location(),
            element: FILE.to_owned(),
            attribute: "SourcePath",
        })?;
        Ok(source)
    }

    #[allow(clippy::type_complexity)]
    fn parse_entry_start(
        &self,
        e: &BytesStart<'_>,
    ) -> Result<(EntryKind, String, Option<String>, Vec<(String, String)>)> {
        let Some(kind) = EntryKind::from_element(e.name().as_ref()) else {
            return Err(self.unexpected_element(e.name().as_ref()));
        };
        let mut key = None;
        let mut hash = None;
        let mut extra = Vec::new();
        for (name, value) in self.attributes(e)? {
            match name.as_str() {
                "Name" => key = Some(value),
                "Hash" => hash = Some(value),
                _ => extra.push((name, value)),
            }
        }
        let key = key.ok_or_else(|| DocumentError::MissingAttribute {
            at: self.location(),
            element: kind.element_name().to_owned(),
            attribute: "Name",
        })?;
        Ok((kind, key, hash, extra))
    }

    fn attributes(&self, e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|err| DocumentError::Xml {
                at: self.location(),
                source: err.into(),
            })?;
            let name = self.utf8(attr.key.as_ref())?.to_owned();
            let value = attr.unescape_value().map_err(|source| DocumentError::Xml {
                at: self.location(),
                source,
            })?;
            out.push((name, value.into_owned()));
        }
        Ok(out)
    }

    fn timestamp(&self, value: String) -> Result<DateTime<Utc>> {
        match DateTime::parse_from_rfc3339(value.trim()) {
            Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
            Err(source) => Err(DocumentError::Timestamp {
                at: self.location(),
                value,
                source,
            }),
        }
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> Result<&'b str> {
        std::str::from_utf8(bytes).map_err(|_| DocumentError::Utf8 {
            at: self.location(),
        })
    }

    fn expect_blank(&self, bytes: &[u8]) -> Result<()> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            Ok(())
        } else {
            Err(self.unexpected_text(bytes))
        }
    }

    fn unexpected_text(&self, bytes: &[u8]) -> DocumentError {
        DocumentError::UnexpectedText {
            at: self.location(),
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    fn unexpected_element(&self, name: &[u8]) -> DocumentError {
        DocumentError::UnexpectedElement {
            at: self.location(),
            element: String::from_utf8_lossy(name).into_owned(),
        }
    }

    fn mismatched_end(&self, expected: &str, found: &[u8]) -> DocumentError {
        DocumentError::MismatchedEnd {
            at: self.location(),
            expected: expected.to_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    fn unexpected_eof(&self, element: &str) -> DocumentError {
        DocumentError::UnexpectedEof {
            at: self.location(),
            element: element.to_owned(),
        }
    }
}

impl<R: BufRead> Iterator for DocumentReader<R> {
    type Item = Result<FileSection>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_section().transpose()
    }
}
