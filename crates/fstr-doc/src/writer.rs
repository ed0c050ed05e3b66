#![forbid(unsafe_code)]

//! Document writer.
//!
//! Entries are written either immediately or deferred. Deferred entries are
//! buffered per file section and written sorted by key when the section
//! ends, so regenerated documents stay diff-stable no matter what order the
//! producer visits its sources in.
//!
//! Keys are unique within a section across both modes.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{DocumentError, Result};
use crate::model::{Entry, FILE, ROOT, SourceInfo};

/// Writes an interchange document.
pub struct DocumentWriter<W: Write> {
    writer: Writer<W>,
    current: Option<SourceInfo>,
    /// Key to text of entries already written in the open section.
    written: FxHashMap<String, String>,
    deferred: BTreeMap<String, Entry>,
}

impl<W: Write> DocumentWriter<W> {
    /// Open a document for `locale`, stamped with the current time.
    pub fn new(out: W, locale: &str) -> Result<Self> {
        Self::with_timestamp(out, locale, Utc::now())
    }

    pub fn with_timestamp(out: W, locale: &str, generated: DateTime<Utc>) -> Result<Self> {
        let mut writer = Writer::new_with_indent(out, b'\t', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        let generated = timestamp(generated);
        let root = BytesStart::new(ROOT)
            .with_attributes([("GeneratedUtc", generated.as_str()), ("Locale", locale)]);
        writer.write_event(Event::Start(root))?;
        Ok(Self {
            writer,
            current: None,
            written: FxHashMap::default(),
            deferred: BTreeMap::new(),
        })
    }

    /// Source of the open section, if any.
    #[must_use]
    pub fn current_file(&self) -> Option<&SourceInfo> {
        self.current.as_ref()
    }

    /// Open a section for `source`, closing the previous one.
    ///
    /// Re-opening the section that is already open does nothing.
    pub fn start_file(&mut self, source: SourceInfo) -> Result<()> {
        if self.current.as_ref() == Some(&source) {
            return Ok(());
        }
        if self.current.is_some() {
            self.end_file()?;
        }
        self.written.clear();
        self.deferred.clear();

        self.write_comment(&format!("Start of file {}", source.file_name()))?;
        let modified = source.modified_utc.map(timestamp);
        let mut start = BytesStart::new(FILE);
        start.push_attribute(("SourcePath", source.path.as_str()));
        if let Some(modified) = &modified {
            start.push_attribute(("SourceModifiedUtc", modified.as_str()));
        }
        if let Some(hash) = source.commit_hash.as_deref().filter(|h| !h.trim().is_empty()) {
            start.push_attribute(("SourceCommitHash", hash));
        }
        self.writer.write_event(Event::Start(start))?;
        self.current = Some(source);
        Ok(())
    }

    fn check_unique(&self, entry: &Entry) -> Result<()> {
        let Some(source) = &self.current else {
            return Err(DocumentError::NoOpenSection);
        };
        let existing = self
            .written
            .get(&entry.key)
            .or_else(|| self.deferred.get(&entry.key).map(|e| &e.text));
        match existing {
            Some(existing) => Err(DocumentError::DuplicateKey {
                section: source.path.clone(),
                key: entry.key.clone(),
                existing: existing.clone(),
                text: entry.text.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Write `entry` now, preceded by its comment if it has one.
    pub fn write_entry(&mut self, entry: &Entry) -> Result<()> {
        self.check_unique(entry)?;
        self.emit_entry(entry)?;
        self.written.insert(entry.key.clone(), entry.text.clone());
        Ok(())
    }

    /// Buffer `entry` until the section is flushed.
    pub fn defer_entry(&mut self, entry: Entry) -> Result<()> {
        self.check_unique(&entry)?;
        self.deferred.insert(entry.key.clone(), entry);
        Ok(())
    }

    /// Write every deferred entry in key order.
    pub fn flush(&mut self) -> Result<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }
        debug!(target: "fstr.doc", entries = self.deferred.len(), "flushing deferred entries");
        for (key, entry) in std::mem::take(&mut self.deferred) {
            self.emit_entry(&entry)?;
            self.written.insert(key, entry.text);
        }
        Ok(())
    }

    /// Flush and close the open section.
    pub fn end_file(&mut self) -> Result<()> {
        self.flush()?;
        let Some(source) = self.current.take() else {
            return Err(DocumentError::NoOpenSection);
        };
        self.writer.write_event(Event::End(BytesEnd::new(FILE)))?;
        self.write_comment(&format!("End of file {}", source.file_name()))?;
        self.written.clear();
        Ok(())
    }

    /// Write a free-standing comment. `--` is not allowed in XML comments
    /// and is broken up.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        let mut text = text.to_owned();
        while text.contains("--") {
            text = text.replace("--", "- -");
        }
        self.writer
            .write_event(Event::Comment(BytesText::from_escaped(format!(" {text} "))))?;
        Ok(())
    }

    /// Close any open section and the root, returning the output.
    pub fn finish(mut self) -> Result<W> {
        if self.current.is_some() {
            self.end_file()?;
        }
        self.writer.write_event(Event::End(BytesEnd::new(ROOT)))?;
        let mut out = self.writer.into_inner();
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(out)
    }

    fn emit_entry(&mut self, entry: &Entry) -> Result<()> {
        if let Some(comment) = &entry.comment {
            self.write_comment(comment)?;
        }
        let element = entry.kind.element_name();
        let mut start = BytesStart::new(element);
        start.push_attribute(("Name", entry.key.as_str()));
        start.push_attribute(("Hash", entry.hash.as_str()));
        for (name, value) in &entry.attributes {
            start.push_attribute((name.as_str(), value.as_str()));
        }

        if entry.text.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        self.writer.write_event(Event::Start(start))?;
        if needs_cdata(&entry.text) {
            for part in cdata_parts(&entry.text) {
                self.writer.write_event(Event::CData(BytesCData::new(part)))?;
            }
        } else {
            self.writer.write_event(Event::Text(BytesText::new(&entry.text)))?;
        }
        self.writer.write_event(Event::End(BytesEnd::new(element)))?;
        Ok(())
    }
}

fn timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn needs_cdata(text: &str) -> bool {
    text.contains(['<', '&', '\n'])
}

/// Split text so no part contains `]]>`: each occurrence is cut between
/// `]]` and `>`.
fn cdata_parts(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = Some(text);
    std::iter::from_fn(move || {
        let current = rest?;
        match current.find("]]>") {
            Some(at) => {
                let (head, tail) = current.split_at(at + 2);
                rest = Some(tail);
                Some(head)
            }
            None => {
                rest = None;
                Some(current)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::DocumentReader;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn writer() -> DocumentWriter<Vec<u8>> {
        DocumentWriter::with_timestamp(Vec::new(), "en-US", fixed_time()).unwrap()
    }

    fn output(writer: DocumentWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn cdata_parts_split_terminator() {
        let parts: Vec<&str> = cdata_parts("a]]>b]]>c").collect();
        assert_eq!(parts, ["a]]", ">b]]", ">c"]);
        let whole: Vec<&str> = cdata_parts("plain").collect();
        assert_eq!(whole, ["plain"]);
    }

    #[test]
    fn header_and_section_markers() {
        let mut w = writer();
        w.start_file(SourceInfo::new("src/menu.rs").with_commit("abc"))
            .unwrap();
        w.write_entry(&Entry::template("k", "v")).unwrap();
        let xml = output(w);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(xml.contains("GeneratedUtc=\"2024-05-01T12:30:00Z\""));
        assert!(xml.contains("Locale=\"en-US\""));
        assert!(xml.contains("<!-- Start of file menu.rs -->"));
        assert!(xml.contains("<!-- End of file menu.rs -->"));
        assert!(xml.contains("SourceCommitHash=\"abc\""));
        assert!(xml.contains(">v</String>"));
        assert!(xml.trim_end().ends_with("</StringTable>"));
    }

    #[test]
    fn markup_text_uses_cdata() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.write_entry(&Entry::template("markup", "<b>{x}</b>")).unwrap();
        w.write_entry(&Entry::template("amp", "a & b")).unwrap();
        w.write_entry(&Entry::template("lines", "one\ntwo")).unwrap();
        w.write_entry(&Entry::template("quote", "say \"hi\"")).unwrap();
        let xml = output(w);
        assert!(xml.contains("<![CDATA[<b>{x}</b>]]>"));
        assert!(xml.contains("<![CDATA[a & b]]>"));
        assert!(xml.contains("<![CDATA[one\ntwo]]>"));
        assert!(!xml.contains("<![CDATA[say"));
    }

    #[test]
    fn cdata_terminator_round_trips() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.write_entry(&Entry::literal("tricky", "x <y> ]]> z")).unwrap();
        let xml = output(w);
        let sections: Vec<_> = DocumentReader::from_text(&xml)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(sections[0].entries[0].text, "x <y> ]]> z");
    }

    #[test]
    fn entries_require_open_section() {
        let mut w = writer();
        assert!(matches!(
            w.write_entry(&Entry::template("k", "v")),
            Err(DocumentError::NoOpenSection)
        ));
        assert!(matches!(w.end_file(), Err(DocumentError::NoOpenSection)));
    }

    #[test]
    fn duplicate_immediate_write() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.write_entry(&Entry::template("k", "first")).unwrap();
        let err = w.write_entry(&Entry::template("k", "second")).unwrap_err();
        match err {
            DocumentError::DuplicateKey {
                section,
                key,
                existing,
                text,
            } => {
                assert_eq!(section, "a.rs");
                assert_eq!(key, "k");
                assert_eq!(existing, "first");
                assert_eq!(text, "second");
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn duplicate_across_deferred_and_immediate() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.defer_entry(Entry::template("k", "deferred")).unwrap();
        assert!(matches!(
            w.write_entry(&Entry::template("k", "now")),
            Err(DocumentError::DuplicateKey { .. })
        ));
        assert!(matches!(
            w.defer_entry(Entry::template("k", "again")),
            Err(DocumentError::DuplicateKey { .. })
        ));
        w.flush().unwrap();
        assert!(matches!(
            w.defer_entry(Entry::template("k", "after flush")),
            Err(DocumentError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn keys_reset_per_section() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.write_entry(&Entry::template("k", "a")).unwrap();
        w.start_file(SourceInfo::new("b.rs")).unwrap();
        w.write_entry(&Entry::template("k", "b")).unwrap();
        let sections: Vec<_> = DocumentReader::from_text(&output(w))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn restarting_same_file_is_a_no_op() {
        let mut w = writer();
        let source = SourceInfo::new("a.rs");
        w.start_file(source.clone()).unwrap();
        w.write_entry(&Entry::template("k", "v")).unwrap();
        w.start_file(source).unwrap();
        assert!(w.write_entry(&Entry::template("k", "v2")).is_err());
        let xml = output(w);
        assert_eq!(xml.matches("<File").count(), 1);
    }

    #[test]
    fn deferred_entries_are_sorted() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        for key in ["zeta", "alpha", "mid"] {
            w.defer_entry(Entry::template(key, key.to_uppercase())).unwrap();
        }
        let xml = output(w);
        let alpha = xml.find("alpha").unwrap();
        let mid = xml.find("\"mid\"").unwrap();
        let zeta = xml.find("zeta").unwrap();
        assert!(alpha < mid && mid < zeta);
    }

    #[test]
    fn comments_are_sanitized() {
        let mut w = writer();
        w.write_comment("a -- b --- c").unwrap();
        let xml = output(w);
        let start = xml.find("<!--").unwrap() + 4;
        let end = xml[start..].find("-->").unwrap() + start;
        assert!(!xml[start..end].contains("--"));
    }

    #[test]
    fn empty_text_is_an_empty_element() {
        let mut w = writer();
        w.start_file(SourceInfo::new("a.rs")).unwrap();
        w.write_entry(&Entry::literal("blank", "")).unwrap();
        let xml = output(w);
        assert!(xml.contains("<Literal Name=\"blank\""));
        assert!(xml.contains("/>"));
    }
}
