#![forbid(unsafe_code)]

//! In-memory form of an interchange document.

use chrono::{DateTime, Utc};
use fstr_core::{CompileError, CompileMode, Definition, compile};

use crate::hash::content_hash;

pub(crate) const ROOT: &str = "StringTable";
pub(crate) const FILE: &str = "File";

/// Element kind of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryKind {
    /// `<String>`: compiled as a template.
    String,
    /// `<Literal>`: stored as raw text.
    Literal,
}

impl EntryKind {
    #[must_use]
    pub const fn element_name(self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Literal => "Literal",
        }
    }

    #[must_use]
    pub fn from_element(name: &[u8]) -> Option<Self> {
        match name {
            b"String" => Some(Self::String),
            b"Literal" => Some(Self::Literal),
            _ => None,
        }
    }
}

/// Document header carried on the root element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub generated_utc: Option<DateTime<Utc>>,
    pub locale: String,
}

/// The source file a section of entries was extracted from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceInfo {
    pub path: String,
    pub modified_utc: Option<DateTime<Utc>>,
    pub commit_hash: Option<String>,
}

impl SourceInfo {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            modified_utc: None,
            commit_hash: None,
        }
    }

    #[must_use]
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified_utc = Some(modified);
        self
    }

    #[must_use]
    pub fn with_commit(mut self, hash: impl Into<String>) -> Self {
        self.commit_hash = Some(hash.into());
        self
    }

    /// Last path component, accepting either separator.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }
}

/// One string in a file section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub text: String,
    /// Advisory [`content_hash`] of `text`.
    pub hash: String,
    pub kind: EntryKind,
    /// Extra attributes beyond `Name` and `Hash`, in document order.
    pub attributes: Vec<(String, String)>,
    /// Comment immediately preceding the entry.
    pub comment: Option<String>,
}

impl Entry {
    fn new(kind: EntryKind, key: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            key: key.into(),
            hash: content_hash(&text),
            text,
            kind,
            attributes: Vec::new(),
            comment: None,
        }
    }

    /// A template entry with its hash computed.
    #[must_use]
    pub fn template(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EntryKind::String, key, text)
    }

    /// A raw-text entry with its hash computed.
    #[must_use]
    pub fn literal(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(EntryKind::Literal, key, text)
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.kind == EntryKind::Literal
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Recompute `hash` from the current text.
    pub fn rehash(&mut self) {
        self.hash = content_hash(&self.text);
    }

    /// Build the definition for this entry: raw for literals, compiled for
    /// templates.
    pub fn compile(&self) -> Result<Definition, CompileError> {
        match self.kind {
            EntryKind::Literal => Ok(Definition::raw(&self.key, &self.text)),
            EntryKind::String => compile(&self.key, &self.text, CompileMode::Template),
        }
    }
}

/// Entries extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSection {
    pub source: SourceInfo,
    pub entries: Vec<Entry>,
}

impl FileSection {
    #[must_use]
    pub fn new(source: SourceInfo) -> Self {
        Self {
            source,
            entries: Vec::new(),
        }
    }

    /// Compile every entry, pairing each with its result.
    pub fn definitions(&self) -> impl Iterator<Item = (&Entry, Result<Definition, CompileError>)> {
        self.entries.iter().map(|entry| (entry, entry.compile()))
    }
}
