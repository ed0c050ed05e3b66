#![forbid(unsafe_code)]

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocumentError>;

/// Where in a document a problem was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    /// Byte offset into the input.
    pub position: u64,
    /// `SourcePath` of the enclosing file section, if any.
    pub section: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {}", self.position)?;
        if let Some(section) = &self.section {
            write!(f, " in file section `{section}`")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed XML at {at}: {source}")]
    Xml {
        at: Location,
        source: quick_xml::Error,
    },

    #[error("unexpected element `{element}` at {at}")]
    UnexpectedElement { at: Location, element: String },

    #[error("expected `</{expected}>` but found `</{found}>` at {at}")]
    MismatchedEnd {
        at: Location,
        expected: String,
        found: String,
    },

    #[error("unexpected text {text:?} at {at}")]
    UnexpectedText { at: Location, text: String },

    #[error("`{element}` is missing required attribute `{attribute}` at {at}")]
    MissingAttribute {
        at: Location,
        element: String,
        attribute: &'static str,
    },

    #[error("document ends inside `{element}` at {at}")]
    UnexpectedEof { at: Location, element: String },

    #[error("document has no `StringTable` root element")]
    MissingRoot,

    #[error("invalid UTF-8 at {at}")]
    Utf8 { at: Location },

    #[error("invalid timestamp {value:?} at {at}: {source}")]
    Timestamp {
        at: Location,
        value: String,
        source: chrono::ParseError,
    },

    #[error(
        "key `{key}` already written to file section `{section}` with text {existing:?} (rejected text {text:?})"
    )]
    DuplicateKey {
        section: String,
        key: String,
        existing: String,
        text: String,
    },

    #[error("no file section is open")]
    NoOpenSection,

    #[error("XML write error: {0}")]
    Write(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocumentError {
    /// Location of the problem, for errors raised while reading.
    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Xml { at, .. }
            | Self::UnexpectedElement { at, .. }
            | Self::MismatchedEnd { at, .. }
            | Self::UnexpectedText { at, .. }
            | Self::MissingAttribute { at, .. }
            | Self::UnexpectedEof { at, .. }
            | Self::Utf8 { at }
            | Self::Timestamp { at, .. } => Some(at),
            Self::MissingRoot
            | Self::DuplicateKey { .. }
            | Self::NoOpenSection
            | Self::Write(_)
            | Self::Io(_) => None,
        }
    }
}
