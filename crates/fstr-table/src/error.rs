#![forbid(unsafe_code)]

use fstr_core::{CompileError, LookupError, RenderError};
use fstr_doc::DocumentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TableError>;

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("key `{key}` already exists in string table `{table}`")]
    DuplicateKey { table: String, key: String },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("malformed string table `{location}`: {source}")]
    Document {
        location: String,
        source: DocumentError,
    },

    #[error("string table resource `{location}` not found")]
    ResourceNotFound { location: String },

    #[error("I/O error reading `{location}`: {source}")]
    Io {
        location: String,
        source: std::io::Error,
    },

    #[error("making `{fallback}` the fallback of `{table}` would create a cycle")]
    FallbackCycle { table: String, fallback: String },

    /// Some entries of a loaded resource failed to compile or collided.
    /// The remaining entries were loaded.
    #[error(
        "string table `{location}` rejected {} entries; first: {}",
        .errors.len(),
        first_rejection(.errors)
    )]
    Rejected {
        location: String,
        errors: Vec<TableError>,
    },
}

fn first_rejection(errors: &[TableError]) -> String {
    errors.first().map(ToString::to_string).unwrap_or_default()
}

impl TableError {
    /// True for errors caused by the backing resource rather than its
    /// contents or the caller.
    #[must_use]
    pub fn is_resource_error(&self) -> bool {
        matches!(
            self,
            Self::ResourceNotFound { .. } | Self::Io { .. } | Self::Document { .. }
        )
    }
}
