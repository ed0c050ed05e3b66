use std::path::PathBuf;

use fstr_core::RenderError;
use fstr_doc::DocumentError;
use fstr_table::TableError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Document {
        path: PathBuf,
        source: DocumentError,
    },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("{message}")]
    Exit { code: i32, message: String },
}

impl ToolError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Exit { code, .. } => *code,
            Self::InvalidArgument { .. } => 2,
            _ => 1,
        }
    }

    #[must_use]
    pub fn exit(code: i32, message: impl Into<String>) -> Self {
        Self::Exit {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn document(path: impl Into<PathBuf>) -> impl FnOnce(DocumentError) -> Self {
        let path = path.into();
        move |source| Self::Document { path, source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Read { path, source }
    }
}

#[cfg(test)]
mod tests {
    use super::ToolError;

    #[test]
    fn exit_constructor_preserves_code_and_message() {
        let error = ToolError::exit(3, "two problems found");
        assert_eq!(error.exit_code(), 3);
        assert_eq!(error.to_string(), "two problems found");
    }

    #[test]
    fn invalid_arguments_exit_with_usage_code() {
        assert_eq!(ToolError::invalid("bad pair").exit_code(), 2);
    }

    #[test]
    fn other_errors_exit_with_one() {
        let error = ToolError::from(std::io::Error::other("disk on fire"));
        assert_eq!(error.exit_code(), 1);
        assert_eq!(error.to_string(), "I/O error: disk on fire");
    }
}
