#![forbid(unsafe_code)]

//! Error types shared by the compiler, builder and interpreter.

use thiserror::Error;

/// A template failed to compile.
///
/// Always scoped to one template: callers compiling a batch record the error
/// and move on to the next entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template `{key}` at offset {offset}: {kind}")]
pub struct CompileError {
    /// Key of the template being compiled.
    pub key: String,
    /// Character offset of the offending token.
    pub offset: usize,
    pub kind: CompileErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileErrorKind {
    #[error("unsupported escape sequence `\\{0}`")]
    UnsupportedEscape(char),
    #[error("template ends inside an escape sequence")]
    DanglingEscape,
    #[error("`\\u` escape needs exactly four hex digits")]
    InvalidUnicodeEscape,
    #[error("`\\u{0:04X}` is not a valid character")]
    InvalidCodePoint(u32),
    #[error("unexpected `{{` inside placeholder")]
    NestedPlaceholder,
    #[error("unexpected `}}}}` inside placeholder")]
    EscapedCloseInPlaceholder,
    #[error("unmatched `}}`")]
    UnmatchedClose,
    #[error("placeholder is never closed")]
    UnterminatedPlaceholder,
    #[error("placeholder name is empty")]
    EmptyPlaceholder,
    #[error("placeholder name `{0}` is reserved")]
    ReservedPlaceholder(String),
}

/// A key could not be resolved to a definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("string table key must not be blank")]
    BlankKey,
    #[error("key `{key}` not found in string table `{table}`")]
    KeyNotFound { table: String, key: String },
}

/// Rendering a definition failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("template `{key}` has no value for placeholder `{placeholder}`")]
    UnknownPlaceholder { key: String, placeholder: String },
    #[error("`{name}` is not a literal")]
    NotALiteral { name: String },
    #[error("no string table configured to render nested template `{key}`")]
    NoDefinitionSource { key: String },
    #[error("template `{key}`: {message}")]
    Resolver { key: String, message: String },
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Misuse of an [`OutputBuilder`](crate::OutputBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("output builder already built")]
    AlreadyBuilt,
}
