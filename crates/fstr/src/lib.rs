#![forbid(unsafe_code)]
//! fstr public facade crate.
//!
//! Re-exports the template compiler and renderer from `fstr-core`, the
//! interchange document codec from `fstr-doc` and, with the default `tables`
//! feature, string tables and the locale-aware collection from `fstr-table`.
//! Most applications only need the [`prelude`].
//!
//! ```
//! use fstr::prelude::*;
//!
//! let table = Table::new("greetings");
//! table.add("hello", "Hello {name}!", false)?;
//! let text = table.render(&ArgMap::new("hello").with("name", "World"))?;
//! assert_eq!(text, "Hello World!");
//! # Ok::<(), fstr::Error>(())
//! ```

use thiserror::Error;

// --- Core re-exports -------------------------------------------------------

pub use fstr_core::{
    ArgMap, BuilderError, BuilderState, CompileError, CompileErrorKind, CompileMode, Definition,
    DefinitionSource, Emit, LookupError, Named, NamedConstant, NumberFormat, Opcode, OutputBuilder,
    PlaceholderId, RenderError, Resolver, Template, compile, render,
};

// --- Document re-exports ---------------------------------------------------

pub use fstr_doc::{
    DocumentError, DocumentReader, DocumentWriter, Entry, EntryKind, FileSection, Header,
    SourceInfo, content_hash,
};

// --- Table re-exports ------------------------------------------------------

#[cfg(feature = "tables")]
pub use fstr_table::{
    CollectionConfig, FileStore, MemoryStore, MissingStringHook, PopulateReport, ReloadReport,
    ResourceLocator, ResourceStore, SuffixLocator, Table, TableCollection, TableError, TableKey,
    TableStatus,
};

// --- Errors ---------------------------------------------------------------

/// Any error an fstr API can return.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[cfg(feature = "tables")]
    #[error(transparent)]
    Table(#[from] TableError),
}

/// Standard result type for fstr APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ArgMap, CompileMode, Definition, Error, OutputBuilder, PlaceholderId, RenderError,
        Resolver, Result, Template, compile,
    };

    #[cfg(feature = "tables")]
    pub use crate::{Table, TableCollection};

    pub use crate::{core, doc};

    #[cfg(feature = "tables")]
    pub use crate::table;
}

pub use fstr_core as core;
pub use fstr_doc as doc;
#[cfg(feature = "tables")]
pub use fstr_table as table;
