#![forbid(unsafe_code)]

//! Interchange document codec for fstr string tables.
//!
//! A document is XML of the form:
//!
//! ```text
//! <StringTable GeneratedUtc="..." Locale="de-DE">
//!     <File SourcePath="src/menu.rs" SourceModifiedUtc="..." SourceCommitHash="...">
//!         <!-- optional comment for the next entry -->
//!         <String Name="menu.open" Hash="1f2e...">Open {file}</String>
//!         <Literal Name="menu.raw" Hash="9a0b...">{verbatim}</Literal>
//!     </File>
//! </StringTable>
//! ```
//!
//! `String` entries are compiled as templates, `Literal` entries are kept as
//! raw text. [`DocumentReader`] streams sections; [`DocumentWriter`]
//! produces them, optionally deferring entries so output is sorted by key.

pub mod error;
pub mod hash;
pub mod model;
pub mod reader;
pub mod writer;

pub use error::{DocumentError, Location, Result};
pub use hash::{HASH_BYTES, content_hash};
pub use model::{Entry, EntryKind, FileSection, Header, SourceInfo};
pub use reader::DocumentReader;
pub use writer::DocumentWriter;
