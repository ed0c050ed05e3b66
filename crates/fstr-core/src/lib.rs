#![forbid(unsafe_code)]

//! Core of the fstr string-table system.
//!
//! Templates such as `"Hello {name}!"` are compiled once into a
//! [`Definition`]: an immutable list of [`Opcode`]s. Rendering walks those
//! opcodes, copying literal runs and asking a caller-supplied [`Resolver`] to
//! write each placeholder into an [`OutputBuilder`].
//!
//! # Role in fstr
//! `fstr-core` owns everything that happens per template: parsing, the
//! low-allocation output path and interpretation. Tables, locales and the
//! on-disk interchange format live in `fstr-table` and `fstr-doc`, which
//! build on the types exported here.
//!
//! # Example
//!
//! ```
//! use fstr_core::{ArgMap, CompileMode, compile};
//!
//! let definition = compile("greeting", "Hello {name}!", CompileMode::Template).unwrap();
//! let args = ArgMap::new("greeting").with("name", "World");
//! assert_eq!(definition.render_to_string(&args).unwrap(), "Hello World!");
//! ```

pub mod builder;
pub mod compile;
pub mod definition;
pub mod digits;
pub mod error;
pub mod intern;
pub mod missing;
pub mod render;
pub mod scratch;

pub use builder::{BuilderState, Emit, Named, NamedConstant, NumberFormat, OutputBuilder};
pub use compile::{CompileMode, RESERVED_PLACEHOLDERS, check_reserved_placeholders, compile};
pub use definition::{Definition, Opcode};
pub use error::{BuilderError, CompileError, CompileErrorKind, LookupError, RenderError};
pub use intern::PlaceholderId;
pub use missing::{SourceId, forget_source, missing_definition};
pub use render::{ArgMap, DefinitionSource, Resolver, Template, render};
