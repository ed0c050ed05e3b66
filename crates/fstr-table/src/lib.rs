#![forbid(unsafe_code)]

//! String tables and the locale-aware table collection.
//!
//! # Role in fstr
//! `fstr-table` stores compiled definitions under keys ([`Table`]), chains
//! tables through fallbacks, notifies observers about missing strings and
//! caches one table per folder/name for the current locale
//! ([`TableCollection`]). Documents are read with `fstr-doc`; templates are
//! compiled and rendered with `fstr-core`.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use fstr_core::ArgMap;
//! use fstr_table::{MemoryStore, ResourceStore, TableCollection};
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert(
//!     "strings/menu_en.xml",
//!     r#"<StringTable><File SourcePath="menu.rs"><String Name="open">Open {file}</String></File></StringTable>"#,
//! );
//! let tables = TableCollection::new("en").with_store(store as Arc<dyn ResourceStore>);
//! let menu = tables.load_from_path("strings", "menu", false, false).unwrap();
//! let text = menu.render(&ArgMap::new("open").with("file", "a.txt")).unwrap();
//! assert_eq!(text, "Open a.txt");
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod resource;
pub mod table;

pub use collection::{ReloadReport, TableCollection, TableKey};
pub use config::{CollectionConfig, ConfigError, LOCALE_ENV, normalize_locale};
pub use error::{Result, TableError};
pub use resource::{FileStore, MemoryStore, ResourceLocator, ResourceReader, ResourceStore, SuffixLocator};
pub use table::{MissingStringHook, PopulateReport, Table, TableStatus};
