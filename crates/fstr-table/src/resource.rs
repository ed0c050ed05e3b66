#![forbid(unsafe_code)]

//! Where string table documents live and how they are opened.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use rustc_hash::FxHashMap;

/// Maps a table key and locale to a resource location.
///
/// The same locator is used for the first load and every reload, so a locale
/// switch always resolves to the matching document.
pub trait ResourceLocator: Send + Sync {
    fn locate(&self, folder: &str, name: &str, locale: &str) -> String;
}

/// `<folder>/<name><separator><locale>.<extension>`, e.g. `strings/menu_de-DE.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixLocator {
    pub separator: String,
    pub extension: String,
}

impl Default for SuffixLocator {
    fn default() -> Self {
        Self {
            separator: "_".into(),
            extension: "xml".into(),
        }
    }
}

impl SuffixLocator {
    #[must_use]
    pub fn new(separator: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            extension: extension.into(),
        }
    }
}

impl ResourceLocator for SuffixLocator {
    fn locate(&self, folder: &str, name: &str, locale: &str) -> String {
        let file = format!("{name}{}{locale}.{}", self.separator, self.extension);
        if folder.is_empty() {
            file
        } else if folder.ends_with(['/', '\\']) {
            format!("{folder}{file}")
        } else {
            format!("{folder}/{file}")
        }
    }
}

/// A readable resource.
pub type ResourceReader = Box<dyn BufRead + Send>;

/// Opens resources by location.
pub trait ResourceStore: Send + Sync {
    /// Open `location`; `Ok(None)` means it does not exist.
    fn open(&self, location: &str) -> io::Result<Option<ResourceReader>>;
}

/// Reads resources from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl ResourceStore for FileStore {
    fn open(&self, location: &str) -> io::Result<Option<ResourceReader>> {
        match File::open(location) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// In-memory resources, for embedded documents and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<FxHashMap<String, Arc<[u8]>>>,
    opens: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the document at `location`.
    pub fn insert(&self, location: impl Into<String>, text: &str) {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.insert(location.into(), Arc::from(text.as_bytes()));
    }

    /// Remove the document at `location`, returning whether it existed.
    pub fn remove(&self, location: &str) -> bool {
        let mut documents = self.documents.write().unwrap_or_else(PoisonError::into_inner);
        documents.remove(location).is_some()
    }

    #[must_use]
    pub fn contains(&self, location: &str) -> bool {
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        documents.contains_key(location)
    }

    /// Number of `open` calls, including ones for absent locations.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl ResourceStore for MemoryStore {
    fn open(&self, location: &str) -> io::Result<Option<ResourceReader>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.read().unwrap_or_else(PoisonError::into_inner);
        Ok(documents
            .get(location)
            .map(|bytes| Box::new(Cursor::new(Arc::clone(bytes))) as ResourceReader))
    }
}

impl<S: ResourceStore + ?Sized> ResourceStore for Arc<S> {
    fn open(&self, location: &str) -> io::Result<Option<ResourceReader>> {
        (**self).open(location)
    }
}
