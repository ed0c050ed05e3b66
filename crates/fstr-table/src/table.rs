#![forbid(unsafe_code)]

//! String tables: named maps from key to compiled [`Definition`].
//!
//! # Lookup order
//!
//! [`Table::get`] resolves a key as follows:
//!
//! 1. Blank keys are rejected with [`LookupError::BlankKey`].
//! 2. A local hit is returned as-is.
//! 3. On a miss every missing-string hook on this table is notified.
//! 4. If a fallback table is set, the lookup is delegated to it.
//! 5. Otherwise a required lookup fails with [`LookupError::KeyNotFound`]
//!    and an optional one returns this table's cached missing sentinel.
//!
//! # Concurrency
//!
//! Reads take a short read lock on the entry map. Reloads build the new map
//! off to the side and swap it in under the write lock, so readers only ever
//! see the old or the new contents. Definitions handed out earlier stay
//! valid after a clear or reload.

use std::fmt;
use std::io::BufRead;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use fstr_core::{
    CompileMode, Definition, DefinitionSource, LookupError, NumberFormat, OutputBuilder,
    RenderError, SourceId, Template, compile, forget_source, missing_definition, render,
};
use fstr_doc::DocumentReader;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::error::{Result, TableError};

/// Called with the table and key whenever a lookup misses locally.
pub type MissingStringHook = Arc<dyn Fn(&Table, &str) + Send + Sync>;

type EntryMap = FxHashMap<Box<str>, Arc<Definition>>;

/// Bookkeeping maintained by the table collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStatus {
    /// Locale the table was last populated for.
    pub locale: Option<String>,
    /// The backing resource was absent at the last (re)load.
    pub missing_resource: bool,
    /// Location the table was last populated from.
    pub location: Option<String>,
    /// Entries of that resource that failed to load. A table with
    /// rejections is reloaded on its next request.
    pub rejected: usize,
}

/// Outcome of loading a document into a table.
#[derive(Debug, Default)]
pub struct PopulateReport {
    /// Entries now present in the table.
    pub loaded: usize,
    /// Entries that failed to compile or collided with an existing key.
    pub rejected: Vec<TableError>,
}

impl PopulateReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// A named, case-exact map from key to [`Definition`].
pub struct Table {
    id: SourceId,
    name: String,
    entries: RwLock<EntryMap>,
    fallback: RwLock<Option<Arc<Table>>>,
    hooks: RwLock<Vec<MissingStringHook>>,
    status: Mutex<TableStatus>,
    generation: AtomicU64,
    reload_lock: Mutex<()>,
}

impl Table {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SourceId::next(),
            name: name.into(),
            entries: RwLock::new(EntryMap::default()),
            fallback: RwLock::new(None),
            hooks: RwLock::new(Vec::new()),
            status: Mutex::new(TableStatus::default()),
            generation: AtomicU64::new(0),
            reload_lock: Mutex::new(()),
        }
    }

    /// Identity used to scope this table's missing sentinels.
    #[must_use]
    pub fn id(&self) -> SourceId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, EntryMap> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, EntryMap> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_status(&self) -> MutexGuard<'_, TableStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_reload(&self) -> MutexGuard<'_, ()> {
        self.reload_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read_entries().contains_key(key)
    }

    /// Every key, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read_entries().keys().map(|k| k.to_string()).collect();
        keys.sort_unstable();
        keys
    }

    /// Compile `format` and store it under `name`.
    pub fn add(&self, name: &str, format: &str, allow_overwrite: bool) -> Result<Arc<Definition>> {
        let definition = compile(name, format, CompileMode::Template)?;
        self.insert(definition, allow_overwrite)
    }

    /// Store `text` under `name` without escape or placeholder processing.
    pub fn add_raw(&self, name: &str, text: &str, allow_overwrite: bool) -> Result<Arc<Definition>> {
        self.insert(Definition::raw(name, text), allow_overwrite)
    }

    /// Store a compiled definition under its own name.
    ///
    /// Without `allow_overwrite` an existing key is an error and the stored
    /// definition is left untouched.
    pub fn insert(&self, definition: Definition, allow_overwrite: bool) -> Result<Arc<Definition>> {
        let definition = Arc::new(definition);
        let mut entries = self.write_entries();
        insert_entry(&mut entries, &self.name, Arc::clone(&definition), allow_overwrite)?;
        Ok(definition)
    }

    /// Look up `name`; see the [module docs](self) for the resolution order.
    pub fn get(&self, name: &str, optional: bool) -> std::result::Result<Arc<Definition>, LookupError> {
        if name.trim().is_empty() {
            return Err(LookupError::BlankKey);
        }
        if let Some(found) = self.read_entries().get(name) {
            return Ok(Arc::clone(found));
        }

        debug!(target: "fstr.table", table = %self.name, key = name, optional, "missing string");
        self.notify_missing(name);

        if let Some(fallback) = self.fallback() {
            return fallback.get(name, optional);
        }
        if optional {
            Ok(missing_definition(self.id, name))
        } else {
            Err(LookupError::KeyNotFound {
                table: self.name.clone(),
                key: name.to_owned(),
            })
        }
    }

    /// Render `value` using the definition stored under its table key.
    ///
    /// An absent key renders as `<MISSING: key>`. Nested templates appended
    /// by the resolver are looked up in this table too.
    pub fn render<T: Template + ?Sized>(&self, value: &T) -> std::result::Result<String, RenderError> {
        let definition = self.get(value.table_key(), true)?;
        let format = self
            .locale()
            .map_or_else(NumberFormat::default, |locale| NumberFormat::for_locale(&locale));
        let mut out = OutputBuilder::new()
            .with_number_format(format)
            .with_source(self);
        render(&definition, value, &mut out)?;
        Ok(out.finish().into_owned())
    }

    /// Remove every entry. Definitions already handed out stay valid.
    pub fn clear(&self) {
        self.write_entries().clear();
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn fallback(&self) -> Option<Arc<Table>> {
        self.fallback.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Set or clear the table consulted on a local miss.
    ///
    /// A chain that would lead back to this table is rejected.
    pub fn set_fallback(&self, fallback: Option<Arc<Table>>) -> Result<()> {
        let mut next = fallback.clone();
        while let Some(table) = next {
            if table.id == self.id {
                return Err(TableError::FallbackCycle {
                    table: self.name.clone(),
                    fallback: fallback.map(|f| f.name.clone()).unwrap_or_default(),
                });
            }
            next = table.fallback();
        }
        *self.fallback.write().unwrap_or_else(PoisonError::into_inner) = fallback;
        Ok(())
    }

    pub fn subscribe_missing(&self, hook: MissingStringHook) {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner).push(hook);
    }

    fn notify_missing(&self, key: &str) {
        let hooks = self.hooks.read().unwrap_or_else(PoisonError::into_inner).clone();
        invoke_hooks(&hooks, self, key);
    }

    #[must_use]
    pub fn status(&self) -> TableStatus {
        self.lock_status().clone()
    }

    #[must_use]
    pub fn locale(&self) -> Option<String> {
        self.lock_status().locale.clone()
    }

    #[must_use]
    pub fn location(&self) -> Option<String> {
        self.lock_status().location.clone()
    }

    /// True when the backing resource was absent at the last (re)load.
    #[must_use]
    pub fn is_missing_resource(&self) -> bool {
        self.lock_status().missing_resource
    }

    /// Incremented by every clear and reload.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn set_status(&self, status: TableStatus) {
        *self.lock_status() = status;
    }

    /// Load every entry of a document into this table.
    ///
    /// Entries that fail to compile, or collide with an existing key when
    /// `allow_overwrite` is false, are reported and skipped; the rest are
    /// loaded. A structurally broken document is an error and leaves the
    /// table unchanged.
    pub fn populate_from_reader<R: BufRead>(&self, input: R, allow_overwrite: bool) -> Result<PopulateReport> {
        let location = self.location().unwrap_or_else(|| self.name.clone());
        let (definitions, mut rejected) = self.stage_document(input, &location)?;
        let mut loaded = 0;
        {
            let mut entries = self.write_entries();
            for definition in definitions {
                match insert_entry(&mut entries, &self.name, definition, allow_overwrite) {
                    Ok(()) => loaded += 1,
                    Err(err) => rejected.push(err),
                }
            }
        }
        self.log_rejected(&rejected, &location);
        Ok(PopulateReport { loaded, rejected })
    }

    /// [`populate_from_reader`](Self::populate_from_reader) over a string.
    pub fn populate_from_str(&self, text: &str, allow_overwrite: bool) -> Result<PopulateReport> {
        self.populate_from_reader(text.as_bytes(), allow_overwrite)
    }

    /// Replace the table's contents with a document, swapping the new
    /// entries in at once.
    pub(crate) fn reload_from_reader<R: BufRead>(&self, input: R, location: &str) -> Result<PopulateReport> {
        let (definitions, mut rejected) = self.stage_document(input, location)?;
        let mut staged = EntryMap::default();
        for definition in definitions {
            if let Err(err) = insert_entry(&mut staged, &self.name, definition, false) {
                rejected.push(err);
            }
        }
        let loaded = staged.len();
        *self.write_entries() = staged;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.log_rejected(&rejected, location);
        Ok(PopulateReport { loaded, rejected })
    }

    /// Read and compile a whole document without touching the table.
    #[allow(clippy::type_complexity)]
    fn stage_document<R: BufRead>(
        &self,
        input: R,
        location: &str,
    ) -> Result<(Vec<Arc<Definition>>, Vec<TableError>)> {
        let document_error = |source| TableError::Document {
            location: location.to_owned(),
            source,
        };
        let mut reader = DocumentReader::new(input).map_err(document_error)?;
        let locale = &reader.header().locale;
        if !locale.is_empty() {
            debug!(target: "fstr.table", table = %self.name, location, locale = %locale, "reading document");
        }

        let mut definitions = Vec::new();
        let mut rejected = Vec::new();
        while let Some(section) = reader.next_section().map_err(document_error)? {
            for (_, result) in section.definitions() {
                match result {
                    Ok(definition) => definitions.push(Arc::new(definition)),
                    Err(err) => rejected.push(TableError::Compile(err)),
                }
            }
        }
        Ok((definitions, rejected))
    }

    fn log_rejected(&self, rejected: &[TableError], location: &str) {
        for err in rejected {
            warn!(target: "fstr.table", table = %self.name, location, error = %err, "rejected string table entry");
        }
    }
}

fn insert_entry(
    entries: &mut EntryMap,
    table: &str,
    definition: Arc<Definition>,
    allow_overwrite: bool,
) -> Result<()> {
    if !allow_overwrite && entries.contains_key(definition.name()) {
        return Err(TableError::DuplicateKey {
            table: table.to_owned(),
            key: definition.name().to_owned(),
        });
    }
    entries.insert(definition.name().into(), definition);
    Ok(())
}

/// Run each hook, containing panics so one bad observer cannot break a
/// lookup or starve the others.
pub(crate) fn invoke_hooks(hooks: &[MissingStringHook], table: &Table, key: &str) {
    for hook in hooks {
        if catch_unwind(AssertUnwindSafe(|| hook(table, key))).is_err() {
            warn!(target: "fstr.table", table = %table.name, key, "missing-string hook panicked");
        }
    }
}

impl DefinitionSource for Table {
    fn definition(&self, name: &str, optional: bool) -> std::result::Result<Arc<Definition>, LookupError> {
        self.get(name, optional)
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        forget_source(self.id);
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("entries", &self.len())
            .field("fallback", &self.fallback().map(|t| t.name.clone()))
            .field("status", &self.status())
            .finish()
    }
}
