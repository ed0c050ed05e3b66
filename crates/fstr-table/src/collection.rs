#![forbid(unsafe_code)]

//! A locale-aware cache of string tables.
//!
//! Tables are keyed by [`TableKey`] and loaded on demand for the
//! collection's current locale. Switching locale is lazy: each cached table
//! reloads itself in place the next time it is requested, so `Arc<Table>`
//! handles held by callers stay valid and pick up the new strings.
//!
//! The collection map is locked only for lookups and inserts, never across
//! resource I/O. Two callers loading the same absent key may both read the
//! resource; the first to insert wins and the other's table is discarded.

use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock};

use arc_swap::ArcSwap;
use rustc_hash::FxHashMap;
use tracing::{debug, debug_span, warn};

use crate::config::CollectionConfig;
use crate::error::{Result, TableError};
use crate::resource::{FileStore, ResourceLocator, ResourceStore, SuffixLocator};
use crate::table::{MissingStringHook, Table, TableStatus, invoke_hooks};

/// Identifies a table within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub folder: String,
    pub name: String,
}

impl TableKey {
    #[must_use]
    pub fn new(folder: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.folder.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.folder, self.name)
        }
    }
}

/// Outcome of [`TableCollection::reload_all`].
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Tables repopulated from their resource.
    pub reloaded: Vec<TableKey>,
    /// Tables whose resource is absent; they are now empty.
    pub missing: Vec<TableKey>,
    /// Tables reloaded without the entries that failed to compile, each
    /// with its [`TableError::Rejected`].
    pub rejected: Vec<(TableKey, TableError)>,
    /// Tables that could not be reloaded and were left as they were.
    pub failed: Vec<(TableKey, TableError)>,
}

impl ReloadReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty()
    }
}

/// Cache of [`Table`]s for one target locale at a time.
pub struct TableCollection {
    tables: Mutex<FxHashMap<TableKey, Arc<Table>>>,
    locale: ArcSwap<String>,
    locator: Box<dyn ResourceLocator>,
    store: Arc<dyn ResourceStore>,
    hooks: Arc<RwLock<Vec<MissingStringHook>>>,
    empty: OnceLock<Arc<Table>>,
}

impl TableCollection {
    /// A collection reading `<folder>/<name>_<locale>.xml` from disk.
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            tables: Mutex::new(FxHashMap::default()),
            locale: ArcSwap::from_pointee(locale.into()),
            locator: Box::new(SuffixLocator::default()),
            store: Arc::new(FileStore),
            hooks: Arc::new(RwLock::new(Vec::new())),
            empty: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn with_config(config: &CollectionConfig) -> Self {
        Self::new(config.locale.clone()).with_locator(config.locator())
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: impl ResourceLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    fn lock_tables(&self) -> MutexGuard<'_, FxHashMap<TableKey, Arc<Table>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current target locale.
    #[must_use]
    pub fn locale(&self) -> String {
        (**self.locale.load()).clone()
    }

    /// Change the target locale. Cached tables reload on their next request.
    pub fn set_locale(&self, locale: impl Into<String>) {
        let locale = locale.into();
        let previous = self.locale.swap(Arc::new(locale.clone()));
        if *previous != locale {
            debug!(target: "fstr.collection", from = %previous, to = %locale, "target locale changed");
        }
    }

    /// Register a hook notified by every table this collection hands out,
    /// including tables loaded before the hook was added.
    pub fn subscribe_missing(&self, hook: MissingStringHook) {
        self.hooks.write().unwrap_or_else(PoisonError::into_inner).push(hook);
    }

    /// Cached table for `folder`/`name`, without loading or reloading.
    #[must_use]
    pub fn get(&self, folder: &str, name: &str) -> Option<Arc<Table>> {
        self.lock_tables().get(&TableKey::new(folder, name)).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_tables().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock_tables().is_empty()
    }

    /// Drop every cached table. Handles held elsewhere stay usable.
    pub fn clear_cache(&self) {
        self.lock_tables().clear();
    }

    /// A shared table with no entries, for callers that have nowhere to look
    /// strings up. Do not add to it.
    #[must_use]
    pub fn empty_table(&self) -> Arc<Table> {
        Arc::clone(self.empty.get_or_init(|| Arc::new(Table::new("<empty>"))))
    }

    /// Load (or fetch from the cache) the table `folder`/`name` for the
    /// current locale.
    ///
    /// A cached table whose locale differs from the target, or any cached
    /// table when `force_reload` is set, is reloaded in place. When the
    /// resource is absent an `optional` load yields an empty table flagged
    /// as missing; otherwise [`TableError::ResourceNotFound`] is returned.
    /// Unreadable or malformed resources degrade the same way when
    /// `optional`, and are errors otherwise.
    ///
    /// Entries that fail to compile always fail the load with
    /// [`TableError::Rejected`]. A fresh table is then not cached; a cached
    /// one keeps the entries that did load and is reloaded again on its next
    /// request.
    pub fn load_from_path(
        &self,
        folder: &str,
        name: &str,
        optional: bool,
        force_reload: bool,
    ) -> Result<Arc<Table>> {
        let key = TableKey::new(folder, name);
        let target = self.locale();
        let _span = debug_span!("fstr.collection.load", table = %key, locale = %target).entered();

        let cached = self.lock_tables().get(&key).cloned();
        if let Some(table) = cached {
            self.refresh(&key, &table, &target, optional, force_reload)?;
            return Ok(table);
        }

        let location = self.locator.locate(folder, name, &target);
        let fresh = self.new_table(&key);
        self.fill(&fresh, &location, &target, optional, false)?;

        let (table, inserted) = match self.lock_tables().entry(key.clone()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => (Arc::clone(slot.insert(Arc::new(fresh))), true),
        };
        if !inserted {
            debug!(target: "fstr.collection", table = %key, "concurrent load won, discarding duplicate");
            self.refresh(&key, &table, &target, optional, false)?;
        }
        Ok(table)
    }

    /// Reload every cached table for the current locale.
    ///
    /// Tables whose resource has vanished are cleared and marked missing.
    /// Tables with entries that fail to compile are reported as rejected.
    /// Tables that fail to reload otherwise keep their previous contents.
    pub fn reload_all(&self) -> ReloadReport {
        let target = self.locale();
        let mut snapshot: Vec<(TableKey, Arc<Table>)> = self
            .lock_tables()
            .iter()
            .map(|(key, table)| (key.clone(), Arc::clone(table)))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));

        let mut report = ReloadReport::default();
        for (key, table) in snapshot {
            let _guard = table.lock_reload();
            match self.reload_table(&key, &table, &target, false) {
                Ok(()) if table.is_missing_resource() => report.missing.push(key),
                Ok(()) => report.reloaded.push(key),
                Err(err @ TableError::Rejected { .. }) => report.rejected.push((key, err)),
                Err(err) => {
                    warn!(target: "fstr.collection", table = %key, error = %err, "reload failed");
                    report.failed.push((key, err));
                }
            }
        }
        debug!(
            target: "fstr.collection",
            reloaded = report.reloaded.len(),
            missing = report.missing.len(),
            rejected = report.rejected.len(),
            failed = report.failed.len(),
            "reloaded all tables"
        );
        report
    }

    fn new_table(&self, key: &TableKey) -> Table {
        let table = Table::new(key.to_string());
        let hooks = Arc::clone(&self.hooks);
        table.subscribe_missing(Arc::new(move |table: &Table, name: &str| {
            let hooks = hooks.read().unwrap_or_else(PoisonError::into_inner).clone();
            invoke_hooks(&hooks, table, name);
        }));
        table
    }

    /// Reload `table` if it is stale for `target` (or `force` is set).
    ///
    /// Concurrent callers serialize on the table's reload guard and re-check
    /// after acquiring it, so a locale switch reloads each table once.
    fn refresh(&self, key: &TableKey, table: &Table, target: &str, optional: bool, force: bool) -> Result<()> {
        if !force && is_current(table, target) {
            return Ok(());
        }
        let _guard = table.lock_reload();
        if !force && is_current(table, target) {
            return Ok(());
        }
        self.reload_table(key, table, target, optional)
    }

    fn reload_table(&self, key: &TableKey, table: &Table, target: &str, optional: bool) -> Result<()> {
        let location = self.locator.locate(&key.folder, &key.name, target);
        debug!(target: "fstr.collection", table = %key, location, locale = target, "reloading string table");
        self.fill(table, &location, target, optional, true)
    }

    /// Populate `table` from `location`, recording the outcome in its status.
    fn fill(&self, table: &Table, location: &str, locale: &str, optional: bool, reloading: bool) -> Result<()> {
        let outcome = match self.store.open(location) {
            Ok(Some(reader)) => table.reload_from_reader(reader, location).map(Some),
            Ok(None) if optional || reloading => Ok(None),
            Ok(None) => Err(TableError::ResourceNotFound {
                location: location.to_owned(),
            }),
            Err(source) => Err(TableError::Io {
                location: location.to_owned(),
                source,
            }),
        };

        match outcome {
            Ok(Some(report)) => {
                debug!(
                    target: "fstr.collection",
                    table = table.name(),
                    location,
                    locale,
                    entries = report.loaded,
                    rejected = report.rejected.len(),
                    "loaded string table"
                );
                table.set_status(TableStatus {
                    locale: Some(locale.to_owned()),
                    missing_resource: false,
                    location: Some(location.to_owned()),
                    rejected: report.rejected.len(),
                });
                if report.is_clean() {
                    Ok(())
                } else {
                    Err(TableError::Rejected {
                        location: location.to_owned(),
                        errors: report.rejected,
                    })
                }
            }
            Ok(None) => {
                if reloading && !table.is_missing_resource() {
                    warn!(target: "fstr.collection", table = table.name(), location, locale, "string table resource vanished");
                } else {
                    debug!(target: "fstr.collection", table = table.name(), location, locale, "string table resource absent");
                }
                mark_missing(table, location, locale);
                Ok(())
            }
            Err(err) if optional => {
                warn!(target: "fstr.collection", table = table.name(), location, error = %err, "unreadable optional string table treated as missing");
                mark_missing(table, location, locale);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

fn is_current(table: &Table, target: &str) -> bool {
    let status = table.status();
    status.rejected == 0 && status.locale.as_deref() == Some(target)
}

fn mark_missing(table: &Table, location: &str, locale: &str) {
    table.clear();
    table.set_status(TableStatus {
        locale: Some(locale.to_owned()),
        missing_resource: true,
        location: Some(location.to_owned()),
        rejected: 0,
    });
}

impl fmt::Debug for TableCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.lock_tables().keys().map(ToString::to_string).collect();
        keys.sort_unstable();
        f.debug_struct("TableCollection")
            .field("locale", &self.locale())
            .field("tables", &keys)
            .finish_non_exhaustive()
    }
}
