#![forbid(unsafe_code)]

//! Process-wide cache of missing-string sentinels.
//!
//! Repeated misses for the same key on the same table return the same
//! `Arc<Definition>`, so callers may compare sentinels with `Arc::ptr_eq`.
//! Entries are scoped by [`SourceId`]; owners call [`forget_source`] when
//! they go away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::definition::Definition;

/// Identity of a definition source (usually a table) for sentinel caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

static NEXT_SOURCE: AtomicU64 = AtomicU64::new(1);

impl SourceId {
    /// Allocate a fresh, never reused id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SOURCE.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

type SentinelMap = FxHashMap<SourceId, FxHashMap<Box<str>, Arc<Definition>>>;

static SENTINELS: LazyLock<Mutex<SentinelMap>> = LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// The identity-stable missing sentinel for `name` in `source`.
pub fn missing_definition(source: SourceId, name: &str) -> Arc<Definition> {
    let mut map = SENTINELS.lock().unwrap_or_else(PoisonError::into_inner);
    let per_source = map.entry(source).or_default();
    if let Some(existing) = per_source.get(name) {
        return Arc::clone(existing);
    }
    trace!(target: "fstr.table", source = source.0, key = name, "caching missing sentinel");
    let sentinel = Arc::new(Definition::missing(name));
    per_source.insert(name.into(), Arc::clone(&sentinel));
    sentinel
}

/// Drop every cached sentinel for `source`.
pub fn forget_source(source: SourceId) {
    let mut map = SENTINELS.lock().unwrap_or_else(PoisonError::into_inner);
    map.remove(&source);
}

/// Number of sentinels cached for `source`.
#[must_use]
pub fn cached_sentinels(source: SourceId) -> usize {
    let map = SENTINELS.lock().unwrap_or_else(PoisonError::into_inner);
    map.get(&source).map_or(0, FxHashMap::len)
}
