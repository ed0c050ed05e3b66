#![forbid(unsafe_code)]

//! Process-wide interning of placeholder identifiers.
//!
//! The same handful of placeholder names (`name`, `count`, `path`, ...) recur
//! across every template that shares a resolver shape. Interning them means
//! each name is stored once and resolvers may compare ids by pointer before
//! falling back to a string compare.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, Mutex, PoisonError};

use rustc_hash::FxHashSet;

static INTERNER: LazyLock<Mutex<FxHashSet<Arc<str>>>> =
    LazyLock::new(|| Mutex::new(FxHashSet::default()));

/// An interned placeholder name.
///
/// Equality checks pointer identity first, then content, so ids built from
/// the same text always compare equal.
#[derive(Clone)]
pub struct PlaceholderId(Arc<str>);

impl PlaceholderId {
    /// Intern `name`, returning the shared id for it.
    pub fn intern(name: &str) -> Self {
        let mut set = INTERNER.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = set.get(name) {
            return Self(Arc::clone(existing));
        }
        let shared: Arc<str> = Arc::from(name);
        set.insert(Arc::clone(&shared));
        Self(shared)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when both ids point at the same interned allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for PlaceholderId {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0 == *other.0
    }
}

impl Eq for PlaceholderId {}

impl PartialEq<str> for PlaceholderId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for PlaceholderId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Hash for PlaceholderId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Borrow<str> for PlaceholderId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PlaceholderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaceholderId({:?})", &*self.0)
    }
}

impl fmt::Display for PlaceholderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_shares_allocation() {
        let a = PlaceholderId::intern("count");
        let b = PlaceholderId::intern(&String::from("count"));
        assert!(a.ptr_eq(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn different_names_differ() {
        let a = PlaceholderId::intern("left");
        let b = PlaceholderId::intern("right");
        assert!(!a.ptr_eq(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn compares_against_str() {
        let id = PlaceholderId::intern("path");
        assert_eq!(id, "path");
        assert_eq!(id.as_str(), "path");
        assert_eq!(id.to_string(), "path");
    }
}
