//! Property-based invariant tests for tables and the collection.
//!
//! 1. A duplicate insert fails and leaves the stored entry unchanged
//! 2. Repeated optional misses return the identical sentinel
//! 3. Required misses without fallback name the table and key
//! 4. Lookups through a fallback notify the local table exactly once
//! 5. Blank keys are always rejected
//! 6. Loading a document stores exactly the entries it contains
//! 7. Any sequence of locale switches leaves each table on the final locale

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use fstr_core::LookupError;
use fstr_table::{MemoryStore, ResourceStore, Table, TableCollection, TableError};
use proptest::prelude::*;

// ── Helpers ──────────────────────────────────────────────────────────

fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_.]{0,12}"
}

fn text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 ,.!?]{0,24}"
}

fn literal(table: &Table, key: &str) -> String {
    table.get(key, false).unwrap().string_literal().unwrap().into_owned()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Duplicate insertion
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn duplicate_insert_leaves_entry_unchanged(
        key in key_strategy(),
        first in text_strategy(),
        second in text_strategy(),
    ) {
        let table = Table::new("t");
        table.add(&key, &first, false).unwrap();
        let result = table.add(&key, &second, false);
        let is_duplicate = matches!(result, Err(TableError::DuplicateKey { .. }));
        prop_assert!(is_duplicate);
        prop_assert_eq!(literal(&table, &key), first);
        prop_assert_eq!(table.len(), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2-3. Misses without fallback
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn optional_misses_share_one_sentinel(key in key_strategy(), repeats in 2usize..6) {
        let table = Table::new("t");
        let first = table.get(&key, true).unwrap();
        prop_assert!(first.is_missing());
        for _ in 1..repeats {
            prop_assert!(Arc::ptr_eq(&first, &table.get(&key, true).unwrap()));
        }
        prop_assert_eq!(first.string_literal().unwrap().into_owned(), format!("<MISSING: {key}>"));
    }

    #[test]
    fn required_miss_names_table_and_key(name in key_strategy(), key in key_strategy()) {
        let table = Table::new(name.clone());
        prop_assert_eq!(
            table.get(&key, false),
            Err(LookupError::KeyNotFound { table: name, key })
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Fallback notification
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn fallback_lookup_notifies_local_once(key in key_strategy(), text in text_strategy()) {
        let base = Arc::new(Table::new("base"));
        base.add(&key, &text, false).unwrap();
        let local = Table::new("local");
        local.set_fallback(Some(Arc::clone(&base))).unwrap();
        let misses = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&misses);
        local.subscribe_missing(Arc::new(move |_: &Table, _: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        prop_assert_eq!(literal(&local, &key), text);
        prop_assert_eq!(misses.load(Ordering::SeqCst), 1);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Blank keys
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn blank_keys_are_rejected(key in "[ \t\r\n]{0,6}", optional in any::<bool>()) {
        let table = Table::new("t");
        prop_assert_eq!(table.get(&key, optional), Err(LookupError::BlankKey));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Document population
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn populate_stores_exactly_the_document(
        entries in prop::collection::btree_map(key_strategy(), text_strategy(), 0..16),
    ) {
        let mut xml = String::from("<StringTable><File SourcePath=\"gen.rs\">");
        for (key, text) in &entries {
            xml.push_str(&format!("<String Name=\"{key}\">{text}</String>"));
        }
        xml.push_str("</File></StringTable>");

        let table = Table::new("t");
        let report = table.populate_from_str(&xml, false).unwrap();
        prop_assert!(report.is_clean());
        prop_assert_eq!(report.loaded, entries.len());
        prop_assert_eq!(table.keys(), entries.keys().cloned().collect::<Vec<_>>());
        for (key, text) in &entries {
            prop_assert_eq!(&literal(&table, key), text);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Locale switching
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn final_locale_wins(switches in prop::collection::vec(0usize..3, 1..8)) {
        const LOCALES: [&str; 3] = ["en", "de", "fr"];
        let store = Arc::new(MemoryStore::new());
        for locale in LOCALES {
            store.insert(
                format!("s/t_{locale}.xml"),
                &format!("<StringTable><File SourcePath=\"a\"><String Name=\"k\">{locale}</String></File></StringTable>"),
            );
        }
        let tables = TableCollection::new("en").with_store(Arc::clone(&store) as Arc<dyn ResourceStore>);
        let table = tables.load_from_path("s", "t", false, false).unwrap();

        let mut current = "en";
        for index in switches {
            current = LOCALES[index];
            tables.set_locale(current);
            tables.load_from_path("s", "t", false, false).unwrap();
        }
        prop_assert_eq!(literal(&table, "k"), current);
        let locale = table.locale();
        prop_assert_eq!(locale.as_deref(), Some(current));
    }
}
