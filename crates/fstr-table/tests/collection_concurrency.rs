//! Concurrency guarantees of `TableCollection`.
//!
//! 1. Concurrent optional loads of an absent resource yield one instance
//! 2. Concurrent loads of a present resource yield one instance
//! 3. A locale switch reloads a table exactly once, however many callers race
//! 4. A locale switch never touches tables nobody asked for
//! 5. Readers during a reload see either the old or the new strings
//!
//! Run:
//!   cargo test -p fstr-table --test collection_concurrency

use std::sync::{Arc, Barrier};
use std::thread;

use fstr_table::{MemoryStore, ResourceStore, Table, TableCollection};

const THREADS: usize = 8;

fn doc(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from("<StringTable><File SourcePath=\"src/ui.rs\">");
    for (key, text) in entries {
        xml.push_str(&format!("<String Name=\"{key}\">{text}</String>"));
    }
    xml.push_str("</File></StringTable>");
    xml
}

fn collection(store: &Arc<MemoryStore>, locale: &str) -> TableCollection {
    TableCollection::new(locale).with_store(Arc::clone(store) as Arc<dyn ResourceStore>)
}

fn load_concurrently(tables: &TableCollection, name: &str, optional: bool) -> Vec<Arc<Table>> {
    let barrier = Barrier::new(THREADS);
    thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    tables.load_from_path("strings", name, optional, false).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

fn text(table: &Table, key: &str) -> String {
    table.get(key, true).unwrap().string_literal().unwrap().into_owned()
}

#[test]
fn concurrent_optional_load_of_absent_resource_yields_one_instance() {
    let store = Arc::new(MemoryStore::new());
    let tables = collection(&store, "en");

    let loaded = load_concurrently(&tables, "absent", true);
    let first = &loaded[0];
    for table in &loaded {
        assert!(Arc::ptr_eq(first, table));
        assert!(table.is_missing_resource());
    }
    assert_eq!(tables.len(), 1);
    assert!(Arc::ptr_eq(first, &tables.get("strings", "absent").unwrap()));
}

#[test]
fn concurrent_load_of_present_resource_yields_one_instance() {
    let store = Arc::new(MemoryStore::new());
    store.insert("strings/menu_en.xml", &doc(&[("title", "Menu")]));
    let tables = collection(&store, "en");

    let loaded = load_concurrently(&tables, "menu", false);
    for table in &loaded {
        assert!(Arc::ptr_eq(&loaded[0], table));
    }
    assert_eq!(text(&loaded[0], "title"), "Menu");
    assert!(store.open_count() >= 1 && store.open_count() <= THREADS);
}

#[test]
fn locale_switch_reloads_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    store.insert("strings/menu_en.xml", &doc(&[("title", "Menu")]));
    store.insert("strings/menu_de.xml", &doc(&[("title", "Speisekarte")]));
    let tables = collection(&store, "en");
    let held = tables.load_from_path("strings", "menu", false, false).unwrap();
    let opens = store.open_count();

    tables.set_locale("de");
    let loaded = load_concurrently(&tables, "menu", false);

    assert_eq!(store.open_count(), opens + 1);
    for table in &loaded {
        assert!(Arc::ptr_eq(&held, table));
    }
    assert_eq!(text(&held, "title"), "Speisekarte");
    assert_eq!(held.locale().as_deref(), Some("de"));
}

#[test]
fn locale_switch_leaves_unrelated_tables_alone() {
    let store = Arc::new(MemoryStore::new());
    for (name, locale) in [("menu", "en"), ("menu", "de"), ("hud", "en"), ("hud", "de")] {
        let title = format!("{name}-{locale}");
        store.insert(format!("strings/{name}_{locale}.xml"), &doc(&[("title", title.as_str())]));
    }
    let tables = collection(&store, "en");
    let menu = tables.load_from_path("strings", "menu", false, false).unwrap();
    let hud = tables.load_from_path("strings", "hud", false, false).unwrap();
    assert_eq!(store.open_count(), 2);

    tables.set_locale("de");
    tables.load_from_path("strings", "menu", false, false).unwrap();
    assert_eq!(store.open_count(), 3);
    assert_eq!(text(&menu, "title"), "menu-de");
    assert_eq!(text(&hud, "title"), "hud-en");

    tables.load_from_path("strings", "hud", false, false).unwrap();
    assert_eq!(store.open_count(), 4);
    assert_eq!(text(&hud, "title"), "hud-de");
}

#[test]
fn readers_during_reload_see_whole_tables() {
    let store = Arc::new(MemoryStore::new());
    let english = doc(&[("a", "en"), ("b", "en")]);
    let german = doc(&[("a", "de"), ("b", "de")]);
    store.insert("strings/menu_en.xml", &english);
    store.insert("strings/menu_de.xml", &german);
    let tables = collection(&store, "en");
    let table = tables.load_from_path("strings", "menu", false, false).unwrap();

    thread::scope(|scope| {
        scope.spawn(|| {
            for round in 0..50 {
                tables.set_locale(if round % 2 == 0 { "de" } else { "en" });
                tables.load_from_path("strings", "menu", false, false).unwrap();
            }
        });
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..200 {
                    let a = text(&table, "a");
                    let b = text(&table, "b");
                    assert!(a == "en" || a == "de", "unexpected {a}");
                    assert!(b == "en" || b == "de", "unexpected {b}");
                }
            });
        }
    });
}
