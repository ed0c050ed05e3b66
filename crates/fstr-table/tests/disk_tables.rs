//! On-disk string tables through the default `FileStore`.

use std::fs;
use std::path::Path;

use fstr_core::ArgMap;
use fstr_table::{CollectionConfig, TableCollection, TableError};

fn write_table(dir: &Path, file: &str, entries: &[(&str, &str)]) {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<StringTable Locale=\"x\">\n");
    xml.push_str("\t<File SourcePath=\"src/app.rs\">\n");
    for (key, text) in entries {
        xml.push_str(&format!("\t\t<String Name=\"{key}\">{text}</String>\n"));
    }
    xml.push_str("\t</File>\n</StringTable>\n");
    fs::write(dir.join(file), xml).unwrap();
}

fn folder(dir: &tempfile::TempDir) -> String {
    dir.path().to_string_lossy().into_owned()
}

#[test]
fn loads_tables_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "app_en-US.xml", &[("greet", "Hello {name}!")]);

    let tables = TableCollection::new("en-US");
    let app = tables.load_from_path(&folder(&dir), "app", false, false).unwrap();
    let args = ArgMap::new("greet").with("name", "World");
    assert_eq!(app.render(&args).unwrap(), "Hello World!");
    assert!(app.location().unwrap().ends_with("app_en-US.xml"));
}

#[test]
fn missing_file_is_not_found_unless_optional() {
    let dir = tempfile::tempdir().unwrap();
    let tables = TableCollection::new("en-US");
    let err = tables.load_from_path(&folder(&dir), "nothing", false, false).unwrap_err();
    assert!(matches!(err, TableError::ResourceNotFound { .. }));
    assert!(err.is_resource_error());

    let table = tables.load_from_path(&folder(&dir), "nothing", true, false).unwrap();
    assert!(table.is_missing_resource());
    assert_eq!(table.render(&ArgMap::new("k")).unwrap(), "<MISSING: k>");
}

#[test]
fn reload_all_picks_up_edits_and_deletions() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "a_fr.xml", &[("k", "un")]);
    write_table(dir.path(), "b_fr.xml", &[("k", "deux")]);
    let tables = TableCollection::new("fr");
    let a = tables.load_from_path(&folder(&dir), "a", false, false).unwrap();
    let b = tables.load_from_path(&folder(&dir), "b", false, false).unwrap();

    write_table(dir.path(), "a_fr.xml", &[("k", "uno")]);
    fs::remove_file(dir.path().join("b_fr.xml")).unwrap();

    let report = tables.reload_all();
    assert!(report.is_clean());
    assert_eq!(report.reloaded.len(), 1);
    assert_eq!(report.missing.len(), 1);
    assert_eq!(a.render(&ArgMap::new("k")).unwrap(), "uno");
    assert!(b.is_missing_resource());
    assert_eq!(b.render(&ArgMap::new("k")).unwrap(), "<MISSING: k>");
}

#[test]
fn configured_naming_is_used_for_every_locale() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), "ui.en.strings", &[("ok", "OK")]);
    write_table(dir.path(), "ui.ja.strings", &[("ok", "了解")]);
    let config = CollectionConfig {
        locale: "en".into(),
        extension: "strings".into(),
        locale_separator: ".".into(),
    };
    let tables = TableCollection::with_config(&config);
    let ui = tables.load_from_path(&folder(&dir), "ui", false, false).unwrap();
    assert_eq!(ui.render(&ArgMap::new("ok")).unwrap(), "OK");

    tables.set_locale("ja");
    tables.load_from_path(&folder(&dir), "ui", false, false).unwrap();
    assert_eq!(ui.render(&ArgMap::new("ok")).unwrap(), "了解");
}
