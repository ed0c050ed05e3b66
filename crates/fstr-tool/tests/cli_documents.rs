//! End-to-end runs of the `fstr` subcommands against documents on disk.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use fstr_tool::check::check_document;
use fstr_tool::cli::{Cli, run};
use fstr_tool::ToolError;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<StringTable GeneratedUtc="2024-05-01T12:00:00Z" Locale="en-US">
	<File SourcePath="src/hud.rs">
		<String Name="hud.score">Score: {points}</String>
		<String Name="hud.ammo">Ammo {count} / {max}</String>
		<Literal Name="hud.raw">{not a placeholder}</Literal>
	</File>
</StringTable>
"#;

fn write_document(dir: &tempfile::TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

fn run_args(args: &[&str]) -> Result<(), ToolError> {
    let mut argv = vec!["fstr"];
    argv.extend_from_slice(args);
    run(Cli::try_parse_from(argv).unwrap())
}

#[test]
fn check_passes_on_a_clean_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "hud_en-US.xml", DOCUMENT);
    run_args(&["check", path.to_str().unwrap()]).unwrap();
}

#[test]
fn check_fails_with_exit_code_on_problems() {
    let dir = tempfile::tempdir().unwrap();
    let broken = DOCUMENT.replace("{points}", "{points");
    let path = write_document(&dir, "hud_en-US.xml", &broken);
    let err = run_args(&["check", path.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, ToolError::Exit { code: 1, .. }));
}

#[test]
fn malformed_document_names_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "bad.xml", "<StringTable><File></File></StringTable>");
    let err = run_args(&["check", path.to_str().unwrap()]).unwrap_err();
    assert!(matches!(err, ToolError::Document { .. }));
    assert!(err.to_string().contains("bad.xml"));
}

#[test]
fn render_runs_against_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "hud_en-US.xml", DOCUMENT);
    run_args(&["render", path.to_str().unwrap(), "hud.ammo", "count=3", "max=12"]).unwrap();

    let err = run_args(&["render", "--strict", path.to_str().unwrap(), "hud.absent"]).unwrap_err();
    assert!(matches!(err, ToolError::Table(_)));
}

#[test]
fn normalize_in_place_produces_a_checkable_sorted_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "hud_en-US.xml", DOCUMENT);
    let target = path.to_str().unwrap();
    run_args(&["normalize", target, "--output", target, "--keep-timestamp"]).unwrap();

    let normalized = fs::read_to_string(&path).unwrap();
    let ammo = normalized.find("hud.ammo").unwrap();
    let raw = normalized.find("hud.raw").unwrap();
    let score = normalized.find("hud.score").unwrap();
    assert!(ammo < raw && raw < score, "{normalized}");
    assert!(normalized.contains("2024-05-01T12:00:00"));

    let report = check_document(normalized.as_bytes(), false).unwrap();
    assert!(report.is_clean());
    assert!(report.stale.is_empty());
    assert_eq!(report.entries, 3);
}

#[test]
fn hash_of_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_document(&dir, "note.txt", "abc");
    run_args(&["hash", "--file", path.to_str().unwrap()]).unwrap();
    run_args(&["hash", "abc", "def"]).unwrap();
}
