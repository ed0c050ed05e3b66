use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

use clap::Args;
use fstr_core::check_reserved_placeholders;
use fstr_doc::{DocumentError, DocumentReader, EntryKind, content_hash};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::{Result, ToolError};

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Documents to check.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Accept placeholder names that are reserved for field binding.
    #[arg(long = "allow-reserved")]
    pub allow_reserved: bool,

    /// Report entries whose Hash attribute does not match their text.
    #[arg(long = "stale-hashes")]
    pub stale_hashes: bool,
}

/// Findings for one document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub sections: usize,
    pub entries: usize,
    pub problems: Vec<String>,
    pub stale: Vec<String>,
}

impl CheckReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Compile every entry of a document and collect what a table load would
/// reject: compile errors, reserved placeholder names and duplicate keys.
pub fn check_document<R: BufRead>(input: R, allow_reserved: bool) -> std::result::Result<CheckReport, DocumentError> {
    let mut reader = DocumentReader::new(input)?;
    let mut report = CheckReport::default();
    let mut seen: FxHashMap<String, String> = FxHashMap::default();

    while let Some(section) = reader.next_section()? {
        report.sections += 1;
        for (entry, compiled) in section.definitions() {
            report.entries += 1;
            match compiled {
                Ok(definition) if entry.kind == EntryKind::String && !allow_reserved => {
                    if let Err(err) = check_reserved_placeholders(&definition) {
                        report.problems.push(format!("{}: {err}", section.source.path));
                    }
                }
                Ok(_) => {}
                Err(err) => report.problems.push(format!("{}: {err}", section.source.path)),
            }
            if let Some(first) = seen.insert(entry.key.clone(), section.source.path.clone()) {
                report.problems.push(format!(
                    "{}: key `{}` already defined in {first}",
                    section.source.path, entry.key
                ));
            }
            if entry.hash != content_hash(&entry.text) {
                report.stale.push(entry.key.clone());
            }
        }
    }
    Ok(report)
}

pub fn run_check(args: CheckArgs) -> Result<()> {
    let mut problems = 0;
    for path in &args.files {
        let file = File::open(path).map_err(ToolError::read(path))?;
        let report = check_document(BufReader::new(file), args.allow_reserved).map_err(ToolError::document(path))?;
        debug!(path = %path.display(), entries = report.entries, "checked document");

        for problem in &report.problems {
            println!("{}: {problem}", path.display());
        }
        if args.stale_hashes {
            for key in &report.stale {
                println!("{}: stale hash for `{key}`", path.display());
            }
        }
        println!(
            "{}: {} section(s), {} entries, {} problem(s)",
            path.display(),
            report.sections,
            report.entries,
            report.problems.len()
        );
        problems += report.problems.len();
    }

    if problems > 0 {
        return Err(ToolError::exit(1, format!("{problems} problem(s) found")));
    }
    Ok(())
}
