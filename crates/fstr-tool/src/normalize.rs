use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use chrono::Utc;
use clap::Args;
use fstr_doc::{DocumentError, DocumentReader, DocumentWriter};
use tracing::info;

use crate::error::{Result, ToolError};

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Document to rewrite.
    pub input: PathBuf,

    /// Where to write the result; standard output when omitted. May be the
    /// input file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the document's GeneratedUtc instead of stamping the current time.
    #[arg(long = "keep-timestamp")]
    pub keep_timestamp: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeSummary {
    pub sections: usize,
    pub entries: usize,
}

/// Rewrite a document with every section sorted by key and every hash
/// recomputed. Comments and extra attributes are kept with their entries.
pub fn normalize<R: BufRead, W: Write>(
    input: R,
    out: W,
    keep_timestamp: bool,
) -> std::result::Result<(W, NormalizeSummary), DocumentError> {
    let mut reader = DocumentReader::new(input)?;
    let header = reader.header().clone();
    let generated = header
        .generated_utc
        .filter(|_| keep_timestamp)
        .unwrap_or_else(Utc::now);
    let mut writer = DocumentWriter::with_timestamp(out, &header.locale, generated)?;

    let mut summary = NormalizeSummary::default();
    while let Some(section) = reader.next_section()? {
        summary.sections += 1;
        writer.start_file(section.source)?;
        for mut entry in section.entries {
            entry.rehash();
            writer.defer_entry(entry)?;
            summary.entries += 1;
        }
        writer.end_file()?;
    }
    Ok((writer.finish()?, summary))
}

pub fn run_normalize(args: NormalizeArgs) -> Result<()> {
    let file = File::open(&args.input).map_err(ToolError::read(&args.input))?;
    let (bytes, summary) = normalize(BufReader::new(file), Vec::new(), args.keep_timestamp)
        .map_err(ToolError::document(&args.input))?;
    info!(
        input = %args.input.display(),
        sections = summary.sections,
        entries = summary.entries,
        "normalized document"
    );

    match &args.output {
        Some(path) => fs::write(path, bytes)?,
        None => io::stdout().lock().write_all(&bytes)?,
    }
    Ok(())
}
