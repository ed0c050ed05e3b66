use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use clap::Args;
use fstr_core::{NumberFormat, OutputBuilder, PlaceholderId, RenderError, Resolver, render};
use fstr_table::Table;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::error::{Result, ToolError};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Document holding the template.
    pub file: PathBuf,

    /// Key of the entry to render.
    pub key: String,

    /// Placeholder values as NAME=VALUE. Decimal values such as `3.5` are
    /// written with the separator of `--locale`.
    #[arg(value_parser = parse_pair)]
    pub args: Vec<(String, String)>,

    /// Fail when the key is absent instead of printing a missing marker.
    #[arg(long)]
    pub strict: bool,

    /// Locale whose decimal separator is used for decimal values.
    #[arg(long)]
    pub locale: Option<String>,
}

/// Parse a `NAME=VALUE` pair. The value may itself contain `=`.
pub fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    if name.trim().is_empty() {
        return Err(format!("empty placeholder name in `{raw}`"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

#[derive(Debug, Clone, PartialEq)]
enum ArgValue {
    Decimal(f64),
    Text(String),
}

impl ArgValue {
    /// `-12.5` style values become numbers; everything else, integers
    /// included, is kept verbatim.
    fn parse(raw: &str) -> Self {
        let digits = raw.strip_prefix('-').unwrap_or(raw);
        let is_decimal = digits.split_once('.').is_some_and(|(whole, fraction)| {
            !whole.is_empty()
                && !fraction.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && fraction.bytes().all(|b| b.is_ascii_digit())
        });
        match raw.parse::<f64>() {
            Ok(value) if is_decimal => Self::Decimal(value),
            _ => Self::Text(raw.to_owned()),
        }
    }
}

/// Placeholder values given on the command line.
struct CommandArgs<'k> {
    key: &'k str,
    values: FxHashMap<&'k str, ArgValue>,
}

impl<'k> CommandArgs<'k> {
    fn new(key: &'k str, pairs: &'k [(String, String)]) -> Self {
        let values = pairs
            .iter()
            .map(|(name, value)| (name.as_str(), ArgValue::parse(value)))
            .collect();
        Self { key, values }
    }
}

impl Resolver for CommandArgs<'_> {
    fn resolve<'a>(&'a self, id: &PlaceholderId, out: &mut OutputBuilder<'a>) -> std::result::Result<(), RenderError> {
        match self.values.get(id.as_str()) {
            Some(ArgValue::Decimal(value)) => out.append_f64(*value),
            Some(ArgValue::Text(text)) => out.append_str(text),
            None => {
                return Err(RenderError::UnknownPlaceholder {
                    key: self.key.to_owned(),
                    placeholder: id.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Render `key` from `table` with the given placeholder values.
pub fn render_entry(
    table: &Table,
    key: &str,
    pairs: &[(String, String)],
    strict: bool,
    format: NumberFormat,
) -> Result<String> {
    let definition = table.get(key, !strict).map_err(fstr_table::TableError::from)?;
    let args = CommandArgs::new(key, pairs);
    let mut out = OutputBuilder::new().with_number_format(format).with_source(table);
    render(&definition, &args, &mut out)?;
    Ok(out.finish().into_owned())
}

pub fn run_render(args: RenderArgs) -> Result<()> {
    let name = args
        .file
        .file_stem()
        .map_or_else(|| "document".to_owned(), |stem| stem.to_string_lossy().into_owned());
    let table = Table::new(name);
    let file = File::open(&args.file).map_err(ToolError::read(&args.file))?;
    let report = table.populate_from_reader(BufReader::new(file), true)?;
    if !report.is_clean() {
        warn!(rejected = report.rejected.len(), "some entries could not be loaded");
    }

    let format = args
        .locale
        .as_deref()
        .map_or_else(NumberFormat::default, NumberFormat::for_locale);
    let text = render_entry(&table, &args.key, &args.args, args.strict, format)?;
    println!("{text}");
    Ok(())
}
