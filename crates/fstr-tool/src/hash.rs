use std::fs;
use std::path::PathBuf;

use clap::Args;
use fstr_doc::content_hash;

use crate::error::{Result, ToolError};

#[derive(Debug, Args)]
pub struct HashArgs {
    /// Texts to hash, one line of output each.
    pub texts: Vec<String>,

    /// Hash the contents of a file instead.
    #[arg(long, conflicts_with = "texts")]
    pub file: Option<PathBuf>,
}

/// `<hash>  <text>` lines for each input, like `sha256sum`.
#[must_use]
pub fn hash_lines(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .map(|text| format!("{}  {text}", content_hash(text)))
        .collect()
}

pub fn run_hash(args: HashArgs) -> Result<()> {
    if let Some(path) = &args.file {
        let text = fs::read_to_string(path).map_err(ToolError::read(path))?;
        println!("{}  {}", content_hash(&text), path.display());
        return Ok(());
    }
    if args.texts.is_empty() {
        return Err(ToolError::invalid("nothing to hash: pass TEXT arguments or --file"));
    }
    for line in hash_lines(&args.texts) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_pair_hash_with_text() {
        let lines = hash_lines(&["abc".to_owned(), String::new()]);
        assert_eq!(lines, ["ba7816bf8f01cfea  abc", "e3b0c44298fc1c14  "]);
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = run_hash(HashArgs {
            texts: Vec::new(),
            file: None,
        })
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
