#![forbid(unsafe_code)]

//! The `fstr` command-line tool.
//!
//! Subcommands work on interchange documents directly: `check` compiles
//! every entry, `render` prints one entry with arguments, `normalize`
//! rewrites a document in sorted order with fresh hashes and `hash` prints
//! content hashes.

pub mod check;
pub mod cli;
pub mod error;
pub mod hash;
pub mod logging;
pub mod normalize;
pub mod render;

pub use cli::run_from_env;
pub use error::{Result, ToolError};
