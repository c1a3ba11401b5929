//! # tspack-cli
//!
//! Command-line frontend for [`tspack_bundler`].
//!
//! ```text
//! tspack build src/index.ts -o dist --cdn
//! tspack watch src/index.ts --no-uglify
//! ```
//!
//! Options are layered with `figment`: built-in defaults, then
//! `tspack.config.json` in the working directory, then `TSPACK_*` environment
//! variables, then command-line flags.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;
pub mod watcher;

pub use error::{CliError, ConfigError, Result};
