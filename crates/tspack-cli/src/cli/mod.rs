//! Command-line interface definition for tspack.
//!
//! # Command Structure
//!
//! - `tspack build <input>` - one-shot build (or watch with `--watch`)
//! - `tspack watch <input>` - rebuild on every change until Ctrl+C

mod args;

use clap::{Parser, Subcommand};

pub use args::{BuildArgs, FormatArg, RegistryArg};

/// tspack - bundle a TypeScript entry module into a single ES module
#[derive(Parser, Debug)]
#[command(
    name = "tspack",
    version,
    about = "Bundle a TypeScript entry module into a single browser-ready ES module",
    long_about = "tspack compiles one entry module into <out>/index.js with a source map.\n\
                  Dependencies are either inlined, left to the runtime (--externalize), or\n\
                  rewritten to versioned CDN URLs (--cdn)."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available tspack subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle the entry module once
    ///
    /// Purges the output directory, compiles the entry and writes index.js
    /// plus index.js.map. Pass --watch to keep rebuilding on changes.
    Build(BuildArgs),

    /// Rebuild whenever a source file changes
    ///
    /// Same options as `build`, with watch mode implied. Build errors are
    /// reported and the watcher keeps running; stop it with Ctrl+C.
    Watch(BuildArgs),
}
