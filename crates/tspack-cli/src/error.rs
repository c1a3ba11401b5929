//! Error handling for the tspack CLI.
//!
//! - `CliError` is what every command returns
//! - `ConfigError` covers loading `tspack.config.json` and the environment
//! - library errors convert automatically via `#[from]`
//!
//! At the process boundary [`cli_error_to_miette`] turns a `CliError` into a
//! `miette` report with an actionable hint.

mod report;

use std::path::PathBuf;
use thiserror::Error;
use tspack_bundler::{ConfigurationError, FailureKind, FatalWatchError};

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Loading or merging configuration sources failed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The merged configuration was rejected by the bundler
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A one-shot build finished with a failure outcome
    #[error("{kind}: {message}")]
    Build {
        kind: FailureKind,
        message: String,
        cause: Option<String>,
    },

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file watcher could not be started
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// The watch session terminated abnormally
    #[error(transparent)]
    FatalWatch(#[from] FatalWatchError),
}

/// Configuration-source errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist
    #[error("Config file not found: {}\n\nHint: Create a tspack.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// No entry module on the command line or in the config file
    #[error("No input module given\n\nHint: Pass the entry module, e.g. `tspack build src/index.ts`, or set \"input\" in tspack.config.json")]
    MissingInput,

    /// A merged value failed to deserialize
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;
