//! Miette diagnostic conversion for CLI errors.

use crate::error::CliError;
use miette::Report;
use tspack_bundler::{EngineError, FailureKind};

/// Convert CliError to miette Report
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Configuration(e) => Report::new(tspack_bundler::Error::Configuration(e)),
        CliError::FatalWatch(e) => Report::new(tspack_bundler::Error::FatalWatch(e)),
        CliError::Build {
            kind: FailureKind::CompileError,
            message,
            cause,
        } => Report::new(tspack_bundler::Error::Engine(EngineError::Compile { message, cause })),
        CliError::Build {
            kind,
            message,
            cause: Some(cause),
        } => miette::miette!("{}: {}\n\nCaused by: {}", kind, message, cause),
        _ => miette::miette!("{}", err),
    }
}
