//! Command implementations.

mod build;
mod watch;

pub use build::execute as build_execute;
pub use watch::execute as watch_execute;

use crate::error::{CliError, Result};
use std::path::{Path, PathBuf};

/// Absolute, canonical working directory for a command.
///
/// Paths reported by the file watcher are absolute, so the root they are
/// compared against must be too.
pub(crate) fn resolve_cwd(cwd: Option<&Path>) -> Result<PathBuf> {
    let cwd = match cwd {
        Some(path) => path.to_path_buf(),
        None => std::env::current_dir()?,
    };
    cwd.canonicalize().map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => CliError::FileNotFound(cwd),
        _ => CliError::Io(err),
    })
}
