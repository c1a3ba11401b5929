#![cfg_attr(docsrs, feature(doc_cfg))]

//! # tspack-bundler
//!
//! Build orchestration for tspack: turns one entry module into a single
//! `index.js` artifact by driving an external bundling engine (Rolldown by
//! default) through an ordered pipeline of plugin units.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tspack_bundler::{BuildConfiguration, BuildSession, InstalledPackages, RolldownEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BuildConfiguration::builder("src/index.ts")
//!     .output_directory("dist")
//!     .rewrite_to_cdn(true)
//!     .build()?;
//!
//! let registry = InstalledPackages::new(config.cwd());
//! let session = BuildSession::new(&config, RolldownEngine::new(), registry)?;
//! let outcome = session.run().await;
//! println!("{outcome}");
//! # Ok(()) }
//! ```
//!
//! ## Watch mode
//!
//! [`watch::WatchController`] wraps a [`BuildSession`] in the
//! [`watch::WatchSession`] state machine and rebuilds on every file change,
//! never running two builds at once.

pub mod config;
pub mod engine;
pub mod manifest;
pub mod pipeline;
pub mod plugins;
pub mod registry;
pub mod session;
pub mod watch;

pub use config::{BuildConfiguration, BuildConfigurationBuilder, ConfigurationError, OutputFormat};
pub use engine::{
    BundlingEngine, CompileInput, EngineError, Externals, RenderRequest, RenderedChunk,
    RolldownEngine,
};
pub use manifest::Manifest;
pub use pipeline::{Pipeline, assemble};
pub use plugins::{Capability, PluginPhase, PluginUnit};
pub use registry::{ExternalLookupError, InstalledPackages, NpmRegistry, VersionRegistry};
pub use session::{BuildOutcome, BuildSession, FailureKind};
pub use watch::{
    FatalWatchError, FileChange, StopHandle, WatchController, WatchEvent, WatchSession,
    WatchStatus,
};

/// Error types for tspack-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or incomplete build configuration.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The bundling engine failed to compile or render the entry module.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The watch session hit an unrecoverable error.
    #[error(transparent)]
    FatalWatch(#[from] FatalWatchError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tspack-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Configuration(_) => "CONFIGURATION_ERROR",
            Error::Engine(_) => "COMPILE_ERROR",
            Error::FatalWatch(_) => "FATAL_WATCH_ERROR",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Configuration(err) => err.hint().map(|h| Box::new(h) as Box<dyn std::fmt::Display>),
            Error::Engine(EngineError::Compile { cause: Some(cause), .. }) => {
                Some(Box::new(cause.clone()))
            }
            Error::FatalWatch(_) => Some(Box::new(
                "The watcher stopped unexpectedly. Restart `tspack watch` to resume.",
            )),
            _ => None,
        }
    }
}
