//! The bundling engine contract.
//!
//! The build session talks to the engine in two steps: [`compile`] turns the
//! entry module and the engine-delegated part of the pipeline into a module
//! graph handle, and [`render`] produces the single output chunk from it.
//!
//! [`RolldownEngine`] is the production implementation. Tests substitute a
//! stub that returns canned chunks.
//!
//! [`compile`]: BundlingEngine::compile
//! [`render`]: BundlingEngine::render

mod rolldown_engine;

use crate::config::{BuildConfiguration, OutputFormat};
use crate::pipeline::Pipeline;
use crate::plugins::cdn_rewrite::split_bare_specifier;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

pub use rolldown_engine::{RolldownEngine, RolldownGraph};

/// Errors reported by a bundling engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The module graph could not be built (parse, resolve or plugin error).
    #[error("{message}")]
    Compile {
        message: String,
        /// Raw engine diagnostic, when it carries more than the message.
        cause: Option<String>,
    },

    /// Rendering the graph into a chunk failed.
    #[error("Render failed: {0}")]
    Render(String),

    /// The engine finished without producing a chunk.
    #[error("Engine produced no output chunk")]
    EmptyOutput,
}

impl EngineError {
    /// Compile error without further detail.
    pub fn compile(message: impl Into<String>) -> Self {
        EngineError::Compile {
            message: message.into(),
            cause: None,
        }
    }

    /// The underlying detail, if any.
    pub fn cause(&self) -> Option<&str> {
        match self {
            EngineError::Compile { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }
}

/// Which import specifiers the engine must leave unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Externals {
    /// Everything is bundled.
    #[default]
    None,
    /// These packages and their subpaths stay external.
    Packages(BTreeSet<String>),
    /// Every bare specifier stays external.
    AllBare,
}

impl Externals {
    /// Derive the externals from the configuration.
    ///
    /// CDN rewriting needs every bare import left in the chunk, and so does
    /// disabling vendor resolution.
    pub fn from_config(config: &BuildConfiguration) -> Self {
        if config.rewrite_to_cdn() || !config.resolve_vendor() {
            Externals::AllBare
        } else if config.externalize() {
            Externals::Packages(config.declared_dependencies().clone())
        } else {
            Externals::None
        }
    }

    pub fn is_external(&self, specifier: &str) -> bool {
        match self {
            Externals::None => false,
            Externals::AllBare => split_bare_specifier(specifier).is_some(),
            Externals::Packages(packages) => split_bare_specifier(specifier)
                .is_some_and(|(name, _)| packages.contains(name)),
        }
    }
}

/// Everything the engine needs to build the module graph.
#[derive(Debug, Clone)]
pub struct CompileInput {
    /// Absolute entry module path.
    pub entry: PathBuf,
    /// Project root for module resolution.
    pub cwd: PathBuf,
    pub pipeline: Pipeline,
    pub externals: Externals,
}

/// Render parameters.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub format: OutputFormat,
    /// Where the chunk will be written; used for source map file names.
    pub output_path: PathBuf,
    pub sourcemap: bool,
}

/// The single chunk produced by a build.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedChunk {
    pub code: String,
    /// Import specifiers still present in `code` (externals).
    pub imports: Vec<String>,
    /// Source map JSON.
    pub map: Option<String>,
}

/// A bundling engine driven by the build session.
#[async_trait]
pub trait BundlingEngine: Send + Sync {
    /// Handle to a compiled module graph.
    type Graph: Send;

    async fn compile(&self, input: CompileInput) -> Result<Self::Graph, EngineError>;

    async fn render(
        &self,
        graph: Self::Graph,
        request: RenderRequest,
    ) -> Result<RenderedChunk, EngineError>;
}
