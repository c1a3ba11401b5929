//! Plugin units and their execution phases.
//!
//! A [`PluginUnit`] is one named step of the build pipeline. Some units are
//! carried out by the bundling engine (compile, replace, resolve, commonjs,
//! style); the others are run by the build session itself (cleanup before the
//! engine starts, import rewriting and minification after it renders).

pub mod cdn_rewrite;
pub mod cleanup;
pub mod minify;

use std::borrow::Cow;
use std::path::PathBuf;

pub use cdn_rewrite::{CdnRewrite, ExternalVersionCache, Rewrite, RewriteReport};
pub use minify::{MinifiedChunk, collapse_source_maps, minify_chunk};

/// What a unit operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Runs before module resolution starts.
    PreResolve,
    /// Transforms module sources while the engine builds the graph.
    TransformSource,
    /// Operates on the fully rendered chunk text.
    PostRender,
}

/// Plugin execution phases
///
/// Units are executed in phase order (lower numbers first). The numeric gaps
/// leave room for new phases without renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PluginPhase {
    /// Output directory purge (always first)
    Cleanup = 0,

    /// Source compilation (TypeScript to JavaScript)
    Compile = 10,

    /// Literal replacement of build-time constants in vendor code
    Replace = 20,

    /// Bare import resolution from `node_modules`
    Resolve = 30,

    /// CommonJS to ESM conversion of resolved vendor modules
    CommonJs = 40,

    /// Style compilation
    Style = 50,

    /// Bare import rewriting on the rendered chunk
    Rewrite = 60,

    /// Minification (always last)
    Minify = 100,
}

/// Options for the style compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleOptions {
    /// Minify CSS in addition to compiling it.
    pub minify: bool,
    /// Path fragments that are never processed.
    pub exclude: Vec<String>,
}

/// One step of the build pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginUnit {
    /// Purge the output directory.
    Cleanup { target: PathBuf },

    /// Compile TypeScript sources to JavaScript.
    Compile,

    /// Replace identifier paths with literal expressions.
    Replace { replacements: Vec<(String, String)> },

    /// Resolve bare imports from `node_modules` and inline them.
    NodeResolve,

    /// Convert CommonJS modules to ESM.
    CommonJs,

    /// Compile `.css` imports.
    Style(StyleOptions),

    /// Rewrite bare imports to CDN URLs.
    ImportRewrite { cdn_base: String },

    /// Minify the rendered chunk.
    Minify,
}

impl PluginUnit {
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            PluginUnit::Cleanup { .. } => "cleanup".into(),
            PluginUnit::Compile => "typescript".into(),
            PluginUnit::Replace { .. } => "replace".into(),
            PluginUnit::NodeResolve => "node-resolve".into(),
            PluginUnit::CommonJs => "commonjs".into(),
            PluginUnit::Style(_) => "style".into(),
            PluginUnit::ImportRewrite { .. } => "cdn-rewrite".into(),
            PluginUnit::Minify => "minify".into(),
        }
    }

    pub fn capability(&self) -> Capability {
        match self {
            PluginUnit::Cleanup { .. } => Capability::PreResolve,
            PluginUnit::Compile
            | PluginUnit::Replace { .. }
            | PluginUnit::NodeResolve
            | PluginUnit::CommonJs
            | PluginUnit::Style(_) => Capability::TransformSource,
            PluginUnit::ImportRewrite { .. } | PluginUnit::Minify => Capability::PostRender,
        }
    }

    pub fn phase(&self) -> PluginPhase {
        match self {
            PluginUnit::Cleanup { .. } => PluginPhase::Cleanup,
            PluginUnit::Compile => PluginPhase::Compile,
            PluginUnit::Replace { .. } => PluginPhase::Replace,
            PluginUnit::NodeResolve => PluginPhase::Resolve,
            PluginUnit::CommonJs => PluginPhase::CommonJs,
            PluginUnit::Style(_) => PluginPhase::Style,
            PluginUnit::ImportRewrite { .. } => PluginPhase::Rewrite,
            PluginUnit::Minify => PluginPhase::Minify,
        }
    }

    /// Whether the bundling engine is responsible for this unit.
    pub fn is_engine_delegated(&self) -> bool {
        self.capability() == Capability::TransformSource
    }
}
