//! Rolldown-backed [`BundlingEngine`].
//!
//! TypeScript compilation, `node_modules` resolution and CommonJS interop
//! are native to Rolldown; the remaining engine-delegated units are mapped to
//! small Rolldown plugins.

mod css;
mod externals;
mod replace;

use super::{BundlingEngine, CompileInput, EngineError, Externals, RenderRequest, RenderedChunk};
use crate::config::OutputFormat;
use crate::plugins::PluginUnit;
use async_trait::async_trait;
use rolldown::{BundlerBuilder, BundlerOptions, InputItem, Platform, ResolveOptions, SourceMapType};
use rolldown_common::Output;
use rolldown_plugin::__inner::SharedPluginable;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

pub use css::CssPlugin;
pub use externals::ExternalsPlugin;
pub use replace::ReplacePlugin;

/// Drives Rolldown through the engine-delegated part of the pipeline.
#[derive(Debug, Clone)]
pub struct RolldownEngine {
    platform: Platform,
}

impl RolldownEngine {
    pub fn new() -> Self {
        Self {
            platform: Platform::Browser,
        }
    }

    /// Target platform for module resolution conditions.
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

impl Default for RolldownEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// A prepared Rolldown build.
///
/// Rolldown scans and generates in a single `generate()` call, so the graph
/// handle carries the resolved options and plugins, and the scan itself
/// happens during [`BundlingEngine::render`]. Resolve and parse errors are
/// still reported as [`EngineError::Compile`].
pub struct RolldownGraph {
    options: BundlerOptions,
    plugins: Vec<SharedPluginable>,
}

impl std::fmt::Debug for RolldownGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolldownGraph")
            .field("input", &self.options.input)
            .field("plugins", &self.plugins.len())
            .finish()
    }
}

#[async_trait]
impl BundlingEngine for RolldownEngine {
    type Graph = RolldownGraph;

    async fn compile(&self, input: CompileInput) -> Result<Self::Graph, EngineError> {
        if !tokio::fs::metadata(&input.entry)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
        {
            return Err(EngineError::compile(format!(
                "Entry module not found: {}",
                input.entry.display()
            )));
        }

        let mut plugins: Vec<SharedPluginable> = Vec::new();

        if input.externals != Externals::None {
            plugins.push(Arc::new(ExternalsPlugin::new(input.externals.clone())));
        }

        for unit in input.pipeline.engine_units() {
            match unit {
                PluginUnit::Replace { replacements } => {
                    plugins.push(Arc::new(ReplacePlugin::new(replacements.clone())));
                }
                PluginUnit::Style(options) => {
                    plugins.push(Arc::new(CssPlugin::new(options.clone())));
                }
                // Native to Rolldown.
                PluginUnit::Compile | PluginUnit::NodeResolve | PluginUnit::CommonJs => {}
                other => debug!(unit = %other.name(), "unit not handled by the engine"),
            }
        }

        let options = BundlerOptions {
            input: Some(vec![InputItem {
                name: Some("index".to_string()),
                import: input.entry.to_string_lossy().to_string(),
            }]),
            cwd: Some(input.cwd.clone()),
            platform: Some(self.platform),
            inline_dynamic_imports: Some(true),
            resolve: Some(configure_resolution(&input.cwd, self.platform)),
            ..Default::default()
        };

        debug!(
            entry = %input.entry.display(),
            plugins = plugins.len(),
            "prepared rolldown build"
        );

        Ok(RolldownGraph { options, plugins })
    }

    async fn render(
        &self,
        graph: Self::Graph,
        request: RenderRequest,
    ) -> Result<RenderedChunk, EngineError> {
        let RolldownGraph {
            mut options,
            plugins,
        } = graph;

        options.format = Some(match request.format {
            OutputFormat::Esm => rolldown::OutputFormat::Esm,
            OutputFormat::Cjs => rolldown::OutputFormat::Cjs,
            OutputFormat::Iife => rolldown::OutputFormat::Iife,
        });
        options.sourcemap = request.sourcemap.then_some(SourceMapType::File);
        debug!(output = %request.output_path.display(), format = %request.format, "rendering chunk");

        let mut bundler = BundlerBuilder::default()
            .with_options(options)
            .with_plugins(plugins)
            .build()
            .map_err(|e| compile_error(&e))?;

        let bundle = bundler.generate().await.map_err(|e| compile_error(&e))?;

        for warning in &bundle.warnings {
            warn!("{warning:?}");
        }

        let mut chunks = bundle.assets.into_iter().filter_map(|output| match output {
            Output::Chunk(chunk) => Some(chunk),
            Output::Asset(_) => None,
        });

        let chunk = chunks.next().ok_or(EngineError::EmptyOutput)?;
        if chunks.next().is_some() {
            warn!("engine produced more than one chunk; only the entry chunk is written");
        }

        Ok(RenderedChunk {
            code: chunk.code.clone(),
            imports: chunk.imports.iter().map(|s| s.to_string()).collect(),
            map: chunk.map.as_ref().map(|map| map.to_json_string()),
        })
    }
}

/// Resolution from every `node_modules` between `cwd` and the filesystem root.
fn configure_resolution(cwd: &Path, platform: Platform) -> ResolveOptions {
    let mut modules: Vec<String> = cwd
        .ancestors()
        .map(|dir| dir.join("node_modules").to_string_lossy().to_string())
        .collect();
    modules.push("node_modules".to_string());

    let (main_fields, conditions) = match platform {
        Platform::Node => (vec!["module", "main"], vec!["import", "node", "default"]),
        _ => (
            vec!["browser", "module", "main"],
            vec!["import", "browser", "default"],
        ),
    };

    ResolveOptions {
        main_fields: Some(main_fields.into_iter().map(String::from).collect()),
        condition_names: Some(conditions.into_iter().map(String::from).collect()),
        extensions: Some(
            [".ts", ".tsx", ".mts", ".js", ".jsx", ".mjs", ".json"]
                .into_iter()
                .map(String::from)
                .collect(),
        ),
        modules: Some(modules),
        symlinks: Some(true),
        ..Default::default()
    }
}

/// Map a Rolldown diagnostic batch to a compile error.
fn compile_error(error: &dyn std::fmt::Debug) -> EngineError {
    let raw = format!("{error:?}");
    let message = if raw.contains("UnresolvedImport") || raw.contains("Could not resolve") {
        "Unresolved import"
    } else if raw.contains("UnresolvedEntry") {
        "Unresolved entry module"
    } else if raw.contains("MissingExport") {
        "Missing export"
    } else if raw.contains("Parse") || raw.contains("Syntax") || raw.contains("Expected") {
        "Parse error"
    } else if raw.contains("Plugin") {
        "Plugin error"
    } else {
        "Compilation failed"
    };

    EngineError::Compile {
        message: message.to_string(),
        cause: Some(raw),
    }
}
