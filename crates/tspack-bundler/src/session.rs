//! One build, from purge to written artifact.
//!
//! ```text
//! cleanup → engine.compile → engine.render → rewrite → minify → write
//! ```
//!
//! The entry is checked again before each run, so an entry deleted while
//! watching fails the build with [`FailureKind::ConfigurationError`] and
//! leaves the previous output in place.
//!
//! A session owns its pipeline, which is assembled once in
//! [`BuildSession::new`] and reused by every [`run`](BuildSession::run), so
//! watch mode rebuilds with exactly the same units.

use crate::config::{BuildConfiguration, ConfigurationError};
use crate::engine::{BundlingEngine, CompileInput, EngineError, Externals, RenderRequest};
use crate::pipeline::{Pipeline, assemble};
use crate::plugins::cleanup::purge_output_dir;
use crate::plugins::{Capability, CdnRewrite, PluginUnit, collapse_source_maps, minify_chunk};
use crate::registry::VersionRegistry;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const SOURCE_MAP_COMMENT: &str = "//# sourceMappingURL=";

/// Classification of a failed build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ConfigurationError,
    CompileError,
    WriteError,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ConfigurationError => write!(f, "Configuration error"),
            FailureKind::CompileError => write!(f, "Compile error"),
            FailureKind::WriteError => write!(f, "Write error"),
        }
    }
}

/// Result of one [`BuildSession::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    Success {
        artifact_path: PathBuf,
        source_map_path: Option<PathBuf>,
        duration: Duration,
    },
    Failure {
        kind: FailureKind,
        message: String,
        cause: Option<String>,
    },
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success { .. })
    }

    fn failure(kind: FailureKind, message: impl Into<String>, cause: Option<String>) -> Self {
        BuildOutcome::Failure {
            kind,
            message: message.into(),
            cause,
        }
    }

    fn from_engine(err: EngineError) -> Self {
        let cause = err.cause().map(str::to_string);
        BuildOutcome::failure(FailureKind::CompileError, err.to_string(), cause)
    }
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Success {
                artifact_path,
                duration,
                ..
            } => write!(
                f,
                "Wrote {} in {}ms",
                artifact_path.display(),
                duration.as_millis()
            ),
            BuildOutcome::Failure { kind, message, .. } => write!(f, "{kind}: {message}"),
        }
    }
}

/// A configured build that can be run any number of times.
pub struct BuildSession<E, R> {
    config: BuildConfiguration,
    pipeline: Pipeline,
    engine: E,
    registry: R,
}

impl<E, R> BuildSession<E, R>
where
    E: BundlingEngine,
    R: VersionRegistry,
{
    /// Assemble the pipeline for `config`.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] raised by [`assemble`].
    pub fn new(config: &BuildConfiguration, engine: E, registry: R) -> Result<Self, ConfigurationError> {
        let pipeline = assemble(config)?;
        Ok(Self {
            config: config.clone(),
            pipeline,
            engine,
            registry,
        })
    }

    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Run the build and write `<output>/index.js` (and its map).
    ///
    /// Never panics and never returns early with an error: every failure is
    /// reported through [`BuildOutcome::Failure`].
    pub async fn run(&self) -> BuildOutcome {
        let start = Instant::now();
        let entry = self.config.resolved_entry();
        info!("Starting to bundle module with entry {}", entry.display());

        let outcome = self.execute(entry, start).await;
        if let BuildOutcome::Failure { kind, message, .. } = &outcome {
            error!(%kind, "{message}");
        }
        outcome
    }

    async fn execute(&self, entry: PathBuf, start: Instant) -> BuildOutcome {
        if !entry.is_file() {
            return BuildOutcome::failure(
                FailureKind::ConfigurationError,
                format!("Entry point not found: {}", entry.display()),
                None,
            );
        }

        for unit in self.pipeline.with_capability(Capability::PreResolve) {
            if let PluginUnit::Cleanup { target } = unit {
                if let Err(err) = purge_output_dir(target).await {
                    return BuildOutcome::failure(
                        FailureKind::WriteError,
                        format!("Failed to clean {}", target.display()),
                        Some(err.to_string()),
                    );
                }
            }
        }

        let input = CompileInput {
            entry,
            cwd: self.config.cwd().to_path_buf(),
            pipeline: self.pipeline.clone(),
            externals: Externals::from_config(&self.config),
        };

        let graph = match self.engine.compile(input).await {
            Ok(graph) => graph,
            Err(err) => return BuildOutcome::from_engine(err),
        };

        let artifact_path = self.config.artifact_path();
        let request = RenderRequest {
            format: self.config.format(),
            output_path: artifact_path.clone(),
            sourcemap: self.config.emit_source_map(),
        };

        let chunk = match self.engine.render(graph, request).await {
            Ok(chunk) => chunk,
            Err(err) => return BuildOutcome::from_engine(err),
        };

        let mut code = chunk.code;
        let mut map = chunk.map.filter(|_| self.config.emit_source_map());
        for unit in self.pipeline.with_capability(Capability::PostRender) {
            match unit {
                PluginUnit::ImportRewrite { cdn_base } => {
                    let report = CdnRewrite::new(cdn_base, &self.registry)
                        .apply(&code, &chunk.imports)
                        .await;
                    for rewrite in &report.rewrites {
                        info!("Rewrote import {} -> {}", rewrite.specifier, rewrite.url);
                    }
                    let unversioned = report.unversioned().count();
                    if unversioned > 0 {
                        warn!("{unversioned} import(s) rewritten without a pinned version");
                    }
                    code = report.code;
                }
                PluginUnit::Minify => match minify_chunk(&code, self.config.format(), map.is_some()) {
                    Ok(minified) => {
                        code = minified.code;
                        map = match (map, minified.map) {
                            (Some(engine_map), Some(minified_map)) => {
                                match collapse_source_maps(&engine_map, &minified_map) {
                                    Ok(collapsed) => Some(collapsed),
                                    Err(message) => {
                                        warn!("Dropping source map: {message}");
                                        None
                                    }
                                }
                            }
                            _ => None,
                        };
                    }
                    Err(message) => {
                        return BuildOutcome::failure(FailureKind::CompileError, message, None);
                    }
                },
                _ => {}
            }
        }

        let source_map_path = map.as_ref().map(|_| self.config.source_map_path());

        info!("Writing bundle to {}", artifact_path.display());
        if let Err(err) = write_artifact(&artifact_path, code, map, source_map_path.as_deref()).await {
            return BuildOutcome::failure(
                FailureKind::WriteError,
                format!("Failed to write {}", artifact_path.display()),
                Some(err.to_string()),
            );
        }

        BuildOutcome::Success {
            artifact_path,
            source_map_path,
            duration: start.elapsed(),
        }
    }
}

async fn write_artifact(
    artifact_path: &Path,
    code: String,
    map: Option<String>,
    source_map_path: Option<&Path>,
) -> std::io::Result<()> {
    if let Some(parent) = artifact_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut code = strip_source_map_comment(&code);
    let map = map.zip(source_map_path);
    if let Some((_, map_path)) = &map {
        let file_name = map_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if !code.ends_with('\n') {
            code.push('\n');
        }
        code.push_str(SOURCE_MAP_COMMENT);
        code.push_str(&file_name);
        code.push('\n');
    }

    // artifact first, so a failed artifact write never leaves a map behind
    tokio::fs::write(artifact_path, code).await?;
    if let Some((map, map_path)) = map {
        if let Err(err) = tokio::fs::write(map_path, map).await {
            let _ = tokio::fs::remove_file(artifact_path).await;
            return Err(err);
        }
    }
    Ok(())
}

/// Drop any trailing source map reference the engine emitted.
fn strip_source_map_comment(code: &str) -> String {
    code.lines()
        .filter(|line| !line.trim_start().starts_with(SOURCE_MAP_COMMENT))
        .collect::<Vec<_>>()
        .join("\n")
}
