//! Immutable build configuration.
//!
//! Every flag the build reads lives on [`BuildConfiguration`], which is
//! constructed once per invocation through [`BuildConfigurationBuilder`] and
//! then passed by reference to each component. Nothing downstream reads
//! process-wide state.

use crate::manifest::Manifest;
use path_clean::PathClean;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default output directory.
pub const DEFAULT_OUTPUT_DIR: &str = "dist";

/// Default CDN used for bare-import rewriting.
pub const DEFAULT_CDN_BASE: &str = "https://dev.jspm.io";

/// Default dependency manifest.
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Default value substituted for `process.env.NODE_ENV` in vendor code.
pub const DEFAULT_NODE_ENV: &str = "production";

/// Name of the artifact written into the output directory.
pub const ARTIFACT_FILE_NAME: &str = "index.js";

/// Errors raised while building or validating the configuration.
///
/// All of these are fatal and reported before any build work starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Entry path is missing or not a readable file.
    #[error("Entry point not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    /// Mutually exclusive options were requested together.
    #[error("Conflicting options: {0}")]
    ConflictingOptions(String),

    /// The dependency manifest does not exist.
    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// The dependency manifest could not be read.
    #[error("Failed to read manifest {}: {source}", .path.display())]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dependency manifest is not valid JSON.
    #[error("Invalid manifest {}: {source}", .path.display())]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Externalization was requested but the manifest declares nothing.
    #[error("No dependencies declared in {}", .0.display())]
    NoDeclaredDependencies(PathBuf),

    /// A field holds a value outside its accepted range.
    #[error("Invalid value for '{field}': {value}")]
    InvalidValue { field: String, value: String },
}

impl ConfigurationError {
    /// Actionable hint shown under the error.
    pub fn hint(&self) -> Option<String> {
        match self {
            ConfigurationError::EntryNotFound(_) => {
                Some("Pass the entry module as the first argument, e.g. `tspack build src/index.ts`".into())
            }
            ConfigurationError::ConflictingOptions(_) => Some(
                "A dependency is either left to the runtime (--externalize) or rewritten to a CDN (--cdn), not both"
                    .into(),
            ),
            ConfigurationError::ManifestNotFound(_) | ConfigurationError::NoDeclaredDependencies(_) => {
                Some("Externalizing requires a package.json with a non-empty \"dependencies\" map; use -p to point at it".into())
            }
            ConfigurationError::InvalidManifest { .. } => {
                Some("Check package.json for JSON syntax errors".into())
            }
            ConfigurationError::InvalidValue { field, .. } if field == "cdnBase" => {
                Some("The CDN base must be an http:// or https:// URL".into())
            }
            _ => None,
        }
    }
}

/// Output module format requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Esm,
    Cjs,
    Iife,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Esm => write!(f, "esm"),
            Self::Cjs => write!(f, "cjs"),
            Self::Iife => write!(f, "iife"),
        }
    }
}

/// Validated, immutable configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    cwd: PathBuf,
    entry_path: PathBuf,
    output_directory: PathBuf,
    format: OutputFormat,
    externalize: bool,
    rewrite_to_cdn: bool,
    cdn_base: String,
    minify: bool,
    emit_source_map: bool,
    watch: bool,
    resolve_vendor: bool,
    node_env: String,
    styles: bool,
    manifest_path: PathBuf,
    declared_dependencies: BTreeSet<String>,
}

impl BuildConfiguration {
    /// Start building a configuration for the given entry module.
    pub fn builder(entry_path: impl Into<PathBuf>) -> BuildConfigurationBuilder {
        BuildConfigurationBuilder::new(entry_path)
    }

    /// Project root all relative paths are resolved against.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Entry module as given.
    pub fn entry_path(&self) -> &Path {
        &self.entry_path
    }

    /// Entry module resolved against [`cwd`](Self::cwd).
    pub fn resolved_entry(&self) -> PathBuf {
        resolve_path(&self.entry_path, &self.cwd)
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Output directory resolved against [`cwd`](Self::cwd).
    pub fn resolved_output_directory(&self) -> PathBuf {
        resolve_path(&self.output_directory, &self.cwd)
    }

    /// `<output>/index.js`
    pub fn artifact_path(&self) -> PathBuf {
        self.resolved_output_directory().join(ARTIFACT_FILE_NAME)
    }

    /// `<output>/index.js.map`
    pub fn source_map_path(&self) -> PathBuf {
        self.resolved_output_directory()
            .join(format!("{ARTIFACT_FILE_NAME}.map"))
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn externalize(&self) -> bool {
        self.externalize
    }

    pub fn rewrite_to_cdn(&self) -> bool {
        self.rewrite_to_cdn
    }

    pub fn cdn_base(&self) -> &str {
        &self.cdn_base
    }

    pub fn minify(&self) -> bool {
        self.minify
    }

    pub fn emit_source_map(&self) -> bool {
        self.emit_source_map
    }

    pub fn watch(&self) -> bool {
        self.watch
    }

    /// Whether bare imports are resolved from `node_modules` and inlined.
    pub fn resolve_vendor(&self) -> bool {
        self.resolve_vendor
    }

    pub fn node_env(&self) -> &str {
        &self.node_env
    }

    pub fn styles(&self) -> bool {
        self.styles
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn declared_dependencies(&self) -> &BTreeSet<String> {
        &self.declared_dependencies
    }
}

/// Builder for [`BuildConfiguration`].
#[derive(Debug, Clone)]
pub struct BuildConfigurationBuilder {
    cwd: PathBuf,
    entry_path: PathBuf,
    output_directory: PathBuf,
    format: OutputFormat,
    externalize: bool,
    rewrite_to_cdn: bool,
    cdn_base: String,
    minify: bool,
    emit_source_map: bool,
    watch: bool,
    resolve_vendor: bool,
    node_env: String,
    styles: bool,
    manifest_path: PathBuf,
    declared_dependencies: Option<BTreeSet<String>>,
}

impl BuildConfigurationBuilder {
    fn new(entry_path: impl Into<PathBuf>) -> Self {
        Self {
            cwd: PathBuf::from("."),
            entry_path: entry_path.into(),
            output_directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: OutputFormat::Esm,
            externalize: false,
            rewrite_to_cdn: false,
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            minify: true,
            emit_source_map: true,
            watch: false,
            resolve_vendor: true,
            node_env: DEFAULT_NODE_ENV.to_string(),
            styles: true,
            manifest_path: PathBuf::from(DEFAULT_MANIFEST),
            declared_dependencies: None,
        }
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn externalize(mut self, enabled: bool) -> Self {
        self.externalize = enabled;
        self
    }

    pub fn rewrite_to_cdn(mut self, enabled: bool) -> Self {
        self.rewrite_to_cdn = enabled;
        self
    }

    pub fn cdn_base(mut self, base: impl Into<String>) -> Self {
        self.cdn_base = base.into();
        self
    }

    pub fn minify(mut self, enabled: bool) -> Self {
        self.minify = enabled;
        self
    }

    pub fn emit_source_map(mut self, enabled: bool) -> Self {
        self.emit_source_map = enabled;
        self
    }

    pub fn watch(mut self, enabled: bool) -> Self {
        self.watch = enabled;
        self
    }

    pub fn resolve_vendor(mut self, enabled: bool) -> Self {
        self.resolve_vendor = enabled;
        self
    }

    pub fn node_env(mut self, value: impl Into<String>) -> Self {
        self.node_env = value.into();
        self
    }

    pub fn styles(mut self, enabled: bool) -> Self {
        self.styles = enabled;
        self
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_path = path.into();
        self
    }

    /// Supply the declared dependencies directly instead of reading the manifest.
    pub fn declared_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared_dependencies = Some(deps.into_iter().map(Into::into).collect());
        self
    }

    /// Validate and freeze the configuration.
    ///
    /// The manifest is only read when externalization is requested and no
    /// dependency set was supplied explicitly.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::ConflictingOptions`] when both `externalize`
    ///   and `rewrite_to_cdn` are set
    /// - manifest errors, or [`ConfigurationError::NoDeclaredDependencies`],
    ///   when `externalize` is set
    /// - [`ConfigurationError::InvalidValue`] for a non-HTTP CDN base
    pub fn build(self) -> Result<BuildConfiguration, ConfigurationError> {
        if self.externalize && self.rewrite_to_cdn {
            return Err(ConfigurationError::ConflictingOptions(
                "--externalize and --cdn cannot be combined".to_string(),
            ));
        }

        let cdn_base = self.cdn_base.trim_end_matches('/').to_string();
        if !(cdn_base.starts_with("http://") || cdn_base.starts_with("https://")) {
            return Err(ConfigurationError::InvalidValue {
                field: "cdnBase".to_string(),
                value: self.cdn_base,
            });
        }

        if self.entry_path.as_os_str().is_empty() {
            return Err(ConfigurationError::EntryNotFound(self.entry_path));
        }

        let manifest_file = resolve_path(&self.manifest_path, &self.cwd);
        let declared_dependencies = match self.declared_dependencies {
            Some(deps) => deps,
            None if self.externalize => Manifest::load(&manifest_file)?.declared_dependencies(),
            None => BTreeSet::new(),
        };

        if self.externalize && declared_dependencies.is_empty() {
            return Err(ConfigurationError::NoDeclaredDependencies(manifest_file));
        }

        Ok(BuildConfiguration {
            cwd: self.cwd,
            entry_path: self.entry_path,
            output_directory: self.output_directory,
            format: self.format,
            externalize: self.externalize,
            rewrite_to_cdn: self.rewrite_to_cdn,
            cdn_base,
            minify: self.minify,
            emit_source_map: self.emit_source_map,
            watch: self.watch,
            resolve_vendor: self.resolve_vendor,
            node_env: self.node_env,
            styles: self.styles,
            manifest_path: self.manifest_path,
            declared_dependencies,
        })
    }
}

/// Resolve `path` against `cwd` unless it is already absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf().clean()
    } else {
        cwd.join(path).clean()
    }
}
