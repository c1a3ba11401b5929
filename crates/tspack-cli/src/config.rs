//! Multi-source configuration for the CLI.
//!
//! Priority: CLI flags > `TSPACK_*` environment > `tspack.config.json` > defaults.
//! The merged [`TspackConfig`] is then frozen into a
//! [`BuildConfiguration`] for the bundler.

use crate::cli::{BuildArgs, RegistryArg};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tspack_bundler::config::{DEFAULT_CDN_BASE, DEFAULT_MANIFEST, DEFAULT_NODE_ENV, DEFAULT_OUTPUT_DIR};
use tspack_bundler::{
    BuildConfiguration, ConfigurationError, InstalledPackages, NpmRegistry, OutputFormat,
    VersionRegistry,
};

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tspack.config.json";

/// Prefix for environment overrides, e.g. `TSPACK_OUT_DIR=public`.
pub const ENV_PREFIX: &str = "TSPACK_";

/// Where CDN rewrites look up package versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Registry {
    #[default]
    Installed,
    Npm,
}

impl From<RegistryArg> for Registry {
    fn from(arg: RegistryArg) -> Self {
        match arg {
            RegistryArg::Installed => Registry::Installed,
            RegistryArg::Npm => Registry::Npm,
        }
    }
}

/// tspack configuration - loaded from tspack.config.json, env and CLI args.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TspackConfig {
    /// Entry module
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    /// Output directory
    pub out_dir: PathBuf,
    /// Dependency manifest consulted by `externalize`
    pub packages: PathBuf,
    pub format: OutputFormat,
    /// Minify the rendered bundle
    pub uglify: bool,
    pub sourcemap: bool,
    /// Inline dependencies from node_modules
    pub resolve: bool,
    pub styles: bool,
    pub externalize: bool,
    pub cdn: bool,
    pub cdn_base: String,
    pub registry: Registry,
    /// Value substituted for `process.env.NODE_ENV`
    pub node_env: String,
    pub watch: bool,
}

impl Default for TspackConfig {
    fn default() -> Self {
        Self {
            input: None,
            out_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            packages: PathBuf::from(DEFAULT_MANIFEST),
            format: OutputFormat::Esm,
            uglify: true,
            sourcemap: true,
            resolve: true,
            styles: true,
            externalize: false,
            cdn: false,
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            registry: Registry::Installed,
            node_env: DEFAULT_NODE_ENV.to_string(),
            watch: false,
        }
    }
}

/// Flags the user actually passed. Unset flags are skipped so they do not
/// shadow the config file or the environment.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    packages: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<OutputFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uglify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sourcemap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolve: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    styles: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    externalize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cdn: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cdn_base: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    registry: Option<Registry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    watch: Option<bool>,
}

impl CliOverrides {
    fn from_build_args(args: &BuildArgs, watch: bool) -> Self {
        Self {
            input: args.input.clone(),
            out_dir: args.out_dir.clone(),
            packages: args.packages.clone(),
            format: args.format.map(Into::into),
            uglify: args.no_uglify.then_some(false),
            sourcemap: args.no_sourcemap.then_some(false),
            resolve: args.no_resolve.then_some(false),
            styles: args.no_styles.then_some(false),
            externalize: args.externalize.then_some(true),
            cdn: args.cdn.then_some(true),
            cdn_base: args.cdn_base.clone(),
            registry: args.registry.map(Into::into),
            watch: (watch || args.watch).then_some(true),
        }
    }
}

impl TspackConfig {
    const FIELDS: &'static [&'static str] = &[
        "input",
        "outDir",
        "packages",
        "format",
        "uglify",
        "sourcemap",
        "resolve",
        "styles",
        "externalize",
        "cdn",
        "cdnBase",
        "registry",
        "nodeEnv",
        "watch",
    ];

    /// Load configuration from every source.
    ///
    /// `watch` forces watch mode on, as `tspack watch` does.
    pub fn load(args: &BuildArgs, cwd: &Path, watch: bool) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = match &args.config {
            Some(path) => {
                let path = tspack_bundler::config::resolve_path(path, cwd);
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Some(path)
            }
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.is_file().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!("Loading config file {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        figment = figment.merge(
            Env::prefixed(ENV_PREFIX)
                .map(|key| env_key_to_field(key.as_str()).into())
                .filter(|key| Self::FIELDS.contains(&key.as_str())),
        );

        figment = figment.merge(Serialized::defaults(CliOverrides::from_build_args(args, watch)));

        let config: Self = figment.extract().map_err(|e| {
            let field = if e.path.is_empty() {
                "configuration".to_string()
            } else {
                e.path.join(".")
            };
            ConfigError::InvalidValue {
                field,
                value: e.kind.to_string(),
                hint: format!("Check {CONFIG_FILE_NAME} and {ENV_PREFIX}* variables for typos and field types"),
            }
        })?;

        if config.input.is_none() {
            return Err(ConfigError::MissingInput.into());
        }
        Ok(config)
    }

    /// Freeze into the bundler's validated configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] from [`BuildConfiguration`] validation,
    /// e.g. `externalize` combined with `cdn`.
    pub fn to_build_configuration(&self, cwd: &Path) -> std::result::Result<BuildConfiguration, ConfigurationError> {
        BuildConfiguration::builder(self.input.clone().unwrap_or_default())
            .cwd(cwd)
            .output_directory(&self.out_dir)
            .manifest_path(&self.packages)
            .format(self.format)
            .minify(self.uglify)
            .emit_source_map(self.sourcemap)
            .resolve_vendor(self.resolve)
            .styles(self.styles)
            .externalize(self.externalize)
            .rewrite_to_cdn(self.cdn)
            .cdn_base(&self.cdn_base)
            .node_env(&self.node_env)
            .watch(self.watch)
            .build()
    }

    /// Version source for CDN rewrites, rooted at `cwd`.
    pub fn version_registry(&self, cwd: &Path) -> Arc<dyn VersionRegistry> {
        match self.registry {
            Registry::Installed => Arc::new(InstalledPackages::new(cwd)),
            Registry::Npm => Arc::new(NpmRegistry::new().with_cwd(cwd)),
        }
    }
}

/// `OUT_DIR` -> `outDir`
fn env_key_to_field(key: &str) -> String {
    let mut field = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = !field.is_empty();
        } else if upper_next {
            field.extend(c.to_uppercase());
            upper_next = false;
        } else {
            field.extend(c.to_lowercase());
        }
    }
    field
}
