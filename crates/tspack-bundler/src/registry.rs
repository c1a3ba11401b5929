//! Package version lookup for CDN rewriting.
//!
//! The rewrite transform asks a [`VersionRegistry`] for the version of every
//! bare package it rewrites. Lookups are single-attempt; a failure is reported
//! as [`ExternalLookupError`] and the caller falls back to an unversioned URL.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Failure to resolve a package version.
#[derive(Debug, Error)]
pub enum ExternalLookupError {
    /// The package is not installed / not known to the registry.
    #[error("package '{0}' not found")]
    NotFound(String),

    /// The registry answered with something that is not a version.
    #[error("invalid version for '{package}': {detail}")]
    InvalidResponse { package: String, detail: String },

    /// The query itself could not be performed.
    #[error("lookup for '{package}' failed: {source}")]
    Io {
        package: String,
        #[source]
        source: std::io::Error,
    },
}

/// Resolves a package name to a concrete version string.
#[async_trait]
pub trait VersionRegistry: Send + Sync {
    async fn resolve_version(&self, package: &str) -> Result<String, ExternalLookupError>;
}

#[async_trait]
impl<T: VersionRegistry + ?Sized> VersionRegistry for std::sync::Arc<T> {
    async fn resolve_version(&self, package: &str) -> Result<String, ExternalLookupError> {
        (**self).resolve_version(package).await
    }
}

/// Reads the installed version from `node_modules/<package>/package.json`.
#[derive(Debug, Clone)]
pub struct InstalledPackages {
    root: PathBuf,
}

#[derive(Deserialize)]
struct InstalledManifest {
    version: Option<String>,
}

impl InstalledPackages {
    /// `root` is the directory containing `node_modules`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl VersionRegistry for InstalledPackages {
    async fn resolve_version(&self, package: &str) -> Result<String, ExternalLookupError> {
        let manifest = self
            .root
            .join("node_modules")
            .join(package)
            .join("package.json");

        let content = match tokio::fs::read_to_string(&manifest).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExternalLookupError::NotFound(package.to_string()));
            }
            Err(source) => {
                return Err(ExternalLookupError::Io {
                    package: package.to_string(),
                    source,
                });
            }
        };

        let parsed: InstalledManifest =
            serde_json::from_str(&content).map_err(|e| ExternalLookupError::InvalidResponse {
                package: package.to_string(),
                detail: e.to_string(),
            })?;

        parsed
            .version
            .filter(|v| is_version(v))
            .ok_or_else(|| ExternalLookupError::InvalidResponse {
                package: package.to_string(),
                detail: "missing \"version\" field".to_string(),
            })
    }
}

/// Asks the npm registry through `npm view <package> version`.
#[derive(Debug, Clone)]
pub struct NpmRegistry {
    program: String,
    cwd: Option<PathBuf>,
}

impl NpmRegistry {
    pub fn new() -> Self {
        Self {
            program: "npm".to_string(),
            cwd: None,
        }
    }

    /// Use a different executable (e.g. `pnpm`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

impl Default for NpmRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VersionRegistry for NpmRegistry {
    async fn resolve_version(&self, package: &str) -> Result<String, ExternalLookupError> {
        let mut command = Command::new(&self.program);
        command.args(["view", package, "version"]);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        let output = command
            .output()
            .await
            .map_err(|source| ExternalLookupError::Io {
                package: package.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ExternalLookupError::NotFound(package.to_string()));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if is_version(&version) {
            Ok(version)
        } else {
            Err(ExternalLookupError::InvalidResponse {
                package: package.to_string(),
                detail: format!("unexpected output {version:?}"),
            })
        }
    }
}

/// Loose semver shape check: `MAJOR.MINOR.PATCH` with optional suffix.
fn is_version(value: &str) -> bool {
    let core = value.split(['-', '+']).next().unwrap_or_default();
    let parts: Vec<_> = core.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
