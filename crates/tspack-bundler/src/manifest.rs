//! Project manifest (`package.json`) reading.

use crate::config::ConfigurationError;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// The subset of `package.json` the build cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,

    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
}

impl Manifest {
    /// Read and parse a manifest from disk.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::ManifestNotFound`] when the file does not exist,
    /// [`ConfigurationError::ManifestIo`] for other read failures and
    /// [`ConfigurationError::InvalidManifest`] for malformed JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigurationError::ManifestNotFound(path.to_path_buf())
            } else {
                ConfigurationError::ManifestIo {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse manifest JSON; `path` is only used for error reporting.
    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigurationError> {
        serde_json::from_str(content).map_err(|source| ConfigurationError::InvalidManifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Runtime and peer dependency names.
    pub fn declared_dependencies(&self) -> BTreeSet<String> {
        self.dependencies
            .keys()
            .chain(self.peer_dependencies.keys())
            .cloned()
            .collect()
    }
}
