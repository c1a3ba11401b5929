//! Pipeline assembly with execution phases.
//!
//! [`assemble`] turns a [`BuildConfiguration`] into an ordered [`Pipeline`].
//! Units are collected together with their [`PluginPhase`] and sorted once,
//! so the ordering guarantees hold no matter in which order they are added:
//!
//! - cleanup is always first
//! - compile immediately follows cleanup
//! - style and import rewrite come after compile
//! - minify, when present, is always last

use crate::config::{BuildConfiguration, ConfigurationError};
use crate::plugins::{Capability, PluginPhase, PluginUnit, StyleOptions};
use tracing::debug;

/// Ordered, immutable sequence of plugin units for one build session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    units: Vec<PluginUnit>,
}

impl Pipeline {
    pub fn units(&self) -> &[PluginUnit] {
        &self.units
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginUnit> {
        self.units.iter()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn first(&self) -> Option<&PluginUnit> {
        self.units.first()
    }

    pub fn last(&self) -> Option<&PluginUnit> {
        self.units.last()
    }

    /// Unit names in execution order.
    pub fn names(&self) -> Vec<String> {
        self.units.iter().map(|u| u.name().into_owned()).collect()
    }

    pub fn contains(&self, phase: PluginPhase) -> bool {
        self.units.iter().any(|u| u.phase() == phase)
    }

    /// Position of the first unit in the given phase.
    pub fn position(&self, phase: PluginPhase) -> Option<usize> {
        self.units.iter().position(|u| u.phase() == phase)
    }

    /// Units with the given capability, in pipeline order.
    pub fn with_capability(&self, capability: Capability) -> impl Iterator<Item = &PluginUnit> {
        self.units
            .iter()
            .filter(move |u| u.capability() == capability)
    }

    /// Units the bundling engine is responsible for, in pipeline order.
    pub fn engine_units(&self) -> impl Iterator<Item = &PluginUnit> {
        self.units.iter().filter(|u| u.is_engine_delegated())
    }
}

/// Collects units and sorts them by phase.
#[derive(Debug, Default)]
struct PipelineBuilder {
    units: Vec<(PluginPhase, PluginUnit)>,
}

impl PipelineBuilder {
    /// Sorting happens once in `finish()` rather than on every add.
    fn add(&mut self, unit: PluginUnit) {
        self.units.push((unit.phase(), unit));
    }

    fn finish(mut self) -> Pipeline {
        // Stable sort keeps insertion order within one phase.
        self.units.sort_by_key(|(phase, _)| *phase);
        Pipeline {
            units: self.units.into_iter().map(|(_, unit)| unit).collect(),
        }
    }
}

/// Build the ordered pipeline for `config`.
///
/// The only I/O performed is checking that the entry module is a readable
/// file; nothing is executed.
///
/// # Errors
///
/// [`ConfigurationError::EntryNotFound`] when the entry path does not point
/// at a file.
pub fn assemble(config: &BuildConfiguration) -> Result<Pipeline, ConfigurationError> {
    let entry = config.resolved_entry();
    if !entry.is_file() {
        return Err(ConfigurationError::EntryNotFound(config.entry_path().to_path_buf()));
    }

    let mut builder = PipelineBuilder::default();

    builder.add(PluginUnit::Cleanup {
        target: config.resolved_output_directory(),
    });
    builder.add(PluginUnit::Compile);

    if config.resolve_vendor() && !config.rewrite_to_cdn() {
        // Vendor code guards dev-only branches with NODE_ENV checks that
        // become dead code once the value is a literal.
        builder.add(PluginUnit::Replace {
            replacements: vec![(
                "process.env.NODE_ENV".to_string(),
                serde_json::Value::String(config.node_env().to_string()).to_string(),
            )],
        });
        builder.add(PluginUnit::NodeResolve);
        builder.add(PluginUnit::CommonJs);
    }

    if config.styles() {
        builder.add(PluginUnit::Style(StyleOptions {
            minify: config.minify(),
            exclude: vec![".min.css".to_string()],
        }));
    }

    if config.rewrite_to_cdn() {
        builder.add(PluginUnit::ImportRewrite {
            cdn_base: config.cdn_base().to_string(),
        });
    }

    if config.minify() {
        builder.add(PluginUnit::Minify);
    }

    let pipeline = builder.finish();
    debug!(units = ?pipeline.names(), "assembled pipeline");
    Ok(pipeline)
}
