//! Style compilation through lightningcss.

use crate::plugins::StyleOptions;
use anyhow::Context;
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
};
use rolldown_common::ModuleType;
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, HookUsage, Plugin, PluginContext};
use std::borrow::Cow;
use std::path::Path;
use tracing::debug;

/// Loads `.css` imports, compiling (and optionally minifying) them.
///
/// ```text
/// .css file → load() hook → lightningcss parse → minify → print → ModuleType::Css
/// ```
#[derive(Clone, Debug)]
pub struct CssPlugin {
    options: StyleOptions,
}

impl CssPlugin {
    pub fn new(options: StyleOptions) -> Self {
        Self { options }
    }

    fn process_css(&self, path: &Path, source: &str) -> anyhow::Result<String> {
        let mut stylesheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename: path.to_string_lossy().to_string(),
                ..Default::default()
            },
        )
        .map_err(|e| anyhow::anyhow!("Failed to parse CSS from {}: {:?}", path.display(), e))?;

        if self.options.minify {
            stylesheet.minify(MinifyOptions::default()).map_err(|e| {
                anyhow::anyhow!("Failed to minify CSS from {}: {:?}", path.display(), e)
            })?;
        }

        let result = stylesheet
            .to_css(PrinterOptions {
                minify: self.options.minify,
                ..Default::default()
            })
            .map_err(|e| anyhow::anyhow!("Failed to print CSS from {}: {:?}", path.display(), e))?;

        Ok(result.code)
    }

    fn should_process(&self, id: &str) -> bool {
        id.ends_with(".css")
            && !self
                .options
                .exclude
                .iter()
                .any(|pattern| id.contains(pattern.as_str()))
    }
}

impl Plugin for CssPlugin {
    fn name(&self) -> Cow<'static, str> {
        "tspack-style".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Load
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let plugin = self.clone();

        async move {
            if !plugin.should_process(&id) {
                return Ok(None);
            }

            let source = tokio::fs::read_to_string(&id)
                .await
                .with_context(|| format!("Failed to read CSS file: {}", id))?;

            let processed = plugin.process_css(Path::new(&id), &source)?;
            debug!(
                id = %id,
                before = source.len(),
                after = processed.len(),
                minify = plugin.options.minify,
                "compiled stylesheet"
            );

            Ok(Some(HookLoadOutput {
                code: processed.into(),
                module_type: Some(ModuleType::Css),
                ..Default::default()
            }))
        }
    }
}
