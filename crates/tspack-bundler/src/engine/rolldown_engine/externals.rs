//! Marks external specifiers during resolution.

use crate::engine::Externals;
use rolldown_common::ResolvedExternal;
use rolldown_plugin::{
    HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use std::borrow::Cow;

/// Resolves external specifiers to themselves so they survive verbatim in
/// the rendered chunk. Everything else falls through to Rolldown.
#[derive(Debug, Clone)]
pub struct ExternalsPlugin {
    externals: Externals,
}

impl ExternalsPlugin {
    pub fn new(externals: Externals) -> Self {
        Self { externals }
    }
}

impl Plugin for ExternalsPlugin {
    fn name(&self) -> Cow<'static, str> {
        "tspack-externals".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        // The entry itself is never external.
        let external = args.importer.is_some() && self.externals.is_external(args.specifier);
        let specifier = args.specifier.to_string();

        async move {
            if !external {
                return Ok(None);
            }

            Ok(Some(HookResolveIdOutput {
                id: specifier.into(),
                external: Some(ResolvedExternal::Bool(true)),
                ..Default::default()
            }))
        }
    }
}
