//! Build-time constant replacement (`process.env.NODE_ENV` and friends).

use rolldown_plugin::{
    HookTransformArgs, HookTransformOutput, HookTransformReturn, HookUsage, Plugin,
    SharedTransformPluginContext,
};
use std::borrow::Cow;

/// Replaces dotted identifier paths with literal expressions in every
/// JavaScript/TypeScript module, vendor code included.
#[derive(Debug, Clone)]
pub struct ReplacePlugin {
    replacements: Vec<(String, String)>,
}

impl ReplacePlugin {
    pub fn new(replacements: Vec<(String, String)>) -> Self {
        Self { replacements }
    }

    /// `None` when nothing matched.
    fn apply(&self, code: &str) -> Option<String> {
        let mut output: Option<String> = None;
        for (from, to) in &self.replacements {
            let current = output.as_deref().unwrap_or(code);
            if let Some(replaced) = replace_path(current, from, to) {
                output = Some(replaced);
            }
        }
        output
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Replace whole-path occurrences of `from`.
///
/// `process.env.NODE_ENV` matches in `process.env.NODE_ENV === "x"` but not
/// in `process.env.NODE_ENV_X` or `my.process.env.NODE_ENV`.
fn replace_path(code: &str, from: &str, to: &str) -> Option<String> {
    let mut result = String::with_capacity(code.len());
    let mut last = 0;
    let mut replaced = false;

    for (idx, _) in code.match_indices(from) {
        let before = code[..idx].chars().next_back();
        let after = code[idx + from.len()..].chars().next();
        let bounded = !before.is_some_and(|c| is_ident_char(c) || c == '.')
            && !after.is_some_and(is_ident_char);
        if !bounded {
            continue;
        }
        result.push_str(&code[last..idx]);
        result.push_str(to);
        last = idx + from.len();
        replaced = true;
    }

    if !replaced {
        return None;
    }
    result.push_str(&code[last..]);
    Some(result)
}

impl Plugin for ReplacePlugin {
    fn name(&self) -> Cow<'static, str> {
        "tspack-replace".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::Transform
    }

    fn transform(
        &self,
        _ctx: SharedTransformPluginContext,
        args: &HookTransformArgs<'_>,
    ) -> impl std::future::Future<Output = HookTransformReturn> + Send {
        let id = args.id.to_string();
        let code = if id.ends_with(".css") || id.ends_with(".json") {
            None
        } else {
            self.apply(args.code)
        };

        async move {
            Ok(code.map(|code| HookTransformOutput {
                code: Some(code),
                map: None,
                side_effects: None,
                module_type: None,
            }))
        }
    }
}
