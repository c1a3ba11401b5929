//! Minification of the rendered chunk.
//!
//! Runs after import rewriting so the rewritten URLs are what gets
//! compressed. The chunk is parsed as a module only for ESM output; CJS and
//! IIFE chunks are scripts, so their directives and top-level bindings are
//! kept. When the engine produced a source map, the minifier's own map is
//! collapsed onto it so the artifact maps straight back to the sources.
//! Columns on import lines shifted by the rewrite are not corrected.

use crate::config::OutputFormat;
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{MangleOptions, Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use oxc_span::SourceType;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

/// Output of [`minify_chunk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinifiedChunk {
    pub code: String,
    /// Map from the minified code back to the chunk it was produced from.
    pub map: Option<String>,
}

/// Compress and mangle a rendered chunk of the given format.
///
/// # Errors
///
/// Returns the first parse error when the chunk is not valid JavaScript.
pub fn minify_chunk(code: &str, format: OutputFormat, source_map: bool) -> Result<MinifiedChunk, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, code, source_type(format)).parse();
    if let Some(err) = ret.errors.first() {
        return Err(format!("failed to parse chunk for minification: {err}"));
    }

    let options = MinifierOptions {
        mangle: Some(MangleOptions {
            top_level: false,
            ..MangleOptions::default()
        }),
        ..MinifierOptions::default()
    };

    let mut program = ret.program;
    let minified = Minifier::new(options).minify(&allocator, &mut program);

    let codegen_options = CodegenOptions {
        source_map_path: source_map.then(|| PathBuf::from("index.js")),
        ..CodegenOptions::minify()
    };
    let output = Codegen::new()
        .with_options(codegen_options)
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(MinifiedChunk {
        code: output.code,
        map: output.map.map(|map| map.to_json_string()),
    })
}

fn source_type(format: OutputFormat) -> SourceType {
    match format {
        OutputFormat::Esm => SourceType::mjs(),
        OutputFormat::Cjs => SourceType::cjs(),
        // top-level bindings of a classic script are globals
        OutputFormat::Iife => SourceType::cjs().with_module(false),
    }
}

/// Chain the minifier's map (minified code to rendered chunk) onto the
/// engine's map (rendered chunk to sources).
///
/// Minified positions that fall before any engine mapping are dropped.
///
/// # Errors
///
/// Returns a message when either map is not valid source map JSON.
pub fn collapse_source_maps(engine_map: &str, minified_map: &str) -> Result<String, String> {
    let engine = SourceMap::from_json_string(engine_map)
        .map_err(|err| format!("invalid engine source map: {err}"))?;
    let minified = SourceMap::from_json_string(minified_map)
        .map_err(|err| format!("invalid minifier source map: {err}"))?;

    let lookup = engine.generate_lookup_table();
    let mut builder = SourceMapBuilder::default();
    if let Some(file) = engine.get_file() {
        builder.set_file(&file.to_string());
    }

    let mut sources: FxHashMap<u32, u32> = FxHashMap::default();
    let mut names: FxHashMap<u32, u32> = FxHashMap::default();

    for token in minified.get_tokens() {
        let Some(original) = engine.lookup_token(&lookup, token.get_src_line(), token.get_src_col())
        else {
            continue;
        };
        let Some(engine_source) = original.get_source_id() else {
            continue;
        };

        let source_id = match sources.get(&engine_source) {
            Some(id) => *id,
            None => {
                let source = engine
                    .get_source(engine_source)
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                let content = engine
                    .get_source_content(engine_source)
                    .map(|c| c.to_string())
                    .unwrap_or_default();
                let id = builder.add_source_and_content(&source, &content);
                sources.insert(engine_source, id);
                id
            }
        };

        let name_id = match original.get_name_id() {
            Some(engine_name) => match names.get(&engine_name) {
                Some(id) => Some(*id),
                None => engine.get_name(engine_name).map(|name| {
                    let id = builder.add_name(&name.to_string());
                    names.insert(engine_name, id);
                    id
                }),
            },
            None => None,
        };

        builder.add_token(
            token.get_dst_line(),
            token.get_dst_col(),
            original.get_src_line(),
            original.get_src_col(),
            Some(source_id),
            name_id,
        );
    }

    Ok(builder.into_sourcemap().to_json_string())
}
