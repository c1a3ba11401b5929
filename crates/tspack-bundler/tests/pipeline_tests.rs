//! Pipeline ordering across every flag combination.

mod helpers;

use helpers::project;
use tspack_bundler::{
    BuildConfiguration, Capability, ConfigurationError, PluginPhase, PluginUnit, assemble,
};

#[derive(Debug, Clone, Copy)]
struct Flags {
    externalize: bool,
    cdn: bool,
    minify: bool,
    styles: bool,
    resolve: bool,
    sourcemap: bool,
}

fn all_flag_combinations() -> Vec<Flags> {
    (0..64u8)
        .map(|bits| Flags {
            externalize: bits & 1 != 0,
            cdn: bits & 2 != 0,
            minify: bits & 4 != 0,
            styles: bits & 8 != 0,
            resolve: bits & 16 != 0,
            sourcemap: bits & 32 != 0,
        })
        // externalize and cdn are mutually exclusive
        .filter(|f| !(f.externalize && f.cdn))
        .collect()
}

#[test]
fn test_ordering_invariants_hold_for_every_configuration() {
    let dir = project();

    for flags in all_flag_combinations() {
        let config = BuildConfiguration::builder("src/index.ts")
            .cwd(dir.path())
            .externalize(flags.externalize)
            .declared_dependencies(["react"])
            .rewrite_to_cdn(flags.cdn)
            .minify(flags.minify)
            .styles(flags.styles)
            .resolve_vendor(flags.resolve)
            .emit_source_map(flags.sourcemap)
            .build()
            .unwrap();

        let pipeline = assemble(&config).unwrap();
        let names = pipeline.names();

        assert_eq!(names[0], "cleanup", "{flags:?}");
        assert_eq!(names[1], "typescript", "{flags:?}");

        assert_eq!(pipeline.contains(PluginPhase::Minify), flags.minify, "{flags:?}");
        if flags.minify {
            assert_eq!(pipeline.last(), Some(&PluginUnit::Minify), "{flags:?}");
        }

        assert_eq!(pipeline.contains(PluginPhase::Rewrite), flags.cdn, "{flags:?}");
        assert_eq!(pipeline.contains(PluginPhase::Style), flags.styles, "{flags:?}");

        let compile = pipeline.position(PluginPhase::Compile).unwrap();
        if let Some(style) = pipeline.position(PluginPhase::Style) {
            assert!(compile < style, "{flags:?}");
            if let Some(rewrite) = pipeline.position(PluginPhase::Rewrite) {
                assert!(style < rewrite, "{flags:?}");
            }
        }
        if let (Some(rewrite), Some(minify)) = (
            pipeline.position(PluginPhase::Rewrite),
            pipeline.position(PluginPhase::Minify),
        ) {
            assert!(rewrite < minify, "{flags:?}");
        }

        // Vendor inlining only when bare imports are bundled.
        let inlines_vendor = flags.resolve && !flags.cdn;
        assert_eq!(pipeline.contains(PluginPhase::Resolve), inlines_vendor, "{flags:?}");
        assert_eq!(pipeline.contains(PluginPhase::CommonJs), inlines_vendor, "{flags:?}");
        assert_eq!(pipeline.contains(PluginPhase::Replace), inlines_vendor, "{flags:?}");
    }
}

#[test]
fn test_default_pipeline() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .build()
        .unwrap();

    let pipeline = assemble(&config).unwrap();
    assert_eq!(
        pipeline.names(),
        vec![
            "cleanup",
            "typescript",
            "replace",
            "node-resolve",
            "commonjs",
            "style",
            "minify"
        ]
    );

    let replace = pipeline.iter().find(|u| u.phase() == PluginPhase::Replace).unwrap();
    assert_eq!(
        replace,
        &PluginUnit::Replace {
            replacements: vec![(
                "process.env.NODE_ENV".to_string(),
                "\"production\"".to_string()
            )]
        }
    );
}

#[test]
fn test_cdn_pipeline_runs_rewrite_after_render() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .rewrite_to_cdn(true)
        .build()
        .unwrap();

    let pipeline = assemble(&config).unwrap();
    let post_render: Vec<_> = pipeline
        .with_capability(Capability::PostRender)
        .map(|u| u.name().into_owned())
        .collect();
    assert_eq!(post_render, vec!["cdn-rewrite", "minify"]);
    assert!(pipeline.engine_units().all(|u| u.is_engine_delegated()));
}

#[test]
fn test_cleanup_targets_resolved_output_directory() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .output_directory("build/out")
        .build()
        .unwrap();

    let pipeline = assemble(&config).unwrap();
    assert_eq!(
        pipeline.first(),
        Some(&PluginUnit::Cleanup {
            target: dir.path().join("build/out")
        })
    );
}

#[test]
fn test_missing_entry_is_rejected() {
    let dir = project();
    let config = BuildConfiguration::builder("src/missing.ts")
        .cwd(dir.path())
        .build()
        .unwrap();

    let err = assemble(&config).unwrap_err();
    assert!(matches!(err, ConfigurationError::EntryNotFound(_)));
}

#[test]
fn test_directory_entry_is_rejected() {
    let dir = project();
    let config = BuildConfiguration::builder("src")
        .cwd(dir.path())
        .build()
        .unwrap();

    assert!(matches!(
        assemble(&config),
        Err(ConfigurationError::EntryNotFound(_))
    ));
}
