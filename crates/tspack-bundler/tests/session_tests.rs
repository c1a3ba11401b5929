//! End-to-end build session tests against a stub engine.

mod helpers;

use helpers::{STUB_MAP, StubEngine, StubRegistry, project, write_file};
use std::fs;
use tspack_bundler::{BuildConfiguration, BuildOutcome, BuildSession, Externals, FailureKind};

const CDN_CHUNK: &str = "import pad from \"left-pad\";\nimport { h } from './helpers.js';\nexport default pad(h, 4);\n";

#[tokio::test]
async fn test_one_shot_build_writes_artifact_and_map() {
    let dir = project();
    write_file(dir.path(), "dist/stale.js", "old");
    write_file(dir.path(), "dist/assets/old.css", "old");

    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new("export const answer = 42;\n//# sourceMappingURL=index.js.map\n");
    let session = BuildSession::new(&config, engine.clone(), StubRegistry::default()).unwrap();

    let outcome = session.run().await;

    let dist = dir.path().join("dist");
    match &outcome {
        BuildOutcome::Success {
            artifact_path,
            source_map_path,
            ..
        } => {
            assert_eq!(artifact_path, &dist.join("index.js"));
            assert_eq!(source_map_path.as_deref(), Some(dist.join("index.js.map").as_path()));
        }
        other => panic!("expected success, got {other:?}"),
    }

    let code = fs::read_to_string(dist.join("index.js")).unwrap();
    assert!(code.starts_with("export const answer = 42;"));
    assert!(code.trim_end().ends_with("//# sourceMappingURL=index.js.map"));
    assert_eq!(code.matches("sourceMappingURL").count(), 1);
    assert!(dist.join("index.js.map").is_file());

    assert!(!dist.join("stale.js").exists());
    assert!(!dist.join("assets").exists());
    assert_eq!(engine.compiles(), 1);
}

#[tokio::test]
async fn test_no_sourcemap_writes_only_artifact() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .minify(false)
        .emit_source_map(false)
        .build()
        .unwrap();
    let session = BuildSession::new(
        &config,
        StubEngine::new("export const a = 1;\n"),
        StubRegistry::default(),
    )
    .unwrap();

    let outcome = session.run().await;

    assert!(matches!(
        outcome,
        BuildOutcome::Success {
            source_map_path: None,
            ..
        }
    ));
    let code = fs::read_to_string(dir.path().join("dist/index.js")).unwrap();
    assert!(!code.contains("sourceMappingURL"));
    assert!(!dir.path().join("dist/index.js.map").exists());
}

#[tokio::test]
async fn test_cdn_rewrite_uses_resolved_version() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .rewrite_to_cdn(true)
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new(CDN_CHUNK).with_imports(&["left-pad", "./helpers.js"]);
    let registry = StubRegistry::default().with("left-pad", "1.3.0");
    let session = BuildSession::new(&config, engine.clone(), registry.clone()).unwrap();

    assert!(session.run().await.is_success());

    let code = fs::read_to_string(dir.path().join("dist/index.js")).unwrap();
    assert!(code.contains("\"https://dev.jspm.io/left-pad@1.3.0\""));
    assert!(!code.contains("\"left-pad\""));
    assert!(code.contains("'./helpers.js'"));
    assert_eq!(registry.calls(), vec!["left-pad".to_string()]);
    assert_eq!(engine.last_externals(), Some(Externals::AllBare));
}

#[tokio::test]
async fn test_cdn_rewrite_falls_back_when_lookup_fails() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .rewrite_to_cdn(true)
        .cdn_base("https://esm.sh")
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new(CDN_CHUNK).with_imports(&["left-pad", "./helpers.js"]);
    let session = BuildSession::new(&config, engine, StubRegistry::default()).unwrap();

    assert!(session.run().await.is_success());

    let code = fs::read_to_string(dir.path().join("dist/index.js")).unwrap();
    assert!(code.contains("\"https://esm.sh/left-pad\""));
}

#[tokio::test]
async fn test_rewrite_then_minify() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .rewrite_to_cdn(true)
        .build()
        .unwrap();
    let engine = StubEngine::new(CDN_CHUNK)
        .with_imports(&["left-pad", "./helpers.js"])
        .without_map();
    let registry = StubRegistry::default().with("left-pad", "1.3.0");
    let session = BuildSession::new(&config, engine, registry).unwrap();

    assert!(session.run().await.is_success());

    let code = fs::read_to_string(dir.path().join("dist/index.js")).unwrap();
    assert!(code.contains("https://dev.jspm.io/left-pad@1.3.0"));
    assert!(code.len() < CDN_CHUNK.len() + "https://dev.jspm.io/@1.3.0".len());
}

#[tokio::test]
async fn test_minified_artifact_map_points_at_sources() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .build()
        .unwrap();
    let engine = StubEngine::new("export const answer = 42;\nexport const question = \"unknown\";\n");
    let session = BuildSession::new(&config, engine, StubRegistry::default()).unwrap();

    let outcome = session.run().await;
    assert!(outcome.is_success(), "{outcome:?}");

    let dist = dir.path().join("dist");
    let code = fs::read_to_string(dist.join("index.js")).unwrap();
    assert!(code.trim_end().ends_with("//# sourceMappingURL=index.js.map"));

    let written = fs::read_to_string(dist.join("index.js.map")).unwrap();
    assert_ne!(written, STUB_MAP);
    let map: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(map["sources"], serde_json::json!(["../src/index.ts"]));
    assert!(!map["mappings"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_deleted_entry_is_a_configuration_error() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new("export {};\n");
    let session = BuildSession::new(&config, engine.clone(), StubRegistry::default()).unwrap();
    assert!(session.run().await.is_success());

    fs::remove_file(dir.path().join("src/index.ts")).unwrap();
    let outcome = session.run().await;

    match outcome {
        BuildOutcome::Failure { kind, message, .. } => {
            assert_eq!(kind, FailureKind::ConfigurationError);
            assert!(message.contains("Entry point not found"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    // Neither the engine nor the cleanup ran.
    assert_eq!(engine.compiles(), 1);
    assert!(dir.path().join("dist/index.js").is_file());
}

#[tokio::test]
async fn test_externalize_passes_declared_dependencies() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .externalize(true)
        .declared_dependencies(["react", "left-pad"])
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new("export {};\n");
    let session = BuildSession::new(&config, engine.clone(), StubRegistry::default()).unwrap();

    assert!(session.run().await.is_success());

    match engine.last_externals() {
        Some(Externals::Packages(packages)) => {
            assert!(packages.contains("react"));
            assert!(packages.contains("left-pad"));
        }
        other => panic!("expected package externals, got {other:?}"),
    }
}

#[tokio::test]
async fn test_compile_error_leaves_empty_output() {
    let dir = project();
    write_file(dir.path(), "dist/stale.js", "old");
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .build()
        .unwrap();
    let engine = StubEngine::new("").failing("Unresolved import");
    let session = BuildSession::new(&config, engine, StubRegistry::default()).unwrap();

    let outcome = session.run().await;

    match outcome {
        BuildOutcome::Failure {
            kind,
            message,
            cause,
        } => {
            assert_eq!(kind, FailureKind::CompileError);
            assert_eq!(message, "Unresolved import");
            assert_eq!(cause.as_deref(), Some("stub: Unresolved import"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    let dist = dir.path().join("dist");
    assert!(dist.is_dir());
    assert_eq!(fs::read_dir(&dist).unwrap().count(), 0);
}

#[tokio::test]
async fn test_minify_failure_is_a_compile_error() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .build()
        .unwrap();
    let session = BuildSession::new(
        &config,
        StubEngine::new("export function (").without_map(),
        StubRegistry::default(),
    )
    .unwrap();

    let outcome = session.run().await;
    assert!(matches!(
        outcome,
        BuildOutcome::Failure {
            kind: FailureKind::CompileError,
            ..
        }
    ));
}

#[tokio::test]
async fn test_output_path_that_is_a_file_fails_to_write() {
    let dir = project();
    write_file(dir.path(), "dist", "not a directory");
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .build()
        .unwrap();
    let session = BuildSession::new(
        &config,
        StubEngine::new("export {};"),
        StubRegistry::default(),
    )
    .unwrap();

    let outcome = session.run().await;
    assert!(matches!(
        outcome,
        BuildOutcome::Failure {
            kind: FailureKind::WriteError,
            ..
        }
    ));
}

#[tokio::test]
async fn test_session_can_run_repeatedly() {
    let dir = project();
    let config = BuildConfiguration::builder("src/index.ts")
        .cwd(dir.path())
        .minify(false)
        .build()
        .unwrap();
    let engine = StubEngine::new("export const a = 1;\n");
    let session = BuildSession::new(&config, engine.clone(), StubRegistry::default()).unwrap();

    assert!(session.run().await.is_success());
    assert!(session.run().await.is_success());
    assert_eq!(engine.compiles(), 2);
    assert_eq!(session.pipeline().first().unwrap().name(), "cleanup");
}
