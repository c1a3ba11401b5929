//! Integration tests for the build command.
//!
//! These run the real Rolldown engine against small projects on disk.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tspack_bundler::FailureKind;
use tspack_cli::CliError;
use tspack_cli::cli::BuildArgs;
use tspack_cli::commands::build_execute;

fn project(source: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("index.ts"), source).unwrap();
    temp
}

fn args(temp: &TempDir) -> BuildArgs {
    BuildArgs {
        input: Some(PathBuf::from("src/index.ts")),
        cwd: Some(temp.path().to_path_buf()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_build_writes_bundle_and_source_map() {
    let temp = project("export const hello = (name: string): string => `Hello, ${name}!`;\n");
    fs::create_dir_all(temp.path().join("dist/old")).unwrap();
    fs::write(temp.path().join("dist/old/stale.js"), "stale").unwrap();

    build_execute(args(&temp)).await.unwrap();

    let dist = temp.path().join("dist");
    let code = fs::read_to_string(dist.join("index.js")).unwrap();
    assert!(code.contains("Hello"));
    assert!(code.contains("sourceMappingURL=index.js.map"));
    assert!(dist.join("index.js.map").is_file());
    assert!(!dist.join("old").exists());
}

#[tokio::test]
async fn test_build_respects_config_file() {
    let temp = project("export const value = 1;\n");
    fs::write(
        temp.path().join("tspack.config.json"),
        r#"{ "input": "src/index.ts", "outDir": "public", "sourcemap": false }"#,
    )
    .unwrap();

    let args = BuildArgs {
        input: None,
        cwd: Some(temp.path().to_path_buf()),
        ..Default::default()
    };
    build_execute(args).await.unwrap();

    assert!(temp.path().join("public/index.js").is_file());
    assert!(!temp.path().join("public/index.js.map").exists());
}

#[tokio::test]
async fn test_build_without_minify_keeps_identifiers() {
    let temp = project("export function computeAnswer(): number {\n  return 42;\n}\n");

    let args = BuildArgs {
        no_uglify: true,
        ..args(&temp)
    };
    build_execute(args).await.unwrap();

    let code = fs::read_to_string(temp.path().join("dist/index.js")).unwrap();
    assert!(code.contains("computeAnswer"));
    assert!(code.contains('\n'));
}

#[tokio::test]
async fn test_build_syntax_error_is_a_compile_failure() {
    let temp = project("export const = ;\n");

    let err = build_execute(args(&temp)).await.unwrap_err();
    assert!(matches!(
        err,
        CliError::Build {
            kind: FailureKind::CompileError,
            ..
        }
    ));
}

#[tokio::test]
async fn test_build_missing_entry_is_a_configuration_error() {
    let temp = project("export {};\n");

    let args = BuildArgs {
        input: Some(PathBuf::from("src/missing.ts")),
        ..args(&temp)
    };
    let err = build_execute(args).await.unwrap_err();
    assert!(matches!(err, CliError::Configuration(_)));
}

#[tokio::test]
async fn test_externalize_requires_declared_dependencies() {
    let temp = project("export {};\n");
    fs::write(temp.path().join("package.json"), r#"{ "name": "app" }"#).unwrap();

    let args = BuildArgs {
        externalize: true,
        ..args(&temp)
    };
    let err = build_execute(args).await.unwrap_err();
    assert!(matches!(err, CliError::Configuration(_)));
}
