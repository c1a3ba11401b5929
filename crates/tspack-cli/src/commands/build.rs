//! `tspack build`

use crate::cli::BuildArgs;
use crate::config::TspackConfig;
use crate::error::{CliError, Result};
use crate::ui;
use std::path::Path;
use tspack_bundler::{BuildOutcome, BuildSession, RolldownEngine};

/// Execute the build command.
///
/// With `--watch` (or `watch: true` in the config) this hands over to watch
/// mode and only returns once watching stops.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let cwd = super::resolve_cwd(args.cwd.as_deref())?;
    let config = TspackConfig::load(&args, &cwd, false)?;
    tracing::debug!(
        "Resolved configuration: {}",
        serde_json::to_string(&config).unwrap_or_default()
    );

    if config.watch {
        return super::watch::run(&config, &cwd).await;
    }

    let build = config.to_build_configuration(&cwd)?;
    let session = BuildSession::new(&build, RolldownEngine::new(), config.version_registry(&cwd))?;

    report(session.run().await, &cwd)
}

/// Print the outcome of a one-shot build; failures become errors.
fn report(outcome: BuildOutcome, cwd: &Path) -> Result<()> {
    match outcome {
        BuildOutcome::Success {
            artifact_path,
            source_map_path,
            duration,
        } => {
            let size = std::fs::metadata(&artifact_path).map(|m| m.len()).unwrap_or(0);
            ui::success(&format!(
                "Wrote {} ({}) in {}",
                relative(&artifact_path, cwd).display(),
                ui::format_size(size),
                ui::format_duration(duration)
            ));
            if let Some(map) = source_map_path {
                ui::info(&format!("Source map {}", relative(&map, cwd).display()));
            }
            Ok(())
        }
        BuildOutcome::Failure {
            kind,
            message,
            cause,
        } => Err(CliError::Build {
            kind,
            message,
            cause,
        }),
    }
}

fn relative<'a>(path: &'a Path, cwd: &Path) -> &'a Path {
    path.strip_prefix(cwd).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tspack_bundler::FailureKind;

    #[test]
    fn test_report_success() {
        let outcome = BuildOutcome::Success {
            artifact_path: PathBuf::from("/project/dist/index.js"),
            source_map_path: None,
            duration: Duration::from_millis(12),
        };
        assert!(report(outcome, Path::new("/project")).is_ok());
    }

    #[test]
    fn test_report_failure_is_an_error() {
        let outcome = BuildOutcome::Failure {
            kind: FailureKind::CompileError,
            message: "Unexpected token".into(),
            cause: None,
        };
        let err = report(outcome, Path::new("/project")).unwrap_err();
        assert!(matches!(
            err,
            CliError::Build {
                kind: FailureKind::CompileError,
                ..
            }
        ));
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative(Path::new("/project/dist/index.js"), Path::new("/project")),
            Path::new("dist/index.js")
        );
        assert_eq!(
            relative(Path::new("/elsewhere/index.js"), Path::new("/project")),
            Path::new("/elsewhere/index.js")
        );
    }
}
