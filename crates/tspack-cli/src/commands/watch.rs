//! `tspack watch`

use crate::cli::BuildArgs;
use crate::config::TspackConfig;
use crate::error::Result;
use crate::ui;
use crate::watcher::{DEFAULT_DEBOUNCE_MS, FileWatcher};
use std::path::Path;
use tokio::sync::mpsc;
use tspack_bundler::{BuildSession, RolldownEngine, WatchController, WatchEvent};

/// Execute the watch command.
pub async fn execute(args: BuildArgs) -> Result<()> {
    let cwd = super::resolve_cwd(args.cwd.as_deref())?;
    let config = TspackConfig::load(&args, &cwd, true)?;
    run(&config, &cwd).await
}

/// Build once, then rebuild on every change until Ctrl+C.
///
/// Build failures are reported and watching continues; only a fatal watch
/// error is returned.
pub(crate) async fn run(config: &TspackConfig, cwd: &Path) -> Result<()> {
    let build = config.to_build_configuration(cwd)?;
    let session = BuildSession::new(&build, RolldownEngine::new(), config.version_registry(cwd))?;

    let (watcher, changes) = FileWatcher::new(
        cwd.to_path_buf(),
        build.resolved_output_directory(),
        DEFAULT_DEBOUNCE_MS,
    )?;

    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut controller = WatchController::new(session).with_observer(events_tx);

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stop.stop();
        }
    });

    let reporter = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            report_event(&event);
        }
    });

    ui::info(&format!(
        "Watching {} for changes (press Ctrl+C to stop)",
        watcher.root().display()
    ));

    let result = controller.run(changes).await;

    // Dropping the controller closes the observer channel and ends the reporter.
    drop(controller);
    let _ = reporter.await;
    drop(watcher);

    result?;
    ui::info("Stopped watching");
    Ok(())
}

fn report_event(event: &WatchEvent) {
    match event {
        WatchEvent::Start | WatchEvent::BundleEnd => {}
        WatchEvent::BundleStart => ui::info("Bundling..."),
        WatchEvent::End => ui::success("Build complete"),
        WatchEvent::Error(message) => {
            ui::error(message);
            ui::warning("Waiting for changes before rebuilding");
        }
        WatchEvent::Fatal(message) => ui::error(&format!("Watching stopped: {message}")),
    }
}
