//! Debounced file system watcher feeding watch mode.
//!
//! Watches the project root recursively and forwards changed paths to the
//! watch controller, skipping `node_modules`, the output directory and
//! hidden paths (which also covers `.git`). Watcher errors are forwarded
//! too and end the watch session.

use crate::error::{CliError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tspack_bundler::FileChange;

/// Default debounce window for repeated events on the same path.
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

const CHANNEL_CAPACITY: usize = 100;

/// Recursive watcher over a project directory.
///
/// Dropping it stops the underlying notify watcher, which closes the change
/// channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl FileWatcher {
    /// Start watching `root`, ignoring everything under `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::FileNotFound`] if `root` does not exist, or
    /// [`CliError::Watch`] if the platform watcher cannot be started.
    pub fn new(
        root: PathBuf,
        output_dir: PathBuf,
        debounce_ms: u64,
    ) -> Result<(Self, mpsc::Receiver<FileChange>)> {
        if !root.exists() {
            return Err(CliError::FileNotFound(root));
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut forwarder = ChangeForwarder {
            tx,
            root: root.clone(),
            output_dir,
            debounce: Duration::from_millis(debounce_ms),
            last_event: None,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            forwarder.handle(res);
        })?;

        watcher.watch(&root, RecursiveMode::Recursive)?;

        Ok((Self { _watcher: watcher, root }, rx))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Filters, debounces and forwards notify events to the controller.
struct ChangeForwarder {
    tx: mpsc::Sender<FileChange>,
    root: PathBuf,
    output_dir: PathBuf,
    debounce: Duration,
    last_event: Option<(PathBuf, Instant)>,
}

impl ChangeForwarder {
    fn handle(&mut self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(err) => {
                tracing::error!("File watcher error: {err}");
                let _ = self.tx.blocking_send(FileChange::WatcherFailed(err.to_string()));
                return;
            }
        };

        if !matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        ) {
            return;
        }

        for path in event.paths {
            if should_ignore(&path, &self.root, &self.output_dir) {
                continue;
            }

            let now = Instant::now();
            if let Some((last_path, last_time)) = &self.last_event {
                if last_path == &path && now.duration_since(*last_time) < self.debounce {
                    continue;
                }
            }
            self.last_event = Some((path.clone(), now));

            tracing::debug!("Change detected: {}", path.display());
            // The receiver is gone once watch mode has stopped.
            if self.tx.blocking_send(FileChange::Changed(path)).is_err() {
                return;
            }
        }
    }
}

/// Whether a change at `path` should not trigger a rebuild.
pub fn should_ignore(path: &Path, root: &Path, output_dir: &Path) -> bool {
    if path.starts_with(output_dir) {
        return true;
    }

    let Ok(relative) = path.strip_prefix(root) else {
        return true;
    };

    relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name == "node_modules" || name.starts_with('.')
    }) || relative
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with('~'))
}
