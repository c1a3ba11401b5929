//! Rebuild loop driving a [`BuildSession`] from file changes.

use super::state::{FatalWatchError, WatchEvent, WatchSession, WatchStatus};
use crate::engine::BundlingEngine;
use crate::registry::VersionRegistry;
use crate::session::{BuildOutcome, BuildSession};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Message from a file watcher to a [`WatchController`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Changed(PathBuf),
    /// The watcher failed and reports no further changes.
    WatcherFailed(String),
}

impl From<PathBuf> for FileChange {
    fn from(path: PathBuf) -> Self {
        FileChange::Changed(path)
    }
}

/// Requests a cooperative stop of a running [`WatchController`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Idempotent; takes effect between lifecycle events.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Rebuilds on every file change, one build at a time.
pub struct WatchController<E, R> {
    session: BuildSession<E, R>,
    state: WatchSession,
    observer: Option<mpsc::UnboundedSender<WatchEvent>>,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl<E, R> WatchController<E, R>
where
    E: BundlingEngine,
    R: VersionRegistry,
{
    pub fn new(session: BuildSession<E, R>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            session,
            state: WatchSession::new(),
            observer: None,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    /// Forward every lifecycle event to `observer`.
    pub fn with_observer(mut self, observer: mpsc::UnboundedSender<WatchEvent>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    pub fn state(&self) -> &WatchSession {
        &self.state
    }

    pub fn session(&self) -> &BuildSession<E, R> {
        &self.session
    }

    /// Build once, then rebuild on every change received on `changes` until
    /// stopped.
    ///
    /// Returns `Ok` after a requested stop. A watcher failure or a closed
    /// change stream is fatal.
    ///
    /// # Errors
    ///
    /// [`FatalWatchError`] when the watcher fails or goes away.
    pub async fn run(&mut self, mut changes: mpsc::Receiver<FileChange>) -> Result<(), FatalWatchError> {
        if self.state.is_terminated() {
            return Ok(());
        }

        self.build_cycle(&mut changes).await?;

        loop {
            if self.stop_requested() {
                break;
            }

            tokio::select! {
                biased;

                _ = self.stop_rx.changed() => {}

                change = changes.recv() => match change {
                    Some(FileChange::Changed(path)) => {
                        info!("File changed: {}", path.display());
                        if self.state.request_rebuild() {
                            self.build_cycle(&mut changes).await?;
                        }
                    }
                    Some(FileChange::WatcherFailed(message)) => {
                        return self.dispatch(WatchEvent::Fatal(watcher_failure(&message)));
                    }
                    None => {
                        return self.dispatch(WatchEvent::Fatal("file watcher closed".to_string()));
                    }
                },
            }
        }

        self.state.terminate();
        info!("Watch session stopped after {} builds", self.state.build_count());
        Ok(())
    }

    /// Run builds until no change is pending.
    async fn build_cycle(&mut self, changes: &mut mpsc::Receiver<FileChange>) -> Result<(), FatalWatchError> {
        loop {
            let mut watcher_error = None;
            self.dispatch(WatchEvent::Start)?;
            self.dispatch(WatchEvent::BundleStart)?;

            let outcome = {
                let build = self.session.run();
                tokio::pin!(build);
                loop {
                    tokio::select! {
                        outcome = &mut build => break outcome,
                        Some(change) = changes.recv() => match change {
                            FileChange::Changed(path) => {
                                debug!(path = %path.display(), "change during build, rebuild queued");
                                self.state.request_rebuild();
                            }
                            FileChange::WatcherFailed(message) => {
                                watcher_error.get_or_insert(message);
                            }
                        },
                    }
                }
            };

            self.dispatch(WatchEvent::BundleEnd)?;
            match &outcome {
                BuildOutcome::Success { .. } => {
                    info!("{outcome}");
                    self.dispatch(WatchEvent::End)?;
                }
                BuildOutcome::Failure { .. } => {
                    warn!("Build failed, waiting for changes");
                    self.dispatch(WatchEvent::Error(outcome.to_string()))?;
                }
            }

            if let Some(message) = watcher_error {
                return self.dispatch(WatchEvent::Fatal(watcher_failure(&message)));
            }

            if !self.state.take_pending() || self.stop_requested() {
                return Ok(());
            }
            debug!("starting queued rebuild");
        }
    }

    fn dispatch(&mut self, event: WatchEvent) -> Result<(), FatalWatchError> {
        if let Some(observer) = &self.observer {
            let _ = observer.send(event.clone());
        }
        let status = self.state.apply(&event)?;
        debug!(?event, %status, "watch transition");
        if status == WatchStatus::Terminated {
            warn!("event {event:?} ignored, watch session already terminated");
        }
        Ok(())
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }
}

fn watcher_failure(message: &str) -> String {
    format!("file watcher error: {message}")
}
