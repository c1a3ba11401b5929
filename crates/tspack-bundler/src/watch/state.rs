//! Watch session state machine.
//!
//! | from               | event                    | to                 |
//! |--------------------|--------------------------|--------------------|
//! | any but Terminated | `Start`                  | `Building`         |
//! | `Building`         | `BundleStart`/`BundleEnd`| `Building`         |
//! | `Building`         | `End`                    | `IdleAfterSuccess` |
//! | any but Terminated | `Error`                  | `IdleAfterError`   |
//! | any but Terminated | `Fatal`                  | `Terminated`       |
//! | `Terminated`       | anything                 | ignored            |

use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Lifecycle status of a watch session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchStatus {
    /// No build has run yet.
    #[default]
    Idle,
    Building,
    IdleAfterSuccess,
    IdleAfterError,
    Terminated,
}

impl WatchStatus {
    pub fn is_idle(&self) -> bool {
        matches!(
            self,
            WatchStatus::Idle | WatchStatus::IdleAfterSuccess | WatchStatus::IdleAfterError
        )
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WatchStatus::Idle => "idle",
            WatchStatus::Building => "building",
            WatchStatus::IdleAfterSuccess => "idle (last build succeeded)",
            WatchStatus::IdleAfterError => "idle (last build failed)",
            WatchStatus::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Lifecycle event delivered to the watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A build cycle begins.
    Start,
    /// The engine starts bundling.
    BundleStart,
    /// The engine finished bundling.
    BundleEnd,
    /// The build cycle completed successfully.
    End,
    /// The build failed; watching continues.
    Error(String),
    /// Watching cannot continue.
    Fatal(String),
}

/// Unrecoverable watcher failure. Terminates the watch session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Watch session terminated: {0}")]
pub struct FatalWatchError(pub String);

/// State of one watch session.
#[derive(Debug, Default)]
pub struct WatchSession {
    status: WatchStatus,
    build_count: u64,
    pending_rebuild: bool,
    last_error: Option<String>,
}

impl WatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> WatchStatus {
        self.status
    }

    /// Number of builds started so far.
    pub fn build_count(&self) -> u64 {
        self.build_count
    }

    pub fn is_building(&self) -> bool {
        self.status == WatchStatus::Building
    }

    pub fn is_terminated(&self) -> bool {
        self.status == WatchStatus::Terminated
    }

    pub fn pending_rebuild(&self) -> bool {
        self.pending_rebuild
    }

    /// Message of the most recent failed build, cleared by a successful one.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one lifecycle event.
    ///
    /// # Errors
    ///
    /// [`FatalWatchError`] for a `Fatal` event on a live session.
    pub fn apply(&mut self, event: &WatchEvent) -> Result<WatchStatus, FatalWatchError> {
        if self.is_terminated() {
            debug!(?event, "ignoring event on terminated watch session");
            return Ok(self.status);
        }

        match event {
            WatchEvent::Start => {
                self.status = WatchStatus::Building;
                self.build_count += 1;
            }
            WatchEvent::BundleStart | WatchEvent::BundleEnd => {
                if !self.is_building() {
                    debug!(?event, status = %self.status, "bundle event outside a build");
                }
            }
            WatchEvent::End => {
                if self.is_building() {
                    self.status = WatchStatus::IdleAfterSuccess;
                    self.last_error = None;
                } else {
                    debug!(status = %self.status, "end event outside a build");
                }
            }
            WatchEvent::Error(message) => {
                self.status = WatchStatus::IdleAfterError;
                self.last_error = Some(message.clone());
            }
            WatchEvent::Fatal(message) => {
                self.status = WatchStatus::Terminated;
                self.pending_rebuild = false;
                self.last_error = Some(message.clone());
                return Err(FatalWatchError(message.clone()));
            }
        }

        Ok(self.status)
    }

    /// Record a file change.
    ///
    /// Returns `true` when a build should start right away. While a build is
    /// running the change only sets the pending flag; any number of changes
    /// collapse into one follow-up build.
    pub fn request_rebuild(&mut self) -> bool {
        match self.status {
            WatchStatus::Terminated => false,
            WatchStatus::Building => {
                self.pending_rebuild = true;
                false
            }
            _ => true,
        }
    }

    /// Consume the pending flag.
    pub fn take_pending(&mut self) -> bool {
        std::mem::take(&mut self.pending_rebuild)
    }

    /// Cooperative stop. Idempotent.
    pub fn terminate(&mut self) {
        self.status = WatchStatus::Terminated;
        self.pending_rebuild = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_cycle() {
        let mut session = WatchSession::new();
        for event in [
            WatchEvent::Start,
            WatchEvent::BundleStart,
            WatchEvent::BundleEnd,
            WatchEvent::End,
        ] {
            session.apply(&event).unwrap();
        }
        assert_eq!(session.status(), WatchStatus::IdleAfterSuccess);
        assert_eq!(session.build_count(), 1);
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_error_then_restart() {
        let mut session = WatchSession::new();
        session.apply(&WatchEvent::Start).unwrap();
        session
            .apply(&WatchEvent::Error("Unresolved import".into()))
            .unwrap();
        assert_eq!(session.status(), WatchStatus::IdleAfterError);
        assert_eq!(session.last_error(), Some("Unresolved import"));

        session.apply(&WatchEvent::Start).unwrap();
        assert_eq!(session.status(), WatchStatus::Building);
        assert_eq!(session.build_count(), 2);

        session.apply(&WatchEvent::End).unwrap();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_fatal_terminates_and_is_idempotent() {
        let mut session = WatchSession::new();
        session.apply(&WatchEvent::Start).unwrap();

        let err = session
            .apply(&WatchEvent::Fatal("watcher closed".into()))
            .unwrap_err();
        assert_eq!(err, FatalWatchError("watcher closed".into()));
        assert!(session.is_terminated());

        assert_eq!(session.apply(&WatchEvent::Start).unwrap(), WatchStatus::Terminated);
        assert_eq!(
            session.apply(&WatchEvent::Fatal("again".into())).unwrap(),
            WatchStatus::Terminated
        );
        assert_eq!(session.build_count(), 1);
        assert!(!session.request_rebuild());
    }

    #[test]
    fn test_changes_during_build_collapse() {
        let mut session = WatchSession::new();
        assert!(session.request_rebuild());

        session.apply(&WatchEvent::Start).unwrap();
        assert!(!session.request_rebuild());
        assert!(!session.request_rebuild());
        assert!(session.pending_rebuild());

        session.apply(&WatchEvent::End).unwrap();
        assert!(session.take_pending());
        assert!(!session.take_pending());
    }

    #[test]
    fn test_end_outside_build_ignored() {
        let mut session = WatchSession::new();
        session.apply(&WatchEvent::End).unwrap();
        assert_eq!(session.status(), WatchStatus::Idle);
    }

    #[test]
    fn test_terminate_idempotent() {
        let mut session = WatchSession::new();
        session.terminate();
        session.terminate();
        assert!(session.is_terminated());
    }
}
