//! Watch mode.
//!
//! [`WatchSession`] is the pure state machine; [`WatchController`] feeds it
//! lifecycle events while awaiting each build inline, so at most one build
//! is in flight and changes arriving mid-build collapse into one rebuild.

mod controller;
mod state;

pub use controller::{FileChange, StopHandle, WatchController};
pub use state::{FatalWatchError, WatchEvent, WatchSession, WatchStatus};
