//! Local storage and pomodoro backend for the StudyMate screens.
//!
//! Screens talk to [`AppState`] through the `*_impl` command functions in
//! [`application::commands`]. All state lives in one SQLite key-value table
//! under the workspace `state/` directory.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::bootstrap::{bootstrap_workspace, BootstrapResult};
pub use application::commands::AppState;
pub use application::dashboard::DashboardSummary;
pub use application::pomodoro::{PomodoroService, TimerSnapshot};
pub use application::settings::AppSettings;
pub use domain::models::{CalendarEvent, Dream, EventType, Note, Theme, TimerStats, Todo, User};
pub use domain::timer::{PomodoroTimer, TimerPhase, TimerTone};
pub use infrastructure::error::InfraError;

use std::path::PathBuf;

/// Opens (creating if needed) the workspace at `root`, or the current
/// directory when `root` is `None`.
pub fn open_workspace(root: Option<PathBuf>) -> Result<AppState, InfraError> {
    let workspace_root = match root {
        Some(path) => path,
        None => std::env::current_dir()?,
    };
    AppState::new(workspace_root)
}
