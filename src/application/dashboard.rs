use crate::application::collections::load_or_default;
use crate::application::pomodoro::load_timer_stats;
use crate::domain::models::{Dream, Todo};
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_todos: usize,
    pub completed_todos: usize,
    pub total_dreams: usize,
    pub completed_dreams: usize,
    pub sessions_today: u32,
    pub minutes_today: u32,
    pub total_sessions: u32,
}

/// Builds the home-screen counters straight from the store, so the result
/// reflects the last successful write of every screen.
pub fn dashboard_summary(
    store: &CollectionStore,
    log: &CommandLog,
    today: NaiveDate,
) -> DashboardSummary {
    let todos = load_or_default::<Vec<Todo>>(store, log, StorageKey::Todos);
    let dreams = load_or_default::<Vec<Dream>>(store, log, StorageKey::Dreams);
    let stats = load_timer_stats(store, log, today);
    DashboardSummary {
        total_todos: todos.len(),
        completed_todos: todos.iter().filter(|todo| todo.completed).count(),
        total_dreams: dreams.len(),
        completed_dreams: dreams.iter().filter(|dream| dream.completed).count(),
        sessions_today: stats.today_sessions,
        minutes_today: stats.today_minutes,
        total_sessions: stats.total_sessions,
    }
}
