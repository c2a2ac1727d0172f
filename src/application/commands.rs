use crate::application::bootstrap::bootstrap_workspace;
use crate::application::calendar::CalendarService;
use crate::application::clock::{Clock, IdGenerator, NowProvider};
use crate::application::dashboard::{dashboard_summary, DashboardSummary};
use crate::application::dreams::{DreamProgress, DreamService};
use crate::application::notes::{NoteDraft, NoteService};
use crate::application::pomodoro::{PomodoroService, TimerSnapshot};
use crate::application::settings::{AppSettings, SettingsService};
use crate::application::todos::{TodoSections, TodoService};
use crate::domain::models::{CalendarEvent, Dream, Note, Theme, TimerStats, Todo, User};
use crate::infrastructure::alarm::{AlarmPlayer, BellAlarm};
use crate::infrastructure::collection_store::CollectionStore;
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::config::ConfigBundle;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::image_picker::FilePathImagePicker;
use crate::infrastructure::storage::SqliteKeyValueStore;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Everything the screens call into. One instance per process; screens call
/// the `*_impl` functions below with a shared reference.
pub struct AppState {
    config: ConfigBundle,
    config_dir: PathBuf,
    database_path: PathBuf,
    store: CollectionStore,
    log: Arc<CommandLog>,
    clock: Clock,
    todos: Mutex<TodoService>,
    notes: Mutex<NoteService>,
    dreams: Mutex<DreamService>,
    settings: Mutex<SettingsService>,
    calendar: CalendarService,
    pomodoro: PomodoroService,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::with_alarm(workspace_root, Arc::new(BellAlarm::default()))
    }

    pub fn with_alarm(
        workspace_root: PathBuf,
        alarm: Arc<dyn AlarmPlayer>,
    ) -> Result<Self, InfraError> {
        Self::build(&workspace_root, alarm, None)
    }

    fn build(
        workspace_root: &Path,
        alarm: Arc<dyn AlarmPlayer>,
        now_provider: Option<NowProvider>,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(workspace_root)?;
        let config = bootstrap.config;
        let log = Arc::new(CommandLog::new(&bootstrap.logs_dir));
        let store = CollectionStore::new(Arc::new(SqliteKeyValueStore::new(
            &bootstrap.database_path,
            config.app.storage_namespace.clone(),
        )));
        let mut clock = Clock::new(config.app.timezone);
        if let Some(now_provider) = now_provider {
            clock = clock.with_now_provider(now_provider);
        }
        let ids = Arc::new(IdGenerator::new(clock.clone()));

        let todos = TodoService::mount(store.clone(), log.clone(), ids.clone(), clock.clone());
        let notes = NoteService::mount(store.clone(), log.clone(), ids.clone(), clock.clone());
        let dreams = DreamService::mount(store.clone(), log.clone(), ids.clone(), clock.clone());
        let settings = SettingsService::load(store.clone(), log.clone(), ids);
        let pomodoro = PomodoroService::new(
            config.timer,
            store.clone(),
            log.clone(),
            clock.clone(),
            alarm,
        );

        log.info(
            "start",
            &format!(
                "app={} timezone={} namespace={}",
                config.app.app_name,
                config.app.timezone.name(),
                config.app.storage_namespace
            ),
        );

        Ok(Self {
            config,
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path,
            store,
            log,
            clock,
            todos: Mutex::new(todos),
            notes: Mutex::new(notes),
            dreams: Mutex::new(dreams),
            settings: Mutex::new(settings),
            calendar: CalendarService::default(),
            pomodoro,
        })
    }

    pub fn config(&self) -> &ConfigBundle {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Logs a failed command. This is the only place command errors are
    /// logged; services hand them back untouched.
    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        if error.is_storage_io() {
            self.log_error(command, &format!("storage unavailable: {error}"));
        } else {
            self.log_error(command, &error.to_string());
        }
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.log.info(command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.log.error(command, message);
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> Result<MutexGuard<'a, T>, InfraError> {
    mutex
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("{name} lock poisoned: {error}")))
}

fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidConfig(format!(
            "{field_name} must not be empty"
        )));
    }
    Ok(value)
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        InfraError::InvalidConfig(format!("{field_name} must be YYYY-MM-DD: {error}"))
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn list_todos_impl(state: &AppState) -> Result<Vec<Todo>, InfraError> {
    Ok(lock(&state.todos, "todos")?.todos().to_vec())
}

pub fn add_todo_impl(
    state: &AppState,
    text: String,
    deadline: Option<String>,
) -> Result<Todo, InfraError> {
    let deadline = non_blank(deadline);
    let todo = lock(&state.todos, "todos")?.add(&text, deadline.as_deref())?;
    state.log_info("add_todo", &format!("created todo_id={}", todo.id));
    Ok(todo)
}

pub fn toggle_todo_impl(state: &AppState, todo_id: String) -> Result<Option<Todo>, InfraError> {
    let todo_id = required_id(&todo_id, "todo_id")?;
    let toggled = lock(&state.todos, "todos")?.toggle(todo_id)?;
    if let Some(todo) = &toggled {
        state.log_info(
            "toggle_todo",
            &format!("todo_id={todo_id} completed={}", todo.completed),
        );
    }
    Ok(toggled)
}

pub fn delete_todo_impl(state: &AppState, todo_id: String) -> Result<bool, InfraError> {
    let todo_id = required_id(&todo_id, "todo_id")?;
    let removed = lock(&state.todos, "todos")?.delete(todo_id)?;
    if removed {
        state.log_info("delete_todo", &format!("deleted todo_id={todo_id}"));
    }
    Ok(removed)
}

pub fn search_todos_impl(
    state: &AppState,
    query: Option<String>,
) -> Result<TodoSections, InfraError> {
    let query = query.unwrap_or_default();
    Ok(lock(&state.todos, "todos")?.sections(&query))
}

pub fn list_notes_impl(state: &AppState) -> Result<Vec<Note>, InfraError> {
    Ok(lock(&state.notes, "notes")?.notes().to_vec())
}

pub fn get_note_impl(state: &AppState, note_id: String) -> Result<Option<Note>, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    Ok(lock(&state.notes, "notes")?.get(note_id).cloned())
}

pub fn add_note_impl(
    state: &AppState,
    title: String,
    content: String,
    image: Option<String>,
) -> Result<Note, InfraError> {
    let note = lock(&state.notes, "notes")?.add(&title, &content, non_blank(image))?;
    state.log_info("add_note", &format!("created note_id={}", note.id));
    Ok(note)
}

pub fn update_note_impl(
    state: &AppState,
    note_id: String,
    title: String,
    content: String,
    image: Option<String>,
) -> Result<Option<Note>, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    let updated =
        lock(&state.notes, "notes")?.update(note_id, &title, &content, non_blank(image))?;
    if updated.is_some() {
        state.log_info("update_note", &format!("updated note_id={note_id}"));
    }
    Ok(updated)
}

pub fn save_note_detail_impl(
    state: &AppState,
    note_id: Option<String>,
    title: String,
    content: String,
    image: Option<String>,
) -> Result<Option<Note>, InfraError> {
    let saved = lock(&state.notes, "notes")?.save_detail(NoteDraft {
        id: note_id,
        title,
        content,
        image,
    })?;
    match &saved {
        Some(note) => state.log_info("save_note_detail", &format!("saved note_id={}", note.id)),
        None => state.log_info("save_note_detail", "skipped empty note"),
    }
    Ok(saved)
}

pub fn delete_note_impl(state: &AppState, note_id: String) -> Result<bool, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    let removed = lock(&state.notes, "notes")?.delete(note_id)?;
    if removed {
        state.log_info("delete_note", &format!("deleted note_id={note_id}"));
    }
    Ok(removed)
}

pub fn search_notes_impl(
    state: &AppState,
    query: Option<String>,
) -> Result<Vec<Note>, InfraError> {
    let query = query.unwrap_or_default();
    Ok(lock(&state.notes, "notes")?.search(&query))
}

/// Attaches the image at `image_path`; `None` is a cancelled picker.
pub fn attach_note_image_impl(
    state: &AppState,
    note_id: String,
    image_path: Option<String>,
) -> Result<Option<Note>, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    let picker = FilePathImagePicker::new(non_blank(image_path).map(PathBuf::from));
    let note = lock(&state.notes, "notes")?.attach_image(note_id, &picker)?;
    state.log_info("attach_note_image", &format!("note_id={note_id}"));
    Ok(note)
}

pub fn remove_note_image_impl(
    state: &AppState,
    note_id: String,
) -> Result<Option<Note>, InfraError> {
    let note_id = required_id(&note_id, "note_id")?;
    lock(&state.notes, "notes")?.remove_image(note_id)
}

pub fn list_dreams_impl(state: &AppState) -> Result<Vec<Dream>, InfraError> {
    Ok(lock(&state.dreams, "dreams")?.dreams().to_vec())
}

pub fn dream_categories_impl() -> Vec<String> {
    DreamService::categories()
        .iter()
        .map(|category| category.to_string())
        .collect()
}

pub fn add_dream_impl(
    state: &AppState,
    title: String,
    description: String,
    category: Option<String>,
) -> Result<Dream, InfraError> {
    let dream = lock(&state.dreams, "dreams")?.add(&title, &description, category.as_deref())?;
    state.log_info("add_dream", &format!("created dream_id={}", dream.id));
    Ok(dream)
}

pub fn toggle_dream_impl(state: &AppState, dream_id: String) -> Result<Option<Dream>, InfraError> {
    let dream_id = required_id(&dream_id, "dream_id")?;
    let toggled = lock(&state.dreams, "dreams")?.toggle(dream_id)?;
    if let Some(dream) = &toggled {
        state.log_info(
            "toggle_dream",
            &format!("dream_id={dream_id} completed={}", dream.completed),
        );
    }
    Ok(toggled)
}

pub fn delete_dream_impl(state: &AppState, dream_id: String) -> Result<bool, InfraError> {
    let dream_id = required_id(&dream_id, "dream_id")?;
    let removed = lock(&state.dreams, "dreams")?.delete(dream_id)?;
    if removed {
        state.log_info("delete_dream", &format!("deleted dream_id={dream_id}"));
    }
    Ok(removed)
}

pub fn dream_progress_impl(state: &AppState) -> Result<DreamProgress, InfraError> {
    Ok(lock(&state.dreams, "dreams")?.progress())
}

pub fn list_events_impl(state: &AppState) -> Vec<CalendarEvent> {
    state.calendar.events().to_vec()
}

pub fn events_on_impl(state: &AppState, date: String) -> Result<Vec<CalendarEvent>, InfraError> {
    let date = parse_date_input(&date, "date")?;
    Ok(state.calendar.events_on(date))
}

/// Events from `from` onward; defaults to today in the configured timezone.
pub fn upcoming_events_impl(
    state: &AppState,
    from: Option<String>,
) -> Result<Vec<CalendarEvent>, InfraError> {
    let from = match non_blank(from) {
        Some(value) => parse_date_input(&value, "from")?,
        None => state.clock.today(),
    };
    Ok(state.calendar.upcoming(from))
}

pub fn dashboard_summary_impl(state: &AppState) -> DashboardSummary {
    dashboard_summary(&state.store, &state.log, state.clock.today())
}

pub fn get_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    Ok(lock(&state.settings, "settings")?.current().clone())
}

pub fn toggle_theme_impl(state: &AppState) -> Result<Theme, InfraError> {
    let theme = lock(&state.settings, "settings")?.toggle_theme()?;
    state.log_info("toggle_theme", &format!("theme={theme:?}"));
    Ok(theme)
}

pub fn login_impl(state: &AppState, email: String) -> Result<User, InfraError> {
    let user = lock(&state.settings, "settings")?.login(&email)?;
    state.log_info("login", &format!("user_id={}", user.id));
    Ok(user)
}

pub fn logout_impl(state: &AppState) -> Result<(), InfraError> {
    lock(&state.settings, "settings")?.logout()?;
    state.log_info("logout", "user signed out");
    Ok(())
}

pub fn save_settings_impl(state: &AppState) -> Result<(), InfraError> {
    lock(&state.settings, "settings")?.save()?;
    state.log_info("save_settings", "settings saved");
    Ok(())
}

/// Wipes every key of the namespace and reloads all in-memory state.
pub fn reset_all_impl(state: &AppState) -> Result<(), InfraError> {
    state.store.clear_all()?;
    lock(&state.settings, "settings")?.forget();
    lock(&state.todos, "todos")?.reload();
    lock(&state.notes, "notes")?.reload();
    lock(&state.dreams, "dreams")?.reload();
    state.pomodoro.forget_stats()?;
    state.log_info("reset_all", "all stored data cleared");
    Ok(())
}

pub fn get_timer_state_impl(state: &AppState) -> Result<TimerSnapshot, InfraError> {
    state.pomodoro.snapshot()
}

pub async fn toggle_timer_impl(state: &AppState) -> Result<TimerSnapshot, InfraError> {
    state.pomodoro.toggle().await
}

pub async fn acknowledge_timer_impl(state: &AppState) -> Result<TimerSnapshot, InfraError> {
    state.pomodoro.acknowledge().await
}

pub fn reset_timer_impl(state: &AppState) -> Result<TimerSnapshot, InfraError> {
    state.pomodoro.reset()
}

pub fn timer_stats_impl(state: &AppState) -> Result<TimerStats, InfraError> {
    state.pomodoro.reload_stats()
}

/// Stops background work and writes settings. Call once before exit.
pub async fn shutdown_impl(state: &AppState) -> Result<(), InfraError> {
    state.pomodoro.shutdown().await;
    save_settings_impl(state)?;
    state.log_info("shutdown", "state saved");
    Ok(())
}
