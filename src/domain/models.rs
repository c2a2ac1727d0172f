use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Anything stored in a collection, addressed by its opaque id.
pub trait Record {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    pub text: String,
    pub completed: bool,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

impl Todo {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "todo.id")?;
        validate_non_empty(&self.text, "todo.text")
    }
}

impl Record for Todo {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Note {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "note.id")?;
        validate_non_empty(&self.title, "note.title")
    }

    pub fn matches(&self, query: &str) -> bool {
        contains_ignore_case(&self.title, query) || contains_ignore_case(&self.content, query)
    }
}

impl Record for Note {
    fn id(&self) -> &str {
        &self.id
    }
}

pub const DREAM_CATEGORIES: [&str; 5] = [
    "🎓 Akademik",
    "💼 Karir",
    "🌟 Pribadi",
    "🌍 Perjalanan",
    "💰 Finansial",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dream {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub completed: bool,
}

impl Dream {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "dream.id")?;
        validate_non_empty(&self.title, "dream.title")?;
        validate_non_empty(&self.description, "dream.description")?;
        validate_non_empty(&self.category, "dream.category")
    }
}

impl Record for Dream {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Aggregate focus statistics. The `today_*` counters only describe
/// `last_session_date`; see [`TimerStats::roll_over`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerStats {
    pub total_sessions: u32,
    pub total_minutes: u32,
    pub today_sessions: u32,
    pub today_minutes: u32,
    pub last_session_date: String,
}

impl TimerStats {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            total_sessions: 0,
            total_minutes: 0,
            today_sessions: 0,
            today_minutes: 0,
            last_session_date: format_day(today),
        }
    }

    /// Zeroes the day counters when they belong to another day. Returns
    /// whether anything changed.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        let today = format_day(today);
        if self.last_session_date == today {
            return false;
        }
        self.today_sessions = 0;
        self.today_minutes = 0;
        self.last_session_date = today;
        true
    }

    pub fn record_session(&mut self, today: NaiveDate, minutes: u32) {
        self.roll_over(today);
        self.total_sessions = self.total_sessions.saturating_add(1);
        self.total_minutes = self.total_minutes.saturating_add(minutes);
        self.today_sessions = self.today_sessions.saturating_add(1);
        self.today_minutes = self.today_minutes.saturating_add(minutes);
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl User {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "user.id")?;
        validate_non_empty(&self.name, "user.name")?;
        validate_non_empty(&self.email, "user.email")?;
        if !self.email.contains('@') {
            return Err("user.email must contain '@'".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Exam,
    Study,
    Assignment,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub time: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl CalendarEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "event.id")?;
        validate_non_empty(&self.title, "event.title")?;
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| "event.date must be YYYY-MM-DD".to_string())?;
        chrono::NaiveTime::parse_from_str(&self.time, "%H:%M")
            .map_err(|_| "event.time must be HH:MM".to_string())?;
        Ok(())
    }
}

pub fn format_day(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
