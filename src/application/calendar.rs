use crate::domain::models::{CalendarEvent, EventType};
use chrono::NaiveDate;

/// Read-only event list. Events are fixed at construction; nothing here is
/// persisted.
#[derive(Debug, Clone)]
pub struct CalendarService {
    events: Vec<CalendarEvent>,
}

impl CalendarService {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        let mut events = events
            .into_iter()
            .filter(|event| event.validate().is_ok())
            .collect::<Vec<_>>();
        events.sort_by(|left, right| {
            (left.date.as_str(), left.time.as_str())
                .cmp(&(right.date.as_str(), right.time.as_str()))
        });
        Self { events }
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<CalendarEvent> {
        let date = date.format("%Y-%m-%d").to_string();
        self.events
            .iter()
            .filter(|event| event.date == date)
            .cloned()
            .collect()
    }

    /// Events on or after `from`, soonest first.
    pub fn upcoming(&self, from: NaiveDate) -> Vec<CalendarEvent> {
        let from = from.format("%Y-%m-%d").to_string();
        self.events
            .iter()
            .filter(|event| event.date >= from)
            .cloned()
            .collect()
    }
}

impl Default for CalendarService {
    fn default() -> Self {
        Self::new(vec![
            event("1", "Ujian Matematika", "2025-11-05", "09:00", EventType::Exam),
            event("2", "Belajar Fisika", "2025-11-01", "14:00", EventType::Study),
            event(
                "3",
                "Tugas Bahasa Inggris",
                "2025-11-03",
                "16:00",
                EventType::Assignment,
            ),
        ])
    }
}

fn event(id: &str, title: &str, date: &str, time: &str, event_type: EventType) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        event_type,
    }
}
