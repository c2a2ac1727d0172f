pub mod bootstrap;
pub mod calendar;
pub mod clock;
pub mod collections;
pub mod commands;
pub mod dashboard;
pub mod dreams;
pub mod notes;
pub mod pomodoro;
pub mod settings;
pub mod todos;
