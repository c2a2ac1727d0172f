pub mod alarm;
pub mod collection_store;
pub mod command_log;
pub mod config;
pub mod error;
pub mod image_picker;
pub mod storage;
