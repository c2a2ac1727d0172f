use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const TIMER_JSON: &str = "timer.json";
const DEFAULT_NAMESPACE: &str = "studymate";
const DEFAULT_FOCUS_MINUTES: u32 = 25;
const DEFAULT_WARNING_THRESHOLD_SECONDS: u32 = 180;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub app_name: String,
    pub timezone: Tz,
    pub storage_namespace: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "StudyMate".to_string(),
            timezone: Tz::UTC,
            storage_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub focus_minutes: u32,
    pub warning_threshold_seconds: u32,
}

impl TimerConfig {
    pub fn focus_seconds(&self) -> u32 {
        self.focus_minutes * 60
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            warning_threshold_seconds: DEFAULT_WARNING_THRESHOLD_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigBundle {
    pub app: AppConfig,
    pub timer: TimerConfig,
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "StudyMate",
                "timezone": "UTC",
                "storageNamespace": DEFAULT_NAMESPACE
            }),
        ),
        (
            TIMER_JSON,
            serde_json::json!({
                "schema": 1,
                "focusMinutes": DEFAULT_FOCUS_MINUTES,
                "warningThresholdSeconds": DEFAULT_WARNING_THRESHOLD_SECONDS
            }),
        ),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

fn read_trimmed_str<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_app_config(value: &serde_json::Value, path: &Path) -> Result<AppConfig, InfraError> {
    let defaults = AppConfig::default();
    let timezone = match read_trimmed_str(value, "timezone") {
        Some(name) => name.parse::<Tz>().map_err(|error| {
            InfraError::InvalidConfig(format!(
                "unknown timezone '{name}' in {}: {error}",
                path.display()
            ))
        })?,
        None => defaults.timezone,
    };
    Ok(AppConfig {
        app_name: read_trimmed_str(value, "appName")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.app_name),
        timezone,
        storage_namespace: read_trimmed_str(value, "storageNamespace")
            .map(ToOwned::to_owned)
            .unwrap_or(defaults.storage_namespace),
    })
}

fn parse_timer_config(value: &serde_json::Value, path: &Path) -> Result<TimerConfig, InfraError> {
    let defaults = TimerConfig::default();
    let focus_minutes = value
        .get("focusMinutes")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(u64::from(defaults.focus_minutes));
    if focus_minutes == 0 || focus_minutes > 24 * 60 {
        return Err(InfraError::InvalidConfig(format!(
            "focusMinutes must be between 1 and 1440 in {}",
            path.display()
        )));
    }
    let warning_threshold_seconds = value
        .get("warningThresholdSeconds")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(u64::from(defaults.warning_threshold_seconds));
    Ok(TimerConfig {
        focus_minutes: focus_minutes as u32,
        warning_threshold_seconds: warning_threshold_seconds.min(u64::from(u32::MAX)) as u32,
    })
}

pub fn load_configs(config_dir: &Path) -> Result<ConfigBundle, InfraError> {
    let app_path = config_dir.join(APP_JSON);
    let timer_path = config_dir.join(TIMER_JSON);
    Ok(ConfigBundle {
        app: parse_app_config(&read_config(&app_path)?, &app_path)?,
        timer: parse_timer_config(&read_config(&timer_path)?, &timer_path)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_CONFIG: AtomicUsize = AtomicUsize::new(0);

    struct TempConfigDir {
        path: PathBuf,
    }

    impl TempConfigDir {
        fn new() -> Self {
            let sequence = NEXT_TEMP_CONFIG.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "studymate-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp config dir");
            Self { path }
        }
    }

    impl Drop for TempConfigDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn defaults_are_written_and_loaded() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        let bundle = load_configs(&dir.path).expect("load configs");
        assert_eq!(bundle, ConfigBundle::default());
        assert_eq!(bundle.timer.focus_seconds(), 1500);
    }

    #[test]
    fn existing_files_are_not_overwritten() {
        let dir = TempConfigDir::new();
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema":1,"appName":"Mine","timezone":"Asia/Jakarta"}"#,
        )
        .expect("write app config");
        ensure_default_configs(&dir.path).expect("write defaults");

        let bundle = load_configs(&dir.path).expect("load configs");
        assert_eq!(bundle.app.app_name, "Mine");
        assert_eq!(bundle.app.timezone, chrono_tz::Asia::Jakarta);
        assert_eq!(bundle.app.storage_namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(dir.path.join(TIMER_JSON), r#"{"schema":2}"#).expect("write timer config");
        match load_configs(&dir.path) {
            Err(InfraError::InvalidConfig(message)) => assert!(message.contains("schema")),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let dir = TempConfigDir::new();
        ensure_default_configs(&dir.path).expect("write defaults");
        fs::write(
            dir.path.join(APP_JSON),
            r#"{"schema":1,"timezone":"Mars/Olympus"}"#,
        )
        .expect("write app config");
        assert!(load_configs(&dir.path).is_err());
    }
}
