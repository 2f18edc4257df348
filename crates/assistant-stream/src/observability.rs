use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

const ENABLED_VAR: &str = "ASSISTANT_OBSERVABILITY_ENABLED";
const LEVEL_VAR: &str = "ASSISTANT_LOG_LEVEL";
const JSON_PATH_VAR: &str = "ASSISTANT_JSON_LOG_PATH";
const DEFAULT_FILTER: &str = "warn";
const DEFAULT_LOG_FILE: &str = "assistant.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records go.
#[derive(Debug, PartialEq, Eq)]
enum LogSink {
    /// Compact lines on stderr, leaving stdout to reply text.
    Stderr,
    /// JSON lines appended to `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogSink {
    fn from_path(raw: &str) -> Self {
        let path = Path::new(raw);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE)
            .to_string();
        Self::JsonFile { dir, file_name }
    }
}

/// Logging setup resolved from the environment.
#[derive(Debug)]
struct LogSettings {
    enabled: bool,
    /// Explicit `ASSISTANT_LOG_LEVEL` directive; falls back to `RUST_LOG`.
    level: Option<String>,
    sink: LogSink,
}

impl LogSettings {
    fn resolve(var: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = var(ENABLED_VAR)
            .and_then(|value| parse_flag(&value))
            .unwrap_or(true);
        let level = var(LEVEL_VAR).filter(|level| !level.trim().is_empty());
        let sink = var(JSON_PATH_VAR)
            .filter(|path| !path.trim().is_empty())
            .map_or(LogSink::Stderr, |path| LogSink::from_path(&path));
        Self {
            enabled,
            level,
            sink,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        self.level
            .as_deref()
            .and_then(|level| EnvFilter::try_new(level).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `ASSISTANT_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `ASSISTANT_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `ASSISTANT_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact format so they do not mix with
///   streamed reply text on stdout.
/// - `RUST_LOG`: filter used when `ASSISTANT_LOG_LEVEL` is unset or invalid.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let settings = LogSettings::resolve(|key| std::env::var(key).ok());
        if !settings.enabled {
            return;
        }
        let env_filter = settings.env_filter();
        match settings.sink {
            LogSink::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init();
            }
            LogSink::Stderr => {
                let layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .try_init();
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve(vars: &[(&str, &str)]) -> LogSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogSettings::resolve(|key| vars.get(key).cloned())
    }

    #[test]
    fn flag_values() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn defaults_log_to_stderr() {
        let settings = resolve(&[]);
        assert!(settings.enabled);
        assert_eq!(settings.level, None);
        assert_eq!(settings.sink, LogSink::Stderr);
    }

    #[test]
    fn unknown_flag_keeps_logging_enabled() {
        assert!(resolve(&[(ENABLED_VAR, "sometimes")]).enabled);
        assert!(!resolve(&[(ENABLED_VAR, "0")]).enabled);
    }

    #[test]
    fn json_path_splits_into_dir_and_file() {
        let settings = resolve(&[(JSON_PATH_VAR, "logs/run.jsonl"), (LEVEL_VAR, "debug")]);
        assert_eq!(settings.level.as_deref(), Some("debug"));
        assert_eq!(
            settings.sink,
            LogSink::JsonFile {
                dir: PathBuf::from("logs"),
                file_name: "run.jsonl".into(),
            }
        );
        assert_eq!(
            LogSink::from_path("bare.jsonl"),
            LogSink::JsonFile {
                dir: PathBuf::from("."),
                file_name: "bare.jsonl".into(),
            }
        );
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings = resolve(&[(JSON_PATH_VAR, "  "), (LEVEL_VAR, "")]);
        assert_eq!(settings.level, None);
        assert_eq!(settings.sink, LogSink::Stderr);
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
    }
}
