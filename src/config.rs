//! Runtime context and settings.
//!
//! Both are resolved once at process start from an environment lookup and then
//! passed by reference. Nothing below `main` reads the process environment.
use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CODING_MODEL: &str = "gpt-4.1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_ASSETS_DIR: &str = "assets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    #[default]
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    /// Parse a level name, falling back to `Info` on anything unrecognized.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "DEBUG" => Ok(LogLevel::Debug),
            other => Err(format!("unknown log level {other:?}")),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_filter().to_ascii_uppercase())
    }
}

/// Per-invocation context threaded through every component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
    dry_run: bool,
    run_id: String,
    log_level: LogLevel,
}

/// Explicit values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct ContextOverrides {
    pub dry_run: Option<bool>,
    pub run_id: Option<String>,
    pub log_level: Option<String>,
}

impl RuntimeContext {
    #[cfg(test)]
    pub fn new(dry_run: bool, run_id: impl Into<String>, log_level: LogLevel) -> Self {
        Self {
            dry_run,
            run_id: run_id.into(),
            log_level,
        }
    }

    /// Resolve from `DRY_RUN`, `RUN_ID` and `LOG_LEVEL`, applying overrides first.
    pub fn from_lookup<F>(lookup: F, overrides: ContextOverrides) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dry_run = match overrides.dry_run {
            Some(flag) => flag,
            None => match lookup("DRY_RUN") {
                Some(raw) => parse_flag("DRY_RUN", &raw)?,
                None => false,
            },
        };
        let run_id = overrides
            .run_id
            .or_else(|| lookup("RUN_ID"))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_run_id);
        let log_level = overrides
            .log_level
            .or_else(|| lookup("LOG_LEVEL"))
            .map(|raw| LogLevel::parse_lenient(&raw))
            .unwrap_or_default();
        Ok(Self {
            dry_run,
            run_id,
            log_level,
        })
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }
}

fn new_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    let value = raw.trim().to_ascii_lowercase();
    match value.as_str() {
        "" | "false" | "no" | "off" => Ok(false),
        "true" | "yes" | "on" => Ok(true),
        _ => value
            .parse::<i64>()
            .map(|n| n != 0)
            .map_err(|_| {
                Error::InvalidConfig(format!("{name} must be a boolean flag (got {raw:?})"))
            }),
    }
}

/// Credentials, endpoints and local paths for the collaborator clients.
#[derive(Clone, Default)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_coding_model: String,
    pub openai_base_url: String,
    pub notion_api_key: Option<String>,
    pub notion_database_id: Option<String>,
    pub assets_dir: PathBuf,
    pub ffmpeg_command: Option<String>,
}

impl Settings {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_model: non_empty("OPENAI_MODEL")
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            openai_coding_model: non_empty("OPENAI_CODING_MODEL")
                .unwrap_or_else(|| DEFAULT_CODING_MODEL.to_string()),
            openai_base_url: non_empty("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            notion_api_key: non_empty("NOTION_API_KEY"),
            notion_database_id: non_empty("NOTION_DATABASE_ID"),
            assets_dir: non_empty("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR)),
            ffmpeg_command: non_empty("FFMPEG_COMMAND"),
        }
    }

    pub fn require_openai_key(&self) -> Result<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or(Error::MissingConfig("OPENAI_API_KEY"))
    }

    pub fn require_notion_key(&self) -> Result<&str> {
        self.notion_api_key
            .as_deref()
            .ok_or(Error::MissingConfig("NOTION_API_KEY"))
    }

    pub fn require_notion_database(&self) -> Result<&str> {
        self.notion_database_id
            .as_deref()
            .ok_or(Error::MissingConfig("NOTION_DATABASE_ID"))
    }
}

// Secrets stay out of logs and panics.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("openai_model", &self.openai_model)
            .field("openai_coding_model", &self.openai_coding_model)
            .field("openai_base_url", &self.openai_base_url)
            .field("notion_api_key", &redact(&self.notion_api_key))
            .field("notion_database_id", &self.notion_database_id)
            .field("assets_dir", &self.assets_dir)
            .field("ffmpeg_command", &self.ffmpeg_command)
            .finish()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
