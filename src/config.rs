use std::collections::HashMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::BookingError;

pub const DEFAULT_TIMEZONE: &str = "Asia/Kolkata";
pub const DEFAULT_CALENDAR_ID: &str = "primary";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_MAX_TOOL_TURNS: usize = 5;

#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, BookingError> {
        let content = fs::read_to_string(path)
            .map_err(|e| BookingError::Configuration(format!("cannot read {path}: {e}")))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, BookingError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(BookingError::Configuration(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    /// Loads `CONFIG_FILE` when set, otherwise `./.env` if it exists.
    pub fn discover() -> Result<Self, BookingError> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => Self::from_file(&path),
            Err(_) if Path::new(".env").exists() => Self::from_file(".env"),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// File value first, then the process environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| std::env::var(key).ok())
            .filter(|v| !v.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub openai_temperature: f32,
    pub service_account_key_path: PathBuf,
    pub calendar_id: String,
    pub calendar_api_base: String,
    pub default_timezone: Tz,
    pub bind_addr: SocketAddr,
    pub max_tool_turns: usize,
    pub oracle_timeout: Duration,
    pub calendar_timeout: Duration,
}

impl ServerSettings {
    pub fn from_lookup<F>(get_prop: F) -> Result<Self, BookingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let openai_api_key = get_prop("OPENAI_API_KEY").ok_or_else(|| {
            BookingError::Configuration(
                "OPENAI_API_KEY environment variable not set".to_string(),
            )
        })?;

        let key_path = get_prop("GOOGLE_SERVICE_ACCOUNT_KEY_PATH").ok_or_else(|| {
            BookingError::Configuration(
                "GOOGLE_SERVICE_ACCOUNT_KEY_PATH environment variable not set".to_string(),
            )
        })?;
        let service_account_key_path = PathBuf::from(key_path);
        if !service_account_key_path.is_file() {
            return Err(BookingError::Configuration(format!(
                "Service account key file not found at {}",
                service_account_key_path.display()
            )));
        }

        let timezone_name =
            get_prop("DEFAULT_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let default_timezone = timezone_name.parse::<Tz>().map_err(|_| {
            BookingError::Configuration(format!("DEFAULT_TIMEZONE '{timezone_name}' is not a valid IANA timezone"))
        })?;

        Ok(Self {
            openai_api_key,
            openai_model: get_prop("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            openai_base_url: get_prop("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            openai_temperature: parse_or(&get_prop, "OPENAI_TEMPERATURE", 0.7)?,
            service_account_key_path,
            calendar_id: get_prop("GOOGLE_CALENDAR_ID")
                .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string()),
            calendar_api_base: get_prop("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string()),
            default_timezone,
            bind_addr: parse_or(
                &get_prop,
                "BIND_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8000)),
            )?,
            max_tool_turns: parse_or(&get_prop, "MAX_TOOL_TURNS", DEFAULT_MAX_TOOL_TURNS)?,
            oracle_timeout: Duration::from_secs(parse_or(&get_prop, "ORACLE_TIMEOUT_SECS", 60)?),
            calendar_timeout: Duration::from_secs(parse_or(
                &get_prop,
                "CALENDAR_TIMEOUT_SECS",
                30,
            )?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ShellSettings {
    pub backend_url: String,
    pub timeout: Duration,
}

impl ShellSettings {
    pub fn from_lookup<F>(get_prop: F) -> Result<Self, BookingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            backend_url: get_prop("BACKEND_URL")
                .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: Duration::from_secs(parse_or(&get_prop, "BACKEND_TIMEOUT_SECS", 120)?),
        })
    }
}

fn parse_or<F, T>(get_prop: &F, key: &str, default: T) -> Result<T, BookingError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get_prop(key) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| {
            BookingError::Configuration(format!("{key} has an invalid value '{raw}'"))
        }),
        None => Ok(default),
    }
}
