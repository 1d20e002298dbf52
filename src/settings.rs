//! Runtime settings for the binaries, read from environment variables.

use crate::locator::Lookahead;
use chrono_tz::Tz;
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    InvalidAddress(String),
    InvalidTimezone(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidAddress(value) => {
                write!(f, "TIMETABLE_HTTP_ADDR '{value}' is not a socket address")
            }
            SettingsError::InvalidTimezone(value) => {
                write!(f, "TIMETABLE_DEFAULT_TZ '{value}' is not an IANA timezone")
            }
            SettingsError::InvalidFlag { name, value } => {
                write!(f, "{name} '{value}' must be true or false")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub http_addr: SocketAddr,
    /// SQLite database file. Takes precedence over `snapshot_path`.
    pub db_path: Option<PathBuf>,
    /// JSON snapshot used to seed an in-memory store.
    pub snapshot_path: Option<PathBuf>,
    /// Timezone for teachers without one of their own.
    pub default_timezone: Tz,
    pub lookahead: Lookahead,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            db_path: None,
            snapshot_path: None,
            default_timezone: Tz::UTC,
            lookahead: Lookahead::Sequential,
        }
    }
}

impl Settings {
    /// Reads settings from the environment.
    ///
    /// - `TIMETABLE_HTTP_ADDR` (default `0.0.0.0:3000`)
    /// - `TIMETABLE_DB_PATH` (optional SQLite file)
    /// - `TIMETABLE_SNAPSHOT` (optional JSON snapshot)
    /// - `TIMETABLE_DEFAULT_TZ` (default `UTC`)
    /// - `TIMETABLE_PARALLEL_LOOKAHEAD` (default `false`)
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(addr) = non_empty("TIMETABLE_HTTP_ADDR") {
            settings.http_addr = addr
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidAddress(addr.clone()))?;
        }
        settings.db_path = non_empty("TIMETABLE_DB_PATH").map(PathBuf::from);
        settings.snapshot_path = non_empty("TIMETABLE_SNAPSHOT").map(PathBuf::from);
        if let Some(name) = non_empty("TIMETABLE_DEFAULT_TZ") {
            settings.default_timezone = name
                .trim()
                .parse::<Tz>()
                .map_err(|_| SettingsError::InvalidTimezone(name.clone()))?;
        }
        if let Some(flag) = non_empty("TIMETABLE_PARALLEL_LOOKAHEAD") {
            let parallel = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(SettingsError::InvalidFlag {
                        name: "TIMETABLE_PARALLEL_LOOKAHEAD",
                        value: flag,
                    });
                }
            };
            if parallel {
                settings.lookahead = Lookahead::Parallel;
            }
        }
        Ok(settings)
    }
}
