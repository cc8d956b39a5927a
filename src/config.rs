use thiserror::Error;

use crate::models::DEFAULT_MIN_ATTENDANCE;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set to a Postgres instance")]
    MissingDatabaseUrl,

    #[error("{name} must be a whole number, got {value:?}")]
    NotANumber { name: &'static str, value: String },

    #[error("DEFAULT_MIN_ATTENDANCE must be between 0 and 100, got {0}")]
    MinAttendanceOutOfRange(i32),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub default_min_attendance: i32,
}

impl AppConfig {
    /// Reads settings from the process environment. Call `dotenvy::dotenv()` first
    /// to pick up a local `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::MissingDatabaseUrl)?;

        let max_connections: u32 = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber {
                name: "DATABASE_MAX_CONNECTIONS",
                value: value.clone(),
            })?,
            None => 5,
        };

        let default_min_attendance: i32 = match lookup("DEFAULT_MIN_ATTENDANCE") {
            Some(value) => value.trim().parse().map_err(|_| ConfigError::NotANumber {
                name: "DEFAULT_MIN_ATTENDANCE",
                value: value.clone(),
            })?,
            None => DEFAULT_MIN_ATTENDANCE,
        };
        if !(0..=100).contains(&default_min_attendance) {
            return Err(ConfigError::MinAttendanceOutOfRange(default_min_attendance));
        }

        Ok(Self {
            database_url,
            max_connections,
            default_min_attendance,
        })
    }
}
