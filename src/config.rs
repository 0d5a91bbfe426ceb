//! Runtime configuration read from the environment (after `.env` is loaded).
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `127.0.0.1` |
//! | `PORT` | `3000` |
//! | `DATABASE_URL` | unset: in-memory store |
//! | `JWT_SECRET` | required |
//! | `JWT_EXPIRE_HOURS` | `8` |
//! | `BCRYPT_COST` | bcrypt's default cost |
//! | `MAX_ACTIVE_RESERVATIONS` | `3` |
//! | `PRUNE_SCHEDULE_ON_DELETE` | `true` |
//! | `CORS_ORIGINS` | unset: no CORS layer |

use std::env;
use std::net::IpAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expire_hours: i64,
    pub bcrypt_cost: u32,
    pub max_active_reservations: i64,
    pub prune_schedule_on_delete: bool,
    pub cors_origins: Option<Vec<String>>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            host: parse_or(&lookup, "HOST", IpAddr::from([127, 0, 0, 1]))?,
            port: parse_or(&lookup, "PORT", 3000)?,
            database_url: lookup("DATABASE_URL").filter(|s| !s.is_empty()),
            jwt_secret,
            jwt_expire_hours: parse_or(&lookup, "JWT_EXPIRE_HOURS", 8)?,
            bcrypt_cost: parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            max_active_reservations: parse_or(&lookup, "MAX_ACTIVE_RESERVATIONS", 3)?,
            prune_schedule_on_delete: parse_or(&lookup, "PRUNE_SCHEDULE_ON_DELETE", true)?,
            cors_origins: lookup("CORS_ORIGINS").map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }

    /// Config suitable for tests and local runs against the in-memory store.
    pub fn for_testing(jwt_secret: &str) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            jwt_expire_hours: 8,
            bcrypt_cost: 4,
            max_active_reservations: 3,
            prune_schedule_on_delete: true,
            cors_origins: None,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
