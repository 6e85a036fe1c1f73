use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

/// Connection settings for the Postgres backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub pool_size: u32,
    pub connect_timeout: Duration,
}

impl Config {
    /// Reads the process environment, after loading a `.env` file if one exists.
    pub fn load() -> Result<Config, ConfigError> {
        dotenvy::dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let pool_size: u32 = try_load(&lookup, "POLLS_POOL_SIZE", 8)?;
        let connect_timeout_ms: u64 = try_load(&lookup, "POLLS_CONNECT_TIMEOUT_MS", 1000)?;

        if pool_size == 0 {
            return Err(ConfigError::Invalid {
                key: "POLLS_POOL_SIZE",
                value: pool_size.to_string(),
                reason: String::from("pool needs at least one connection"),
            });
        }

        Ok(Config {
            database_url,
            pool_size,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
        })
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            debug!("{key} not set, using default: {default}");
            Ok(default)
        },
        Some(value) => value.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid { key, value: value.clone(), reason: e.to_string() }
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter()
            .map(|(k, v)| (String::from(*k), String::from(*v)))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/polls")])).unwrap();
        assert_eq!(config.database_url, "postgres://localhost/polls");
        assert_eq!(config.pool_size, 8);
        assert_eq!(config.connect_timeout, Duration::from_millis(1000));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/polls"),
            ("POLLS_POOL_SIZE", " 32 "),
            ("POLLS_CONNECT_TIMEOUT_MS", "250"),
        ])).unwrap();
        assert_eq!(config.pool_size, 32);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_url_is_an_error() {
        assert_eq!(Config::from_lookup(lookup(&[])), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(Config::from_lookup(lookup(&[("DATABASE_URL", "  ")])), Err(ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn bad_numbers_are_errors() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("POLLS_POOL_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLLS_POOL_SIZE", .. }));

        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "x"), ("POLLS_POOL_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "POLLS_POOL_SIZE", .. }));
    }
}
