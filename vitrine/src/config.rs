//! Process configuration read from the environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `VITRINE_TENANT` | `default` |
//! | `VITRINE_POOL_MAX_CONNECTIONS` | 10 |
//! | `VITRINE_POOL_MIN_CONNECTIONS` | 5 |
//! | `VITRINE_POOL_MAX_LIFETIME_SECS` | 3600 |
//! | `VITRINE_POOL_IDLE_TIMEOUT_SECS` | 600 |
//! | `VITRINE_POOL_ACQUIRE_TIMEOUT_SECS` | 30 |
//! | `VITRINE_REMINDER_POLL_SECS` | 60 |
//! | `VITRINE_REMINDER_LOOKAHEAD_SECS` | 0 |
//! | `VITRINE_REMINDER_TIMEZONE` | `Europe/Warsaw` |
//! | `VITRINE_LOGIN_GUARD_ENABLED` | `true` |

use std::{str::FromStr, time::Duration};

use chrono_tz::Tz;
use vitrine_core::{LoginGuardConfig, PoolConfig, SchedulerConfig, TenantId};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Unsupported database URL scheme: {0}")]
    UnsupportedBackend(String),
}

/// Storage backend chosen from the scheme of the database URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Postgres,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split(':').next().unwrap_or_default();
        match scheme {
            "sqlite" => Ok(Backend::Sqlite),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(ConfigError::UnsupportedBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub tenant: TenantId,
    pub pool: PoolConfig,
    pub scheduler: SchedulerConfig,
    pub login_guard: LoginGuardConfig,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_url(None)
    }

    /// Like [`from_env`](Self::from_env), with `database_url` taking precedence
    /// over `DATABASE_URL` when given.
    pub fn from_env_with_url(database_url: Option<String>) -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "Failed to load .env file");
            }
        }
        Self::from_lookup(|name| match (name, &database_url) {
            ("DATABASE_URL", Some(url)) => Some(url.clone()),
            _ => std::env::var(name).ok(),
        })
    }

    /// Build a configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let tenant = match lookup("VITRINE_TENANT") {
            Some(tenant) => TenantId::new(tenant).map_err(|e| ConfigError::Invalid {
                name: "VITRINE_TENANT",
                reason: e.to_string(),
            })?,
            None => TenantId::default_tenant(),
        };

        let defaults = PoolConfig::default();
        let pool = PoolConfig::default()
            .with_max_connections(
                parse(&lookup, "VITRINE_POOL_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            )
            .with_min_connections(
                parse(&lookup, "VITRINE_POOL_MIN_CONNECTIONS")?.unwrap_or(defaults.min_connections),
            )
            .with_max_lifetime(
                seconds(&lookup, "VITRINE_POOL_MAX_LIFETIME_SECS")?.unwrap_or(defaults.max_lifetime),
            )
            .with_idle_timeout(
                seconds(&lookup, "VITRINE_POOL_IDLE_TIMEOUT_SECS")?.unwrap_or(defaults.idle_timeout),
            )
            .with_acquire_timeout(
                seconds(&lookup, "VITRINE_POOL_ACQUIRE_TIMEOUT_SECS")?
                    .unwrap_or(defaults.acquire_timeout),
            );

        let mut scheduler = SchedulerConfig::default();
        if let Some(interval) = seconds(&lookup, "VITRINE_REMINDER_POLL_SECS")? {
            if interval.is_zero() {
                return Err(ConfigError::Invalid {
                    name: "VITRINE_REMINDER_POLL_SECS",
                    reason: "must be greater than zero".to_string(),
                });
            }
            scheduler = scheduler.with_poll_interval(interval);
        }
        if let Some(lookahead) = parse::<i64>(&lookup, "VITRINE_REMINDER_LOOKAHEAD_SECS")? {
            if lookahead < 0 {
                return Err(ConfigError::Invalid {
                    name: "VITRINE_REMINDER_LOOKAHEAD_SECS",
                    reason: "cannot be negative".to_string(),
                });
            }
            scheduler = scheduler.with_lookahead(chrono::Duration::seconds(lookahead));
        }
        if let Some(timezone) = parse::<Tz>(&lookup, "VITRINE_REMINDER_TIMEZONE")? {
            scheduler = scheduler.with_timezone(timezone);
        }

        let login_guard = LoginGuardConfig::default().with_enabled(
            parse::<bool>(&lookup, "VITRINE_LOGIN_GUARD_ENABLED")?.unwrap_or(true),
        );

        Ok(Self {
            database_url,
            tenant,
            pool,
            scheduler,
            login_guard,
        })
    }

    pub fn backend(&self) -> Result<Backend, ConfigError> {
        Backend::from_url(&self.database_url)
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn seconds(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    Ok(parse::<u64>(lookup, name)?.map(Duration::from_secs))
}
