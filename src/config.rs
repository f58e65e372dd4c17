use std::env;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,

    // Failed login / step-up throttling
    pub auth_max_attempts: u32,
    pub auth_window_secs: u64,

    // Optional admin account created at start-up
    pub seed_admin_password: Option<String>,
    pub seed_admin_email: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://mentalcare.db".into(),
            db_max_connections: 5,
            db_acquire_timeout_secs: 5,
            auth_max_attempts: 5,
            auth_window_secs: 60,
            seed_admin_password: None,
            seed_admin_email: "admin@mentalcare.local".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            db_acquire_timeout_secs: parse_var(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.db_acquire_timeout_secs,
            )?,

            auth_max_attempts: parse_var("AUTH_MAX_ATTEMPTS", defaults.auth_max_attempts)?,
            auth_window_secs: parse_var("AUTH_WINDOW_SECS", defaults.auth_window_secs)?,

            seed_admin_password: env::var("SEED_ADMIN_PASSWORD")
                .ok()
                .filter(|s| !s.is_empty()),
            seed_admin_email: env::var("SEED_ADMIN_EMAIL").unwrap_or(defaults.seed_admin_email),
        })
    }

    /// In-memory store, used by tests and throwaway sessions.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".into(),
            db_max_connections: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be a number")),
        Err(_) => Ok(default),
    }
}
