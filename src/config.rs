use std::str::FromStr;

use anyhow::Context;

pub const DEFAULT_STORAGE_BUDGET_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_FULL_SNAPSHOTS: usize = 3;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub max_connections: u32,
    pub storage_budget_bytes: usize,
    pub full_snapshots: usize,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        Ok(Self {
            database_url,
            max_connections: env_or("CLAIMS_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            storage_budget_bytes: env_or(
                "CLAIMS_STORAGE_BUDGET_BYTES",
                DEFAULT_STORAGE_BUDGET_BYTES,
            )?,
            full_snapshots: env_or("CLAIMS_FULL_SNAPSHOTS", DEFAULT_FULL_SNAPSHOTS)?,
        })
    }
}

fn env_or<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{name} must be a non-negative integer, got '{raw}'"))
}
