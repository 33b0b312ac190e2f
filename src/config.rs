use std::{env, fmt::Display, str::FromStr};

use anyhow::Context;
use tracing::{info, warn};

pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set to a production Postgres instance")?,
            max_connections: try_load("KKL_MAX_CONNECTIONS", "5")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow::anyhow!("invalid {key} value {raw:?}: {e}")
    })
}
