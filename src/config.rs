use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::bridge::DEFAULT_OP_TIMEOUT;

/// Service configuration, sourced from `EMO_*` environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Connection string for the prediction store. Required: an empty value
    /// is a fatal configuration error at service start.
    pub database_url: String,
    /// Cap on how long a request thread blocks on one database operation.
    pub op_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = env_string("EMO_BIND_ADDR", "127.0.0.1:8000")
            .parse::<SocketAddr>()
            .context("EMO_BIND_ADDR must be a valid host:port")?;

        let database_url = std::env::var("EMO_DATABASE_URL").unwrap_or_default();

        let op_timeout_secs = env_string(
            "EMO_OP_TIMEOUT_SECS",
            &DEFAULT_OP_TIMEOUT.as_secs().to_string(),
        )
        .parse::<u64>()
        .context("EMO_OP_TIMEOUT_SECS must be u64")?;

        Ok(Self {
            bind_addr,
            database_url,
            op_timeout: Duration::from_secs(op_timeout_secs),
        })
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
