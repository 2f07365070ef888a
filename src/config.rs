//! Server configuration parsed from environment variables.

use std::time::Duration;

use crate::services::debounce::DEFAULT_PREVIEW_DEBOUNCE_MS;
use crate::services::sweeper::{
    DEFAULT_WORKSPACE_IDLE_TIMEOUT_SECS, DEFAULT_WORKSPACE_SWEEP_INTERVAL_SECS, SweepConfig,
};

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub preview_debounce: Duration,
    pub sweep: SweepConfig,
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `PREVIEW_DEBOUNCE_MS`,
    /// `WORKSPACE_IDLE_TIMEOUT_SECS` and `WORKSPACE_SWEEP_INTERVAL_SECS`.
    /// Missing or malformed values fall back to defaults. A zero sweep
    /// interval is treated as malformed.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let sweep_secs = match lookup_parse(&lookup, "WORKSPACE_SWEEP_INTERVAL_SECS", DEFAULT_WORKSPACE_SWEEP_INTERVAL_SECS) {
            0 => DEFAULT_WORKSPACE_SWEEP_INTERVAL_SECS,
            secs => secs,
        };
        Self {
            host,
            port: lookup_parse(&lookup, "PORT", DEFAULT_PORT),
            preview_debounce: Duration::from_millis(lookup_parse(
                &lookup,
                "PREVIEW_DEBOUNCE_MS",
                DEFAULT_PREVIEW_DEBOUNCE_MS,
            )),
            sweep: SweepConfig {
                idle_timeout: Duration::from_secs(lookup_parse(
                    &lookup,
                    "WORKSPACE_IDLE_TIMEOUT_SECS",
                    DEFAULT_WORKSPACE_IDLE_TIMEOUT_SECS,
                )),
                interval: Duration::from_secs(sweep_secs),
            },
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn lookup_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
