//! Environment-driven application configuration.
//!
//! All settings are optional and fall back to documented defaults, so the
//! binary starts with no environment at all. Invalid values fail fast with a
//! `ConfigError` instead of being silently replaced.

use crate::errors::ConfigError;
use std::env;
use std::net::SocketAddr;

type Result<T> = std::result::Result<T, ConfigError>;

/// Runtime configuration for the hub core.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Maximum number of concurrently executing event workers.
    pub worker_limit: usize,
    /// Bound of the inbound event queue.
    pub queue_size: usize,
    /// Disconnect count that flips a device offline.
    pub offline_threshold: u32,
    /// Rolling window for the offline debounce, in seconds.
    pub offline_window_seconds: i64,
    /// Capacity of the identity LRU cache.
    pub identity_cache_size: usize,
    /// TTL for cached identities, in seconds.
    pub identity_ttl_seconds: i64,
    /// Optional statsd endpoint, e.g. "127.0.0.1:8125".
    pub statsd_host: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            worker_limit: 32,
            queue_size: 500,
            offline_threshold: 3,
            offline_window_seconds: 60,
            identity_cache_size: 1000,
            identity_ttl_seconds: 300,
            statsd_host: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            worker_limit: parsed_var("DEVICEHUB_WORKER_LIMIT", defaults.worker_limit)?,
            queue_size: parsed_var("DEVICEHUB_QUEUE_SIZE", defaults.queue_size)?,
            offline_threshold: parsed_var(
                "DEVICEHUB_OFFLINE_THRESHOLD",
                defaults.offline_threshold,
            )?,
            offline_window_seconds: parsed_var(
                "DEVICEHUB_OFFLINE_WINDOW_SECONDS",
                defaults.offline_window_seconds,
            )?,
            identity_cache_size: parsed_var(
                "DEVICEHUB_IDENTITY_CACHE_SIZE",
                defaults.identity_cache_size,
            )?,
            identity_ttl_seconds: parsed_var(
                "DEVICEHUB_IDENTITY_TTL_SECONDS",
                defaults.identity_ttl_seconds,
            )?,
            statsd_host: match env::var("DEVICEHUB_STATSD_HOST") {
                Ok(host) if !host.is_empty() => {
                    if host.parse::<SocketAddr>().is_err() {
                        return Err(ConfigError::InvalidStatsdHost { host });
                    }
                    Some(host)
                }
                _ => None,
            },
        })
    }
}

fn parsed_var<T: std::str::FromStr>(var_name: &str, default: T) -> Result<T> {
    match env::var(var_name) {
        Ok(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            var_name: var_name.to_string(),
            value,
        }),
        Err(_) => Ok(default),
    }
}

/// Crate version, used for `--version` output.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
