//! Process configuration read from environment variables
//!
//! Every setting has a default; a value that is present but malformed is an
//! error so a typo in a deployment manifest fails the process at startup.

use crate::flags::DEFAULT_ENVIRONMENT;
use crate::probe::{
    DEFAULT_AGGREGATION_TIMEOUT, DEFAULT_CHECK_TIMEOUT, DEFAULT_MEMORY_THRESHOLD_PERCENT,
};
use crate::server::ProbeSettings;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5000;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default pool size for the database probe
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 2;

/// Default time probes report 503 before the listener stops accepting
pub const DEFAULT_DRAIN: Duration = Duration::from_secs(5);

/// Default deadline for in-flight requests after the listener stops
pub const DEFAULT_FORCE_SHUTDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("VIGIL_TLS_CERT_PATH and VIGIL_TLS_KEY_PATH must be set together")]
    IncompleteTls,
}

/// Where the TLS certificate comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsSource {
    Files { cert: PathBuf, key: PathBuf },
    SelfSigned,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub bind: SocketAddr,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_check_timeout: Duration,
    pub aggregation_timeout: Duration,
    pub memory_threshold_percent: u64,
    pub memory_limit_mb: Option<u64>,
    pub drain: Duration,
    pub force_shutdown: Duration,
    pub tls: Option<TlsSource>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            bind: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            db_check_timeout: DEFAULT_CHECK_TIMEOUT,
            aggregation_timeout: DEFAULT_AGGREGATION_TIMEOUT,
            memory_threshold_percent: DEFAULT_MEMORY_THRESHOLD_PERCENT,
            memory_limit_mb: None,
            drain: DEFAULT_DRAIN,
            force_shutdown: DEFAULT_FORCE_SHUTDOWN,
            tls: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(env) = get("VIGIL_ENV").or_else(|| get("APP_ENV")) {
            config.environment = env;
        }

        let port = parse_or(get("VIGIL_PORT"), "VIGIL_PORT", DEFAULT_PORT)?;
        let ip = parse_or(get("VIGIL_BIND"), "VIGIL_BIND", config.bind.ip())?;
        config.bind = SocketAddr::new(ip, port);

        config.database_url = get("DATABASE_URL");
        config.db_max_connections = parse_or(
            get("VIGIL_DB_MAX_CONNECTIONS"),
            "VIGIL_DB_MAX_CONNECTIONS",
            DEFAULT_DB_MAX_CONNECTIONS,
        )?;

        if let Some(ms) = parse_opt::<u64>(get("VIGIL_DB_CHECK_TIMEOUT_MS"), "VIGIL_DB_CHECK_TIMEOUT_MS")? {
            config.db_check_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_opt::<u64>(
            get("VIGIL_AGGREGATION_TIMEOUT_MS"),
            "VIGIL_AGGREGATION_TIMEOUT_MS",
        )? {
            config.aggregation_timeout = Duration::from_millis(ms);
        }

        config.memory_threshold_percent = parse_or(
            get("VIGIL_MEMORY_THRESHOLD_PERCENT"),
            "VIGIL_MEMORY_THRESHOLD_PERCENT",
            DEFAULT_MEMORY_THRESHOLD_PERCENT,
        )?;
        config.memory_limit_mb = parse_opt(get("VIGIL_MEMORY_LIMIT_MB"), "VIGIL_MEMORY_LIMIT_MB")?;
        if let Some(mb) = config.memory_limit_mb {
            if mb.checked_mul(BYTES_PER_MB).is_none() {
                return Err(ConfigError::Invalid {
                    var: "VIGIL_MEMORY_LIMIT_MB",
                    value: mb.to_string(),
                    reason: "limit does not fit in bytes".to_string(),
                });
            }
        }

        if let Some(secs) = parse_opt::<u64>(get("VIGIL_DRAIN_SECONDS"), "VIGIL_DRAIN_SECONDS")? {
            config.drain = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_opt::<u64>(
            get("VIGIL_FORCE_SHUTDOWN_SECONDS"),
            "VIGIL_FORCE_SHUTDOWN_SECONDS",
        )? {
            config.force_shutdown = Duration::from_secs(secs);
        }

        config.tls = match (get("VIGIL_TLS_CERT_PATH"), get("VIGIL_TLS_KEY_PATH")) {
            (Some(cert), Some(key)) => Some(TlsSource::Files {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => get("VIGIL_TLS_SELF_SIGNED")
                .is_some_and(|v| v == "true" || v == "1")
                .then_some(TlsSource::SelfSigned),
            _ => return Err(ConfigError::IncompleteTls),
        };

        Ok(config)
    }

    /// Settings consumed by the probe endpoints
    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            environment: self.environment.clone(),
            memory_threshold_percent: self.memory_threshold_percent,
            aggregation_timeout: self.aggregation_timeout,
        }
    }
}

fn parse_opt<T>(raw: Option<String>, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        })
    })
    .transpose()
}

fn parse_or<T>(raw: Option<String>, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(raw, var)?.unwrap_or(default))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
