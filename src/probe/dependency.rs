//! Dependency checks against external systems
//!
//! Every check resolves to a `DependencyResult`; failures are captured as data,
//! never propagated. Each round-trip is bounded by an explicit timeout so a hung
//! dependency cannot stall the aggregator.

use crate::probe::report::DependencyResult;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default bound for a single dependency round-trip
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_millis(250);

/// Ways a dependency check can fail
///
/// Only the rendered message reaches the report.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{dependency} check timed out after {timeout_ms}ms")]
    Timeout { dependency: String, timeout_ms: u64 },

    #[error("{0}")]
    Query(String),

    #[error("{0} connection pool is closed")]
    Closed(String),

    #[error("{0}")]
    NotConfigured(String),
}

/// A probe against one external dependency
///
/// Implementations must not panic and must bound their own latency.
#[async_trait]
pub trait DependencyCheck: Send + Sync {
    /// Name used in logs and metrics labels
    fn name(&self) -> &str;

    /// Run the cheapest possible round-trip against the dependency
    async fn check(&self) -> DependencyResult;
}

/// Time a probe future and bound it with `timeout`
///
/// Elapsed time is measured from just before the call to just after it.
/// Errors and timeouts both surface as `DependencyStatus::Error`.
pub async fn timed_check<F, E>(dependency: &str, timeout: Duration, probe: F) -> DependencyResult
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    let start = Instant::now();

    match tokio::time::timeout(timeout, probe).await {
        Ok(Ok(())) => {
            let elapsed_ms = start.elapsed().as_millis() as u64;
            debug!(dependency, response_time_ms = elapsed_ms, "Dependency check succeeded");
            DependencyResult::connected(elapsed_ms)
        }
        Ok(Err(e)) => {
            let error = ProbeError::Query(e.to_string());
            warn!(dependency, error = %error, "Dependency check failed");
            DependencyResult::error(error.to_string())
        }
        Err(_) => {
            let error = ProbeError::Timeout {
                dependency: dependency.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            };
            warn!(dependency, error = %error, "Dependency check timed out");
            DependencyResult::error(error.to_string())
        }
    }
}

/// PostgreSQL liveness check running `SELECT 1` over a shared pool
pub struct DatabaseCheck {
    pool: PgPool,
    timeout: Duration,
}

impl DatabaseCheck {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Build a check over a lazily connected pool
    ///
    /// No connection is attempted until the first check, so the service can
    /// start (and report itself unhealthy) while the database is down.
    pub fn connect_lazy(
        database_url: &str,
        max_connections: u32,
        timeout: Duration,
    ) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(timeout)
            .connect_lazy(database_url)?;

        Ok(Self::new(pool, timeout))
    }
}

#[async_trait]
impl DependencyCheck for DatabaseCheck {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> DependencyResult {
        // A closed pool is detectable without attempting the call
        if self.pool.is_closed() {
            return DependencyResult::disconnected(
                ProbeError::Closed(self.name().to_string()).to_string(),
            );
        }

        timed_check(self.name(), self.timeout, async {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map(|_| ())
        })
        .await
    }
}

/// Stand-in for a dependency the deployment did not configure
///
/// Always reports `Disconnected`, so health is degraded and the instance is
/// never admitted to traffic without its database.
pub struct UnconfiguredDependency {
    name: String,
    reason: String,
}

impl UnconfiguredDependency {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl DependencyCheck for UnconfiguredDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self) -> DependencyResult {
        DependencyResult::disconnected(ProbeError::NotConfigured(self.reason.clone()).to_string())
    }
}
