//! Health aggregation
//!
//! Combines the database check, the encryption collaborator, and memory
//! sampling into one classification:
//!
//! ```text
//! shutting down                    → unhealthy (503, no checks run)
//! database error                   → unhealthy (503)
//! database disconnected            → degraded  (200)
//! memory above threshold           → degraded  (200)
//! otherwise                        → healthy   (200)
//! ```

use crate::probe::clock::Clock;
use crate::probe::dependency::DependencyCheck;
use crate::probe::encryption::EncryptionStatusSource;
use crate::probe::guard::AggregationFault;
use crate::probe::report::{
    DependencyResult, DependencyStatus, HealthChecks, HealthReport, HealthStatus, MemoryStats,
    UnhealthyNotice,
};
use crate::probe::resources::ResourceSampler;
use crate::server::ShutdownCoordinator;
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::debug;

/// Memory percentage above which an instance is flagged as degraded
pub const DEFAULT_MEMORY_THRESHOLD_PERCENT: u64 = 90;

pub const SHUTTING_DOWN_MESSAGE: &str = "Server is shutting down";

/// Result of a health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    /// Checks ran and produced a full report
    Report(HealthReport),
    /// Checks were skipped (shutdown) or could not complete (fault)
    Unavailable(UnhealthyNotice),
}

impl HealthOutcome {
    pub fn status(&self) -> HealthStatus {
        match self {
            HealthOutcome::Report(report) => report.status,
            HealthOutcome::Unavailable(notice) => notice.status,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.status().status_code()
    }
}

/// Classify a set of check results
///
/// First match wins: a database error is fatal, a disconnected database or
/// memory pressure only degrades.
pub fn classify(database: &DependencyResult, memory: &MemoryStats, threshold: u64) -> HealthStatus {
    match database.status {
        DependencyStatus::Error => HealthStatus::Unhealthy,
        DependencyStatus::Disconnected => HealthStatus::Degraded,
        DependencyStatus::Connected if memory.percentage > threshold => HealthStatus::Degraded,
        DependencyStatus::Connected => HealthStatus::Healthy,
    }
}

/// Builds `HealthReport`s on demand
pub struct HealthAggregator {
    lifecycle: ShutdownCoordinator,
    database: Arc<dyn DependencyCheck>,
    encryption: Arc<dyn EncryptionStatusSource>,
    sampler: Arc<dyn ResourceSampler>,
    clock: Arc<dyn Clock>,
    environment: String,
    memory_threshold: u64,
}

impl HealthAggregator {
    pub fn new(
        lifecycle: ShutdownCoordinator,
        database: Arc<dyn DependencyCheck>,
        encryption: Arc<dyn EncryptionStatusSource>,
        sampler: Arc<dyn ResourceSampler>,
        clock: Arc<dyn Clock>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            lifecycle,
            database,
            encryption,
            sampler,
            clock,
            environment: environment.into(),
            memory_threshold: DEFAULT_MEMORY_THRESHOLD_PERCENT,
        }
    }

    /// Override the degraded-memory threshold (percent)
    pub fn with_memory_threshold(mut self, threshold: u64) -> Self {
        self.memory_threshold = threshold;
        self
    }

    /// Run all checks and classify the instance
    pub async fn check(&self) -> HealthOutcome {
        if self.lifecycle.is_shutting_down() {
            return HealthOutcome::Unavailable(UnhealthyNotice {
                status: HealthStatus::Unhealthy,
                message: Some(SHUTTING_DOWN_MESSAGE.to_string()),
                error: None,
                timestamp: self.clock.timestamp(),
            });
        }

        let database = self.database.check().await;
        let encryption = self.encryption.status();
        let memory = self.sampler.sample();

        let status = classify(&database, &memory, self.memory_threshold);
        debug!(
            status = status.as_str(),
            database = ?database.status,
            memory_percentage = memory.percentage,
            "Health check completed"
        );

        HealthOutcome::Report(HealthReport {
            status,
            timestamp: self.clock.timestamp(),
            uptime: self.lifecycle.uptime_seconds(),
            checks: HealthChecks {
                database,
                encryption,
                memory,
            },
            environment: self.environment.clone(),
        })
    }

    /// Well-formed unhealthy answer for a check that could not complete
    pub fn fault_outcome(&self, fault: &AggregationFault) -> HealthOutcome {
        HealthOutcome::Unavailable(UnhealthyNotice {
            status: HealthStatus::Unhealthy,
            message: None,
            error: Some(fault.to_string()),
            timestamp: self.clock.timestamp(),
        })
    }
}
