//! JSON payloads returned by the probe endpoints
//!
//! Field names follow the wire format orchestrators and dashboards already
//! consume (`responseTime`, `keySet`, ...), hence the camelCase renames.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Overall health classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    /// HTTP status for this classification
    ///
    /// Degraded instances stay routable (200); only unhealthy ones get 503.
    pub fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Connection state of a checked dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyStatus {
    Connected,
    Disconnected,
    Error,
}

/// Outcome of a single dependency round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyResult {
    pub status: DependencyStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DependencyResult {
    pub fn connected(response_time_ms: u64) -> Self {
        Self {
            status: DependencyStatus::Connected,
            response_time: Some(response_time_ms),
            error: None,
        }
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self {
            status: DependencyStatus::Disconnected,
            response_time: None,
            error: Some(reason.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: DependencyStatus::Error,
            response_time: None,
            error: Some(message.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == DependencyStatus::Connected
    }
}

/// Process memory usage in megabytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryStats {
    pub used: u64,
    pub total: u64,
    pub percentage: u64,
}

impl MemoryStats {
    /// Convert raw byte counters into rounded megabytes and a percentage
    ///
    /// A zero total yields zeros rather than a division error.
    pub fn from_bytes(used_bytes: u64, total_bytes: u64) -> Self {
        if total_bytes == 0 {
            return Self::default();
        }

        const MB: f64 = 1024.0 * 1024.0;
        let percentage = (used_bytes as f64 * 100.0 / total_bytes as f64).round() as u64;

        Self {
            used: (used_bytes as f64 / MB).round() as u64,
            total: (total_bytes as f64 / MB).round() as u64,
            percentage,
        }
    }
}

/// Self-reported state of the encryption subsystem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionStatus {
    pub enabled: bool,
    pub key_set: bool,
    pub key_valid: bool,
    pub test_passed: bool,
    pub algorithm: String,
    pub key_length: usize,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChecks {
    pub database: DependencyResult,
    pub encryption: EncryptionStatus,
    pub memory: MemoryStats,
}

/// Full health report, recomputed on every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: String,
    /// Seconds since process start
    pub uptime: u64,
    pub checks: HealthChecks,
    pub environment: String,
}

/// Short body returned instead of a report when a probe cannot run its checks
///
/// Used both for the shutdown short-circuit (`message`) and for faults while
/// assembling a report (`error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnhealthyNotice {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessChecks {
    pub database: bool,
    pub server: bool,
}

/// Readiness answer for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessReport {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ReadinessChecks>,
}

impl ReadinessReport {
    pub fn status_code(&self) -> StatusCode {
        if self.ready {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivenessReport {
    pub alive: bool,
    pub timestamp: String,
    pub uptime: u64,
}
