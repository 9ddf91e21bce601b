//! Tests for health aggregation

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::guard::{guarded, AggregationFault};
use super::health::*;
use super::mock::*;
use super::report::*;
use crate::server::ShutdownCoordinator;
use axum::http::StatusCode;
use std::sync::Arc;
use std::time::Duration;

fn aggregator(
    lifecycle: ShutdownCoordinator,
    database: Arc<StaticDependency>,
    memory_percentage: u64,
) -> HealthAggregator {
    HealthAggregator::new(
        lifecycle,
        database,
        Arc::new(StaticEncryption),
        Arc::new(FixedSampler(memory_percentage)),
        fixed_clock(),
        "testing",
    )
}

fn expect_report(outcome: HealthOutcome) -> HealthReport {
    match outcome {
        HealthOutcome::Report(report) => report,
        HealthOutcome::Unavailable(notice) => panic!("expected report, got {:?}", notice),
    }
}

#[tokio::test]
async fn test_healthy_when_database_connected_and_memory_normal() {
    let outcome = aggregator(ShutdownCoordinator::new(), StaticDependency::connected(), 40)
        .check()
        .await;

    assert_eq!(outcome.status_code(), StatusCode::OK);
    let report = expect_report(outcome);
    assert_eq!(report.status, HealthStatus::Healthy);
    assert_eq!(report.environment, "testing");
    assert_eq!(report.timestamp, "2026-01-02T03:04:05.000Z");
    assert_eq!(report.checks.memory.percentage, 40);
    assert!(report.checks.encryption.enabled);
}

/// Memory above 90% with a connected database degrades but stays routable
#[tokio::test]
async fn test_memory_pressure_degrades_with_200() {
    let outcome = aggregator(ShutdownCoordinator::new(), StaticDependency::connected(), 95)
        .check()
        .await;

    assert_eq!(outcome.status(), HealthStatus::Degraded);
    assert_eq!(outcome.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn test_memory_at_threshold_is_still_healthy() {
    let outcome = aggregator(ShutdownCoordinator::new(), StaticDependency::connected(), 90)
        .check()
        .await;

    assert_eq!(outcome.status(), HealthStatus::Healthy);
}

/// A database error is fatal regardless of memory
#[tokio::test]
async fn test_database_error_is_unhealthy_regardless_of_memory() {
    for memory in [10, 95] {
        let database = StaticDependency::new(DependencyResult::error("connection refused"));
        let outcome = aggregator(ShutdownCoordinator::new(), database, memory)
            .check()
            .await;

        assert_eq!(outcome.status(), HealthStatus::Unhealthy);
        assert_eq!(outcome.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        let report = expect_report(outcome);
        assert_eq!(
            report.checks.database.error.as_deref(),
            Some("connection refused")
        );
    }
}

#[tokio::test]
async fn test_disconnected_database_degrades() {
    let database = StaticDependency::new(DependencyResult::disconnected("pool closed"));
    let outcome = aggregator(ShutdownCoordinator::new(), database, 10)
        .check()
        .await;

    assert_eq!(outcome.status(), HealthStatus::Degraded);
    assert_eq!(outcome.status_code(), StatusCode::OK);
}

/// Shutdown short-circuits before any dependency is touched
#[tokio::test]
async fn test_shutting_down_skips_checks_and_returns_503() {
    let lifecycle = ShutdownCoordinator::new();
    lifecycle.set_shutting_down(true);
    let database = StaticDependency::connected();

    let outcome = aggregator(lifecycle, database.clone(), 10).check().await;

    assert_eq!(outcome.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(database.calls(), 0, "database must not be checked");
    match outcome {
        HealthOutcome::Unavailable(notice) => {
            assert_eq!(notice.message.as_deref(), Some("Server is shutting down"));
        }
        other => panic!("expected shutdown notice, got {:?}", other),
    }
}

#[tokio::test]
async fn test_custom_memory_threshold() {
    let outcome = aggregator(ShutdownCoordinator::new(), StaticDependency::connected(), 80)
        .with_memory_threshold(75)
        .check()
        .await;

    assert_eq!(outcome.status(), HealthStatus::Degraded);
}

#[tokio::test(start_paused = true)]
async fn test_report_carries_uptime() {
    let lifecycle = ShutdownCoordinator::new();
    tokio::time::advance(Duration::from_secs(42)).await;

    let report = expect_report(
        aggregator(lifecycle, StaticDependency::connected(), 10)
            .check()
            .await,
    );

    assert_eq!(report.uptime, 42);
}

/// A collaborator panic becomes a well-formed unhealthy answer
#[tokio::test]
async fn test_panicking_collaborator_becomes_unhealthy_fault() {
    let health = Arc::new(HealthAggregator::new(
        ShutdownCoordinator::new(),
        StaticDependency::connected(),
        Arc::new(PanickingEncryption),
        Arc::new(FixedSampler(10)),
        fixed_clock(),
        "testing",
    ));

    let task_health = health.clone();
    let fault = guarded("health", Duration::from_secs(1), async move {
        task_health.check().await
    })
    .await
    .unwrap_err();
    assert!(matches!(fault, AggregationFault::Panicked(_)));

    let outcome = health.fault_outcome(&fault);
    assert_eq!(outcome.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    let json = match outcome {
        HealthOutcome::Unavailable(notice) => serde_json::to_value(notice).unwrap(),
        other => panic!("expected fault notice, got {:?}", other),
    };
    assert_eq!(json["status"], "unhealthy");
    assert_eq!(json["error"], "health check failed");
}

#[test]
fn test_classify_priority_order() {
    let memory_high = MemoryStats {
        used: 950,
        total: 1000,
        percentage: 95,
    };
    let memory_low = MemoryStats::default();

    assert_eq!(
        classify(&DependencyResult::connected(1), &memory_low, 90),
        HealthStatus::Healthy
    );
    assert_eq!(
        classify(&DependencyResult::connected(1), &memory_high, 90),
        HealthStatus::Degraded
    );
    assert_eq!(
        classify(&DependencyResult::disconnected("x"), &memory_high, 90),
        HealthStatus::Degraded
    );
    assert_eq!(
        classify(&DependencyResult::error("x"), &memory_high, 90),
        HealthStatus::Unhealthy
    );
}

#[tokio::test]
async fn test_report_json_shape() {
    let report = expect_report(
        aggregator(ShutdownCoordinator::new(), StaticDependency::connected(), 40)
            .check()
            .await,
    );
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"]["status"], "connected");
    assert_eq!(json["checks"]["database"]["responseTime"], 3);
    assert_eq!(json["checks"]["encryption"]["keySet"], true);
    assert_eq!(json["checks"]["encryption"]["keyLength"], 32);
    assert_eq!(json["checks"]["memory"]["total"], 1000);
    assert!(json["uptime"].is_u64());
}
