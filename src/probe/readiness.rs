//! Readiness gate: should the orchestrator send traffic here?
//!
//! Deliberately narrower than health aggregation. Memory pressure never makes
//! an instance unready; only the shutdown flag and database connectivity do.

use crate::probe::clock::Clock;
use crate::probe::dependency::DependencyCheck;
use crate::probe::guard::AggregationFault;
use crate::probe::health::SHUTTING_DOWN_MESSAGE;
use crate::probe::report::{ReadinessChecks, ReadinessReport};
use crate::server::ShutdownCoordinator;
use std::sync::Arc;

pub struct ReadinessGate {
    lifecycle: ShutdownCoordinator,
    database: Arc<dyn DependencyCheck>,
    clock: Arc<dyn Clock>,
}

impl ReadinessGate {
    pub fn new(
        lifecycle: ShutdownCoordinator,
        database: Arc<dyn DependencyCheck>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            lifecycle,
            database,
            clock,
        }
    }

    /// Decide whether to admit traffic
    ///
    /// Short-circuits without touching the database once shutdown has begun.
    pub async fn check(&self) -> ReadinessReport {
        if self.lifecycle.is_shutting_down() {
            return ReadinessReport {
                ready: false,
                reason: Some(SHUTTING_DOWN_MESSAGE.to_string()),
                error: None,
                timestamp: self.clock.timestamp(),
                checks: None,
            };
        }

        let database = self.database.check().await.is_connected();
        // Shutdown may have started while the database check was in flight
        let server = !self.lifecycle.is_shutting_down();

        ReadinessReport {
            ready: database && server,
            reason: None,
            error: None,
            timestamp: self.clock.timestamp(),
            checks: Some(ReadinessChecks { database, server }),
        }
    }

    pub fn fault_report(&self, fault: &AggregationFault) -> ReadinessReport {
        ReadinessReport {
            ready: false,
            reason: None,
            error: Some(fault.to_string()),
            timestamp: self.clock.timestamp(),
            checks: None,
        }
    }
}
