//! Liveness probe
//!
//! There is no failing branch: if the handler runs, the process is alive.
//! Liveness failure is the orchestrator's request timing out.

use crate::probe::clock::Clock;
use crate::probe::report::LivenessReport;
use crate::server::ShutdownCoordinator;
use std::sync::Arc;

pub struct LivenessProbe {
    lifecycle: ShutdownCoordinator,
    clock: Arc<dyn Clock>,
}

impl LivenessProbe {
    pub fn new(lifecycle: ShutdownCoordinator, clock: Arc<dyn Clock>) -> Self {
        Self { lifecycle, clock }
    }

    pub fn check(&self) -> LivenessReport {
        LivenessReport {
            alive: true,
            timestamp: self.clock.timestamp(),
            uptime: self.lifecycle.uptime_seconds(),
        }
    }
}
