//! Shared server state injected into every handler

use crate::flags::FeatureFlagManager;
use crate::probe::{
    Clock, DependencyCheck, EncryptionStatusSource, HealthAggregator, LivenessProbe,
    ReadinessGate, ResourceSampler, DEFAULT_AGGREGATION_TIMEOUT, DEFAULT_MEMORY_THRESHOLD_PERCENT,
};
use crate::server::metrics::SharedMetrics;
use crate::server::shutdown::ShutdownCoordinator;
use std::sync::Arc;
use std::time::Duration;

/// Tunables for the probe endpoints
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub environment: String,
    pub memory_threshold_percent: u64,
    pub aggregation_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            environment: crate::flags::DEFAULT_ENVIRONMENT.to_string(),
            memory_threshold_percent: DEFAULT_MEMORY_THRESHOLD_PERCENT,
            aggregation_timeout: DEFAULT_AGGREGATION_TIMEOUT,
        }
    }
}

/// External collaborators the probes consult
pub struct Collaborators {
    pub database: Arc<dyn DependencyCheck>,
    pub encryption: Arc<dyn EncryptionStatusSource>,
    pub sampler: Arc<dyn ResourceSampler>,
    pub clock: Arc<dyn Clock>,
}

/// Combined state for probe, feature, and metrics endpoints
///
/// Built once at startup. Tests construct a fresh one per case.
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: ShutdownCoordinator,
    pub health: Arc<HealthAggregator>,
    pub readiness: Arc<ReadinessGate>,
    pub liveness: Arc<LivenessProbe>,
    pub flags: Arc<FeatureFlagManager>,
    pub metrics: SharedMetrics,
    pub clock: Arc<dyn Clock>,
    pub aggregation_timeout: Duration,
}

impl AppState {
    pub fn new(
        lifecycle: ShutdownCoordinator,
        collaborators: Collaborators,
        flags: Arc<FeatureFlagManager>,
        metrics: SharedMetrics,
        settings: &ProbeSettings,
    ) -> Self {
        let Collaborators {
            database,
            encryption,
            sampler,
            clock,
        } = collaborators;

        let health = HealthAggregator::new(
            lifecycle.clone(),
            database.clone(),
            encryption,
            sampler,
            clock.clone(),
            settings.environment.clone(),
        )
        .with_memory_threshold(settings.memory_threshold_percent);
        let readiness = ReadinessGate::new(lifecycle.clone(), database, clock.clone());
        let liveness = LivenessProbe::new(lifecycle.clone(), clock.clone());

        Self {
            lifecycle,
            health: Arc::new(health),
            readiness: Arc::new(readiness),
            liveness: Arc::new(liveness),
            flags,
            metrics,
            clock,
            aggregation_timeout: settings.aggregation_timeout,
        }
    }
}
