//! Prometheus metrics for probe and feature-gate activity
//!
//! Exposed on `/metrics` in text format. The registry is owned by the
//! server state, not the global default registry, so tests get a fresh one.

use crate::probe::DependencyResult;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Buckets sized around the 250ms dependency timeout
const DEPENDENCY_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0];

pub struct ProbeMetrics {
    registry: Registry,
    probe_checks: IntCounterVec,
    dependency_duration: HistogramVec,
    gate_rejections: IntCounterVec,
    flag_updates: IntCounter,
    shutting_down: IntGauge,
}

/// Metrics shared between handlers
pub type SharedMetrics = Arc<ProbeMetrics>;

impl ProbeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let probe_checks = IntCounterVec::new(
            Opts::new(
                "vigil_probe_checks_total",
                "Probe requests by probe and outcome",
            ),
            &["probe", "outcome"],
        )?;
        let dependency_duration = HistogramVec::new(
            HistogramOpts::new(
                "vigil_dependency_check_duration_seconds",
                "Round-trip time of successful dependency checks",
            )
            .buckets(DEPENDENCY_BUCKETS.to_vec()),
            &["dependency"],
        )?;
        let gate_rejections = IntCounterVec::new(
            Opts::new(
                "vigil_feature_gate_rejections_total",
                "Requests rejected because a required feature flag was disabled",
            ),
            &["flag"],
        )?;
        let flag_updates = IntCounter::new(
            "vigil_feature_flag_updates_total",
            "Runtime feature flag overrides applied",
        )?;
        let shutting_down = IntGauge::new(
            "vigil_shutting_down",
            "1 while the process is draining for shutdown",
        )?;

        registry.register(Box::new(probe_checks.clone()))?;
        registry.register(Box::new(dependency_duration.clone()))?;
        registry.register(Box::new(gate_rejections.clone()))?;
        registry.register(Box::new(flag_updates.clone()))?;
        registry.register(Box::new(shutting_down.clone()))?;

        Ok(Self {
            registry,
            probe_checks,
            dependency_duration,
            gate_rejections,
            flag_updates,
            shutting_down,
        })
    }

    /// Count a probe answer (`outcome` is e.g. "healthy", "ready", "fault")
    pub fn record_probe(&self, probe: &str, outcome: &str) {
        self.probe_checks.with_label_values(&[probe, outcome]).inc();
    }

    /// Observe the round-trip time of a successful dependency check
    pub fn observe_dependency(&self, dependency: &str, result: &DependencyResult) {
        if let Some(ms) = result.response_time {
            self.dependency_duration
                .with_label_values(&[dependency])
                .observe(ms as f64 / 1000.0);
        }
    }

    pub fn record_gate_rejection(&self, flag: &str) {
        self.gate_rejections.with_label_values(&[flag]).inc();
    }

    pub fn record_flag_update(&self) {
        self.flag_updates.inc();
    }

    pub fn set_shutting_down(&self, shutting_down: bool) {
        self.shutting_down.set(i64::from(shutting_down));
    }

    /// Render all metrics in Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the metrics registry for the server
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ProbeMetrics::new()?))
}
