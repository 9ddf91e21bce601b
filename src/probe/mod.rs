//! Lifecycle probes for orchestrators
//!
//! Three independent questions about this instance:
//! - liveness: is the process able to answer at all? (`LivenessProbe`)
//! - readiness: should it receive traffic? (`ReadinessGate`)
//! - health: how are its dependencies doing? (`HealthAggregator`)
//!
//! Every probe consults the `ShutdownCoordinator` before touching any
//! dependency. Collaborators (database, encryption subsystem, memory sampler,
//! clock) are trait objects injected at construction so tests can swap them.

pub mod clock;
pub mod dependency;
pub mod encryption;
pub mod guard;
pub mod health;
pub mod liveness;
pub mod readiness;
pub mod report;
pub mod resources;

#[cfg(test)]
pub(crate) mod mock;

pub use clock::{Clock, SystemClock};
pub use dependency::{
    timed_check, DatabaseCheck, DependencyCheck, ProbeError, UnconfiguredDependency,
    DEFAULT_CHECK_TIMEOUT,
};
pub use encryption::{EncryptionStatusSource, KeyEncryptionStatus};
pub use guard::{guarded, AggregationFault, DEFAULT_AGGREGATION_TIMEOUT};
pub use health::{classify, HealthAggregator, HealthOutcome, DEFAULT_MEMORY_THRESHOLD_PERCENT};
pub use liveness::LivenessProbe;
pub use readiness::ReadinessGate;
pub use report::{
    DependencyResult, DependencyStatus, EncryptionStatus, HealthReport, HealthStatus,
    LivenessReport, MemoryStats, ReadinessReport,
};
pub use resources::{ProcessMemorySampler, ResourceSampler};

#[cfg(test)]
#[path = "dependency_test.rs"]
mod dependency_tests;

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "readiness_test.rs"]
mod readiness_tests;
