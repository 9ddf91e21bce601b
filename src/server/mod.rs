//! HTTP server for probe, feature-flag, and metrics endpoints
//!
//! Provides orchestrator probes:
//! - `/health` - Health report (dependencies, encryption, memory)
//! - `/ready`, `/readyz` - Readiness probe (admit traffic?)
//! - `/live`, `/livez`, `/healthz` - Liveness probe (process is running)
//!
//! Also provides feature flag administration, request gating, and graceful
//! shutdown handling for SIGTERM/SIGINT.

pub mod features;
mod health;
pub mod metrics;
pub mod shutdown;
mod state;
pub mod tls;

pub use features::{gated, require_flag, FlagGate};
pub use health::{build_router, run_health_server, run_health_server_tls, serve};
pub use metrics::{create_metrics, ProbeMetrics, SharedMetrics};
pub use shutdown::{
    drain_then_stop, shutdown_channel, wait_for_signal, ShutdownController, ShutdownCoordinator,
    ShutdownSignal,
};
pub use state::{AppState, Collaborators, ProbeSettings};
pub use tls::{build_rustls_config, generate_self_signed, CertificateBundle, TlsError};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "features_test.rs"]
mod features_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "tls_test.rs"]
mod tls_tests;
