//! Lifecycle state and graceful shutdown handling
//!
//! Handles SIGTERM and SIGINT signals for clean shutdown:
//! - Flips the process-wide shutting-down flag so probes start failing
//! - Keeps serving through the drain period so the orchestrator sees 503s
//! - Stops the HTTP server and waits for in-flight requests

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug)]
struct LifecycleState {
    shutting_down: AtomicBool,
    started: Instant,
}

/// Process-wide lifecycle flag consulted by every probe
///
/// Created once at startup and shared by cloning; all clones observe the same
/// flag. Writes are atomic, so setting the flag from the signal-handling task
/// is safe while probes read it concurrently.
#[derive(Debug, Clone)]
pub struct ShutdownCoordinator {
    state: Arc<LifecycleState>,
}

impl ShutdownCoordinator {
    /// Create lifecycle state for a freshly started process
    pub fn new() -> Self {
        Self {
            state: Arc::new(LifecycleState {
                shutting_down: AtomicBool::new(false),
                started: Instant::now(),
            }),
        }
    }

    /// Overwrite the shutting-down flag
    pub fn set_shutting_down(&self, shutting_down: bool) {
        let previous = self
            .state
            .shutting_down
            .swap(shutting_down, Ordering::SeqCst);
        if previous != shutting_down {
            info!(shutting_down, "Lifecycle state changed");
        }
    }

    /// Check whether shutdown has begun
    pub fn is_shutting_down(&self) -> bool {
        self.state.shutting_down.load(Ordering::SeqCst)
    }

    /// Whole seconds since the process started (monotonic)
    pub fn uptime_seconds(&self) -> u64 {
        self.state.started.elapsed().as_secs()
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Shutdown signal sender/receiver pair
///
/// The sender is used to trigger shutdown, the receiver is used to wait for it.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        // Wait until the value becomes true
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }

    /// Check if shutdown was signaled (non-blocking)
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Controller for stopping the HTTP server
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Enter the drain period, then stop the server
///
/// Readiness and health report 503 for the whole `drain` window while the
/// server keeps answering, giving the orchestrator time to pull the instance
/// out of rotation before connections stop being accepted.
pub async fn drain_then_stop(
    coordinator: &ShutdownCoordinator,
    controller: &ShutdownController,
    drain: Duration,
) {
    coordinator.set_shutting_down(true);
    info!(drain_secs = drain.as_secs(), "Draining before server stop");

    tokio::time::sleep(drain).await;
    controller.shutdown();
}

/// Wait for SIGTERM or SIGINT signal
///
/// This function blocks until a termination signal is received.
/// Returns the signal name that was received.
///
/// # Panics
/// Panics if signal handlers cannot be registered (OS resource exhaustion).
#[cfg(unix)]
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::error;

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register SIGTERM handler");
            panic!("Cannot register SIGTERM handler: {}", e);
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register SIGINT handler");
            panic!("Cannot register SIGINT handler: {}", e);
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM");
            "SIGTERM"
        }
        _ = sigint.recv() => {
            info!("Received SIGINT");
            "SIGINT"
        }
    }
}

/// Wait for Ctrl+C signal (Windows)
///
/// # Panics
/// Panics if Ctrl+C handler cannot be registered.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> &'static str {
    use tracing::error;

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to wait for Ctrl+C");
        panic!("Cannot wait for Ctrl+C: {}", e);
    }
    info!("Received Ctrl+C");
    "CTRL_C"
}
