//! Fault boundary for report assembly
//!
//! Probe assembly runs on its own task with a latency budget. A panic inside a
//! collaborator or a budget overrun becomes an `AggregationFault`, which the
//! endpoints turn into a failing (503) but well-formed response.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

/// Default bound on assembling a full report
pub const DEFAULT_AGGREGATION_TIMEOUT: Duration = Duration::from_millis(1000);

/// Unexpected failure while assembling a probe report
#[derive(Debug, Error)]
pub enum AggregationFault {
    #[error("{0} check failed")]
    Panicked(&'static str),

    #[error("{probe} check exceeded {budget_ms}ms")]
    TimedOut { probe: &'static str, budget_ms: u64 },
}

/// Run `assemble` on a separate task, bounded by `budget`
///
/// The task is aborted when the budget runs out, so a hung check does not
/// outlive its request.
pub async fn guarded<T, F>(probe: &'static str, budget: Duration, assemble: F) -> Result<T, AggregationFault>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut handle = tokio::spawn(assemble);

    match tokio::time::timeout(budget, &mut handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(probe, error = %e, "Probe assembly aborted");
            Err(AggregationFault::Panicked(probe))
        }
        Err(_) => {
            handle.abort();
            let fault = AggregationFault::TimedOut {
                probe,
                budget_ms: budget.as_millis() as u64,
            };
            error!(probe, error = %fault, "Probe assembly timed out");
            Err(fault)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_guarded_returns_value() {
        let result = guarded("health", Duration::from_secs(1), async { 7 }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_guarded_converts_panic_into_fault() {
        let result: Result<(), _> = guarded("health", Duration::from_secs(1), async {
            panic!("collaborator exploded");
        })
        .await;

        let fault = result.unwrap_err();
        assert!(matches!(fault, AggregationFault::Panicked("health")));
        assert_eq!(fault.to_string(), "health check failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_times_out_hung_assembly() {
        let result: Result<(), _> = guarded("readiness", Duration::from_millis(500), async {
            std::future::pending::<()>().await;
        })
        .await;

        let fault = result.unwrap_err();
        assert_eq!(fault.to_string(), "readiness check exceeded 500ms");
    }
}
