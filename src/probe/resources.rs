//! Process-local resource sampling

use crate::probe::report::MemoryStats;
use parking_lot::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// Source of memory readings for the health report
///
/// Sampling is synchronous and cannot fail; platforms without usable counters
/// report zeros.
pub trait ResourceSampler: Send + Sync {
    fn sample(&self) -> MemoryStats;
}

/// Samples resident memory of the current process via `sysinfo`
///
/// The percentage is taken against `limit_bytes` when the deployment declares
/// one (typically the container memory limit), otherwise against total
/// system memory.
pub struct ProcessMemorySampler {
    system: Mutex<System>,
    pid: Option<Pid>,
    limit_bytes: Option<u64>,
}

impl ProcessMemorySampler {
    pub fn new(limit_mb: Option<u64>) -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                debug!(error = e, "Current pid unavailable, memory will report zeros");
                None
            }
        };

        Self {
            system: Mutex::new(System::new()),
            pid,
            limit_bytes: limit_mb.map(|mb| mb.saturating_mul(1024 * 1024)),
        }
    }
}

impl Default for ProcessMemorySampler {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResourceSampler for ProcessMemorySampler {
    fn sample(&self) -> MemoryStats {
        let Some(pid) = self.pid else {
            return MemoryStats::default();
        };

        let mut system = self.system.lock();
        system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let used = system.process(pid).map(|p| p.memory()).unwrap_or(0);

        let total = match self.limit_bytes {
            Some(limit) => limit,
            None => {
                system.refresh_memory();
                system.total_memory()
            }
        };

        if used == 0 || total == 0 {
            debug!(used, total, "Memory counters unavailable");
        }

        MemoryStats::from_bytes(used, total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_rounds_to_megabytes() {
        let stats = MemoryStats::from_bytes(150 * 1024 * 1024 + 600 * 1024, 1024 * 1024 * 1024);
        assert_eq!(stats.used, 151);
        assert_eq!(stats.total, 1024);
        assert_eq!(stats.percentage, 15);
    }

    #[test]
    fn test_from_bytes_zero_total_yields_zeros() {
        assert_eq!(MemoryStats::from_bytes(42, 0), MemoryStats::default());
    }

    #[test]
    fn test_from_bytes_percentage_rounds_half_up() {
        // 91.5% rounds to 92
        let stats = MemoryStats::from_bytes(915, 1000);
        assert_eq!(stats.percentage, 92);
    }

    #[test]
    fn test_process_sampler_reports_nonzero_usage() {
        let sampler = ProcessMemorySampler::default();
        let stats = sampler.sample();

        assert!(stats.total > 0, "system memory should be detectable");
        assert!(stats.percentage <= 100);
    }

    #[test]
    fn test_huge_limit_saturates_instead_of_overflowing() {
        let sampler = ProcessMemorySampler::new(Some(u64::MAX / 1024));
        assert_eq!(sampler.limit_bytes, Some(u64::MAX));
    }

    #[test]
    fn test_process_sampler_uses_configured_limit() {
        let sampler = ProcessMemorySampler::new(Some(4096));
        assert_eq!(sampler.sample().total, 4096);
    }
}
