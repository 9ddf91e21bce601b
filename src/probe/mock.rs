//! Test doubles for probe collaborators

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::probe::clock::MockClock;
use crate::probe::dependency::{timed_check, DependencyCheck};
use crate::probe::encryption::EncryptionStatusSource;
use crate::probe::report::{DependencyResult, EncryptionStatus, MemoryStats};
use crate::probe::resources::ResourceSampler;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fixed timestamp used by probe tests
pub fn fixed_clock() -> Arc<MockClock> {
    Arc::new(MockClock::new(
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
    ))
}

/// Dependency returning a preconfigured result and counting calls
pub struct StaticDependency {
    result: DependencyResult,
    calls: AtomicUsize,
}

impl StaticDependency {
    pub fn new(result: DependencyResult) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn connected() -> Arc<Self> {
        Self::new(DependencyResult::connected(3))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyCheck for StaticDependency {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> DependencyResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Dependency whose round-trip takes `delay`, bounded by `timeout`
pub struct SlowDependency {
    pub delay: Duration,
    pub timeout: Duration,
}

#[async_trait]
impl DependencyCheck for SlowDependency {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> DependencyResult {
        let delay = self.delay;
        timed_check(self.name(), self.timeout, async move {
            tokio::time::sleep(delay).await;
            Ok::<(), std::io::Error>(())
        })
        .await
    }
}

/// Sampler returning a fixed percentage of a 1000 MB budget
pub struct FixedSampler(pub u64);

impl ResourceSampler for FixedSampler {
    fn sample(&self) -> MemoryStats {
        MemoryStats {
            used: self.0 * 10,
            total: 1000,
            percentage: self.0,
        }
    }
}

/// Encryption collaborator with a canned status
pub struct StaticEncryption;

impl EncryptionStatusSource for StaticEncryption {
    fn status(&self) -> EncryptionStatus {
        EncryptionStatus {
            enabled: true,
            key_set: true,
            key_valid: true,
            test_passed: true,
            algorithm: "aes-256-gcm".to_string(),
            key_length: 32,
            environment: "testing".to_string(),
        }
    }
}

/// Encryption collaborator that violates its no-panic contract
pub struct PanickingEncryption;

impl EncryptionStatusSource for PanickingEncryption {
    fn status(&self) -> EncryptionStatus {
        panic!("encryption subsystem unavailable");
    }
}
