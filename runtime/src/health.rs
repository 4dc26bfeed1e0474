//! Shared health cell and its time-to-live cache.

use crate::executor::JobExecutor;
use crate::metrics::SearchMetrics;
use chrono::Duration;
use event_reader_core::HealthStatus;
use event_reader_core::query::RenderedQuery;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The single shared [`HealthStatus`], guarded by a mutex.
///
/// Clones share the same cell. The status is only reachable through
/// [`HealthCell::read`] and [`HealthCell::update`].
#[derive(Debug, Clone, Default)]
pub struct HealthCell {
    inner: Arc<Mutex<HealthStatus>>,
}

impl HealthCell {
    /// Create a cell holding an unobserved status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current status.
    pub async fn read(&self) -> HealthStatus {
        self.inner.lock().await.clone()
    }

    /// Overwrite the status.
    pub async fn update(&self, status: HealthStatus) {
        *self.inner.lock().await = status;
    }
}

/// Serves the cached health status, probing the backend once it expires.
///
/// Concurrent callers arriving after expiry may each send a probe.
#[derive(Debug, Clone)]
pub struct HealthCache {
    executor: Arc<JobExecutor>,
    probe: RenderedQuery,
    ttl: Duration,
}

impl HealthCache {
    /// Default time-to-live of a health observation, in seconds.
    pub const DEFAULT_TTL_SECS: i64 = 60;

    /// Create a cache probing with the given query.
    #[must_use]
    pub const fn new(executor: Arc<JobExecutor>, probe: RenderedQuery, ttl: Duration) -> Self {
        Self {
            executor,
            probe,
            ttl,
        }
    }

    /// Time-to-live of an observation.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current health, probing the backend if the cached status is stale.
    pub async fn is_healthy(&self) -> HealthStatus {
        let cached = self.executor.health().read().await;
        if cached.is_fresh(self.ttl, self.executor.clock().now()) {
            return cached;
        }

        tracing::debug!("Health status stale, probing search backend");
        SearchMetrics::record_health_probe();
        // The probe's rows are irrelevant; execute records the outcome in the cell.
        let _ = self.executor.execute(&self.probe).await;
        self.executor.health().read().await
    }
}
