//! The event reader facade: query in, shaped result out.

use crate::executor::{ExecutorConfig, JobExecutor};
use crate::health::HealthCache;
use chrono::Duration;
use event_reader_core::aggregate::{aggregate_transactions, latest_event};
use event_reader_core::environment::{Clock, SearchTransport};
use event_reader_core::{
    EventReaderError, HealthStatus, MonitoringQuery, PublishEvent, QueryBuilder, TransactionEvent,
};
use std::sync::Arc;

/// Answers publish queries against the search backend.
///
/// Cheap to clone; clones share the executor and the health cell.
#[derive(Debug, Clone)]
pub struct EventReader {
    queries: QueryBuilder,
    executor: Arc<JobExecutor>,
    health: HealthCache,
}

impl EventReader {
    /// Create a reader for the given environment.
    #[must_use]
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        queries: QueryBuilder,
        config: ExecutorConfig,
    ) -> Self {
        Self::from_executor(queries, JobExecutor::new(transport, config))
    }

    /// Create a reader around a configured executor.
    #[must_use]
    pub fn from_executor(queries: QueryBuilder, executor: JobExecutor) -> Self {
        let executor = Arc::new(executor);
        let health = HealthCache::new(
            Arc::clone(&executor),
            queries.health_probe(),
            Duration::seconds(HealthCache::DEFAULT_TTL_SECS),
        );
        Self {
            queries,
            executor,
            health,
        }
    }

    /// Create a reader with an explicit clock, for tests.
    #[must_use]
    pub fn with_clock(
        transport: Arc<dyn SearchTransport>,
        queries: QueryBuilder,
        config: ExecutorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::from_executor(queries, JobExecutor::new(transport, config).with_clock(clock))
    }

    /// Replace the health cache time-to-live.
    #[must_use]
    pub fn with_health_ttl(mut self, ttl: Duration) -> Self {
        self.health = HealthCache::new(
            Arc::clone(&self.executor),
            self.queries.health_probe(),
            ttl,
        );
        self
    }

    /// The underlying executor.
    #[must_use]
    pub fn executor(&self) -> &JobExecutor {
        &self.executor
    }

    /// Environment queries are rendered for.
    #[must_use]
    pub fn environment(&self) -> &str {
        self.queries.environment()
    }

    /// Open transactions touching the query's content type.
    ///
    /// # Errors
    ///
    /// Returns the executor's error, or [`EventReaderError::Decode`] if a row
    /// is not a publish event.
    #[tracing::instrument(skip(self), fields(content_type = query.content_type()))]
    pub async fn get_transactions(
        &self,
        query: &MonitoringQuery,
    ) -> Result<Vec<TransactionEvent>, EventReaderError> {
        let rendered = self.queries.transactions(query);
        let rows = self.executor.execute(&rendered).await?;
        let transactions = aggregate_transactions(&rows, query.content_type())?;
        tracing::info!(count = transactions.len(), "Open transactions found");
        Ok(transactions)
    }

    /// Most recent completed publish for the query's content type.
    ///
    /// # Errors
    ///
    /// Returns [`EventReaderError::NoResults`] when the search matched
    /// nothing, or the executor's error.
    #[tracing::instrument(skip(self), fields(content_type = query.content_type()))]
    pub async fn get_last_event(
        &self,
        query: &MonitoringQuery,
    ) -> Result<PublishEvent, EventReaderError> {
        let rendered = self.queries.last_event(query);
        let rows = self.executor.execute(&rendered).await?;
        latest_event(&rows)
    }

    /// Health of the search backend, probing it when the cache is stale.
    #[tracing::instrument(skip(self))]
    pub async fn is_healthy(&self) -> HealthStatus {
        self.health.is_healthy().await
    }
}
