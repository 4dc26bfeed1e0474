//! Drives search jobs end to end against a [`SearchTransport`].
//!
//! [`JobExecutor::execute`] runs the job state machine (submit, poll until
//! terminal, fetch) inside a bounded retry, and records every outcome in the
//! shared [`HealthCell`].

use crate::health::HealthCell;
use crate::metrics::SearchMetrics;
use crate::retry::{RetryPolicy, retry_with_predicate};
use event_reader_core::environment::{Clock, SearchTransport, SystemClock};
use event_reader_core::query::RenderedQuery;
use event_reader_core::reducer::Reducer;
use event_reader_core::{
    EventReaderError, HealthStatus, Job, JobEffect, JobEvent, JobFailure, JobId, JobReducer,
    JobState, PollPolicy, ResultRow,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Configuration of a [`JobExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Attempt budget and backoff of whole executions
    pub retry: RetryPolicy,
    /// Polling cadence and budget within one attempt
    pub poll: PollPolicy,
    /// Whether a job failing only on diagnostics marks the backend unhealthy
    pub diagnostics_affect_health: bool,
}

impl ExecutorConfig {
    /// Set the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the poll policy.
    #[must_use]
    pub const fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Choose whether diagnostics-only failures affect health.
    #[must_use]
    pub const fn with_diagnostics_affect_health(mut self, affect: bool) -> Self {
        self.diagnostics_affect_health = affect;
        self
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll: PollPolicy::default(),
            diagnostics_affect_health: true,
        }
    }
}

/// Executes rendered searches as asynchronous jobs.
pub struct JobExecutor {
    transport: Arc<dyn SearchTransport>,
    config: ExecutorConfig,
    health: HealthCell,
    clock: Arc<dyn Clock>,
}

impl JobExecutor {
    /// Create an executor over the given transport, using the system clock.
    #[must_use]
    pub fn new(transport: Arc<dyn SearchTransport>, config: ExecutorConfig) -> Self {
        Self {
            transport,
            config,
            health: HealthCell::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to timestamp health observations.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The shared health cell updated by every execution.
    #[must_use]
    pub const fn health(&self) -> &HealthCell {
        &self.health
    }

    /// Clock used for health observations.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Executor configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Create a search job.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn submit(&self, query: &RenderedQuery) -> Result<JobId, EventReaderError> {
        self.transport.submit(query).await
    }

    /// Fetch the status of a job as reported, failed or not.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn status(&self, sid: &JobId) -> Result<Job, EventReaderError> {
        self.transport.status(sid).await
    }

    /// Fetch and classify the status of a job.
    ///
    /// # Errors
    ///
    /// Returns [`EventReaderError::JobFailed`] if the job failed or carries
    /// diagnostics, or the transport's error.
    pub async fn poll(&self, sid: &JobId) -> Result<Job, EventReaderError> {
        let job = self.status(sid).await?;
        match job.failure() {
            Some(reason) => Err(job.into_error(reason)),
            None => Ok(job),
        }
    }

    /// Fetch all result rows of a finished job.
    ///
    /// # Errors
    ///
    /// Returns the transport's error unchanged.
    pub async fn fetch(&self, sid: &JobId) -> Result<Vec<ResultRow>, EventReaderError> {
        self.transport.results(sid).await
    }

    /// Run a search to completion with retries and record the outcome.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, or the error of the final
    /// attempt once the attempt budget is spent.
    pub async fn execute(&self, query: &RenderedQuery) -> Result<Vec<ResultRow>, EventReaderError> {
        let started = Instant::now();

        let result = retry_with_predicate(
            &self.config.retry,
            || {
                SearchMetrics::record_attempt();
                self.run_job(query)
            },
            EventReaderError::is_retryable,
        )
        .await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        SearchMetrics::record_execution(outcome, started.elapsed());
        self.record_health(&result).await;

        result
    }

    async fn record_health(&self, result: &Result<Vec<ResultRow>, EventReaderError>) {
        let now = self.clock.now();
        let status = match result {
            Ok(_) => HealthStatus::ok(now),
            Err(err) if err.is_diagnostics_only() && !self.config.diagnostics_affect_health => {
                HealthStatus::degraded(now)
            }
            Err(err) => HealthStatus::failed(err.clone(), now),
        };
        self.health.update(status).await;
    }

    /// One attempt: drive the job state machine until it delivers or fails.
    async fn run_job(&self, query: &RenderedQuery) -> Result<Vec<ResultRow>, EventReaderError> {
        let reducer = JobReducer;
        let policy = &self.config.poll;
        let mut state = JobState::new();
        let mut effect = reducer.reduce(&mut state, JobEvent::Start, policy);

        loop {
            let event = match effect {
                JobEffect::Submit => match self.submit(query).await {
                    Ok(sid) => {
                        tracing::debug!(%sid, "Search job submitted");
                        JobEvent::Submitted { sid }
                    }
                    Err(err) => JobEvent::CallFailed(err),
                },
                JobEffect::PollStatus { sid, delay } => {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    // Classification happens in the reducer.
                    match self.status(&sid).await {
                        Ok(job) => JobEvent::StatusReceived(job),
                        Err(err) => JobEvent::CallFailed(err),
                    }
                }
                JobEffect::FetchResults { sid } => match self.fetch(&sid).await {
                    Ok(rows) => {
                        tracing::debug!(%sid, rows = rows.len(), "Search results fetched");
                        JobEvent::ResultsReceived(rows)
                    }
                    Err(err) => JobEvent::CallFailed(err),
                },
                JobEffect::Deliver(rows) => return Ok(rows),
                JobEffect::Fail(err) => {
                    tracing::warn!(error = %err, "Search job failed");
                    return Err(err);
                }
                JobEffect::None => {
                    return Err(EventReaderError::JobFailed {
                        sid: state.sid().map(ToString::to_string).unwrap_or_default(),
                        reason: JobFailure::Stalled,
                        messages: Vec::new(),
                    });
                }
            };

            effect = reducer.reduce(&mut state, event, policy);
        }
    }
}

impl std::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
