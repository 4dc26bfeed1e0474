//! In-memory [`SearchTransport`] with scripted responses.

use async_trait::async_trait;
use event_reader_core::environment::SearchTransport;
use event_reader_core::query::RenderedQuery;
use event_reader_core::{DispatchState, EventReaderError, Job, JobId, ResultRow};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by a [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    /// `submit` with the rendered query
    Submit(RenderedQuery),
    /// `status` for a job
    Status(JobId),
    /// `results` for a job
    Results(JobId),
}

#[derive(Debug, Default)]
struct Script {
    submits: VecDeque<Result<JobId, EventReaderError>>,
    statuses: VecDeque<Result<Job, EventReaderError>>,
    results: VecDeque<Result<Vec<ResultRow>, EventReaderError>>,
    failure: Option<EventReaderError>,
    rows: Vec<ResultRow>,
    calls: Vec<TransportCall>,
}

/// Transport answering from queued responses, then from defaults.
///
/// Without a script every job is accepted as `test_sid`, reports `DONE`
/// without diagnostics on its first poll and returns the default rows.
/// Queued one-shot responses take precedence over the defaults, and
/// [`ScriptedTransport::always_failing`] makes every call fail.
///
/// # Example
///
/// ```
/// use event_reader_core::EventReaderError;
/// use event_reader_testing::ScriptedTransport;
///
/// let transport = ScriptedTransport::new()
///     .push_submit(Err(EventReaderError::Transport("reset".into())));
/// assert_eq!(transport.submit_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    /// Job id assigned when no submit response is queued.
    pub const DEFAULT_SID: &'static str = "test_sid";

    /// Transport with default behaviour and no rows.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose every call fails with `error`.
    #[must_use]
    pub fn always_failing(error: EventReaderError) -> Self {
        let transport = Self::new();
        transport.lock().failure = Some(error);
        transport
    }

    /// Rows returned by `results` when no response is queued.
    #[must_use]
    pub fn with_rows(self, rows: Vec<ResultRow>) -> Self {
        self.lock().rows = rows;
        self
    }

    /// Queue a one-shot `submit` response.
    #[must_use]
    pub fn push_submit(self, response: Result<JobId, EventReaderError>) -> Self {
        self.lock().submits.push_back(response);
        self
    }

    /// Queue a one-shot `status` response.
    #[must_use]
    pub fn push_status(self, response: Result<Job, EventReaderError>) -> Self {
        self.lock().statuses.push_back(response);
        self
    }

    /// Queue a one-shot `results` response.
    #[must_use]
    pub fn push_results(self, response: Result<Vec<ResultRow>, EventReaderError>) -> Self {
        self.lock().results.push_back(response);
        self
    }

    /// Every call received so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.lock().calls.clone()
    }

    /// Number of `submit` calls received.
    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| matches!(call, TransportCall::Submit(_)))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SearchTransport for ScriptedTransport {
    async fn submit(&self, query: &RenderedQuery) -> Result<JobId, EventReaderError> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Submit(query.clone()));
        if let Some(err) = &script.failure {
            return Err(err.clone());
        }
        script
            .submits
            .pop_front()
            .unwrap_or_else(|| Ok(JobId::new(Self::DEFAULT_SID)))
    }

    async fn status(&self, sid: &JobId) -> Result<Job, EventReaderError> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Status(sid.clone()));
        if let Some(err) = &script.failure {
            return Err(err.clone());
        }
        script
            .statuses
            .pop_front()
            .unwrap_or_else(|| Ok(Job::new(sid.clone(), DispatchState::Done, Vec::new())))
    }

    async fn results(&self, sid: &JobId) -> Result<Vec<ResultRow>, EventReaderError> {
        let mut script = self.lock();
        script.calls.push(TransportCall::Results(sid.clone()));
        if let Some(err) = &script.failure {
            return Err(err.clone());
        }
        match script.results.pop_front() {
            Some(response) => response,
            None => Ok(script.rows.clone()),
        }
    }
}
