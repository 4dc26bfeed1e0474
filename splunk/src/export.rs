//! Transport over the streaming export endpoint.
//!
//! Export runs the search synchronously and streams the rows in the
//! response. To fit the job interface the rows are parked under a locally
//! generated job id: the job reports `DONE` at once, and the results call
//! hands the rows over exactly once. Rows nobody fetched within
//! [`ExportTransport::DEFAULT_RETENTION`] are dropped on the next submit.

use crate::client::{EXPORT_PATH, SplunkClient, body_text};
use async_trait::async_trait;
use event_reader_core::environment::SearchTransport;
use event_reader_core::query::RenderedQuery;
use event_reader_core::rows::decode_rows;
use event_reader_core::{DispatchState, EventReaderError, Job, JobId, ResultRow};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug)]
struct Parked {
    at: Instant,
    rows: Vec<ResultRow>,
}

/// Export-based transport.
#[derive(Debug)]
pub struct ExportTransport {
    client: SplunkClient,
    retention: Duration,
    parked: Mutex<HashMap<JobId, Parked>>,
}

impl ExportTransport {
    /// How long streamed rows wait for their results call.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

    /// Create a transport using the given client.
    #[must_use]
    pub fn new(client: SplunkClient) -> Self {
        Self {
            client,
            retention: Self::DEFAULT_RETENTION,
            parked: Mutex::new(HashMap::new()),
        }
    }

    /// Set how long unfetched rows are kept.
    #[must_use]
    pub const fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Number of jobs whose rows have not been fetched yet.
    pub async fn parked_jobs(&self) -> usize {
        self.parked.lock().await.len()
    }
}

#[async_trait]
impl SearchTransport for ExportTransport {
    async fn submit(&self, query: &RenderedQuery) -> Result<JobId, EventReaderError> {
        let response = self.client.post_form(EXPORT_PATH, query).await?;
        let body = body_text(response).await?;
        let rows = decode_rows(&body)?;

        let sid = JobId::new(format!("export_{}", uuid::Uuid::new_v4()));
        tracing::debug!(%sid, rows = rows.len(), "Export search streamed");

        let now = Instant::now();
        let mut parked = self.parked.lock().await;
        let before = parked.len();
        parked.retain(|_, entry| now.duration_since(entry.at) < self.retention);
        let evicted = before - parked.len();
        if evicted > 0 {
            tracing::warn!(evicted, "Dropped export results that were never fetched");
        }
        parked.insert(sid.clone(), Parked { at: now, rows });
        Ok(sid)
    }

    async fn status(&self, sid: &JobId) -> Result<Job, EventReaderError> {
        if self.parked.lock().await.contains_key(sid) {
            Ok(Job::new(sid.clone(), DispatchState::Done, Vec::new()))
        } else {
            Err(EventReaderError::Decode(format!("unknown export job {sid}")))
        }
    }

    async fn results(&self, sid: &JobId) -> Result<Vec<ResultRow>, EventReaderError> {
        self.parked
            .lock()
            .await
            .remove(sid)
            .map(|entry| entry.rows)
            .ok_or_else(|| EventReaderError::Decode(format!("unknown export job {sid}")))
    }
}
