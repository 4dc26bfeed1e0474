//! Splunk REST client and the job-based transport.

use crate::error::SplunkError;
use crate::types::{JobStatusResponse, ResultsPage, SubmitResponse};
use async_trait::async_trait;
use event_reader_core::environment::SearchTransport;
use event_reader_core::query::RenderedQuery;
use event_reader_core::rows::decode_rows;
use event_reader_core::{EventReaderError, Job, JobId, ResultRow};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Path creating search jobs.
pub const JOBS_PATH: &str = "/services/search/jobs";

/// Path streaming search results without a job.
pub const EXPORT_PATH: &str = "/services/search/jobs/export";

/// Connection settings of a Splunk instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplunkConfig {
    /// Base URL of the management port, e.g. `https://splunk:8089`
    pub base_url: String,
    /// Basic auth user
    pub user: String,
    /// Basic auth password
    pub password: String,
    /// Timeout of each request
    pub timeout: Duration,
    /// Accept invalid TLS certificates
    pub accept_invalid_certs: bool,
}

impl SplunkConfig {
    /// Settings for the given base URL with a 30 second timeout and relaxed TLS.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(30),
            accept_invalid_certs: true,
        }
    }

    /// Read `SPLUNK_URL`, `SPLUNK_USER` and `SPLUNK_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`SplunkError::MissingUrl`] if `SPLUNK_URL` is not set.
    pub fn from_env() -> Result<Self, SplunkError> {
        let base_url = std::env::var("SPLUNK_URL").map_err(|_| SplunkError::MissingUrl)?;
        Ok(Self::new(base_url).with_credentials(
            std::env::var("SPLUNK_USER").unwrap_or_default(),
            std::env::var("SPLUNK_PASSWORD").unwrap_or_default(),
        ))
    }

    /// Set the basic auth credentials.
    #[must_use]
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Choose whether invalid TLS certificates are accepted.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Authenticated HTTP access to one Splunk instance.
#[derive(Clone)]
pub struct SplunkClient {
    client: Client,
    config: SplunkConfig,
}

impl SplunkClient {
    /// Build a client.
    ///
    /// # Errors
    ///
    /// Returns [`SplunkError::InvalidUrl`] for a non-http(s) base URL and
    /// [`SplunkError::ClientBuild`] if the TLS backend cannot be initialised.
    pub fn new(config: SplunkConfig) -> Result<Self, SplunkError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(SplunkError::InvalidUrl(config.base_url));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| SplunkError::ClientBuild(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build a client from the environment.
    ///
    /// # Errors
    ///
    /// See [`SplunkConfig::from_env`] and [`SplunkClient::new`].
    pub fn from_env() -> Result<Self, SplunkError> {
        Self::new(SplunkConfig::from_env()?)
    }

    /// Client configuration.
    #[must_use]
    pub const fn config(&self) -> &SplunkConfig {
        &self.config
    }

    /// POST a form to `path`.
    pub(crate) async fn post_form(
        &self,
        path: &str,
        query: &RenderedQuery,
    ) -> Result<Response, EventReaderError> {
        let request = self
            .client
            .post(self.url(path))
            .query(&[("output_mode", "json")])
            .form(&query.form_params());
        self.send(request).await
    }

    /// GET `path` with JSON output.
    pub(crate) async fn get(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, EventReaderError> {
        let request = self
            .client
            .get(self.url(path))
            .query(&[("output_mode", "json")])
            .query(params);
        self.send(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, EventReaderError> {
        let response = request
            .basic_auth(&self.config.user, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| EventReaderError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            body
        };
        tracing::warn!(status = status.as_u16(), %message, "Splunk request rejected");
        Err(EventReaderError::BackendStatus {
            status: status.as_u16(),
            message,
        })
    }
}

impl std::fmt::Debug for SplunkClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplunkClient")
            .field("base_url", &self.config.base_url)
            .field("user", &self.config.user)
            .finish_non_exhaustive()
    }
}

/// Read a response body as text.
pub(crate) async fn body_text(response: Response) -> Result<String, EventReaderError> {
    response
        .text()
        .await
        .map_err(|e| EventReaderError::Transport(e.to_string()))
}

/// Decode a results body, either a JSON results page or a row stream.
pub(crate) fn decode_results(body: &str) -> Result<Vec<ResultRow>, EventReaderError> {
    match serde_json::from_str::<ResultsPage>(body) {
        Ok(page) => Ok(page.into_rows()),
        Err(_) => decode_rows(body),
    }
}

/// Transport over the asynchronous search jobs API.
#[derive(Debug, Clone)]
pub struct JobsTransport {
    client: SplunkClient,
}

impl JobsTransport {
    /// Create a transport using the given client.
    #[must_use]
    pub const fn new(client: SplunkClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SearchTransport for JobsTransport {
    async fn submit(&self, query: &RenderedQuery) -> Result<JobId, EventReaderError> {
        let response = self.client.post_form(JOBS_PATH, query).await?;
        let body = body_text(response).await?;
        let submitted: SubmitResponse = serde_json::from_str(&body)?;
        Ok(JobId::new(submitted.sid))
    }

    async fn status(&self, sid: &JobId) -> Result<Job, EventReaderError> {
        let response = self
            .client
            .get(&format!("{JOBS_PATH}/{sid}"), &[])
            .await?;
        let body = body_text(response).await?;
        let status: JobStatusResponse = serde_json::from_str(&body)?;

        status
            .entry
            .into_iter()
            .next()
            .map(|entry| entry.content.into_job(sid.clone()))
            .ok_or_else(|| EventReaderError::Decode(format!("no status entry for job {sid}")))
    }

    async fn results(&self, sid: &JobId) -> Result<Vec<ResultRow>, EventReaderError> {
        let response = self
            .client
            .get(&format!("{JOBS_PATH}/{sid}/results"), &[("count", "0")])
            .await?;
        let body = body_text(response).await?;
        decode_results(&body)
    }
}
