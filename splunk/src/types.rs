//! Wire types of the Splunk search REST API.

use event_reader_core::{DispatchState, Job, JobId, ResultRow};
use serde::Deserialize;

/// Response to a job creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    /// Search id of the new job
    pub sid: String,
}

/// Response to a job status request.
#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusResponse {
    /// Matching jobs; the first one is the requested job
    #[serde(default)]
    pub entry: Vec<JobEntry>,
}

/// One job entry.
#[derive(Debug, Clone, Deserialize)]
pub struct JobEntry {
    /// Job properties
    pub content: JobContent,
}

/// Properties of a search job.
#[derive(Debug, Clone, Deserialize)]
pub struct JobContent {
    /// Lifecycle stage as reported by Splunk
    #[serde(rename = "dispatchState", default)]
    pub dispatch_state: String,
    /// Whether the job finished
    #[serde(rename = "isDone", default)]
    pub is_done: bool,
    /// Diagnostic messages
    #[serde(default)]
    pub messages: Vec<JobMessage>,
}

impl JobContent {
    /// Convert into the core job status.
    ///
    /// A job flagged `isDone` without a dispatch state counts as done.
    #[must_use]
    pub fn into_job(self, id: JobId) -> Job {
        let dispatch_state = if self.dispatch_state.is_empty() && self.is_done {
            DispatchState::Done
        } else {
            DispatchState::from(self.dispatch_state.as_str())
        };
        let messages = self
            .messages
            .into_iter()
            .map(JobMessage::into_text)
            .filter(|text| !text.is_empty())
            .collect();
        Job::new(id, dispatch_state, messages)
    }
}

/// A diagnostic message, either bare text or typed.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum JobMessage {
    /// Plain message text
    Text(String),
    /// Message with a severity
    Typed {
        /// Severity, e.g. `ERROR` or `WARN`
        #[serde(rename = "type", default)]
        kind: String,
        /// Message text
        #[serde(default)]
        text: String,
    },
}

impl JobMessage {
    /// Render as a single line, prefixed with the severity when present.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Typed { kind, text } if kind.is_empty() => text,
            Self::Typed { kind, text } => format!("{kind}: {text}"),
        }
    }
}

/// A results page as returned by `output_mode=json` on the results endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ResultsPage {
    /// Result events
    pub results: Vec<serde_json::Value>,
}

impl ResultsPage {
    /// Convert into rows, the final one flagged `lastrow`.
    #[must_use]
    pub fn into_rows(self) -> Vec<ResultRow> {
        let count = self.results.len();
        self.results
            .into_iter()
            .enumerate()
            .map(|(i, result)| {
                let mut row = ResultRow::with_result(i as u64, result);
                row.lastrow = i + 1 == count;
                row
            })
            .collect()
    }
}
