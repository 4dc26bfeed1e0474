//! Error taxonomy shared by every layer of the event reader.

use std::fmt;
use thiserror::Error;

/// Why a search job was classified as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobFailure {
    /// The backend reported a `FAILED` dispatch state
    Dispatch,
    /// The job finished but carried diagnostic messages
    Diagnostics,
    /// The job never reached a terminal state within the poll budget
    PollBudgetExhausted,
    /// The job state machine received no event it could act on
    Stalled,
}

impl fmt::Display for JobFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch => write!(f, "dispatch failed"),
            Self::Diagnostics => write!(f, "diagnostics reported"),
            Self::PollBudgetExhausted => write!(f, "poll budget exhausted"),
            Self::Stalled => write!(f, "state machine stalled"),
        }
    }
}

/// Errors that can occur while searching for publish events.
///
/// `Transport`, `BackendStatus` and `JobFailed` are transient from the
/// executor's point of view and are retried within the attempt budget.
/// `Decode` is never retried. `NoResults` is not a failure of the backend:
/// it is the typed "not found" answer for single-event lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventReaderError {
    /// Connection, timeout or other network-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The search backend answered with a non-success HTTP status
    #[error("Search backend returned status {status}: {message}")]
    BackendStatus {
        /// HTTP status code
        status: u16,
        /// Status reason or response body
        message: String,
    },

    /// The backend reported a failed or diagnostically tainted job
    #[error("Search job {sid} failed ({reason}): {}", messages.join("; "))]
    JobFailed {
        /// Job id assigned by the backend
        sid: String,
        /// Classification of the failure
        reason: JobFailure,
        /// Diagnostic messages attached to the job
        messages: Vec<String>,
    },

    /// Malformed row or JSON returned by the backend
    #[error("Malformed search result: {0}")]
    Decode(String),

    /// The search completed but produced no matching rows
    #[error("No results")]
    NoResults,
}

impl EventReaderError {
    /// Whether the job executor should try the search again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::BackendStatus { .. } | Self::JobFailed { .. }
        )
    }

    /// Whether this is the "well-formed but empty" answer.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoResults)
    }

    /// Whether the failure stems only from diagnostics attached to a finished job.
    #[must_use]
    pub const fn is_diagnostics_only(&self) -> bool {
        matches!(
            self,
            Self::JobFailed {
                reason: JobFailure::Diagnostics,
                ..
            }
        )
    }
}

impl From<serde_json::Error> for EventReaderError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_kinds() {
        assert!(EventReaderError::Transport("reset".into()).is_retryable());
        assert!(
            EventReaderError::BackendStatus {
                status: 503,
                message: "Service Unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            EventReaderError::JobFailed {
                sid: "sid".into(),
                reason: JobFailure::Dispatch,
                messages: vec![],
            }
            .is_retryable()
        );
        assert!(!EventReaderError::Decode("eof".into()).is_retryable());
        assert!(!EventReaderError::NoResults.is_retryable());
    }

    #[test]
    fn no_results_is_distinguishable() {
        assert!(EventReaderError::NoResults.is_not_found());
        assert!(
            !EventReaderError::BackendStatus {
                status: 503,
                message: String::new()
            }
            .is_not_found()
        );
    }

    #[test]
    fn job_failed_message_lists_diagnostics() {
        let err = EventReaderError::JobFailed {
            sid: "1234.5".into(),
            reason: JobFailure::Diagnostics,
            messages: vec!["index missing".into(), "peer down".into()],
        };
        assert!(err.is_diagnostics_only());
        assert_eq!(
            err.to_string(),
            "Search job 1234.5 failed (diagnostics reported): index missing; peer down"
        );
    }
}
