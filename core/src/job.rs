//! Search job lifecycle as a pure state machine.
//!
//! A job moves `Submitting → Polling → Fetching → Done`, and may exit to
//! `Failed` from any non-terminal phase. [`JobReducer`] computes the next
//! phase and the single effect the shell must perform; it never performs I/O.

use crate::error::{EventReaderError, JobFailure};
use crate::reducer::Reducer;
use crate::rows::ResultRow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque search job id assigned by the backend (the Splunk `sid`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a backend-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Backend-reported lifecycle stage of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchState {
    /// Waiting to be scheduled
    Queued,
    /// Executing, finalizing or paused
    Running,
    /// Finished; results can be fetched
    Done,
    /// Terminated with an error
    Failed,
}

impl DispatchState {
    /// Whether the job will not change state any more.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl From<&str> for DispatchState {
    fn from(value: &str) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "QUEUED" | "PARSING" => Self::Queued,
            "DONE" => Self::Done,
            "FAILED" => Self::Failed,
            _ => Self::Running,
        }
    }
}

/// A status report for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    /// Job id
    pub id: JobId,
    /// Current dispatch state
    pub dispatch_state: DispatchState,
    /// Diagnostic messages in backend order
    pub messages: Vec<String>,
}

impl Job {
    /// Build a status report.
    #[must_use]
    pub fn new(id: JobId, dispatch_state: DispatchState, messages: Vec<String>) -> Self {
        Self {
            id,
            dispatch_state,
            messages,
        }
    }

    /// Classify the report as failed, if it is.
    ///
    /// A `FAILED` dispatch state is a failure, and so is any diagnostic
    /// message regardless of the dispatch state.
    #[must_use]
    pub fn failure(&self) -> Option<JobFailure> {
        if self.dispatch_state == DispatchState::Failed {
            Some(JobFailure::Dispatch)
        } else if !self.messages.is_empty() {
            Some(JobFailure::Diagnostics)
        } else {
            None
        }
    }

    /// Whether results can be fetched.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.dispatch_state == DispatchState::Done && self.failure().is_none()
    }

    /// Turn the report into the error for a failure of the given kind.
    #[must_use]
    pub fn into_error(self, reason: JobFailure) -> EventReaderError {
        EventReaderError::JobFailed {
            sid: self.id.0,
            reason,
            messages: self.messages,
        }
    }
}

/// How long and how often a job is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_polls: u32,
}

impl PollPolicy {
    /// Create a policy.
    #[must_use]
    pub const fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    /// Set the delay between two status requests.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the number of status requests before giving up.
    #[must_use]
    pub const fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    /// Delay between two status requests.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Status request budget.
    #[must_use]
    pub const fn max_polls(&self) -> u32 {
        self.max_polls
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 120)
    }
}

/// Phase of a single job execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum JobPhase {
    /// Not started
    #[default]
    Idle,
    /// Waiting for the backend to accept the search
    Submitting,
    /// Waiting for the job to finish
    Polling {
        /// Job being polled
        sid: JobId,
        /// Status reports received so far
        polls: u32,
    },
    /// Waiting for the result rows
    Fetching {
        /// Finished job
        sid: JobId,
    },
    /// Rows delivered
    Done,
    /// Execution failed
    Failed,
}

impl JobPhase {
    /// Whether no further event is accepted.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// State of one job execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobState {
    /// Current phase
    pub phase: JobPhase,
}

impl JobState {
    /// Fresh, unstarted state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Job id, once the backend has assigned one and the job is active.
    #[must_use]
    pub const fn sid(&self) -> Option<&JobId> {
        match &self.phase {
            JobPhase::Polling { sid, .. } | JobPhase::Fetching { sid } => Some(sid),
            _ => None,
        }
    }
}

/// Inputs to the job state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    /// Begin the execution
    Start,
    /// The backend accepted the search
    Submitted {
        /// Assigned job id
        sid: JobId,
    },
    /// A status report arrived
    StatusReceived(Job),
    /// The result rows arrived
    ResultsReceived(Vec<ResultRow>),
    /// A backend call failed
    CallFailed(EventReaderError),
}

/// Work the shell must perform after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEffect {
    /// Nothing to do
    None,
    /// Submit the rendered search
    Submit,
    /// Request the job status after a delay
    PollStatus {
        /// Job to poll
        sid: JobId,
        /// Delay before the request
        delay: Duration,
    },
    /// Request the result rows
    FetchResults {
        /// Finished job
        sid: JobId,
    },
    /// Hand the rows to the caller
    Deliver(Vec<ResultRow>),
    /// Report the failure to the caller
    Fail(EventReaderError),
}

/// Pure transition function of the job lifecycle.
///
/// Events that make no sense in the current phase leave the state unchanged
/// and yield [`JobEffect::None`].
#[derive(Debug, Clone, Copy, Default)]
pub struct JobReducer;

impl Reducer for JobReducer {
    type State = JobState;
    type Action = JobEvent;
    type Environment = PollPolicy;
    type Effect = JobEffect;

    fn reduce(&self, state: &mut JobState, event: JobEvent, policy: &PollPolicy) -> JobEffect {
        let phase = std::mem::take(&mut state.phase);

        let (next, effect) = match (phase, event) {
            (JobPhase::Idle, JobEvent::Start) => (JobPhase::Submitting, JobEffect::Submit),

            (JobPhase::Submitting, JobEvent::Submitted { sid }) => (
                JobPhase::Polling {
                    sid: sid.clone(),
                    polls: 0,
                },
                JobEffect::PollStatus {
                    sid,
                    delay: Duration::ZERO,
                },
            ),

            (JobPhase::Polling { sid, polls }, JobEvent::StatusReceived(job)) if job.id == sid => {
                let polls = polls.saturating_add(1);
                if let Some(reason) = job.failure() {
                    (JobPhase::Failed, JobEffect::Fail(job.into_error(reason)))
                } else if job.dispatch_state == DispatchState::Done {
                    (
                        JobPhase::Fetching { sid: sid.clone() },
                        JobEffect::FetchResults { sid },
                    )
                } else if polls >= policy.max_polls() {
                    (
                        JobPhase::Failed,
                        JobEffect::Fail(job.into_error(JobFailure::PollBudgetExhausted)),
                    )
                } else {
                    (
                        JobPhase::Polling {
                            sid: sid.clone(),
                            polls,
                        },
                        JobEffect::PollStatus {
                            sid,
                            delay: policy.interval(),
                        },
                    )
                }
            }

            (JobPhase::Fetching { .. }, JobEvent::ResultsReceived(rows)) => {
                (JobPhase::Done, JobEffect::Deliver(rows))
            }

            (
                JobPhase::Submitting | JobPhase::Polling { .. } | JobPhase::Fetching { .. },
                JobEvent::CallFailed(err),
            ) => (JobPhase::Failed, JobEffect::Fail(err)),

            (phase, event) => {
                tracing::debug!(?phase, ?event, "Ignoring job event in current phase");
                (phase, JobEffect::None)
            }
        };

        state.phase = next;
        effect
    }
}
