//! # Event Reader Core
//!
//! Pure domain of the publish event reader.
//!
//! The reader answers "what happened to this publish?" by rendering a
//! structured [`query::MonitoringQuery`] into a Splunk search, running it as an
//! asynchronous search job and folding the returned rows into transactions.
//!
//! ## Core Concepts
//!
//! - **Query**: [`query::QueryBuilder`] renders queries; rendering is pure
//! - **Job**: [`job::JobReducer`] is the lifecycle as a pure transition
//!   `(state, event) → (state, effect)`
//! - **Aggregation**: [`aggregate::aggregate_transactions`] groups rows by
//!   transaction id and keeps the open ones
//! - **Environment**: [`environment::SearchTransport`] and
//!   [`environment::Clock`] are the seams the runtime injects
//!
//! No I/O happens in this crate; the runtime crate drives the effects.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod health;
pub mod job;
pub mod query;
pub mod rows;

pub use chrono::{DateTime, Utc};
pub use error::{EventReaderError, JobFailure};
pub use event::{EventKind, PublishEvent, TransactionEvent};
pub use health::HealthStatus;
pub use job::{
    DispatchState, Job, JobEffect, JobEvent, JobId, JobPhase, JobReducer, JobState, PollPolicy,
};
pub use query::{MonitoringQuery, QueryBuilder, RenderedQuery, SearchScope};
pub use rows::ResultRow;

/// Reducer module - pure state transitions
pub mod reducer {
    /// A pure transition function over some state.
    ///
    /// Implementations validate the action, update the state in place and
    /// return a description of the work the caller must perform next.
    pub trait Reducer {
        /// The state this reducer operates on
        type State;

        /// The inputs this reducer processes
        type Action;

        /// Injected configuration the transition may consult
        type Environment;

        /// Description of the work to perform after a transition
        type Effect;

        /// Reduce an action into a state change and an effect.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Self::Effect;
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies of the reader are abstracted behind these traits
/// and injected by the runtime.
pub mod environment {
    use crate::error::EventReaderError;
    use crate::job::{Job, JobId};
    use crate::query::RenderedQuery;
    use crate::rows::ResultRow;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// The three calls of the asynchronous search job API.
    ///
    /// Implementations map connection failures to
    /// [`EventReaderError::Transport`] and non-success statuses to
    /// [`EventReaderError::BackendStatus`].
    #[async_trait]
    pub trait SearchTransport: Send + Sync {
        /// Create a search job and return its id.
        async fn submit(&self, query: &RenderedQuery) -> Result<JobId, EventReaderError>;

        /// Fetch the current status of a job.
        async fn status(&self, sid: &JobId) -> Result<Job, EventReaderError>;

        /// Fetch every result row of a finished job.
        async fn results(&self, sid: &JobId) -> Result<Vec<ResultRow>, EventReaderError>;
    }
}
