//! # Event Reader Runtime
//!
//! Imperative shell around the pure core.
//!
//! - [`executor::JobExecutor`] performs the effects of the job state machine
//!   through a [`event_reader_core::environment::SearchTransport`], retrying
//!   whole executions with a [`retry::RetryPolicy`]
//! - [`health::HealthCache`] serves the shared health status with a
//!   time-to-live and probes the backend when it expires
//! - [`service::EventReader`] ties query rendering, execution and
//!   aggregation together
//!
//! ## Example
//!
//! ```ignore
//! use event_reader_runtime::{EventReader, ExecutorConfig};
//! use event_reader_core::{MonitoringQuery, QueryBuilder};
//!
//! let reader = EventReader::new(transport, QueryBuilder::new("xp"), ExecutorConfig::default());
//! let open = reader
//!     .get_transactions(&MonitoringQuery::new("annotations").with_earliest_time("-15m"))
//!     .await?;
//! ```

pub mod executor;
pub mod health;
pub mod metrics;
pub mod retry;
pub mod service;

pub use executor::{ExecutorConfig, JobExecutor};
pub use health::{HealthCache, HealthCell};
pub use retry::RetryPolicy;
pub use service::EventReader;
