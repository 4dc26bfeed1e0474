//! # Event Reader Testing
//!
//! Testing utilities for the event reader.
//!
//! This crate provides:
//! - Deterministic clocks implementing the core `Clock` trait
//! - [`ScriptedTransport`], an in-memory search backend
//! - Row fixtures shaped like real publish log lines
//! - [`JobMachineTest`], a Given-When-Then harness for the job state machine
//!
//! ## Example
//!
//! ```ignore
//! use event_reader_testing::{ScriptedTransport, fixtures};
//!
//! #[tokio::test]
//! async fn finds_open_transaction() {
//!     let transport = ScriptedTransport::new()
//!         .with_rows(vec![fixtures::publish_row(0, "tid_1", "PublishStart", "annotations", "u1")]);
//!     let reader = EventReader::new(Arc::new(transport), QueryBuilder::new("xp"), ExecutorConfig::default());
//!     let open = reader.get_transactions(&MonitoringQuery::new("annotations")).await.unwrap();
//!     assert_eq!(open.len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use event_reader_core::environment::Clock;

pub mod transport;

/// Clocks for deterministic tests.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use event_reader_testing::mocks::FixedClock;
    /// use event_reader_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<Mutex<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Create a clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(Mutex::new(time)),
            }
        }

        /// Move the clock forward.
        pub fn advance(&self, by: chrono::Duration) {
            let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
            *time += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.time.lock().unwrap_or_else(PoisonError::into_inner)
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_time())
    }

    /// The instant [`test_clock`] is fixed at.
    ///
    /// # Panics
    ///
    /// Never in practice; the timestamp is hardcoded.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc)
    }
}

/// Result rows shaped like the publish log lines the backend returns.
pub mod fixtures {
    use event_reader_core::ResultRow;
    use serde_json::json;

    /// Timestamp of [`last_publish_row`].
    pub const LAST_EVENT_TIME: &str = "2017-09-19T15:11:31.795334198Z";
    /// Transaction id of [`last_publish_row`].
    pub const LAST_EVENT_TID: &str = "tid_evjm9gls5a";
    /// Content uuid of [`last_publish_row`].
    pub const LAST_EVENT_UUID: &str = "ed08f771-db28-4d63-b566-0d49c6595111";

    /// A row carrying one publish event.
    #[must_use]
    pub fn publish_row(
        offset: u64,
        transaction_id: &str,
        event: &str,
        content_type: &str,
        uuid: &str,
    ) -> ResultRow {
        ResultRow::with_result(
            offset,
            json!({
                "@time": format!("2017-09-19T15:11:{:02}.000000000Z", offset % 60),
                "content_type": content_type,
                "event": event,
                "isValid": "true",
                "level": "info",
                "service_name": "annotations-monitoring-service",
                "transaction_id": transaction_id,
                "uuid": uuid,
            }),
        )
    }

    /// A completed annotations publish.
    #[must_use]
    pub fn last_publish_row() -> ResultRow {
        ResultRow::with_result(
            0,
            json!({
                "@time": LAST_EVENT_TIME,
                "content_type": "Annotations",
                "event": "PublishEnd",
                "isValid": "true",
                "level": "info",
                "service_name": "annotations-monitoring-service",
                "transaction_id": LAST_EVENT_TID,
                "uuid": LAST_EVENT_UUID,
            }),
        )
    }

    /// Serialize rows as the newline-delimited body the backend streams,
    /// flagging the final row with `lastrow`.
    #[must_use]
    pub fn rows_body(rows: &[ResultRow]) -> String {
        let count = rows.len();
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                let mut row = row.clone();
                row.lastrow = i + 1 == count;
                serde_json::to_string(&row).unwrap_or_default()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use reducer_test::{JobMachineTest, ReducerTest};
pub use transport::{ScriptedTransport, TransportCall};
