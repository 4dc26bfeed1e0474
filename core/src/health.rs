//! Health of the search backend as last observed.

use crate::error::EventReaderError;
use chrono::{DateTime, Duration, Utc};

/// Message recorded when the last search succeeded.
pub const HEALTHY_MESSAGE: &str = "Splunk is ok";

/// Message recorded when the last search failed.
pub const UNHEALTHY_MESSAGE: &str = "Splunk error";

/// Message recorded when the last search only failed on diagnostics and
/// diagnostics are configured not to affect health.
pub const DIAGNOSTICS_MESSAGE: &str = "Splunk is ok, last job reported diagnostics";

/// Outcome of the most recent interaction with the search backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    /// Human readable summary
    pub message: String,
    /// Error of the last search, if it failed
    pub error: Option<EventReaderError>,
    /// When the status was recorded; `None` before the first observation
    pub observed_at: Option<DateTime<Utc>>,
}

impl HealthStatus {
    /// A successful observation.
    #[must_use]
    pub fn ok(at: DateTime<Utc>) -> Self {
        Self {
            message: HEALTHY_MESSAGE.to_string(),
            error: None,
            observed_at: Some(at),
        }
    }

    /// A failed observation.
    #[must_use]
    pub fn failed(error: EventReaderError, at: DateTime<Utc>) -> Self {
        Self {
            message: UNHEALTHY_MESSAGE.to_string(),
            error: Some(error),
            observed_at: Some(at),
        }
    }

    /// A healthy backend whose last job carried diagnostics.
    #[must_use]
    pub fn degraded(at: DateTime<Utc>) -> Self {
        Self {
            message: DIAGNOSTICS_MESSAGE.to_string(),
            error: None,
            observed_at: Some(at),
        }
    }

    /// Placeholder before any search ran. Never fresh.
    #[must_use]
    pub const fn unobserved() -> Self {
        Self {
            message: String::new(),
            error: None,
            observed_at: None,
        }
    }

    /// Whether the backend is considered healthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.error.is_none() && self.observed_at.is_some()
    }

    /// Whether the status is younger than `ttl` at `now`.
    ///
    /// An expiry past the representable range counts as stale.
    #[must_use]
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.observed_at
            .and_then(|at| at.checked_add_signed(ttl))
            .is_some_and(|until| now < until)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::unobserved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap_or_default()
    }

    #[test]
    fn freshness_window() {
        let status = HealthStatus::ok(at(0));
        let ttl = Duration::minutes(1);

        assert!(status.is_fresh(ttl, at(59)));
        assert!(!status.is_fresh(ttl, at(60)));
    }

    #[test]
    fn overflowing_ttl_is_stale() {
        let status = HealthStatus::ok(at(0));
        assert!(!status.is_fresh(Duration::MAX, at(0)));
        assert!(!status.is_fresh(Duration::MAX, DateTime::<Utc>::MAX_UTC));
    }

    #[test]
    fn unobserved_is_never_fresh_nor_healthy() {
        let status = HealthStatus::unobserved();
        assert!(!status.is_fresh(Duration::days(365), at(0)));
        assert!(!status.is_healthy());
    }

    #[test]
    fn failed_status_keeps_error() {
        let status = HealthStatus::failed(EventReaderError::Transport("refused".into()), at(0));
        assert_eq!(status.message, UNHEALTHY_MESSAGE);
        assert!(!status.is_healthy());
        assert!(HealthStatus::degraded(at(0)).is_healthy());
    }
}
