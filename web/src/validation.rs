//! Request parameter validation.

use event_reader_core::MonitoringQuery;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Content types the reader can be queried for.
pub const CONTENT_TYPES: &[&str] = &["annotations"];

#[allow(clippy::expect_used)] // Hardcoded pattern always compiles
static TIME_PERIOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-\d+[msh]$").expect("time period pattern should always compile")
});

/// A rejected request parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Path segment is not a supported content type
    #[error("Invalid content type {0}")]
    ContentType(String),

    /// `uuid` parameter does not parse as a UUID
    #[error("Invalid UUID {0}")]
    Uuid(String),

    /// Time parameter is not a relative period such as `-15m`
    #[error("Invalid {name} parameter {value}")]
    TimePeriod {
        /// Parameter name
        name: &'static str,
        /// Rejected value
        value: String,
    },

    /// `lastEvent` is missing or not `true`
    #[error("lastEvent param must be true for the /events endpoint, value is {0}")]
    LastEventFlag(String),
}

/// Check the content type against [`CONTENT_TYPES`].
///
/// # Errors
///
/// Returns [`ValidationError::ContentType`] for any other value.
pub fn content_type(value: &str) -> Result<(), ValidationError> {
    if CONTENT_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ContentType(value.to_string()))
    }
}

/// Check that a value parses as a UUID.
///
/// # Errors
///
/// Returns [`ValidationError::Uuid`] if it does not.
pub fn uuid(value: &str) -> Result<(), ValidationError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| ValidationError::Uuid(value.to_string()))
}

/// Check an optional relative time period. Absent and empty values pass.
///
/// # Errors
///
/// Returns [`ValidationError::TimePeriod`] for anything not matching
/// `-<digits><m|s|h>`.
pub fn time_period(name: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    if TIME_PERIOD.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::TimePeriod {
            name,
            value: value.to_string(),
        })
    }
}

/// Check that the `lastEvent` flag is exactly `true`.
///
/// # Errors
///
/// Returns [`ValidationError::LastEventFlag`] otherwise.
pub fn last_event_flag(value: Option<&str>) -> Result<(), ValidationError> {
    match value {
        Some("true") => Ok(()),
        other => Err(ValidationError::LastEventFlag(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Query parameters of `GET /{contentType}/transactions`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionsParams {
    /// Repeated `uuid` parameters
    pub uuids: Vec<String>,
    /// `earliestTime`
    pub earliest_time: Option<String>,
    /// `latestTime`
    pub latest_time: Option<String>,
}

impl TransactionsParams {
    /// Collect parameters from raw query pairs. The last value of a
    /// single-valued parameter wins; unknown parameters are ignored.
    #[must_use]
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "uuid" => params.uuids.push(value),
                "earliestTime" => params.earliest_time = Some(value),
                "latestTime" => params.latest_time = Some(value),
                _ => {}
            }
        }
        params
    }

    /// Validate and build the search request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking content type,
    /// uuids, then time periods.
    pub fn into_query(self, content_type_value: &str) -> Result<MonitoringQuery, ValidationError> {
        content_type(content_type_value)?;
        for value in &self.uuids {
            uuid(value)?;
        }
        time_period("earliest time", self.earliest_time.as_deref())?;
        time_period("latest time", self.latest_time.as_deref())?;

        let mut query = MonitoringQuery::new(content_type_value).with_uuids(self.uuids);
        if let Some(earliest) = self.earliest_time.filter(|v| !v.is_empty()) {
            query = query.with_earliest_time(earliest);
        }
        if let Some(latest) = self.latest_time.filter(|v| !v.is_empty()) {
            query = query.with_latest_time(latest);
        }
        Ok(query)
    }
}

/// Query parameters of `GET /{contentType}/events`.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub struct EventsParams {
    /// `lastEvent`, must be `true`
    #[serde(rename = "lastEvent")]
    pub last_event: Option<String>,
    /// `earliestTime`
    #[serde(rename = "earliestTime")]
    pub earliest_time: Option<String>,
}

impl EventsParams {
    /// Validate and build the search request.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, checking content type,
    /// the `lastEvent` flag, then the time period.
    pub fn into_query(self, content_type_value: &str) -> Result<MonitoringQuery, ValidationError> {
        content_type(content_type_value)?;
        last_event_flag(self.last_event.as_deref())?;
        time_period("earliest time", self.earliest_time.as_deref())?;

        let query = MonitoringQuery::new(content_type_value);
        Ok(match self.earliest_time.filter(|v| !v.is_empty()) {
            Some(earliest) => query.with_earliest_time(earliest),
            None => query,
        })
    }
}
