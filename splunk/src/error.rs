//! Error types for building Splunk clients

use thiserror::Error;

/// Errors that can occur while configuring a Splunk client.
///
/// Request-time failures are reported as
/// [`event_reader_core::EventReaderError`] instead.
#[derive(Debug, Error)]
pub enum SplunkError {
    /// Missing `SPLUNK_URL` environment variable
    #[error("Missing SPLUNK_URL environment variable")]
    MissingUrl,

    /// The base URL is not an absolute http(s) URL
    #[error("Invalid Splunk URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}
