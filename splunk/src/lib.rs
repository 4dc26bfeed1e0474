//! # Splunk Transports
//!
//! reqwest-based implementations of
//! [`event_reader_core::environment::SearchTransport`] for the Splunk REST API.
//!
//! ## Example
//!
//! ```no_run
//! use event_reader_splunk::{JobsTransport, SplunkClient};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads SPLUNK_URL, SPLUNK_USER and SPLUNK_PASSWORD
//! let client = SplunkClient::from_env()?;
//! let transport = JobsTransport::new(client);
//! # Ok(())
//! # }
//! ```
//!
//! ## Wire variants
//!
//! - [`JobsTransport`]: create a job, poll its status, fetch its results
//! - [`ExportTransport`]: one streaming export request per search
//!
//! Both authenticate with HTTP basic auth, send form-encoded searches and
//! accept self-signed certificates unless configured otherwise.

pub mod client;
pub mod error;
pub mod export;
pub mod types;

pub use client::{JobsTransport, SplunkClient, SplunkConfig};
pub use error::SplunkError;
pub use export::ExportTransport;
