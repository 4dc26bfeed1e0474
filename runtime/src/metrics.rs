//! Prometheus metrics for search executions and health probes.
//!
//! Counters are recorded through the `metrics` facade and are no-ops until a
//! recorder is installed. [`MetricsServer`] installs the Prometheus exporter
//! with its own HTTP listener.
//!
//! # Example
//!
//! ```rust,no_run
//! use event_reader_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Searches by outcome label.
pub const SEARCHES_TOTAL: &str = "event_reader_searches_total";
/// Individual submit/poll/fetch cycles, retries included.
pub const SEARCH_ATTEMPTS_TOTAL: &str = "event_reader_search_attempts_total";
/// Wall time of a whole execution, retries included.
pub const SEARCH_DURATION_SECONDS: &str = "event_reader_search_duration_seconds";
/// Health probes actually sent to the backend.
pub const HEALTH_PROBES_TOTAL: &str = "event_reader_health_probes_total";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build or install the exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus exporter bound to a scrape address.
#[derive(Debug, Clone, Copy)]
pub struct MetricsServer {
    addr: SocketAddr,
}

impl MetricsServer {
    /// Create a server for the given scrape address.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Install the exporter and start its listener.
    ///
    /// Must be called from within a Tokio runtime, and only once per process.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Install`] if the exporter cannot be built or a
    /// recorder is already installed.
    pub fn start(&self) -> Result<(), MetricsError> {
        register_metrics();

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            )
            .map_err(|e| MetricsError::Install(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        tracing::info!(addr = %self.addr, "Metrics exporter listening");
        Ok(())
    }
}

fn register_metrics() {
    describe_counter!(SEARCHES_TOTAL, "Total number of search executions by outcome");
    describe_counter!(
        SEARCH_ATTEMPTS_TOTAL,
        "Total number of search attempts, retries included"
    );
    describe_histogram!(
        SEARCH_DURATION_SECONDS,
        "Time taken by a search execution, retries included"
    );
    describe_counter!(
        HEALTH_PROBES_TOTAL,
        "Total number of health probes sent to the search backend"
    );
}

/// Search metrics recorder.
pub struct SearchMetrics;

impl SearchMetrics {
    /// Record a finished execution.
    pub fn record_execution(outcome: &'static str, duration: Duration) {
        counter!(SEARCHES_TOTAL, "outcome" => outcome).increment(1);
        histogram!(SEARCH_DURATION_SECONDS).record(duration.as_secs_f64());
    }

    /// Record one submit/poll/fetch cycle.
    pub fn record_attempt() {
        counter!(SEARCH_ATTEMPTS_TOTAL).increment(1);
    }

    /// Record a health probe sent to the backend.
    pub fn record_health_probe() {
        counter!(HEALTH_PROBES_TOTAL).increment(1);
    }
}
