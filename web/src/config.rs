//! Service configuration read from the environment.

use event_reader_core::environment::SearchTransport;
use event_reader_core::{PollPolicy, QueryBuilder};
use event_reader_runtime::{EventReader, ExecutorConfig, RetryPolicy};
use event_reader_splunk::{ExportTransport, JobsTransport, SplunkClient, SplunkConfig, SplunkError};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable has a value that cannot be parsed
    #[error("Invalid value for {name}: {value}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Rejected value
        value: String,
    },

    /// The Splunk client could not be built
    #[error(transparent)]
    Splunk(#[from] SplunkError),
}

/// How searches reach Splunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    /// Create a job, poll it, fetch its results
    #[default]
    Jobs,
    /// One streaming export request per search
    Export,
}

impl FromStr for WireFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jobs" => Ok(Self::Jobs),
            "export" => Ok(Self::Export),
            _ => Err(()),
        }
    }
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// System code reported by `/__health`
    pub system_code: String,
    /// Application name reported by `/__health`
    pub name: String,
    /// HTTP listen address
    pub bind_addr: SocketAddr,
    /// Cluster name the searches are scoped to
    pub environment: String,
    /// Splunk connection
    pub splunk: SplunkConfig,
    /// Wire variant
    pub wire_format: WireFormat,
    /// Whole-search retry budget
    pub retry: RetryPolicy,
    /// Job status polling
    pub poll: PollPolicy,
    /// How long a health observation is served from cache
    pub health_ttl: chrono::Duration,
    /// Whether diagnostics-only job failures mark Splunk unhealthy
    pub diagnostics_affect_health: bool,
    /// Prometheus exporter address, if enabled
    pub metrics_addr: Option<SocketAddr>,
}

impl ServiceConfig {
    /// Read the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SPLUNK_URL` is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `SPLUNK_URL` is missing or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let bind_ip: IpAddr = env.parse("BIND_ADDR", IpAddr::V4(Ipv4Addr::UNSPECIFIED))?;
        let port: u16 = env.parse("APP_PORT", 8080)?;

        let splunk_url = env
            .get("SPLUNK_URL")
            .ok_or(ConfigError::Missing("SPLUNK_URL"))?;
        let splunk = SplunkConfig::new(splunk_url)
            .with_credentials(
                env.get("SPLUNK_USER").unwrap_or_default(),
                env.get("SPLUNK_PASSWORD").unwrap_or_default(),
            )
            .with_timeout(Duration::from_secs(env.parse("SPLUNK_TIMEOUT_SECS", 30)?));

        let wire_format = match env.get("SPLUNK_WIRE_FORMAT") {
            Some(value) => value.parse().map_err(|()| ConfigError::Invalid {
                name: "SPLUNK_WIRE_FORMAT",
                value,
            })?,
            None => WireFormat::default(),
        };

        let retry = RetryPolicy::builder()
            .max_attempts(env.parse("SEARCH_MAX_ATTEMPTS", 3)?)
            .initial_delay(Duration::from_millis(env.parse("SEARCH_RETRY_DELAY_MS", 1000)?))
            .build();

        let poll = PollPolicy::default()
            .with_interval(Duration::from_millis(env.parse("JOB_POLL_INTERVAL_MS", 500)?))
            .with_max_polls(env.parse("JOB_MAX_POLLS", 120)?);

        let ttl_secs: u32 = env.parse("HEALTH_CACHE_TTL_SECS", 60)?;
        let health_ttl = chrono::Duration::try_seconds(i64::from(ttl_secs)).ok_or_else(|| {
            ConfigError::Invalid {
                name: "HEALTH_CACHE_TTL_SECS",
                value: ttl_secs.to_string(),
            }
        })?;

        let metrics_addr = env
            .parse_optional::<u16>("METRICS_PORT")?
            .map(|port| SocketAddr::new(bind_ip, port));

        Ok(Self {
            system_code: env
                .get("APP_SYSTEM_CODE")
                .unwrap_or_else(|| "splunk-event-reader".to_string()),
            name: env
                .get("APP_NAME")
                .unwrap_or_else(|| "Splunk Event Reader".to_string()),
            bind_addr: SocketAddr::new(bind_ip, port),
            environment: env.get("ENVIRONMENT").unwrap_or_else(|| "xp".to_string()),
            splunk,
            wire_format,
            retry,
            poll,
            health_ttl,
            diagnostics_affect_health: env.parse("DIAGNOSTICS_AFFECT_HEALTH", true)?,
            metrics_addr,
        })
    }

    /// Executor settings derived from this configuration.
    #[must_use]
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::default()
            .with_retry(self.retry)
            .with_poll(self.poll)
            .with_diagnostics_affect_health(self.diagnostics_affect_health)
    }

    /// Build the Splunk transport for the configured wire format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Splunk`] if the HTTP client cannot be built.
    pub fn transport(&self) -> Result<Arc<dyn SearchTransport>, ConfigError> {
        let client = SplunkClient::new(self.splunk.clone())?;
        Ok(match self.wire_format {
            WireFormat::Jobs => Arc::new(JobsTransport::new(client)),
            WireFormat::Export => Arc::new(ExportTransport::new(client)),
        })
    }

    /// Build the event reader.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Splunk`] if the HTTP client cannot be built.
    pub fn event_reader(&self) -> Result<EventReader, ConfigError> {
        let reader = EventReader::new(
            self.transport()?,
            QueryBuilder::new(self.environment.clone()),
            self.executor_config(),
        );
        Ok(reader.with_health_ttl(self.health_ttl))
    }
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        Ok(self.parse_optional(name)?.unwrap_or(default))
    }

    fn parse_optional<T: FromStr>(&self, name: &'static str) -> Result<Option<T>, ConfigError> {
        self.get(name)
            .map(|value| {
                let parsed = value.trim().parse();
                parsed.map_err(|_| ConfigError::Invalid { name, value })
            })
            .transpose()
    }
}
