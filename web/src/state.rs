//! Application state for Axum handlers.

use crate::config::ServiceConfig;
use event_reader_runtime::EventReader;
use std::sync::Arc;

/// Identity reported by the health endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// System code, e.g. `splunk-event-reader`
    pub system_code: String,
    /// Human readable application name
    pub name: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            system_code: "splunk-event-reader".to_string(),
            name: "Splunk Event Reader".to_string(),
        }
    }
}

/// Application state shared across all HTTP handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Search facade
    pub reader: EventReader,
    /// Service identity
    pub info: Arc<ServiceInfo>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(reader: EventReader, info: ServiceInfo) -> Self {
        Self {
            reader,
            info: Arc::new(info),
        }
    }

    /// Build the state from the service configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::config::ConfigError`] if the Splunk client cannot be built.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(
            config.event_reader()?,
            ServiceInfo {
                system_code: config.system_code.clone(),
                name: config.name.clone(),
            },
        ))
    }
}
