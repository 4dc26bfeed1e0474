//! Axum HTTP shell for the Splunk event reader.
//!
//! Handlers validate request parameters, hand a [`event_reader_core::MonitoringQuery`]
//! to the [`event_reader_runtime::EventReader`] and map its outcome to a
//! response.
//!
//! # Routes
//!
//! | route | answer |
//! |---|---|
//! | `GET /{contentType}/transactions` | open transactions, JSON array |
//! | `GET /{contentType}/events?lastEvent=true` | last completed publish, 404 if none |
//! | `GET /__health` | health report |
//! | `GET /__gtg` | `OK` or 503 |
//! | `GET /__build-info` | package name and version |
//!
//! # Example
//!
//! ```ignore
//! use event_reader_web::{AppState, ServiceConfig, router};
//!
//! let config = ServiceConfig::from_env()?;
//! let app = router(AppState::from_config(&config)?);
//! let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
//! axum::serve(listener, app).await?;
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;
pub mod validation;

pub use config::{ConfigError, ServiceConfig, WireFormat};
pub use error::AppError;
pub use state::{AppState, ServiceInfo};

use axum::{Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;

/// Build the application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/__health", get(handlers::health_report))
        .route("/__gtg", get(handlers::good_to_go))
        .route("/__build-info", get(handlers::build_info))
        .route("/:content_type/transactions", get(handlers::transactions))
        .route("/:content_type/events", get(handlers::last_event))
        .with_state(state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
