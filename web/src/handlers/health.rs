//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify that Splunk answers searches.

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode};
use event_reader_core::{DateTime, HealthStatus, Utc};
use serde::Serialize;

/// Description reported by `/__health`.
pub const APP_DESCRIPTION: &str = "Reads Splunk events via the Splunk REST API";

const CHECK_ID: &str = "splunk";
const CHECK_NAME: &str = "Splunk healthcheck";
const BUSINESS_IMPACT: &str =
    "Monitoring of publishing events is hindered. SLA compliance cannot be tracked";
const TECHNICAL_SUMMARY: &str = "Splunk is not able to return results, therefore publishing transactions can not be processed. Check Splunk REST API availability.";
const PANIC_GUIDE: &str = "https://dewey.ft.com/splunk-event-reader.html";
const SEVERITY: u8 = 2;

/// Body of `GET /__health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Report format version
    pub schema_version: u8,
    /// Service system code
    pub system_code: String,
    /// Service name
    pub name: String,
    /// Service description
    pub description: String,
    /// Individual checks
    pub checks: Vec<CheckResult>,
    /// Whether every check passed
    pub ok: bool,
}

/// Outcome of one health check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// Stable check id
    pub id: &'static str,
    /// Check name
    pub name: &'static str,
    /// Whether the check passed
    pub ok: bool,
    /// 1 (highest) to 3
    pub severity: u8,
    /// What breaks when the check fails
    pub business_impact: &'static str,
    /// What the check verifies
    pub technical_summary: &'static str,
    /// Where to look when it fails
    pub panic_guide: &'static str,
    /// Status message, followed by the error when there is one
    pub check_output: String,
    /// When Splunk was last observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl CheckResult {
    fn splunk(status: &HealthStatus) -> Self {
        let check_output = match &status.error {
            Some(err) => format!("{}: {err}", status.message),
            None => status.message.clone(),
        };
        Self {
            id: CHECK_ID,
            name: CHECK_NAME,
            ok: status.is_healthy(),
            severity: SEVERITY,
            business_impact: BUSINESS_IMPACT,
            technical_summary: TECHNICAL_SUMMARY,
            panic_guide: PANIC_GUIDE,
            check_output,
            last_updated: status.observed_at,
        }
    }
}

/// Full health report.
///
/// ```text
/// GET /__health
/// ```
///
/// Always answers 200; failing checks are reported in the body.
pub async fn health_report(State(state): State<AppState>) -> Json<HealthReport> {
    let status = state.reader.is_healthy().await;
    let check = CheckResult::splunk(&status);

    Json(HealthReport {
        schema_version: 1,
        system_code: state.info.system_code.clone(),
        name: state.info.name.clone(),
        description: APP_DESCRIPTION.to_string(),
        ok: check.ok,
        checks: vec![check],
    })
}

/// Good-to-go check for load balancers.
///
/// ```text
/// GET /__gtg
/// ```
///
/// 200 `OK` when Splunk is healthy, otherwise 503 with the error text.
pub async fn good_to_go(State(state): State<AppState>) -> (StatusCode, String) {
    let status = state.reader.is_healthy().await;
    if status.is_healthy() {
        return (StatusCode::OK, "OK".to_string());
    }
    let text = status.error.map_or(status.message, |err| err.to_string());
    (StatusCode::SERVICE_UNAVAILABLE, text)
}

/// Build information.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    /// Package name
    pub name: &'static str,
    /// Package version
    pub version: &'static str,
}

/// Build information of the running binary.
///
/// ```text
/// GET /__build-info
/// ```
#[allow(clippy::unused_async)]
pub async fn build_info() -> Json<BuildInfo> {
    Json(BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}
