//! HTTP tests of the router against a scripted search backend.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code

use axum::http::StatusCode;
use axum_test::TestServer;
use event_reader_core::environment::SearchTransport;
use event_reader_core::{EventReaderError, QueryBuilder};
use event_reader_runtime::{EventReader, ExecutorConfig, RetryPolicy};
use event_reader_testing::{ScriptedTransport, TransportCall, fixtures, test_clock};
use event_reader_web::{AppState, ServiceInfo, router};
use serde_json::Value;
use std::sync::Arc;

fn server(transport: Arc<ScriptedTransport>) -> TestServer {
    let config = ExecutorConfig::default().with_retry(RetryPolicy::builder().max_attempts(1).build());
    let transport: Arc<dyn SearchTransport> = transport;
    let reader = EventReader::with_clock(
        transport,
        QueryBuilder::new("xp"),
        config,
        Arc::new(test_clock()),
    );
    TestServer::new(router(AppState::new(reader, ServiceInfo::default()))).unwrap()
}

fn submitted_search(transport: &ScriptedTransport) -> String {
    let calls = transport.calls();
    let TransportCall::Submit(query) = &calls[0] else {
        panic!("expected a submit call, got {calls:?}");
    };
    query.search.clone()
}

#[tokio::test]
async fn transactions_return_open_aggregates() {
    let transport = Arc::new(ScriptedTransport::new().with_rows(vec![
        fixtures::publish_row(0, "tid_open", "PublishStart", "annotations", fixtures::LAST_EVENT_UUID),
        fixtures::publish_row(1, "tid_open", "Mapped", "annotations", fixtures::LAST_EVENT_UUID),
        fixtures::publish_row(2, "tid_done", "PublishStart", "annotations", "u2"),
        fixtures::publish_row(3, "tid_done", "PublishEnd", "annotations", "u2"),
    ]));
    let server = server(transport.clone());

    let response = server
        .get("/annotations/transactions?earliestTime=-15m")
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let transactions = body.as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["transaction_id"], "tid_open");
    assert_eq!(transactions[0]["uuid"], fixtures::LAST_EVENT_UUID);
    assert_eq!(transactions[0]["closed_txn"], false);
    assert_eq!(transactions[0]["eventcount"], 2);
    assert_eq!(transactions[0]["events"][0]["event"], "PublishStart");

    let calls = transport.calls();
    let TransportCall::Submit(query) = &calls[0] else {
        panic!("expected a submit call");
    };
    assert_eq!(query.earliest_time, "-15m");
}

#[tokio::test]
async fn transactions_pass_every_uuid_to_the_search() {
    let transport = Arc::new(ScriptedTransport::new());
    let server = server(transport.clone());

    server
        .get("/annotations/transactions?uuid=ed08f771-db28-4d63-b566-0d49c6595111&uuid=a1d1c1a4-0b4c-4b2e-9b8d-3f7c6f2d9e10")
        .await
        .assert_status_ok();

    assert!(submitted_search(&transport).contains(
        r#"uuid IN ("a1d1c1a4-0b4c-4b2e-9b8d-3f7c6f2d9e10","ed08f771-db28-4d63-b566-0d49c6595111")"#
    ));
}

#[tokio::test]
async fn empty_search_is_an_empty_array() {
    let server = server(Arc::new(ScriptedTransport::new()));

    let response = server.get("/annotations/transactions").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), serde_json::json!([]));
}

#[tokio::test]
async fn invalid_parameters_are_rejected_without_searching() {
    let transport = Arc::new(ScriptedTransport::new());
    let server = server(transport.clone());

    for path in [
        "/videos/transactions",
        "/annotations/transactions?uuid=not-a-uuid",
        "/annotations/transactions?earliestTime=10m",
        "/annotations/transactions?latestTime=-1d",
        "/annotations/events",
        "/annotations/events?lastEvent=false",
        "/annotations/events?lastEvent=true&earliestTime=yesterday",
        "/videos/events?lastEvent=true",
    ] {
        let response = server.get(path).await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST", "{path}");
    }

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn backend_failure_is_internal_error() {
    let transport = Arc::new(ScriptedTransport::always_failing(
        EventReaderError::BackendStatus {
            status: 503,
            message: "Service Unavailable".into(),
        },
    ));
    let server = server(transport);

    let response = server.get("/annotations/transactions").await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "INTERNAL_SERVER_ERROR");
    assert!(!body["error"].as_str().unwrap().contains("503"));
}

#[tokio::test]
async fn last_event_returns_raw_event() {
    let transport =
        Arc::new(ScriptedTransport::new().with_rows(vec![fixtures::last_publish_row()]));
    let server = server(transport.clone());

    let response = server
        .get("/annotations/events?lastEvent=true&earliestTime=-1h")
        .await;

    response.assert_status_ok();
    let event: Value = response.json();
    assert_eq!(event["transaction_id"], fixtures::LAST_EVENT_TID);
    assert_eq!(event["uuid"], fixtures::LAST_EVENT_UUID);
    assert_eq!(event["@time"], fixtures::LAST_EVENT_TIME);
    assert_eq!(event["event"], "PublishEnd");
    assert!(submitted_search(&transport).contains("| head 1"));
}

#[tokio::test]
async fn last_event_without_results_is_not_found() {
    let server = server(Arc::new(ScriptedTransport::new()));

    let response = server.get("/annotations/events?lastEvent=true").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");
}

#[tokio::test]
async fn health_report_lists_splunk_check() {
    let server = server(Arc::new(ScriptedTransport::new()));

    let response = server.get("/__health").await;

    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["systemCode"], "splunk-event-reader");
    assert_eq!(report["name"], "Splunk Event Reader");
    assert_eq!(report["ok"], true);
    assert_eq!(report["checks"][0]["name"], "Splunk healthcheck");
    assert_eq!(report["checks"][0]["severity"], 2);
    assert_eq!(report["checks"][0]["checkOutput"], "Splunk is ok");
}

#[tokio::test]
async fn health_is_cached_between_endpoints() {
    let transport = Arc::new(ScriptedTransport::new());
    let server = server(transport.clone());

    server.get("/__health").await.assert_status_ok();
    server.get("/__gtg").await.assert_status_ok();

    assert_eq!(transport.submit_count(), 1);
    assert!(submitted_search(&transport).starts_with("search index=_audit"));
}

#[tokio::test]
async fn gtg_reports_ok() {
    let server = server(Arc::new(ScriptedTransport::new()));

    let response = server.get("/__gtg").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn gtg_reports_error_text_when_splunk_fails() {
    let server = server(Arc::new(ScriptedTransport::always_failing(
        EventReaderError::Transport("connection refused".into()),
    )));

    let response = server.get("/__gtg").await;

    assert_eq!(response.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    response.assert_text("Transport error: connection refused");

    let report: Value = server.get("/__health").await.json();
    assert_eq!(report["ok"], false);
    assert_eq!(
        report["checks"][0]["checkOutput"],
        "Splunk error: Transport error: connection refused"
    );
}

#[tokio::test]
async fn build_info() {
    let server = server(Arc::new(ScriptedTransport::new()));

    let info: Value = server.get("/__build-info").await.json();

    assert_eq!(info["name"], "event-reader-web");
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));
}
