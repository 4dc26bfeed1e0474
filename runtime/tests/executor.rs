//! Integration tests for search execution, retry and health caching.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use chrono::Duration as ChronoDuration;
use event_reader_core::{
    DispatchState, EventReaderError, Job, JobFailure, MonitoringQuery, PollPolicy, QueryBuilder,
};
use event_reader_runtime::{EventReader, ExecutorConfig, JobExecutor, RetryPolicy};
use event_reader_testing::fixtures::{self, LAST_EVENT_TID};
use event_reader_testing::mocks::test_time;
use event_reader_testing::{ManualClock, ScriptedTransport, TransportCall};
use std::sync::Arc;
use std::time::Duration;

fn config(attempts: u32) -> ExecutorConfig {
    ExecutorConfig::default()
        .with_retry(
            RetryPolicy::builder()
                .max_attempts(attempts)
                .initial_delay(Duration::from_secs(1))
                .build(),
        )
        .with_poll(PollPolicy::new(Duration::from_millis(500), 5))
}

fn reader(transport: Arc<ScriptedTransport>, clock: ManualClock) -> EventReader {
    EventReader::with_clock(transport, QueryBuilder::new("xp"), config(3), Arc::new(clock))
}

fn unavailable() -> EventReaderError {
    EventReaderError::BackendStatus {
        status: 503,
        message: "Service Unavailable".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn transport_failure_exhausts_attempt_budget() {
    let err = EventReaderError::Transport("connection refused".into());
    let transport = Arc::new(ScriptedTransport::always_failing(err.clone()));
    let executor = JobExecutor::new(transport.clone(), config(4));

    let result = executor
        .execute(&QueryBuilder::new("xp").health_probe())
        .await;

    assert_eq!(result, Err(err.clone()));
    assert_eq!(transport.submit_count(), 4);

    let health = executor.health().read().await;
    assert!(!health.is_healthy());
    assert_eq!(health.error, Some(err));
}

#[tokio::test(start_paused = true)]
async fn last_error_is_returned_unchanged() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .push_submit(Err(EventReaderError::Transport("reset".into())))
            .push_submit(Err(EventReaderError::Transport("reset".into())))
            .push_submit(Err(unavailable())),
    );
    let executor = JobExecutor::new(transport.clone(), config(3));

    let result = executor.execute(&QueryBuilder::new("xp").health_probe()).await;

    assert_eq!(result, Err(unavailable()));
    assert_eq!(transport.submit_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn job_is_polled_until_done_then_fetched() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .push_status(Ok(Job::new("test_sid".into(), DispatchState::Queued, vec![])))
            .push_status(Ok(Job::new("test_sid".into(), DispatchState::Running, vec![])))
            .with_rows(vec![fixtures::last_publish_row()]),
    );
    let executor = JobExecutor::new(transport.clone(), config(3));

    let rows = executor
        .execute(&QueryBuilder::new("xp").health_probe())
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    let calls = transport.calls();
    assert_eq!(calls.len(), 5);
    assert!(matches!(calls[0], TransportCall::Submit(_)));
    assert_eq!(calls[3], TransportCall::Status("test_sid".into()));
    assert_eq!(calls[4], TransportCall::Results("test_sid".into()));
    assert!(executor.health().read().await.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn diagnostics_fail_the_job_and_are_retried() {
    let diagnostics = Job::new(
        "test_sid".into(),
        DispatchState::Done,
        vec!["Unknown search command 'heaad'".into()],
    );
    let transport = Arc::new(
        ScriptedTransport::new()
            .push_status(Ok(diagnostics.clone()))
            .push_status(Ok(diagnostics.clone()))
            .push_status(Ok(diagnostics)),
    );
    let executor = JobExecutor::new(transport.clone(), config(3));

    let err = executor
        .execute(&QueryBuilder::new("xp").health_probe())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EventReaderError::JobFailed {
            reason: JobFailure::Diagnostics,
            ..
        }
    ));
    assert_eq!(transport.submit_count(), 3);
    assert!(!executor.health().read().await.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn diagnostics_can_leave_health_untouched() {
    let transport = Arc::new(ScriptedTransport::new().push_status(Ok(Job::new(
        "test_sid".into(),
        DispatchState::Done,
        vec!["peer timed out".into()],
    ))));
    let executor = JobExecutor::new(
        transport,
        config(1).with_diagnostics_affect_health(false),
    );

    let result = executor.execute(&QueryBuilder::new("xp").health_probe()).await;

    assert!(result.unwrap_err().is_diagnostics_only());
    let health = executor.health().read().await;
    assert!(health.is_healthy());
    assert_eq!(health.message, "Splunk is ok, last job reported diagnostics");
}

#[tokio::test(start_paused = true)]
async fn poll_budget_exhaustion_fails_the_attempt() {
    let mut transport = ScriptedTransport::new();
    for _ in 0..5 {
        transport = transport.push_status(Ok(Job::new(
            "test_sid".into(),
            DispatchState::Running,
            vec![],
        )));
    }
    let executor = JobExecutor::new(Arc::new(transport), config(1));

    let err = executor
        .execute(&QueryBuilder::new("xp").health_probe())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EventReaderError::JobFailed {
            reason: JobFailure::PollBudgetExhausted,
            ..
        }
    ));
}

#[tokio::test]
async fn poll_classifies_failed_dispatch() {
    let transport = Arc::new(ScriptedTransport::new().push_status(Ok(Job::new(
        "test_sid".into(),
        DispatchState::Failed,
        vec![],
    ))));
    let executor = JobExecutor::new(transport, config(1));

    let err = executor.poll(&"test_sid".into()).await.unwrap_err();
    assert!(matches!(
        err,
        EventReaderError::JobFailed {
            reason: JobFailure::Dispatch,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn execute_and_step_calls_share_one_path() {
    let failed = || {
        Ok(Job::new(
            "test_sid".into(),
            DispatchState::Failed,
            vec!["Unknown search command 'bogus'".into()],
        ))
    };
    let transport = Arc::new(
        ScriptedTransport::new()
            .push_status(failed())
            .push_status(failed()),
    );
    let executor = JobExecutor::new(transport.clone(), config(1));
    let query = QueryBuilder::new("xp").health_probe();

    let executed = executor.execute(&query).await.unwrap_err();
    let sid = executor.submit(&query).await.unwrap();
    let polled = executor.poll(&sid).await.unwrap_err();

    assert_eq!(executed, polled);
    assert_eq!(
        transport.calls(),
        vec![
            TransportCall::Submit(query.clone()),
            TransportCall::Status(sid.clone()),
            TransportCall::Submit(query),
            TransportCall::Status(sid),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn health_is_cached_within_ttl() {
    let transport = Arc::new(ScriptedTransport::new());
    let clock = ManualClock::new(test_time());
    let reader = reader(transport.clone(), clock.clone());

    let first = reader.is_healthy().await;
    clock.advance(ChronoDuration::seconds(30));
    let second = reader.is_healthy().await;

    assert!(first.is_healthy());
    assert_eq!(first, second);
    assert_eq!(transport.submit_count(), 1);

    clock.advance(ChronoDuration::seconds(31));
    let third = reader.is_healthy().await;

    assert_eq!(transport.submit_count(), 2);
    assert_eq!(third.observed_at, Some(test_time() + ChronoDuration::seconds(61)));
}

#[tokio::test(start_paused = true)]
async fn health_probe_uses_minimal_query() {
    let transport = Arc::new(ScriptedTransport::new());
    let reader = reader(transport.clone(), ManualClock::new(test_time()));

    reader.is_healthy().await;

    let calls = transport.calls();
    let TransportCall::Submit(query) = &calls[0] else {
        panic!("expected a submit call");
    };
    assert_eq!(query.search, "search index=_audit | head 1");
    assert_eq!(query.earliest_time, "-10s");
}

#[tokio::test(start_paused = true)]
async fn data_queries_refresh_health() {
    let transport = Arc::new(ScriptedTransport::new());
    let reader = reader(transport.clone(), ManualClock::new(test_time()));

    reader
        .get_transactions(&MonitoringQuery::new("annotations"))
        .await
        .unwrap();
    let status = reader.is_healthy().await;

    assert!(status.is_healthy());
    assert_eq!(transport.submit_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn last_event_on_empty_response_is_not_found() {
    let transport = Arc::new(ScriptedTransport::new().with_rows(vec![]));
    let reader = reader(transport, ManualClock::new(test_time()));

    let err = reader
        .get_last_event(&MonitoringQuery::new("annotations"))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(reader.executor().health().read().await.is_healthy());
}

#[tokio::test(start_paused = true)]
async fn last_event_on_unavailable_backend_is_status_error() {
    let transport = Arc::new(ScriptedTransport::always_failing(unavailable()));
    let reader = reader(transport, ManualClock::new(test_time()));

    let err = reader
        .get_last_event(&MonitoringQuery::new("annotations"))
        .await
        .unwrap_err();

    assert_eq!(err, unavailable());
}

#[tokio::test(start_paused = true)]
async fn last_event_returns_first_completion() {
    let transport = Arc::new(ScriptedTransport::new().with_rows(vec![fixtures::last_publish_row()]));
    let reader = reader(transport, ManualClock::new(test_time()));

    let event = reader
        .get_last_event(&MonitoringQuery::new("annotations").with_earliest_time("-5m"))
        .await
        .unwrap();

    assert_eq!(event.transaction_id, LAST_EVENT_TID);
    assert_eq!(event.content_type, "Annotations");
    assert!(event.event.is_end());
}

#[tokio::test(start_paused = true)]
async fn transactions_keep_only_open_matches() {
    let transport = Arc::new(ScriptedTransport::new().with_rows(vec![
        fixtures::publish_row(0, "tid_open", "PublishStart", "annotations", "u1"),
        fixtures::publish_row(1, "tid_closed", "PublishStart", "annotations", "u2"),
        fixtures::publish_row(2, "tid_closed", "PublishEnd", "annotations", "u2"),
        fixtures::publish_row(3, "tid_other", "PublishStart", "video", "u3"),
    ]));
    let reader = reader(transport.clone(), ManualClock::new(test_time()));

    let txs = reader
        .get_transactions(&MonitoringQuery::new("annotations").with_uuids(["u1", "u2"]))
        .await
        .unwrap();

    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].transaction_id, "tid_open");

    let calls = transport.calls();
    let TransportCall::Submit(query) = &calls[0] else {
        panic!("expected a submit call");
    };
    assert!(query.search.contains(r#"uuid IN ("u1","u2")"#));
}
