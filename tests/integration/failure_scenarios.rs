//! Failure handling at the probe and scheduler boundaries
//!
//! These tests verify that:
//! - Transport failures reduce to failed cycles, never panics
//! - Malformed SERVER addresses advance the state machine deterministically
//! - Misconfigured monitor kinds fail fast at start time
//! - stop() is idempotent and leaves no state machines behind

use std::sync::Arc;

use assert_matches::assert_matches;
use vigil::health::MonitorState;
use vigil::{Scheduler, SchedulerError};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::helpers::{Recording, create_test_monitor, recording_sinks};

#[tokio::test]
async fn unreachable_service_is_an_outage() {
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::new(recording_sinks(&recording));

    // nothing listens on port 9
    let monitor = create_test_monitor("dead", "http://127.0.0.1:9/health", "GET", 60);

    let event = scheduler.run_single_cycle(&monitor, None).await.unwrap();
    assert!(!event.success);
    assert_eq!(event.state, MonitorState::Outage);

    // one notification for the onset
    assert_eq!(recording.notifications.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_server_address_counts_as_failure() {
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::new(recording_sinks(&recording));

    // the port segment is not numeric: the parse error is caught at the
    // cycle boundary and the machine still advances
    let monitor = create_test_monitor("broken", "http://host:notaport/x", "SERVER", 60);

    let event = scheduler.run_single_cycle(&monitor, None).await.unwrap();
    assert!(!event.success);
    assert_eq!(event.state, MonitorState::Outage);
}

#[tokio::test]
async fn unsupported_kind_rejected_at_start() {
    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::new(recording_sinks(&recording));

    let result = scheduler.start(vec![create_test_monitor(
        "odd",
        "http://example.com",
        "TELNET",
        60,
    )]);

    assert_matches!(result, Err(SchedulerError::UnsupportedKind(_)));
    assert_eq!(recording.observed_count(), 0);
}

#[tokio::test]
async fn stop_twice_leaves_registry_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::new(recording_sinks(&recording));

    scheduler
        .start(vec![create_test_monitor("api", &server.uri(), "GET", 0)])
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    scheduler.stop().await;
    assert_eq!(scheduler.machine_count(), 0);

    scheduler.stop().await;
    assert_eq!(scheduler.machine_count(), 0);
}

#[tokio::test]
async fn recovery_after_transient_failure() {
    let server = MockServer::start().await;

    // first request fails, everything after succeeds
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let recording = Arc::new(Recording::default());
    let scheduler = Scheduler::new(recording_sinks(&recording));
    let monitor = create_test_monitor("flappy", &server.uri(), "GET", 60);

    let first = scheduler.run_single_cycle(&monitor, None).await.unwrap();
    let second = scheduler.run_single_cycle(&monitor, None).await.unwrap();

    assert_eq!(first.state, MonitorState::Outage);
    assert_eq!(second.state, MonitorState::Recovered);

    let subjects = recording.notification_subjects();
    assert_eq!(subjects.len(), 2);
    assert!(subjects[1].ends_with("-recovery"));
}
