//! Integration tests for feedback delivery against a live loopback controller

use std::sync::Arc;
use std::time::{Duration, Instant};

use deltawash::core::{
    create_router, ControllerState, FeedbackConfig, FeedbackTransport, LedClient, MemoryLeds,
    TransportStats,
};
use deltawash::types::{HealthReport, ReasonCode, StepEvent, StepId, StepState};
use pretty_assertions::assert_eq;

fn step(n: i64) -> StepId {
    StepId::try_from(n).unwrap()
}

fn event(n: i64, state: StepState) -> StepEvent {
    StepEvent::new(step(n), state, ReasonCode::T001_ENTERED_CURRENT, 0)
}

/// Serve a fresh controller on an ephemeral port
async fn spawn_controller() -> (String, Arc<ControllerState>) {
    let state = ControllerState::new(MemoryLeds::new());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

fn feedback(url: &str, health_interval_ms: u64) -> FeedbackConfig {
    FeedbackConfig {
        timeout_ms: 500,
        retries: 1,
        health_interval_ms,
        ..FeedbackConfig::for_endpoint(url)
    }
}

fn view(report: &HealthReport) -> (Option<u8>, Vec<u8>) {
    (
        report.current.map(|s| s.number()),
        report.completed.iter().map(|s| s.number()).collect(),
    )
}

#[tokio::test]
async fn test_events_reach_controller() {
    let (url, state) = spawn_controller().await;
    let transport = FeedbackTransport::spawn(&feedback(&url, 0)).unwrap();
    assert!(transport.is_enabled());

    transport.publish(&event(2, StepState::Current));
    transport.publish(&event(2, StepState::Completed));
    transport.publish(&event(3, StepState::Current));
    let stats = transport.close().await;

    assert_eq!(view(&state.health().await), (Some(3), vec![2]));
    assert!(stats.delivered >= 2);
    assert_eq!(stats.dropped, 0);
}

#[tokio::test]
async fn test_latest_state_wins_per_step() {
    let (url, state) = spawn_controller().await;
    let transport = FeedbackTransport::spawn(&feedback(&url, 0)).unwrap();

    for n in [2, 3, 4] {
        transport.publish(&event(n, StepState::Current));
        transport.publish(&event(n, StepState::Idle));
    }
    transport.publish(&event(4, StepState::Current));
    transport.publish(&event(4, StepState::Completed));
    transport.publish(&event(6, StepState::Current));
    transport.close().await;

    assert_eq!(view(&state.health().await), (Some(6), vec![4]));
}

#[tokio::test]
async fn test_reset_supersedes_earlier_states() {
    let (url, state) = spawn_controller().await;
    let transport = FeedbackTransport::spawn(&feedback(&url, 0)).unwrap();

    transport.publish(&event(2, StepState::Completed));
    transport.publish(&event(3, StepState::Current));
    transport.publish_reset();
    transport.publish(&event(5, StepState::Current));
    transport.close().await;

    assert_eq!(view(&state.health().await), (Some(5), vec![]));
}

#[tokio::test]
async fn test_unreachable_controller_never_blocks_publisher() {
    // Nothing listens on the discard port
    let transport = FeedbackTransport::spawn(&feedback("http://127.0.0.1:9", 0)).unwrap();

    let started = Instant::now();
    for n in 2..=7 {
        transport.publish(&event(n, StepState::Current));
        transport.publish(&event(n, StepState::Completed));
    }
    assert!(started.elapsed() < Duration::from_millis(100));

    let stats = transport.close().await;
    assert_eq!(stats.delivered, 0);
    assert!(stats.dropped >= 1);
    assert_eq!(stats.retried, stats.dropped);
}

#[tokio::test]
async fn test_disabled_transport_discards() {
    let transport = FeedbackTransport::spawn(&FeedbackConfig::default()).unwrap();
    assert!(!transport.is_enabled());
    transport.publish(&event(2, StepState::Current));
    transport.publish_reset();
    assert_eq!(transport.close().await, TransportStats::default());
}

#[tokio::test]
async fn test_health_probe_resyncs_rebooted_controller() {
    let (url, state) = spawn_controller().await;
    let transport = FeedbackTransport::spawn(&feedback(&url, 50)).unwrap();

    transport.publish(&event(3, StepState::Completed));
    transport.publish(&event(4, StepState::Current));
    wait_for(&state, (Some(4), vec![3])).await;

    // Controller loses its state behind the transport's back
    let client = LedClient::new(&feedback(&url, 0)).unwrap();
    client.reset().await.unwrap();

    wait_for(&state, (Some(4), vec![3])).await;
    let stats = transport.close().await;
    assert!(stats.resyncs >= 1);
}

async fn wait_for(state: &ControllerState, expected: (Option<u8>, Vec<u8>)) {
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let seen = view(&state.health().await);
        if seen == expected {
            return;
        }
        assert!(Instant::now() < deadline, "controller stuck at {:?}, wanted {:?}", seen, expected);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
