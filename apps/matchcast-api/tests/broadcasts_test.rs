mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum_test::TestServer;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use matchcast_api::broadcast::types::{Message, NotificationTarget};
use matchcast_api::config::Config;
use matchcast_api::db::BroadcastRepository;
use matchcast_api::delivery::{DeliveryError, DeliveryExecutor};
use matchcast_api::models::broadcast_record::RecordStatus;

fn live_body() -> Value {
    json!({
        "title": "Football APP",
        "content": "TeamA vs TeamB - LIVE",
        "channels": ["TeamA", "TeamB"],
    })
}

#[tokio::test]
async fn broadcast_is_dispatched_then_recorded() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server.post("/api/v1/broadcasts/42").json(&live_body()).await;
    resp.assert_status(http::StatusCode::ACCEPTED);
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "dispatched");
    assert_eq!(body["event_id"], 42);
    assert_eq!(body["target_count"], 3);
    assert!(body["job_id"].as_str().unwrap().starts_with("job_"));

    state.orchestrator.shutdown().await;

    let record = state.broadcasts.get_by_event_id(42).await.unwrap().unwrap();
    assert_eq!(record.status, RecordStatus::Completed);
    assert_eq!(
        record.content_hash,
        Message::new("Football APP", "TeamA vs TeamB - LIVE").fingerprint()
    );
}

#[tokio::test]
async fn repeated_event_is_already_sent() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    server
        .post("/api/v1/broadcasts/7")
        .json(&live_body())
        .await
        .assert_status(http::StatusCode::ACCEPTED);

    let resp = server.post("/api/v1/broadcasts/7").json(&live_body()).await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["outcome"], "already_sent");
    assert_eq!(body["event_id"], 7);

    state.orchestrator.shutdown().await;
}

#[tokio::test]
async fn unknown_channel_reports_no_targets() {
    let (app, state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/broadcasts/9")
        .json(&json!({ "content": "kick-off", "channels": ["TeamZ"] }))
        .await;
    resp.assert_status_ok();
    assert_eq!(resp.json::<Value>()["outcome"], "no_targets");
    assert!(state.broadcasts.get_by_event_id(9).await.unwrap().is_none());
}

#[tokio::test]
async fn invalid_event_id_is_rejected() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/broadcasts/kickoff")
        .json(&live_body())
        .await;
    resp.assert_status_bad_request();
    assert_eq!(resp.json::<Value>()["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn empty_channel_list_is_a_validation_error() {
    let (app, _state) = common::test_app();
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/broadcasts/42")
        .json(&json!({ "content": "goal", "channels": ["  "] }))
        .await;
    resp.assert_status_bad_request();
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "channels");
}

/// Blocks every delivery until the test releases permits.
struct HeldExecutor {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl DeliveryExecutor for HeldExecutor {
    async fn send(&self, _target: &NotificationTarget, _message: &Message) -> Result<(), DeliveryError> {
        let _permit = self.gate.acquire().await.map_err(|_| DeliveryError::Transport("closed".into()))?;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn full_queue_returns_service_unavailable() {
    let gate = Arc::new(Semaphore::new(0));
    let config = Config {
        workers: 1,
        queue_capacity: 1,
        ..Config::reliable()
    };
    let state = common::test_state_with(config, Arc::new(HeldExecutor { gate: gate.clone() }));
    let server = TestServer::new(matchcast_api::routes::router().with_state(state.clone())).unwrap();

    // One job held by the worker, one waiting in the queue.
    for id in [1, 2] {
        server
            .post(&format!("/api/v1/broadcasts/{id}"))
            .json(&live_body())
            .await
            .assert_status(http::StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let resp = server.post("/api/v1/broadcasts/3").json(&live_body()).await;
    resp.assert_status(http::StatusCode::SERVICE_UNAVAILABLE);
    assert!(state.broadcasts.get_by_event_id(3).await.unwrap().is_none());

    gate.add_permits(64);
    state.orchestrator.shutdown().await;
}
