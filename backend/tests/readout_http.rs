use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use backend::readout::{ReadoutState, router};
use backend::runner::stop_pair;
use chrono::{TimeZone, Utc};
use corelib::{ChannelReading, Sample};
use engine::{CadencePhase, DeltaEngine};
use serde_json::Value;
use tower::ServiceExt;

async fn call(state: &ReadoutState, method: Method, uri: &str) -> (StatusCode, String) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let resp = router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn state() -> ReadoutState {
    let (handle, _signal) = stop_pair();
    ReadoutState::new(handle)
}

#[tokio::test]
async fn banner_and_health() {
    let state = state();

    let (status, body) = call(&state, Method::GET, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Velocity recorder running");

    let (status, body) = call(&state, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn latest_routes_are_unavailable_before_data() {
    let state = state();

    for uri in ["/api/eeg/latest", "/api/latest"] {
        let (status, body) = call(&state, Method::GET, uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(body, "No data yet");
    }
}

#[tokio::test]
async fn latest_channels_are_a_flat_map() {
    let state = state();
    let mut reading = ChannelReading::new(Utc::now());
    reading.insert("TP9", 12.5);
    reading.insert("AF7", -3.0);
    state.channels.set(reading);

    let (status, body) = call(&state, Method::GET, "/api/eeg/latest").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["TP9"], 12.5);
    assert_eq!(json["AF7"], -3.0);
    assert_eq!(json.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn latest_record_and_status() {
    let state = state();
    let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();

    let mut engine = DeltaEngine::new();
    engine.ingest(Sample::new(50.0, t0)).unwrap();
    let record = engine
        .ingest(Sample::new(40.0, t0 + chrono::TimeDelta::minutes(1)))
        .unwrap()
        .unwrap();
    state.publish_record(&record);
    state.publish_phase(CadencePhase::Idle);

    let (status, body) = call(&state, Method::GET, "/api/latest").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["value"], 40.0);
    assert_eq!(json["delta"], -10.0);
    assert_eq!(json["direction"], "down");
    assert_eq!(json["velocity_per_minute"], 10.0);
    assert_eq!(json["pct_change"], -20.0);
    assert_eq!(json["has_previous"], true);

    let (_, body) = call(&state, Method::GET, "/api/status").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["phase"], "idle");
    assert_eq!(json["records"], 1);
    assert_eq!(json["latest_minute"], "2025-01-01T09:01:00Z");
}

#[tokio::test]
async fn stop_route_triggers_the_signal() {
    let (handle, signal) = stop_pair();
    let state = ReadoutState::new(handle);

    let (status, body) = call(&state, Method::POST, "/api/stop").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Streaming stopped.");
    assert!(signal.is_stopped());

    // the server keeps answering after a stop
    let (status, _) = call(&state, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stop_route_rejects_get() {
    let state = state();
    let (status, _) = call(&state, Method::GET, "/api/stop").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}
