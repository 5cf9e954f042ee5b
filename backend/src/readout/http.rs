//! HTTP readout.
//!
//! Routes:
//! - `GET  /`                banner
//! - `GET  /health`          liveness
//! - `GET  /api/eeg/latest`  latest channel map, 503 before the first reading
//! - `GET  /api/latest`      latest record, 503 before the first record
//! - `GET  /api/status`      controller phase and record count
//! - `POST /api/stop`        stop acquisition; the server keeps serving

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use corelib::{MinuteKey, Record};
use engine::CadencePhase;
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::info;

use super::ReadoutState;

pub const BANNER: &str = "Velocity recorder running";

#[derive(Error, Debug)]
pub enum ReadoutError {
    #[error("No data yet")]
    NoData,
}

impl IntoResponse for ReadoutError {
    fn into_response(self) -> Response {
        match self {
            ReadoutError::NoData => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
            }
        }
    }
}

pub fn router(state: ReadoutState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/api/eeg/latest", get(latest_channels))
        .route("/api/latest", get(latest_record))
        .route("/api/status", get(status))
        .route("/api/stop", post(stop))
        .with_state(state)
}

/// Serves the readout until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: ReadoutState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("readout listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn banner() -> &'static str {
    BANNER
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn latest_channels(
    State(state): State<ReadoutState>,
) -> Result<Json<BTreeMap<String, f64>>, ReadoutError> {
    let reading = state.channels.get().ok_or(ReadoutError::NoData)?;
    Ok(Json(reading.channels))
}

async fn latest_record(State(state): State<ReadoutState>) -> Result<Json<Record>, ReadoutError> {
    state.record.get().map(Json).ok_or(ReadoutError::NoData)
}

#[derive(Debug, Serialize)]
struct StatusView {
    phase: CadencePhase,
    records: u64,
    latest_minute: Option<MinuteKey>,
}

async fn status(State(state): State<ReadoutState>) -> Json<StatusView> {
    Json(StatusView {
        phase: state.current_phase(),
        records: state.records_accepted(),
        latest_minute: state.record.get().map(|r| r.timestamp),
    })
}

async fn stop(State(state): State<ReadoutState>) -> &'static str {
    state.request_stop();
    info!("stop requested over http");
    "Streaming stopped."
}
