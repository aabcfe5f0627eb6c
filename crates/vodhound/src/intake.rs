//! Intake HTTP endpoints.
//!
//! Thin boundary: the recorder and the (externally verified) EventSub
//! relay POST signals here, and handlers forward them to the archiver.
//! Request shapes mirror what the recorder sends; anything malformed is
//! rejected with 400 before touching any state.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::archiver::{Archiver, LiveSignal, RecordedSignal};

/// Shared state for intake handlers.
#[derive(Clone)]
pub struct IntakeState {
    pub archiver: Arc<Archiver>,
    pub started: Instant,
}

pub fn router(state: IntakeState) -> Router {
    Router::new()
        .route("/live", post(live))
        .route("/offline", post(offline))
        .route("/update", post(update))
        .route("/recorded", post(recorded))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LiveRequest {
    channel: String,
    #[serde(rename = "channelID")]
    channel_id: String,
    id: Uuid,
    #[serde(rename = "queueId")]
    queue_id: Uuid,
}

impl LiveRequest {
    fn validate(self) -> Option<LiveSignal> {
        if self.channel.len() < 3 {
            return None;
        }
        if self.channel_id.is_empty() || !self.channel_id.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(LiveSignal {
            queue_id: self.queue_id,
            channel_id: self.channel_id,
            channel: self.channel.to_lowercase(),
            id: self.id,
        })
    }
}

async fn live(
    State(state): State<IntakeState>,
    Json(request): Json<LiveRequest>,
) -> impl IntoResponse {
    let Some(signal) = request.validate() else {
        tracing::warn!("rejecting malformed live request");
        return (StatusCode::BAD_REQUEST, "bad request");
    };
    state.archiver.handle_live(signal).await;
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
struct OfflineRequest {
    #[serde(rename = "queueId")]
    queue_id: Uuid,
}

async fn offline(
    State(state): State<IntakeState>,
    Json(request): Json<OfflineRequest>,
) -> impl IntoResponse {
    state.archiver.handle_offline(request.queue_id).await;
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    channel_id: String,
    game: String,
    title: String,
    timestamp: String,
}

async fn update(
    State(state): State<IntakeState>,
    Json(request): Json<UpdateRequest>,
) -> impl IntoResponse {
    state.archiver.handle_update(
        &request.channel_id,
        &request.game,
        &request.title,
        &request.timestamp,
    );
    (StatusCode::OK, "ok")
}

#[derive(Debug, Deserialize)]
struct RecordedRequest {
    channel: String,
    #[serde(rename = "channelID")]
    channel_id: String,
    id: Uuid,
    title: String,
    started_at: chrono::DateTime<chrono::Utc>,
}

async fn recorded(
    State(state): State<IntakeState>,
    Json(request): Json<RecordedRequest>,
) -> impl IntoResponse {
    let rendered = state.archiver.finalize_recording(&RecordedSignal {
        channel_id: request.channel_id,
        channel: request.channel.to_lowercase(),
        id: request.id,
        title: request.title,
        started_at: request.started_at,
    });
    Json(serde_json::json!({
        "part": rendered.part_number,
        "title": rendered.title,
    }))
    .into_response()
}

async fn health(State(state): State<IntakeState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "uptime_secs": state.started.elapsed().as_secs(),
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": { "active": state.archiver.active_sessions() },
        "subscriptions": { "active": state.archiver.active_subscriptions() },
    }))
}
