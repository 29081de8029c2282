//! Thin HTTP front door.
//!
//! Routes are adapters over the core: submit a batch, poll or stream a
//! session's progress, reset a session, read a batch's failure log. No
//! business logic lives here.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::channels::ChannelRegistry;
use crate::dispatch::{
    BatchRequest, BatchScheduler, DispatchOptions, FailureEntry, FailureLog, TrackOverrides,
};
use crate::progress::{ProgressRecord, ProgressStore};

#[derive(Clone)]
pub struct ServerState {
    pub scheduler: Arc<BatchScheduler>,
    pub progress: Arc<ProgressStore>,
    pub fail_log: Arc<FailureLog>,
    pub registry: Arc<ChannelRegistry>,
    pub default_max_concurrent: usize,
    pub default_device: String,
}

#[derive(Debug, Deserialize)]
pub struct DispatchBody {
    pub track_ids: Vec<String>,
    pub channels: Vec<String>,
    #[serde(default)]
    pub options: Option<DispatchOptions>,
    #[serde(default)]
    pub per_track: HashMap<String, TrackOverrides>,
    pub max_concurrent: Option<usize>,
    /// Client-supplied batch id; generated when absent.
    pub batch_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub batch_id: String,
    /// Per-track progress session ids, in submission order.
    pub session_ids: Vec<String>,
}

pub async fn run_server(state: ServerState, port: u16, shutdown: CancellationToken) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    info!("Listening on port {}", port);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("Server error")?;
    Ok(())
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/dispatch", post(post_dispatch))
        .route("/api/channels", get(get_channels))
        .route("/api/progress/{session_id}", get(get_progress))
        .route("/api/progress/{session_id}", delete(delete_progress))
        .route("/api/progress/{session_id}/stream", get(stream_progress))
        .route("/api/failures/{batch_id}", get(get_failures))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn post_dispatch(
    State(state): State<ServerState>,
    Json(body): Json<DispatchBody>,
) -> impl IntoResponse {
    if body.track_ids.is_empty() {
        return (StatusCode::BAD_REQUEST, "track_ids must not be empty").into_response();
    }
    if body.channels.is_empty() {
        return (StatusCode::BAD_REQUEST, "channels must not be empty").into_response();
    }

    let options = body.options.unwrap_or_else(|| DispatchOptions {
        device: state.default_device.clone(),
        ..Default::default()
    });
    let batch_id = body
        .batch_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let session_ids = body
        .track_ids
        .iter()
        .map(|track_id| BatchScheduler::session_id(&batch_id, track_id))
        .collect();

    let request = BatchRequest {
        track_ids: body.track_ids,
        channels: body.channels,
        options,
        per_track: body.per_track,
        max_concurrent: body.max_concurrent.unwrap_or(state.default_max_concurrent),
    };
    state.scheduler.spawn(batch_id.clone(), request);

    Json(DispatchResponse {
        batch_id,
        session_ids,
    })
    .into_response()
}

async fn get_channels(State(state): State<ServerState>) -> Json<Vec<String>> {
    Json(state.registry.keys())
}

async fn get_progress(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Json<ProgressRecord> {
    Json(state.progress.get(&session_id))
}

async fn delete_progress(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    state.progress.delete(&session_id);
    StatusCode::NO_CONTENT
}

/// Live progress feed: polls the store once per second and emits the current
/// record. Reads only; never mutates a session.
async fn stream_progress(
    State(state): State<ServerState>,
    Path(session_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let progress = state.progress.clone();
    let interval = tokio::time::interval(Duration::from_secs(1));
    let stream = futures::stream::unfold(
        (progress, session_id, interval),
        |(progress, session_id, mut interval)| async move {
            interval.tick().await;
            let record = progress.get(&session_id);
            let event = Event::default()
                .json_data(&record)
                .unwrap_or_else(|_| Event::default().data("{}"));
            Some((Ok(event), (progress, session_id, interval)))
        },
    );
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn get_failures(
    State(state): State<ServerState>,
    Path(batch_id): Path<String>,
) -> Json<Vec<FailureEntry>> {
    Json(state.fail_log.entries(&batch_id))
}
