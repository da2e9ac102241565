//! `GET /api/events` — Server-Sent Events stream of evaluation/error/system
//! events, mirroring the teacher's broadcast-channel SSE pattern.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    extract::{Query, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Json,
};
use futures::stream::Stream;
use serde::Deserialize;

use crate::{AppResult, AppState};

pub async fn sse_handler(State(state): State<Arc<AppState>>) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let mut rx = state.event_log.subscribe();
    let stream = async_stream::stream! {
        yield Ok(SseEvent::default().event("handshake").data("connected"));
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(json) = serde_json::to_string(&event) {
                        yield Ok(SseEvent::default().data(json));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "SSE stream lagged, dropping buffered events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("keep-alive"))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `GET /api/events/history?limit=N` — a convenience read over the durable
/// JSONL streams for operators who don't want to hold an SSE connection open
/// (§6 Event Log). Not a replacement for the live stream: no guarantee of
/// exactly-once delivery against concurrent appends.
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let limit = query.limit.unwrap_or(50).min(1000);
    let events = state.event_log.recent(limit).await?;
    Ok(Json(serde_json::json!({ "events": events })))
}
