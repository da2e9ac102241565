//! `POST /api/evaluate` — the UI-layer's single entry point into the engine
//! (§1 scope boundary / §6). Accepts a submission envelope, runs it through
//! the Pipeline Orchestrator, and returns the full `EvaluationResult`.

use std::sync::Arc;

use axum::{extract::State, Json};

use crate::{validation, AppResult, AppState};

pub async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<Json<serde_json::Value>> {
    let envelope = validation::parse_submission_envelope(payload)?;
    let result = state.orchestrator.evaluate(envelope).await?;
    Ok(Json(serde_json::to_value(result)?))
}
