//! Destructive operator operations (§9): reset a learner's history and
//! retroactive recalculation. Both are admin-key protected and both must not
//! run concurrently with submissions for the affected learner(s) — enforced
//! by the per-learner lock the `ScoringEngine` already holds.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::{db, AppResult, AppState};

use super::check_auth;

/// `POST /api/admin/learners/:id/reset`
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(learner_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    db::reset_learner_history(&state.pool, &learner_id).await?;
    tracing::warn!(learner_id, "learner history reset");
    Ok(Json(serde_json::json!({ "status": "reset", "learner_id": learner_id })))
}

#[derive(Debug, Default, Deserialize)]
pub struct RecalculateRequest {
    pub learner_id: Option<String>,
    pub skill_id: Option<String>,
}

/// `POST /api/admin/recalculate` — a single `(learner_id, skill_id)` pair if
/// both are given, otherwise every pair in the system.
pub async fn recalculate_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    body: Option<Json<RecalculateRequest>>,
) -> AppResult<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let scoring_config = state.config_store.scoring_config().await;
    let domain_model = state.config_store.domain_model().await;

    let recalculated = match (req.learner_id, req.skill_id) {
        (Some(learner_id), Some(skill_id)) => {
            state
                .scoring_engine
                .recalculate_skill(&scoring_config, &domain_model, &learner_id, &skill_id)
                .await?;
            1
        }
        _ => state.scoring_engine.recalculate_all(&scoring_config, &domain_model).await?,
    };

    tracing::warn!(recalculated, "retroactive recalculation complete");
    Ok(Json(serde_json::json!({ "status": "ok", "pairs_recalculated": recalculated })))
}
