//! Read-only learner endpoints (§6): current skill progress and
//! `ActivityHistoryRow` listings, orderable chronological / recent-first
//! (§4.5).

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{db, db::HistoryOrder, AppResult, AppState};

/// `GET /api/learners/:id/skills`
pub async fn skill_progress_handler(
    State(state): State<Arc<AppState>>,
    Path(learner_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let progress = db::list_skill_progress(&state.pool, &learner_id).await?;
    Ok(Json(serde_json::json!({ "learner_id": learner_id, "skills": progress })))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub skill_id: String,
    #[serde(default)]
    pub order: Option<String>,
}

/// `GET /api/learners/:id/history?skill_id=&order=chronological|recent`
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
    Path(learner_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let order = match query.order.as_deref() {
        Some("recent") => HistoryOrder::RecentFirst,
        _ => HistoryOrder::Chronological,
    };
    let rows = db::history_rows(&state.pool, &learner_id, &query.skill_id, order).await?;
    Ok(Json(serde_json::json!({
        "learner_id": learner_id,
        "skill_id": query.skill_id,
        "history": rows,
    })))
}
