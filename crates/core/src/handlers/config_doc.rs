//! `GET`/`PUT /api/config/:doc` — the four configuration documents (§6),
//! read by anyone, written only with the admin API key.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::config_store::ConfigDoc;
use crate::{AppError, AppResult, AppState};

use super::check_auth;

fn resolve_doc(name: &str) -> AppResult<ConfigDoc> {
    ConfigDoc::from_name(name).ok_or_else(|| AppError::NotFound(format!("unknown config document '{name}'")))
}

/// `GET /api/config/:doc`
pub async fn get_doc(
    State(state): State<Arc<AppState>>,
    Path(doc): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let doc = resolve_doc(&doc)?;
    Ok(Json(state.config_store.get_raw(doc).await?))
}

/// `PUT /api/config/:doc` — admin-key protected.
pub async fn put_doc(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Path(doc): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> AppResult<Json<serde_json::Value>> {
    check_auth(&state, &headers)?;
    let doc = resolve_doc(&doc)?;
    state.config_store.put_raw(doc, payload).await?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
