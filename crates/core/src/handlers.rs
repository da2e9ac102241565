pub mod admin;
pub mod config_doc;
pub mod events;
pub mod evaluate;
pub mod learners;

use axum::http::HeaderMap;

use crate::{AppError, AppResult, AppState};

/// GET /api/system/version — public, no auth.
pub async fn version_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/system/health — lightweight liveness check, no auth required.
pub async fn health_handler() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// Constant-time comparison of the `X-API-Key` header against the
/// configured `ADMIN_API_KEY` (§6). Guards every admin-tagged route.
pub(crate) fn check_auth(state: &AppState, headers: &HeaderMap) -> AppResult<()> {
    use subtle::ConstantTimeEq;

    let Some(ref required_key) = state.config.admin_api_key else {
        if cfg!(debug_assertions) {
            tracing::warn!("admin endpoint reached without ADMIN_API_KEY configured (debug build only)");
            return Ok(());
        }
        return Err(AppError::Unauthorized);
    };

    let provided = headers.get("X-API-Key").and_then(|h| h.to_str().ok());
    let matches: bool = match provided {
        Some(p) => p.as_bytes().ct_eq(required_key.as_bytes()).into(),
        None => false,
    };

    if matches {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn accepts_matching_api_key() {
        let state = crate::test_utils::create_test_app_state(Some("test-secret-key".to_string())).await;
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static("test-secret-key"));
        assert!(check_auth(&state, &headers).is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_api_key() {
        let state = crate::test_utils::create_test_app_state(Some("test-secret-key".to_string())).await;
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static("wrong-key"));
        assert!(matches!(check_auth(&state, &headers), Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let state = crate::test_utils::create_test_app_state(Some("test-secret-key".to_string())).await;
        let headers = HeaderMap::new();
        assert!(check_auth(&state, &headers).is_err());
    }

    #[tokio::test]
    async fn case_sensitive_comparison() {
        let state = crate::test_utils::create_test_app_state(Some("test-secret-key".to_string())).await;
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static("TEST-SECRET-KEY"));
        assert!(check_auth(&state, &headers).is_err());
    }
}
