mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{build_router, sr_submission};
use mastery_core::test_utils::create_test_app_state;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_and_version_are_public() {
    let state = create_test_app_state(None).await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/system/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/api/system/version").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn evaluate_rejects_missing_learner_id() {
    let state = create_test_app_state(None).await;
    let app = build_router(state);

    let mut payload = sr_submission("act-1", "learner-1");
    payload.as_object_mut().unwrap().remove("learner_id");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/evaluate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn evaluate_accepts_well_formed_envelope_and_persists_skill_progress() {
    let state = create_test_app_state(None).await;
    let app = build_router(state);

    let payload = sr_submission("act-sr-1", "learner-42");
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/evaluate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["activity_id"], "act-sr-1");
    assert_eq!(body["learner_id"], "learner-42");
    assert!(body["record_id"].is_number());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/learners/learner-42/skills")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["skills"].as_array().unwrap().len(), 1);
    assert_eq!(body["skills"][0]["skill_id"], "S001");
}

#[tokio::test]
async fn history_requires_skill_id_query_param() {
    let state = create_test_app_state(None).await;
    let app = build_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/learners/learner-1/history")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn config_doc_get_is_public_put_requires_admin_key() {
    let state = create_test_app_state(Some("test-admin-key".to_string())).await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/config/scoring_config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/api/config/not_a_real_doc").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/config/scoring_config")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_string(&json!({})).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_routes_reject_unauthenticated_callers() {
    let state = create_test_app_state(Some("test-admin-key".to_string())).await;
    let app = build_router(state);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/learners/learner-1/reset")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/admin/learners/learner-1/reset")
                .header("X-API-Key", "test-admin-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
