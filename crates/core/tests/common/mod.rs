//! Test-only router assembly, mirroring `mastery_core::run_server`'s route
//! table without the network bind so handler tests can drive it with
//! `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use mastery_core::{handlers, AppState};

/// Mirrors `run_server`'s route tree minus the `rate_limit_middleware` layer
/// (that layer needs `ConnectInfo`, which only a real bound listener
/// populates; it's covered on its own by `middleware`'s unit tests).
pub fn build_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/learners/:id/reset", post(handlers::admin::reset_handler))
        .route("/recalculate", post(handlers::admin::recalculate_handler))
        .route("/config/:doc", put(handlers::config_doc::put_doc));

    let api_routes = Router::new()
        .route("/evaluate", post(handlers::evaluate::evaluate_handler))
        .route("/learners/:id/skills", get(handlers::learners::skill_progress_handler))
        .route("/learners/:id/history", get(handlers::learners::history_handler))
        .route("/config/:doc", get(handlers::config_doc::get_doc))
        .route("/system/health", get(handlers::health_handler))
        .route("/system/version", get(handlers::version_handler))
        .nest("/admin", admin_routes);

    Router::new().nest("/api", api_routes).with_state(state)
}

/// A minimal but schema-valid submission envelope for an `SR` activity,
/// the cheapest activity type to construct (no rubric required).
pub fn sr_submission(activity_id: &str, learner_id: &str) -> serde_json::Value {
    serde_json::json!({
        "activity_id": activity_id,
        "learner_id": learner_id,
        "activity_transcript": {
            "activity_generation_output": {
                "activity_id": activity_id,
                "activity_type": "SR",
                "title": "Two plus two",
                "description": "A single arithmetic check",
                "target_skill": "S001",
                "target_evidence_volume": 2.0,
                "cognitive_level": "L1",
                "depth_level": "D1",
                "rubric": null,
                "content": {
                    "question": "What is 2 + 2?",
                    "options": ["3", "4", "5"],
                    "correct_answer": "4"
                },
                "metadata": {},
                "version": "1.0"
            },
            "student_engagement": {
                "start_timestamp": "2026-01-01T00:00:00Z",
                "submit_timestamp": "2026-01-01T00:02:00Z",
                "completion_status": "completed",
                "component_responses": [
                    {
                        "component_id": "c1",
                        "response_content": "4",
                        "response_type": "selection",
                        "metadata": {}
                    }
                ],
                "assistance_log": []
            }
        }
    })
}
