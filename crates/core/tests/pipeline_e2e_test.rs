//! End-to-end exercise of `Orchestrator::evaluate` with no LLM provider
//! credentials configured — every phase that calls out to a provider fails
//! over to its safe default payload (spec.md §8 E6) instead of the
//! evaluation as a whole erroring out.

mod common;

use std::sync::Arc;

use common::sr_submission;
use mastery_core::config_store::ConfigStore;
use mastery_core::events::EventLog;
use mastery_core::llm::Gateway;
use mastery_core::pipeline::Orchestrator;
use mastery_core::scoring::ScoringEngine;
use mastery_core::validation::parse_submission_envelope;
use sqlx::SqlitePool;

async fn test_orchestrator() -> Orchestrator {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();

    let config_dir = std::env::temp_dir().join(format!("mastery-pipeline-test-{}", uuid::Uuid::new_v4()));
    let config_store = Arc::new(ConfigStore::load(config_dir).await.unwrap());
    let event_log_dir = std::env::temp_dir().join(format!("mastery-pipeline-events-{}", uuid::Uuid::new_v4()));
    let event_log = Arc::new(EventLog::new(event_log_dir).unwrap());
    let gateway = Arc::new(Gateway::new(None, None, None));
    let scoring_engine = Arc::new(ScoringEngine::new(pool.clone()));

    Orchestrator::new(pool, config_store, gateway, scoring_engine, event_log)
}

#[tokio::test]
async fn no_providers_configured_still_produces_a_scored_result() {
    let orchestrator = test_orchestrator().await;
    let envelope = parse_submission_envelope(sr_submission("act-e2e-1", "learner-e2e-1")).unwrap();

    let result = orchestrator.evaluate(envelope).await.unwrap();

    assert!(!result.overall_success, "combined phase should have failed over with no providers reachable");
    assert!(result.record_id.is_some());
    assert_eq!(result.phases.len(), 4);

    let combined = result.phases.iter().find(|p| p.phase == "combined_evaluation").unwrap();
    assert!(!combined.success);
    assert_eq!(combined.payload["overall_score"], 0.5);

    let trend = result.phases.iter().find(|p| p.phase == "trend").unwrap();
    assert!(trend.success);
    assert_eq!(trend.payload["trend"], "disabled");

    assert_eq!(result.skill_progress.len(), 1);
    assert_eq!(result.skill_progress[0].skill_id, "S001");
}

#[tokio::test]
async fn malformed_envelope_short_circuits_with_no_phases_run() {
    let orchestrator = test_orchestrator().await;
    let mut payload = sr_submission("act-e2e-2", "learner-e2e-2");
    payload["activity_transcript"]["activity_generation_output"]["target_evidence_volume"] = serde_json::json!(-1.0);
    let envelope = parse_submission_envelope(payload).unwrap();

    let result = orchestrator.evaluate(envelope).await.unwrap();

    assert!(!result.overall_success);
    assert!(result.record_id.is_none());
    assert!(result.phases.is_empty());
}

#[tokio::test]
async fn activity_record_storage_failure_degrades_instead_of_erroring() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();
    // Drop the table `insert_activity_record` writes to, so the orchestrator
    // observes the same StorageError a real write failure would raise.
    sqlx::query("DROP TABLE activity_records").execute(&pool).await.unwrap();

    let config_dir = std::env::temp_dir().join(format!("mastery-pipeline-test-{}", uuid::Uuid::new_v4()));
    let config_store = Arc::new(ConfigStore::load(config_dir).await.unwrap());
    let event_log_dir = std::env::temp_dir().join(format!("mastery-pipeline-events-{}", uuid::Uuid::new_v4()));
    let event_log = Arc::new(EventLog::new(event_log_dir).unwrap());
    let gateway = Arc::new(Gateway::new(None, None, None));
    let scoring_engine = Arc::new(ScoringEngine::new(pool.clone()));
    let orchestrator = Orchestrator::new(pool, config_store, gateway, scoring_engine, event_log);

    let envelope = parse_submission_envelope(sr_submission("act-e2e-storage", "learner-e2e-storage")).unwrap();
    let result = orchestrator.evaluate(envelope).await.unwrap();

    assert!(!result.overall_success);
    assert!(result.record_id.is_none());
    assert_eq!(result.skill_progress.len(), 0);
}

#[tokio::test]
async fn repeated_submission_accumulates_evidence_for_the_same_skill() {
    let orchestrator = test_orchestrator().await;

    let first = orchestrator
        .evaluate(parse_submission_envelope(sr_submission("act-e2e-3a", "learner-e2e-3")).unwrap())
        .await
        .unwrap();
    let second = orchestrator
        .evaluate(parse_submission_envelope(sr_submission("act-e2e-3b", "learner-e2e-3")).unwrap())
        .await
        .unwrap();

    assert_eq!(first.skill_progress[0].activity_count, 1);
    assert_eq!(second.skill_progress[0].activity_count, 2);
    assert!(second.skill_progress[0].total_adjusted_evidence > first.skill_progress[0].total_adjusted_evidence);
}
