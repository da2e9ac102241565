//! Confirms `db::init_db` applies the full schema and is safe to run twice
//! against the same pool (the real boot path re-runs it on every restart).

use sqlx::{Row, SqlitePool};

async fn table_names(pool: &SqlitePool) -> Vec<String> {
    sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .fetch_all(pool)
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .collect()
}

#[tokio::test]
async fn creates_expected_tables() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();

    let tables = table_names(&pool).await;
    for expected in ["learner_profiles", "activity_records", "skill_progress", "activity_history"] {
        assert!(tables.contains(&expected.to_string()), "missing table {expected}, got {tables:?}");
    }
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();

    let tables = table_names(&pool).await;
    assert!(tables.contains(&"activity_history".to_string()));
}

#[tokio::test]
async fn activity_history_enforces_uniqueness_per_learner_activity_skill() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    mastery_core::db::init_db(&pool).await.unwrap();

    mastery_core::db::get_or_create_learner(&pool, "learner-u").await.unwrap();
    let record_id = mastery_core::db::insert_activity_record(
        &pool,
        "act-u",
        "learner-u",
        &serde_json::json!({}),
        &serde_json::json!({}),
        true,
    )
    .await
    .unwrap();

    let now = chrono::Utc::now();
    let row = mastery_shared::ActivityHistoryRow {
        history_id: 0,
        learner_id: "learner-u".to_string(),
        record_id,
        activity_id: "act-u".to_string(),
        skill_id: "S001".to_string(),
        completion_timestamp: now,
        activity_type: mastery_shared::ActivityType::SR,
        activity_title: "t".to_string(),
        performance_score: 0.8,
        target_evidence_volume: 2.0,
        validity_modifier: 1.0,
        adjusted_evidence_volume: 2.0,
        cumulative_evidence_weight: 2.0,
        decay_factor: 0.9,
        decay_adjusted_evidence_volume: 2.0,
        cumulative_performance: 0.8,
        cumulative_evidence: 2.0,
        evaluation_result: serde_json::json!({}),
        activity_transcript: serde_json::json!({}),
    };

    mastery_core::db::upsert_history_row(&pool, &row).await.unwrap();
    // Re-inserting the same (learner, activity, skill) replaces rather than
    // errors (insert-or-replace on re-evaluation, per the history row's
    // documented uniqueness constraint).
    mastery_core::db::upsert_history_row(&pool, &row).await.unwrap();

    let rows = mastery_core::db::history_rows(&pool, "learner-u", "S001", mastery_core::db::HistoryOrder::Chronological)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}
