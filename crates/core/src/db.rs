//! Persistence layer: learner profiles, activity records, skill progress,
//! and the per-(learner, skill) activity history ledger the scoring engine
//! reads and appends to.

use chrono::{DateTime, SecondsFormat, Utc};
use mastery_shared::{
    ActivityHistoryRow, ActivityType, GateStatus, LearnerProfile, LearnerStatus, OverallStatus,
    SkillProgress,
};
use mastery_shared::error::{EngineError, EngineResult};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::future::Future;
use tokio::time::{timeout, Duration};
use tracing::info;

/// Database operations use a 30s connection timeout (§5); connections are
/// never shared across concurrent callers.
const DB_TIMEOUT_SECS: u64 = 30;
const MIGRATION_TIMEOUT_SECS: u64 = 30;

/// History ordering for `history_rows` (§4.5: "chronological" = oldest-first,
/// "recent-first" = newest-first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOrder {
    Chronological,
    RecentFirst,
}

/// Wrap a query future with a fixed timeout, mapping both the timeout and the
/// underlying sqlx error into a `StorageError`.
async fn timed<T, F>(fut: F) -> EngineResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    timeout(Duration::from_secs(DB_TIMEOUT_SECS), fut)
        .await
        .map_err(|_| {
            EngineError::StorageError(format!(
                "database operation timed out after {DB_TIMEOUT_SECS}s"
            ))
        })?
        .map_err(|e| EngineError::StorageError(e.to_string()))
}

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    info!("running database migrations");
    let migration_future = sqlx::migrate!("./migrations").run(pool);
    timeout(Duration::from_secs(MIGRATION_TIMEOUT_SECS), migration_future)
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "database migrations timed out after {}s",
                MIGRATION_TIMEOUT_SECS
            )
        })?
        .map_err(|e| anyhow::anyhow!("database migration failed: {}", e))?;
    Ok(())
}

fn parse_rfc3339(s: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| EngineError::StorageError(format!("malformed timestamp '{s}': {e}")))
}

fn fmt_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn activity_type_from_str(s: &str) -> EngineResult<ActivityType> {
    Ok(match s {
        "CR" => ActivityType::CR,
        "COD" => ActivityType::COD,
        "RP" => ActivityType::RP,
        "SR" => ActivityType::SR,
        "BR" => ActivityType::BR,
        other => return Err(EngineError::StorageError(format!("unknown activity_type '{other}'"))),
    })
}

fn gate_status_str(s: GateStatus) -> &'static str {
    match s {
        GateStatus::NeedsImprovement => "needs_improvement",
        GateStatus::Developing => "developing",
        GateStatus::Approaching => "approaching",
        GateStatus::Passed => "passed",
    }
}

fn parse_gate_status(s: &str) -> EngineResult<GateStatus> {
    Ok(match s {
        "needs_improvement" => GateStatus::NeedsImprovement,
        "developing" => GateStatus::Developing,
        "approaching" => GateStatus::Approaching,
        "passed" => GateStatus::Passed,
        other => return Err(EngineError::StorageError(format!("unknown gate status '{other}'"))),
    })
}

fn overall_status_str(s: OverallStatus) -> &'static str {
    match s {
        OverallStatus::NeedsImprovement => "needs_improvement",
        OverallStatus::Developing => "developing",
        OverallStatus::Approaching => "approaching",
        OverallStatus::Mastered => "mastered",
    }
}

fn parse_overall_status(s: &str) -> EngineResult<OverallStatus> {
    Ok(match s {
        "needs_improvement" => OverallStatus::NeedsImprovement,
        "developing" => OverallStatus::Developing,
        "approaching" => OverallStatus::Approaching,
        "mastered" => OverallStatus::Mastered,
        other => return Err(EngineError::StorageError(format!("unknown overall status '{other}'"))),
    })
}

/// Fetch a learner profile, creating a default one (status `active`) if none
/// exists yet — mirrors the original's "first submission creates the account"
/// behavior.
pub async fn get_or_create_learner(pool: &SqlitePool, learner_id: &str) -> EngineResult<LearnerProfile> {
    let row = timed(
        sqlx::query_as::<_, (String, String, String, String, String, Option<String>, Option<String>, String, String)>(
            "SELECT learner_id, name, email, enrollment_date, status, background, experience_level, created, last_updated \
             FROM learner_profiles WHERE learner_id = ?",
        )
        .bind(learner_id)
        .fetch_optional(pool),
    )
    .await?;

    if let Some((learner_id, name, email, enrollment_date, status, background, experience_level, created, last_updated)) = row {
        return Ok(LearnerProfile {
            learner_id,
            name,
            email,
            enrollment_date: parse_rfc3339(&enrollment_date)?,
            status: if status == "active" { LearnerStatus::Active } else { LearnerStatus::Inactive },
            background,
            experience_level,
            created: parse_rfc3339(&created)?,
            last_updated: parse_rfc3339(&last_updated)?,
        });
    }

    let profile = LearnerProfile::new(learner_id, learner_id, format!("{learner_id}@unknown.invalid"));
    insert_learner(pool, &profile).await?;
    Ok(profile)
}

async fn insert_learner(pool: &SqlitePool, profile: &LearnerProfile) -> EngineResult<()> {
    timed(
        sqlx::query(
            "INSERT OR IGNORE INTO learner_profiles \
             (learner_id, name, email, enrollment_date, status, background, experience_level, created, last_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.learner_id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(fmt_rfc3339(&profile.enrollment_date))
        .bind(match profile.status {
            LearnerStatus::Active => "active",
            LearnerStatus::Inactive => "inactive",
        })
        .bind(&profile.background)
        .bind(&profile.experience_level)
        .bind(fmt_rfc3339(&profile.created))
        .bind(fmt_rfc3339(&profile.last_updated))
        .execute(pool),
    )
    .await?;
    Ok(())
}

pub async fn touch_learner_last_updated(pool: &SqlitePool, learner_id: &str) -> EngineResult<()> {
    timed(
        sqlx::query("UPDATE learner_profiles SET last_updated = ? WHERE learner_id = ?")
            .bind(fmt_rfc3339(&Utc::now()))
            .bind(learner_id)
            .execute(pool),
    )
    .await?;
    Ok(())
}

/// Append a new activity record, returning its assigned `record_id`. Never
/// mutated afterward.
pub async fn insert_activity_record(
    pool: &SqlitePool,
    activity_id: &str,
    learner_id: &str,
    evaluation_result: &serde_json::Value,
    activity_transcript: &serde_json::Value,
    scored: bool,
) -> EngineResult<i64> {
    let record_id = timed(
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO activity_records (activity_id, learner_id, timestamp, evaluation_result, activity_transcript, scored) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING record_id",
        )
        .bind(activity_id)
        .bind(learner_id)
        .bind(fmt_rfc3339(&Utc::now()))
        .bind(evaluation_result.to_string())
        .bind(activity_transcript.to_string())
        .bind(scored)
        .fetch_one(pool),
    )
    .await?;
    Ok(record_id)
}

/// Insert or replace the history row for `(learner_id, activity_id, skill_id)`.
pub async fn upsert_history_row(pool: &SqlitePool, row: &ActivityHistoryRow) -> EngineResult<()> {
    timed(
        sqlx::query(
            "INSERT INTO activity_history \
             (learner_id, record_id, activity_id, skill_id, completion_timestamp, activity_type, activity_title, \
              performance_score, target_evidence_volume, validity_modifier, adjusted_evidence_volume, \
              cumulative_evidence_weight, decay_factor, decay_adjusted_evidence_volume, \
              cumulative_performance, cumulative_evidence, evaluation_result, activity_transcript) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(learner_id, activity_id, skill_id) DO UPDATE SET \
               record_id = excluded.record_id, \
               completion_timestamp = excluded.completion_timestamp, \
               activity_type = excluded.activity_type, \
               activity_title = excluded.activity_title, \
               performance_score = excluded.performance_score, \
               target_evidence_volume = excluded.target_evidence_volume, \
               validity_modifier = excluded.validity_modifier, \
               adjusted_evidence_volume = excluded.adjusted_evidence_volume, \
               cumulative_evidence_weight = excluded.cumulative_evidence_weight, \
               decay_factor = excluded.decay_factor, \
               decay_adjusted_evidence_volume = excluded.decay_adjusted_evidence_volume, \
               cumulative_performance = excluded.cumulative_performance, \
               cumulative_evidence = excluded.cumulative_evidence, \
               evaluation_result = excluded.evaluation_result, \
               activity_transcript = excluded.activity_transcript",
        )
        .bind(&row.learner_id)
        .bind(row.record_id)
        .bind(&row.activity_id)
        .bind(&row.skill_id)
        .bind(fmt_rfc3339(&row.completion_timestamp))
        .bind(row.activity_type.as_str())
        .bind(&row.activity_title)
        .bind(row.performance_score)
        .bind(row.target_evidence_volume)
        .bind(row.validity_modifier)
        .bind(row.adjusted_evidence_volume)
        .bind(row.cumulative_evidence_weight)
        .bind(row.decay_factor)
        .bind(row.decay_adjusted_evidence_volume)
        .bind(row.cumulative_performance)
        .bind(row.cumulative_evidence)
        .bind(row.evaluation_result.to_string())
        .bind(row.activity_transcript.to_string())
        .execute(pool),
    )
    .await?;
    Ok(())
}

#[allow(clippy::type_complexity)]
type HistoryTuple = (
    i64, String, i64, String, String, String, String, String, f64, f64, f64, f64, f64, f64, f64, f64, f64, String, String,
);

fn row_from_tuple(tuple: HistoryTuple) -> EngineResult<ActivityHistoryRow> {
    let (
        history_id,
        learner_id,
        record_id,
        activity_id,
        skill_id,
        completion_timestamp,
        activity_type,
        activity_title,
        performance_score,
        target_evidence_volume,
        validity_modifier,
        adjusted_evidence_volume,
        cumulative_evidence_weight,
        decay_factor,
        decay_adjusted_evidence_volume,
        cumulative_performance,
        cumulative_evidence,
        evaluation_result,
        activity_transcript,
    ) = tuple;
    Ok(ActivityHistoryRow {
        history_id,
        learner_id,
        record_id,
        activity_id,
        skill_id,
        completion_timestamp: parse_rfc3339(&completion_timestamp)?,
        activity_type: activity_type_from_str(&activity_type)?,
        activity_title,
        performance_score,
        target_evidence_volume,
        validity_modifier,
        adjusted_evidence_volume,
        cumulative_evidence_weight,
        decay_factor,
        decay_adjusted_evidence_volume,
        cumulative_performance,
        cumulative_evidence,
        evaluation_result: serde_json::from_str(&evaluation_result)?,
        activity_transcript: serde_json::from_str(&activity_transcript)?,
    })
}

const HISTORY_COLUMNS: &str = "history_id, learner_id, record_id, activity_id, skill_id, completion_timestamp, \
     activity_type, activity_title, performance_score, target_evidence_volume, validity_modifier, \
     adjusted_evidence_volume, cumulative_evidence_weight, decay_factor, decay_adjusted_evidence_volume, \
     cumulative_performance, cumulative_evidence, evaluation_result, activity_transcript";

/// Load all history rows for `(learner_id, skill_id)` in the requested order,
/// with `record_id` as the tie-break for equal timestamps (§4.4.3).
pub async fn history_rows(
    pool: &SqlitePool,
    learner_id: &str,
    skill_id: &str,
    order: HistoryOrder,
) -> EngineResult<Vec<ActivityHistoryRow>> {
    let direction = match order {
        HistoryOrder::Chronological => "ASC",
        HistoryOrder::RecentFirst => "DESC",
    };
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM activity_history WHERE learner_id = ? AND skill_id = ? \
         ORDER BY completion_timestamp {direction}, record_id {direction}"
    );

    let rows = timed(
        sqlx::query_as::<_, HistoryTuple>(&sql)
            .bind(learner_id)
            .bind(skill_id)
            .fetch_all(pool),
    )
    .await?;

    rows.into_iter().map(row_from_tuple).collect()
}

/// All history rows for a learner, grouped by skill in chronological order.
/// Used by retroactive recalculation.
pub async fn history_rows_by_skill(
    pool: &SqlitePool,
    learner_id: &str,
) -> EngineResult<std::collections::HashMap<String, Vec<ActivityHistoryRow>>> {
    let sql = format!(
        "SELECT {HISTORY_COLUMNS} FROM activity_history WHERE learner_id = ? \
         ORDER BY skill_id, completion_timestamp ASC, record_id ASC"
    );
    let rows = timed(
        sqlx::query_as::<_, HistoryTuple>(&sql)
            .bind(learner_id)
            .fetch_all(pool),
    )
    .await?;

    let mut by_skill: std::collections::HashMap<String, Vec<ActivityHistoryRow>> =
        std::collections::HashMap::new();
    for tuple in rows {
        let row = row_from_tuple(tuple)?;
        by_skill.entry(row.skill_id.clone()).or_default().push(row);
    }
    Ok(by_skill)
}

/// All distinct `(learner_id, skill_id)` pairs, used by a full (all-learner)
/// retroactive recalculation pass.
pub async fn all_learner_skill_pairs(pool: &SqlitePool) -> EngineResult<Vec<(String, String)>> {
    let rows = timed(
        sqlx::query_as::<_, (String, String)>(
            "SELECT DISTINCT learner_id, skill_id FROM activity_history",
        )
        .fetch_all(pool),
    )
    .await?;
    Ok(rows)
}

/// Upsert the `(skill_id, learner_id)` summary row.
pub async fn upsert_skill_progress(pool: &SqlitePool, progress: &SkillProgress) -> EngineResult<()> {
    timed(
        sqlx::query(
            "INSERT INTO skill_progress \
             (skill_id, learner_id, skill_name, cumulative_score, total_adjusted_evidence, activity_count, \
              gate_1_status, gate_2_status, overall_status, confidence_lower, confidence_upper, standard_error, last_updated) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(skill_id, learner_id) DO UPDATE SET \
               skill_name = excluded.skill_name, \
               cumulative_score = excluded.cumulative_score, \
               total_adjusted_evidence = excluded.total_adjusted_evidence, \
               activity_count = excluded.activity_count, \
               gate_1_status = excluded.gate_1_status, \
               gate_2_status = excluded.gate_2_status, \
               overall_status = excluded.overall_status, \
               confidence_lower = excluded.confidence_lower, \
               confidence_upper = excluded.confidence_upper, \
               standard_error = excluded.standard_error, \
               last_updated = excluded.last_updated",
        )
        .bind(&progress.skill_id)
        .bind(&progress.learner_id)
        .bind(&progress.skill_name)
        .bind(progress.cumulative_score)
        .bind(progress.total_adjusted_evidence)
        .bind(progress.activity_count)
        .bind(gate_status_str(progress.gate_1_status))
        .bind(gate_status_str(progress.gate_2_status))
        .bind(overall_status_str(progress.overall_status))
        .bind(progress.confidence_lower)
        .bind(progress.confidence_upper)
        .bind(progress.standard_error)
        .bind(fmt_rfc3339(&progress.last_updated)),
    )
    .await
    .map(|_: sqlx::sqlite::SqliteQueryResult| ())?;
    Ok(())
}

pub async fn get_skill_progress(
    pool: &SqlitePool,
    learner_id: &str,
    skill_id: &str,
) -> EngineResult<Option<SkillProgress>> {
    let row = timed(
        sqlx::query_as::<_, (String, String, String, f64, f64, i64, String, String, String, f64, f64, f64, String)>(
            "SELECT skill_id, learner_id, skill_name, cumulative_score, total_adjusted_evidence, activity_count, \
             gate_1_status, gate_2_status, overall_status, confidence_lower, confidence_upper, standard_error, last_updated \
             FROM skill_progress WHERE skill_id = ? AND learner_id = ?",
        )
        .bind(skill_id)
        .bind(learner_id)
        .fetch_optional(pool),
    )
    .await?;
    row.map(skill_progress_from_tuple).transpose()
}

pub async fn list_skill_progress(pool: &SqlitePool, learner_id: &str) -> EngineResult<Vec<SkillProgress>> {
    let rows = timed(
        sqlx::query_as::<_, (String, String, String, f64, f64, i64, String, String, String, f64, f64, f64, String)>(
            "SELECT skill_id, learner_id, skill_name, cumulative_score, total_adjusted_evidence, activity_count, \
             gate_1_status, gate_2_status, overall_status, confidence_lower, confidence_upper, standard_error, last_updated \
             FROM skill_progress WHERE learner_id = ? ORDER BY skill_id",
        )
        .bind(learner_id)
        .fetch_all(pool),
    )
    .await?;
    rows.into_iter().map(skill_progress_from_tuple).collect()
}

#[allow(clippy::type_complexity)]
fn skill_progress_from_tuple(
    tuple: (String, String, String, f64, f64, i64, String, String, String, f64, f64, f64, String),
) -> EngineResult<SkillProgress> {
    let (
        skill_id,
        learner_id,
        skill_name,
        cumulative_score,
        total_adjusted_evidence,
        activity_count,
        gate_1_status,
        gate_2_status,
        overall_status,
        confidence_lower,
        confidence_upper,
        standard_error,
        last_updated,
    ) = tuple;
    Ok(SkillProgress {
        skill_id,
        learner_id,
        skill_name,
        cumulative_score,
        total_adjusted_evidence,
        activity_count: activity_count as u32,
        gate_1_status: parse_gate_status(&gate_1_status)?,
        gate_2_status: parse_gate_status(&gate_2_status)?,
        overall_status: parse_overall_status(&overall_status)?,
        confidence_lower,
        confidence_upper,
        standard_error,
        last_updated: parse_rfc3339(&last_updated)?,
    })
}

/// Delete a learner's activity history, skill progress, and activity records
/// in one transaction, briefly disabling foreign-key checks so the three
/// deletes can run in any order (§4.5).
pub async fn reset_learner_history(pool: &SqlitePool, learner_id: &str) -> EngineResult<()> {
    let fut = async {
        sqlx::query("PRAGMA foreign_keys = OFF").execute(pool).await?;
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM activity_history WHERE learner_id = ?")
            .bind(learner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM skill_progress WHERE learner_id = ?")
            .bind(learner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM activity_records WHERE learner_id = ?")
            .bind(learner_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
        Ok(())
    };
    timed(fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> SqlitePool {
        let pool = connect("sqlite::memory:").await.unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn creates_learner_on_first_access() {
        let pool = test_pool().await;
        let learner = get_or_create_learner(&pool, "learner-1").await.unwrap();
        assert_eq!(learner.learner_id, "learner-1");
        assert!(matches!(learner.status, LearnerStatus::Active));
    }

    fn sample_row(learner_id: &str, record_id: i64, activity_id: &str, ts: &str) -> ActivityHistoryRow {
        ActivityHistoryRow {
            history_id: 0,
            learner_id: learner_id.to_string(),
            record_id,
            activity_id: activity_id.to_string(),
            skill_id: "S001".to_string(),
            completion_timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            activity_type: ActivityType::SR,
            activity_title: "t".to_string(),
            performance_score: 0.8,
            target_evidence_volume: 10.0,
            validity_modifier: 1.0,
            adjusted_evidence_volume: 10.0,
            cumulative_evidence_weight: 10.0,
            decay_factor: 0.9,
            decay_adjusted_evidence_volume: 10.0,
            cumulative_performance: 0.8,
            cumulative_evidence: 10.0,
            evaluation_result: serde_json::json!({}),
            activity_transcript: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn history_rows_respect_requested_order() {
        let pool = test_pool().await;
        get_or_create_learner(&pool, "learner-1").await.unwrap();
        let record_id = insert_activity_record(
            &pool,
            "a1",
            "learner-1",
            &serde_json::json!({}),
            &serde_json::json!({}),
            true,
        )
        .await
        .unwrap();

        upsert_history_row(&pool, &sample_row("learner-1", record_id, "a0", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        upsert_history_row(&pool, &sample_row("learner-1", record_id, "a1", "2026-01-02T00:00:00Z"))
            .await
            .unwrap();

        let chrono_rows = history_rows(&pool, "learner-1", "S001", HistoryOrder::Chronological)
            .await
            .unwrap();
        assert_eq!(chrono_rows[0].activity_id, "a0");

        let recent_rows = history_rows(&pool, "learner-1", "S001", HistoryOrder::RecentFirst)
            .await
            .unwrap();
        assert_eq!(recent_rows[0].activity_id, "a1");
    }

    #[tokio::test]
    async fn skill_progress_upsert_overwrites() {
        let pool = test_pool().await;
        get_or_create_learner(&pool, "learner-1").await.unwrap();
        let progress = SkillProgress {
            skill_id: "S001".to_string(),
            learner_id: "learner-1".to_string(),
            skill_name: "Example Skill".to_string(),
            cumulative_score: 0.5,
            total_adjusted_evidence: 10.0,
            activity_count: 1,
            gate_1_status: GateStatus::Developing,
            gate_2_status: GateStatus::Developing,
            overall_status: OverallStatus::Developing,
            confidence_lower: 0.1,
            confidence_upper: 0.9,
            standard_error: 0.2,
            last_updated: Utc::now(),
        };
        upsert_skill_progress(&pool, &progress).await.unwrap();

        let mut updated = progress.clone();
        updated.cumulative_score = 0.8;
        updated.activity_count = 2;
        upsert_skill_progress(&pool, &updated).await.unwrap();

        let fetched = get_skill_progress(&pool, "learner-1", "S001").await.unwrap().unwrap();
        assert_eq!(fetched.cumulative_score, 0.8);
        assert_eq!(fetched.activity_count, 2);
    }

    #[tokio::test]
    async fn reset_clears_all_three_tables() {
        let pool = test_pool().await;
        get_or_create_learner(&pool, "learner-1").await.unwrap();
        let record_id = insert_activity_record(
            &pool,
            "a1",
            "learner-1",
            &serde_json::json!({}),
            &serde_json::json!({}),
            true,
        )
        .await
        .unwrap();
        upsert_history_row(&pool, &sample_row("learner-1", record_id, "a1", "2026-01-01T00:00:00Z"))
            .await
            .unwrap();
        let progress = SkillProgress {
            skill_id: "S001".to_string(),
            learner_id: "learner-1".to_string(),
            skill_name: "Example Skill".to_string(),
            cumulative_score: 0.8,
            total_adjusted_evidence: 10.0,
            activity_count: 1,
            gate_1_status: GateStatus::Developing,
            gate_2_status: GateStatus::Developing,
            overall_status: OverallStatus::Developing,
            confidence_lower: 0.1,
            confidence_upper: 0.9,
            standard_error: 0.2,
            last_updated: Utc::now(),
        };
        upsert_skill_progress(&pool, &progress).await.unwrap();

        reset_learner_history(&pool, "learner-1").await.unwrap();

        assert!(list_skill_progress(&pool, "learner-1").await.unwrap().is_empty());
        assert!(history_rows(&pool, "learner-1", "S001", HistoryOrder::Chronological)
            .await
            .unwrap()
            .is_empty());
    }
}
