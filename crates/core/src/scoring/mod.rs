//! Scoring Engine (§4.4): skill extraction, decay-weighted cumulative score,
//! dual-gate status, history-row emission, and retroactive recalculation.
//! Never calls the LLM (§4.4.7); storage failure yields a default result.

pub mod decay;
pub mod gates;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};

use mastery_shared::error::EngineResult;
use mastery_shared::{ActivityHistoryRow, ActivityType, GateStatus, OverallStatus, SkillProgress};

use crate::config_store::{DomainModel, ScoringConfig};
use crate::db;
use decay::{cumulative_score, confidence_interval, standard_error, weight_rows, ScoreInput};
use gates::{gate_status, GateThresholds};

/// Default target skill when none can be extracted from the payload (§4.4.1).
const DEFAULT_SKILL_ID: &str = "S009";

/// Result of scoring one submission against one target skill — folded into
/// the pipeline's per-phase `ScoringResult`.
#[derive(Debug, Clone)]
pub struct SkillScoreOutcome {
    pub skill_progress: SkillProgress,
}

/// Aggregate scoring outcome for a whole submission (one or more skills).
#[derive(Debug, Clone, Default)]
pub struct ScoringOutcome {
    pub skills: Vec<SkillScoreOutcome>,
    pub success: bool,
}

pub struct ScoringEngine {
    pool: SqlitePool,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ScoringEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, locks: DashMap::new() }
    }

    fn learner_lock(&self, learner_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Extract target skills from the evaluation payload in priority order
    /// (§4.4.1), de-duplicated preserving first-seen order.
    pub fn extract_target_skills(evaluation_result: &serde_json::Value) -> Vec<String> {
        let mut skills = Vec::new();

        if let Some(obj) = evaluation_result
            .get("phase_1a_rubric_evaluation")
            .and_then(|p| p.get("skill_evaluations"))
            .and_then(|v| v.as_object())
        {
            skills.extend(obj.keys().cloned());
        }

        if let Some(targeted) = evaluation_result
            .get("activity_generation_output")
            .and_then(|a| a.get("skills_targeted"))
            .and_then(|v| v.as_array())
        {
            skills.extend(targeted.iter().filter_map(|v| v.as_str()).map(str::to_string));
        }
        if let Some(target) = evaluation_result
            .get("activity_generation_output")
            .and_then(|a| a.get("target_skill"))
            .and_then(|v| v.as_str())
        {
            skills.push(target.to_string());
        }

        if let Some(target) = evaluation_result.get("target_skill").and_then(|v| v.as_str()) {
            skills.push(target.to_string());
        }

        if skills.is_empty() {
            skills.push(DEFAULT_SKILL_ID.to_string());
        }

        let mut seen = std::collections::HashSet::new();
        skills.retain(|s| seen.insert(s.clone()));
        skills
    }

    /// Extract `(performance_score, validity_modifier, target_evidence_volume)`
    /// for one skill from the evaluation payload with the precedence of §4.4.2.
    pub fn extract_skill_data(evaluation_result: &serde_json::Value, skill_id: &str) -> (f64, f64, f64) {
        if let Some(combined) = evaluation_result.get("phase_1_combined_evaluation") {
            let score = combined
                .get("overall_score")
                .or_else(|| combined.get("performance_score"))
                .and_then(|v| v.as_f64());
            let validity = combined.get("validity_modifier").and_then(|v| v.as_f64());
            let target = combined
                .get("target_evidence_volume")
                .or_else(|| combined.get("target_evidence"))
                .and_then(|v| v.as_f64());
            if let (Some(score), Some(validity), Some(target)) = (score, validity, target) {
                return (score, validity, target);
            }
        }

        if let Some(rubric) = evaluation_result
            .get("phase_1a_rubric_evaluation")
            .and_then(|p| p.get("skill_evaluations"))
            .and_then(|s| s.get(skill_id))
        {
            let score = rubric.get("overall_score").and_then(|v| v.as_f64());
            let validity = evaluation_result
                .get("phase_1b_validity_analysis")
                .and_then(|v| v.get("validity_modifier"))
                .and_then(|v| v.as_f64());
            let target = rubric.get("target_evidence_volume").and_then(|v| v.as_f64());
            if let (Some(score), Some(validity), Some(target)) = (score, validity, target) {
                return (score, validity, target);
            }
        }

        if let Some(phases) = evaluation_result.get("pipeline_phases").and_then(|v| v.as_array()) {
            for phase in phases {
                let phase_name = phase.get("phase").and_then(|v| v.as_str()).unwrap_or("");
                if phase_name == "combined_evaluation" || phase_name == "scoring" {
                    let score = phase
                        .get("overall_score")
                        .or_else(|| phase.get("performance_score"))
                        .and_then(|v| v.as_f64());
                    let validity = phase.get("validity_modifier").and_then(|v| v.as_f64());
                    let target = phase
                        .get("target_evidence_volume")
                        .or_else(|| phase.get("target_evidence"))
                        .and_then(|v| v.as_f64());
                    if let (Some(score), Some(validity), Some(target)) = (score, validity, target) {
                        return (score, validity, target);
                    }
                }
            }
        }

        let root_target = evaluation_result
            .get("target_evidence_volume")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        (0.0, 1.0, root_target)
    }

    /// Score a submission against every extracted target skill, writing
    /// history rows and upserted `SkillProgress`. Storage failure for a given
    /// skill is swallowed into an `unknown`-status default per §4.4.7; the
    /// caller (the orchestrator) still advances.
    #[allow(clippy::too_many_arguments)]
    pub async fn score_submission(
        &self,
        scoring_config: &ScoringConfig,
        domain_model: &DomainModel,
        learner_id: &str,
        activity_id: &str,
        record_id: i64,
        completion_timestamp: DateTime<Utc>,
        activity_type: ActivityType,
        activity_title: &str,
        evaluation_result: &serde_json::Value,
        activity_transcript: &serde_json::Value,
    ) -> ScoringOutcome {
        let lock = self.learner_lock(learner_id);
        let _guard = lock.lock().await;

        let target_skills = Self::extract_target_skills(evaluation_result);
        let mut outcomes = Vec::with_capacity(target_skills.len());
        let mut all_succeeded = true;

        for skill_id in target_skills {
            let (performance_score, validity_modifier, target_evidence_volume) =
                Self::extract_skill_data(evaluation_result, &skill_id);

            match self
                .score_one_skill(
                    scoring_config,
                    domain_model,
                    learner_id,
                    activity_id,
                    record_id,
                    completion_timestamp,
                    activity_type,
                    activity_title,
                    &skill_id,
                    performance_score,
                    validity_modifier,
                    target_evidence_volume,
                    evaluation_result,
                    activity_transcript,
                )
                .await
            {
                Ok(progress) => outcomes.push(SkillScoreOutcome { skill_progress: progress }),
                Err(e) => {
                    all_succeeded = false;
                    error!(learner_id, skill_id, error = %e, "scoring storage failure; returning unknown status");
                    outcomes.push(SkillScoreOutcome {
                        skill_progress: unknown_skill_progress(learner_id, &skill_id, domain_model),
                    });
                }
            }
        }

        ScoringOutcome { skills: outcomes, success: all_succeeded }
    }

    #[allow(clippy::too_many_arguments)]
    async fn score_one_skill(
        &self,
        scoring_config: &ScoringConfig,
        domain_model: &DomainModel,
        learner_id: &str,
        activity_id: &str,
        record_id: i64,
        completion_timestamp: DateTime<Utc>,
        activity_type: ActivityType,
        activity_title: &str,
        skill_id: &str,
        performance_score: f64,
        validity_modifier: f64,
        target_evidence_volume: f64,
        evaluation_result: &serde_json::Value,
        activity_transcript: &serde_json::Value,
    ) -> EngineResult<SkillProgress> {
        let prior_rows = db::history_rows(&self.pool, learner_id, skill_id, db::HistoryOrder::RecentFirst).await?;

        let new_row_input = ScoreInput {
            target_evidence_volume,
            validity_modifier,
            performance_score,
        };
        let mut newest_first: Vec<ScoreInput> = Vec::with_capacity(prior_rows.len() + 1);
        newest_first.push(new_row_input);
        newest_first.extend(prior_rows.iter().map(|r| ScoreInput {
            target_evidence_volume: r.target_evidence_volume,
            validity_modifier: r.validity_modifier,
            performance_score: r.performance_score,
        }));

        let (cumulative_performance, total_evidence) =
            cumulative_score(&newest_first, scoring_config.decay_factor, scoring_config.prior_mean);
        let weighted = weight_rows(&newest_first, scoring_config.decay_factor);
        let this_weight = weighted[0];

        let prior_evidence: f64 = prior_rows.iter().map(|r| r.adjusted_evidence_volume).sum();
        let cumulative_evidence = if prior_rows.is_empty() {
            this_weight.adjusted_evidence
        } else {
            prior_evidence + this_weight.adjusted_evidence
        };

        let history_row = ActivityHistoryRow {
            history_id: 0,
            learner_id: learner_id.to_string(),
            record_id,
            activity_id: activity_id.to_string(),
            skill_id: skill_id.to_string(),
            completion_timestamp,
            activity_type,
            activity_title: activity_title.to_string(),
            performance_score,
            target_evidence_volume,
            validity_modifier,
            adjusted_evidence_volume: this_weight.adjusted_evidence,
            cumulative_evidence_weight: this_weight.weight,
            decay_factor: scoring_config.decay_factor,
            decay_adjusted_evidence_volume: this_weight.weight,
            cumulative_performance,
            cumulative_evidence,
            evaluation_result: evaluation_result.clone(),
            activity_transcript: activity_transcript.clone(),
        };
        db::upsert_history_row(&self.pool, &history_row).await?;

        let n = newest_first.len();
        let sem = standard_error(n, total_evidence);
        let (confidence_lower, confidence_upper) = confidence_interval(cumulative_performance, sem);
        let gate_1_status = gate_status(cumulative_performance, &GateThresholds::from(&scoring_config.gate_1));
        let gate_2_status = gate_status(total_evidence, &GateThresholds::from(&scoring_config.gate_2));
        let overall_status = OverallStatus::from_gates(gate_1_status, gate_2_status);

        let progress = SkillProgress {
            skill_id: skill_id.to_string(),
            learner_id: learner_id.to_string(),
            skill_name: domain_model.skill_name(skill_id),
            cumulative_score: cumulative_performance,
            total_adjusted_evidence: total_evidence,
            activity_count: n as u32,
            gate_1_status,
            gate_2_status,
            overall_status,
            confidence_lower,
            confidence_upper,
            standard_error: sem,
            last_updated: completion_timestamp,
        };
        db::upsert_skill_progress(&self.pool, &progress).await?;

        Ok(progress)
    }

    /// Recompute `decay_adjusted_evidence_volume`/`cumulative_evidence_weight`
    /// for every history row of `(learner_id, skill_id)` using the current
    /// decay factor, and re-derive `SkillProgress`. Idempotent (§4.4.6).
    /// Must not run concurrently with submissions for the same learner; the
    /// per-learner lock is held for the whole recompute.
    pub async fn recalculate_skill(
        &self,
        scoring_config: &ScoringConfig,
        domain_model: &DomainModel,
        learner_id: &str,
        skill_id: &str,
    ) -> EngineResult<()> {
        let lock = self.learner_lock(learner_id);
        let _guard = lock.lock().await;

        let chronological = db::history_rows(&self.pool, learner_id, skill_id, db::HistoryOrder::Chronological).await?;
        if chronological.is_empty() {
            return Ok(());
        }

        let mut newest_first = chronological.clone();
        newest_first.reverse();

        let inputs: Vec<ScoreInput> = newest_first
            .iter()
            .map(|r| ScoreInput {
                target_evidence_volume: r.target_evidence_volume,
                validity_modifier: r.validity_modifier,
                performance_score: r.performance_score,
            })
            .collect();
        let weighted = weight_rows(&inputs, scoring_config.decay_factor);

        // Walk chronologically, recomputing each row's cumulative_performance
        // / cumulative_evidence over the prefix ending at that row, so the
        // invariant (§8 property 6) still holds after recalculation.
        let mut running_evidence = 0.0;
        for (chrono_idx, row) in chronological.iter().enumerate() {
            let newest_idx = chronological.len() - 1 - chrono_idx;
            let w = weighted[newest_idx];

            let prefix_newest_first: Vec<ScoreInput> = inputs[newest_idx..].to_vec();
            let (cumulative_performance, _) =
                cumulative_score(&prefix_newest_first, scoring_config.decay_factor, scoring_config.prior_mean);
            running_evidence += w.adjusted_evidence;

            let mut updated = row.clone();
            updated.decay_factor = scoring_config.decay_factor;
            updated.decay_adjusted_evidence_volume = w.weight;
            updated.cumulative_evidence_weight = w.weight;
            updated.cumulative_performance = cumulative_performance;
            updated.cumulative_evidence = running_evidence;
            db::upsert_history_row(&self.pool, &updated).await?;
        }

        let (cumulative_performance, total_evidence) =
            cumulative_score(&inputs, scoring_config.decay_factor, scoring_config.prior_mean);
        let n = inputs.len();
        let sem = standard_error(n, total_evidence);
        let (confidence_lower, confidence_upper) = confidence_interval(cumulative_performance, sem);
        let gate_1_status = gate_status(cumulative_performance, &GateThresholds::from(&scoring_config.gate_1));
        let gate_2_status = gate_status(total_evidence, &GateThresholds::from(&scoring_config.gate_2));
        let overall_status = OverallStatus::from_gates(gate_1_status, gate_2_status);

        let progress = SkillProgress {
            skill_id: skill_id.to_string(),
            learner_id: learner_id.to_string(),
            skill_name: domain_model.skill_name(skill_id),
            cumulative_score: cumulative_performance,
            total_adjusted_evidence: total_evidence,
            activity_count: n as u32,
            gate_1_status,
            gate_2_status,
            overall_status,
            confidence_lower,
            confidence_upper,
            standard_error: sem,
            last_updated: Utc::now(),
        };
        db::upsert_skill_progress(&self.pool, &progress).await?;

        Ok(())
    }

    /// Recalculate every `(learner, skill)` pair present in history. Used by
    /// the unscoped `POST /api/admin/recalculate` operation.
    pub async fn recalculate_all(&self, scoring_config: &ScoringConfig, domain_model: &DomainModel) -> EngineResult<usize> {
        let pairs = db::all_learner_skill_pairs(&self.pool).await?;
        let count = pairs.len();
        for (learner_id, skill_id) in pairs {
            if let Err(e) = self.recalculate_skill(scoring_config, domain_model, &learner_id, &skill_id).await {
                warn!(learner_id, skill_id, error = %e, "retroactive recalculation failed for pair");
            }
        }
        Ok(count)
    }
}

fn unknown_skill_progress(learner_id: &str, skill_id: &str, domain_model: &DomainModel) -> SkillProgress {
    SkillProgress {
        skill_id: skill_id.to_string(),
        learner_id: learner_id.to_string(),
        skill_name: domain_model.skill_name(skill_id),
        cumulative_score: 0.0,
        total_adjusted_evidence: 0.0,
        activity_count: 0,
        gate_1_status: GateStatus::NeedsImprovement,
        gate_2_status: GateStatus::NeedsImprovement,
        overall_status: OverallStatus::NeedsImprovement,
        confidence_lower: 0.0,
        confidence_upper: 1.0,
        standard_error: 0.25,
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skill_extraction_prefers_legacy_rubric_keys() {
        let payload = serde_json::json!({
            "phase_1a_rubric_evaluation": { "skill_evaluations": { "S100": {} } },
            "target_skill": "S200",
        });
        assert_eq!(ScoringEngine::extract_target_skills(&payload), vec!["S100".to_string()]);
    }

    #[test]
    fn skill_extraction_falls_back_to_default() {
        let payload = serde_json::json!({});
        assert_eq!(ScoringEngine::extract_target_skills(&payload), vec![DEFAULT_SKILL_ID.to_string()]);
    }

    #[test]
    fn skill_extraction_dedups_preserving_order() {
        let payload = serde_json::json!({
            "activity_generation_output": { "skills_targeted": ["S1", "S2"], "target_skill": "S1" },
        });
        assert_eq!(
            ScoringEngine::extract_target_skills(&payload),
            vec!["S1".to_string(), "S2".to_string()]
        );
    }

    #[test]
    fn skill_data_prefers_combined_evaluation() {
        let payload = serde_json::json!({
            "phase_1_combined_evaluation": {
                "overall_score": 0.9,
                "validity_modifier": 1.0,
                "target_evidence_volume": 4.0,
            }
        });
        assert_eq!(ScoringEngine::extract_skill_data(&payload, "S1"), (0.9, 1.0, 4.0));
    }

    #[test]
    fn skill_data_falls_back_to_zero_score_and_root_target() {
        let payload = serde_json::json!({ "target_evidence_volume": 7.5 });
        assert_eq!(ScoringEngine::extract_skill_data(&payload, "S1"), (0.0, 1.0, 7.5));
    }
}
