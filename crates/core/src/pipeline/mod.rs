//! Pipeline Orchestrator (§4.1): sequences the four phases of one evaluation,
//! swallows per-phase failure into a safe default, and aggregates the result.
//! Holds the process-wide historical-summary cache and the handles to every
//! other subsystem it drives.

mod historical;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use mastery_shared::error::EngineResult;
use mastery_shared::{ActivitySpec, SkillProgress, SubmissionEnvelope};

use crate::config_store::ConfigStore;
use crate::db;
use crate::events::{Event, EventLog};
use crate::llm::Gateway;
use crate::prompts::{self, Phase, PromptContext};
use crate::scoring::ScoringEngine;
use crate::validation;

pub use historical::HistoricalSummary;

const PHASE_COMBINED: &str = "combined_evaluation";
const PHASE_SCORING: &str = "scoring";
const PHASE_INTELLIGENT_FEEDBACK: &str = "intelligent_feedback";
const PHASE_TREND: &str = "trend";

/// Outcome of a single phase, folded into the aggregate `EvaluationResult`.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseResult {
    pub phase: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
    pub tokens_used: u64,
    pub cost_estimate: f64,
    pub provider: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub activity_id: String,
    pub learner_id: String,
    pub record_id: Option<i64>,
    pub overall_success: bool,
    pub phases: Vec<PhaseResult>,
    pub skill_progress: Vec<SkillProgress>,
}

/// Schema-valid default payload for a failed `combined` phase (§4.1 failure
/// policy / spec.md §8 E6).
fn default_combined_payload() -> serde_json::Value {
    serde_json::json!({
        "aspect_scores": [],
        "overall_score": 0.5,
        "rationale": "unavailable",
        "validity_modifier": 1.0,
        "validity_analysis": "unavailable",
        "validity_reason": "unavailable",
        "evidence_quality": "unavailable",
        "assistance_impact": "unavailable",
        "evidence_volume_assessment": "unavailable",
        "assessment_confidence": "unavailable",
        "key_observations": [],
    })
}

fn default_feedback_payload() -> serde_json::Value {
    serde_json::json!({
        "intelligent_feedback": {
            "backend_intelligence": {
                "overview": "unavailable",
                "strengths": [],
                "weaknesses": [],
                "subskill_ratings": [],
            },
            "learner_feedback": {
                "overall": "unavailable",
                "strengths": "unavailable",
                "opportunities": "unavailable",
            },
        }
    })
}

/// Trend analysis is permanently disabled (§1 Non-goals); this is the one
/// fixed payload the phase ever returns.
fn trend_stub_payload() -> serde_json::Value {
    serde_json::json!({ "trend": "disabled", "direction": "unknown" })
}

pub struct Orchestrator {
    pool: SqlitePool,
    config_store: Arc<ConfigStore>,
    gateway: Arc<Gateway>,
    scoring_engine: Arc<ScoringEngine>,
    event_log: Arc<EventLog>,
    historical_cache: RwLock<HashMap<(String, u64), Arc<HistoricalSummary>>>,
}

impl Orchestrator {
    pub fn new(
        pool: SqlitePool,
        config_store: Arc<ConfigStore>,
        gateway: Arc<Gateway>,
        scoring_engine: Arc<ScoringEngine>,
        event_log: Arc<EventLog>,
    ) -> Self {
        Self {
            pool,
            config_store,
            gateway,
            scoring_engine,
            event_log,
            historical_cache: RwLock::new(HashMap::new()),
        }
    }

    /// `Evaluate(activity_id, learner_id, transcript) -> EvaluationResult` (§4.1).
    /// A malformed envelope/transcript short-circuits: no phase runs, the
    /// pipeline returns a failed result immediately (§7
    /// `SubmissionValidationError`/`ActivitySchemaError`).
    pub async fn evaluate(&self, envelope: SubmissionEnvelope) -> EngineResult<EvaluationResult> {
        let activity_id = envelope.activity_id.clone();
        let learner_id = envelope.learner_id.clone();

        let transcript = match validation::parse_activity_transcript(&envelope) {
            Ok(t) => t,
            Err(e) => {
                self.event_log
                    .emit(Event::error(error_kind(&e), e.to_string(), Some(learner_id.clone()), Some(activity_id.clone())))
                    .await;
                return Ok(EvaluationResult {
                    activity_id,
                    learner_id,
                    record_id: None,
                    overall_success: false,
                    phases: Vec::new(),
                    skill_progress: Vec::new(),
                });
            }
        };
        let activity = transcript.activity_generation_output.clone();

        if let Err(e) = db::get_or_create_learner(&self.pool, &learner_id).await {
            self.event_log
                .emit(Event::error("StorageError", e.to_string(), Some(learner_id.clone()), Some(activity_id.clone())))
                .await;
            return Ok(EvaluationResult {
                activity_id,
                learner_id,
                record_id: None,
                overall_success: false,
                phases: Vec::new(),
                skill_progress: Vec::new(),
            });
        }

        let domain_model = self.config_store.domain_model().await;
        let llm_settings = self.config_store.llm_settings().await;
        let scoring_config = self.config_store.scoring_config().await;
        let skill_name = domain_model.skill_name(&activity.target_skill);

        // Phase 1: Combined Evaluation.
        let (combined_result, combined_payload) = self
            .run_combined_phase(&activity, &skill_name, &transcript.student_engagement, &llm_settings)
            .await;

        // Record the activity once the payload scoring needs is known, so
        // the history rows written in the Scoring phase have a valid
        // `record_id` to reference. The row is never rewritten afterward;
        // intelligent-feedback/trend output is ephemeral (HTTP response +
        // event log only), not re-persisted into this row.
        let evaluation_result_for_storage = serde_json::json!({
            "phase_1_combined_evaluation": combined_payload,
            "activity_generation_output": serde_json::to_value(&activity)?,
        });
        let record_id = match db::insert_activity_record(
            &self.pool,
            &activity_id,
            &learner_id,
            &evaluation_result_for_storage,
            &envelope.activity_transcript,
            combined_result.success,
        )
        .await
        {
            Ok(id) => id,
            Err(e) => {
                self.event_log
                    .emit(Event::error("StorageError", e.to_string(), Some(learner_id.clone()), Some(activity_id.clone())))
                    .await;
                return Ok(EvaluationResult {
                    activity_id,
                    learner_id,
                    record_id: None,
                    overall_success: false,
                    phases: vec![combined_result],
                    skill_progress: Vec::new(),
                });
            }
        };

        // Phase 2: Scoring.
        let scoring_outcome = self
            .run_scoring_phase(
                &scoring_config,
                &domain_model,
                &learner_id,
                &activity_id,
                record_id,
                transcript.student_engagement.submit_timestamp,
                &activity,
                &evaluation_result_for_storage,
                &envelope.activity_transcript,
            )
            .await;

        // Phase 3: Intelligent Feedback — historical summary now reflects
        // this submission's own freshly-written row.
        let historical_summary = self.historical_summary(&learner_id, &activity.target_skill).await?;
        let (feedback_result, _feedback_payload) = self
            .run_feedback_phase(&activity, &skill_name, &combined_payload, &historical_summary, &llm_settings)
            .await;

        // Phase 4: Trend — permanently disabled stub (§1 Non-goals).
        let trend_result = self.run_trend_phase().await;

        let overall_success =
            combined_result.success && scoring_outcome.success && feedback_result.success && trend_result.success;

        Ok(EvaluationResult {
            activity_id,
            learner_id,
            record_id: Some(record_id),
            overall_success,
            phases: vec![combined_result, scoring_phase_result(&scoring_outcome), feedback_result, trend_result],
            skill_progress: scoring_outcome.skills.into_iter().map(|s| s.skill_progress).collect(),
        })
    }

    async fn run_combined_phase(
        &self,
        activity: &ActivitySpec,
        skill_name: &str,
        engagement: &mastery_shared::StudentEngagement,
        llm_settings: &crate::config_store::LlmSettings,
    ) -> (PhaseResult, serde_json::Value) {
        self.event_log.emit(Event::phase_start(&activity.target_skill, &activity.activity_id, PHASE_COMBINED)).await;
        let start = Instant::now();

        let ctx = PromptContext {
            activity: Some(activity.clone()),
            skill_name: Some(skill_name.to_string()),
            transcript: Some(serde_json::to_value(engagement).unwrap_or_default()),
            historical_summary: None,
            learner: None,
            combined_evaluation: None,
        };

        let outcome = self.call_llm_phase(Phase::Combined, activity, &ctx, llm_settings).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, payload, provider, tokens_used, cost_estimate, error) = match outcome {
            Ok((payload, provider, tokens, cost)) => (true, payload, Some(provider), tokens, cost, None),
            Err(e) => (false, default_combined_payload(), None, 0, 0.0, Some(e)),
        };

        if let Some(ref msg) = error {
            self.event_log.emit(Event::error("combined_evaluation_failed", msg.clone(), None, Some(activity.activity_id.clone()))).await;
        }
        self.event_log
            .emit(Event::phase_complete(&activity.target_skill, &activity.activity_id, PHASE_COMBINED, success, duration_ms, tokens_used, cost_estimate, provider.clone()))
            .await;

        (
            PhaseResult { phase: PHASE_COMBINED.to_string(), success, error, duration_ms, tokens_used, cost_estimate, provider, payload: payload.clone() },
            payload,
        )
    }

    async fn run_feedback_phase(
        &self,
        activity: &ActivitySpec,
        skill_name: &str,
        combined_payload: &serde_json::Value,
        historical_summary: &HistoricalSummary,
        llm_settings: &crate::config_store::LlmSettings,
    ) -> (PhaseResult, serde_json::Value) {
        self.event_log.emit(Event::phase_start(&activity.target_skill, &activity.activity_id, PHASE_INTELLIGENT_FEEDBACK)).await;
        let start = Instant::now();

        let ctx = PromptContext {
            activity: Some(activity.clone()),
            skill_name: Some(skill_name.to_string()),
            combined_evaluation: Some(combined_payload.clone()),
            historical_summary: Some(historical_summary.render()),
            transcript: None,
            learner: None,
        };

        let outcome = self.call_llm_phase(Phase::IntelligentFeedback, activity, &ctx, llm_settings).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (success, payload, provider, tokens_used, cost_estimate, error) = match outcome {
            Ok((payload, provider, tokens, cost)) => (true, payload, Some(provider), tokens, cost, None),
            Err(e) => (false, default_feedback_payload(), None, 0, 0.0, Some(e)),
        };

        if let Some(ref msg) = error {
            self.event_log.emit(Event::error("intelligent_feedback_failed", msg.clone(), None, Some(activity.activity_id.clone()))).await;
        }
        self.event_log
            .emit(Event::phase_complete(&activity.target_skill, &activity.activity_id, PHASE_INTELLIGENT_FEEDBACK, success, duration_ms, tokens_used, cost_estimate, provider.clone()))
            .await;

        (
            PhaseResult { phase: PHASE_INTELLIGENT_FEEDBACK.to_string(), success, error, duration_ms, tokens_used, cost_estimate, provider, payload: payload.clone() },
            payload,
        )
    }

    async fn run_trend_phase(&self) -> PhaseResult {
        PhaseResult {
            phase: PHASE_TREND.to_string(),
            success: true,
            error: None,
            duration_ms: 0,
            tokens_used: 0,
            cost_estimate: 0.0,
            provider: None,
            payload: trend_stub_payload(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_scoring_phase(
        &self,
        scoring_config: &crate::config_store::ScoringConfig,
        domain_model: &crate::config_store::DomainModel,
        learner_id: &str,
        activity_id: &str,
        record_id: i64,
        completion_timestamp: DateTime<Utc>,
        activity: &ActivitySpec,
        evaluation_result: &serde_json::Value,
        activity_transcript: &serde_json::Value,
    ) -> crate::scoring::ScoringOutcome {
        self.event_log.emit(Event::phase_start(learner_id, activity_id, PHASE_SCORING)).await;
        let start = Instant::now();

        let outcome = self
            .scoring_engine
            .score_submission(
                scoring_config,
                domain_model,
                learner_id,
                activity_id,
                record_id,
                completion_timestamp,
                activity.activity_type,
                &activity.title,
                evaluation_result,
                activity_transcript,
            )
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;
        self.event_log
            .emit(Event::phase_complete(learner_id, activity_id, PHASE_SCORING, outcome.success, duration_ms, 0, 0.0, None))
            .await;
        outcome
    }

    /// Build the phase's prompt and call the Gateway, returning the parsed
    /// JSON payload plus the provider id and token/cost counters on success.
    async fn call_llm_phase(
        &self,
        phase: Phase,
        activity: &ActivitySpec,
        ctx: &PromptContext,
        llm_settings: &crate::config_store::LlmSettings,
    ) -> Result<(serde_json::Value, String, u64, f64), String> {
        let prompt = prompts::build(phase, activity.activity_type, ctx).map_err(|e| e.to_string())?;
        let response = self.gateway.call(&prompt.system_prompt, &prompt.user_prompt, llm_settings, phase.as_str()).await;

        if !response.success {
            return Err(response.error.unwrap_or_else(|| "all providers failed".to_string()));
        }

        let payload: serde_json::Value = serde_json::from_str(&response.content)
            .map_err(|e| format!("failed to parse {} response as JSON: {e}", phase.as_str()))?;

        Ok((payload, response.provider, response.tokens_used, response.cost_estimate))
    }

    /// Per-`(learner_id, row_count)` historical summary cache (§4.1, §9).
    /// `row_count` changes on every write, so invalidation needs no explicit
    /// call: a submission simply produces a fresh cache key.
    async fn historical_summary(&self, learner_id: &str, skill_id: &str) -> EngineResult<HistoricalSummary> {
        let rows = db::history_rows(&self.pool, learner_id, skill_id, db::HistoryOrder::Chronological).await?;
        let row_count = rows.len() as u64;
        let key = (learner_id.to_string(), row_count);

        if let Some(cached) = self.historical_cache.read().await.get(&key) {
            return Ok((**cached).clone());
        }

        let summary = HistoricalSummary::compute(&rows);
        self.historical_cache.write().await.insert(key, Arc::new(summary.clone()));
        Ok(summary)
    }
}

fn scoring_phase_result(outcome: &crate::scoring::ScoringOutcome) -> PhaseResult {
    PhaseResult {
        phase: PHASE_SCORING.to_string(),
        success: outcome.success,
        error: if outcome.success { None } else { Some("one or more skills failed to persist".to_string()) },
        duration_ms: 0,
        tokens_used: 0,
        cost_estimate: 0.0,
        provider: None,
        payload: serde_json::json!({
            "skills": outcome.skills.iter().map(|s| s.skill_progress.skill_id.clone()).collect::<Vec<_>>(),
        }),
    }
}

fn error_kind(e: &mastery_shared::EngineError) -> &'static str {
    match e {
        mastery_shared::EngineError::ConfigurationError(_) => "ConfigurationError",
        mastery_shared::EngineError::ActivitySchemaError { .. } => "ActivitySchemaError",
        mastery_shared::EngineError::SubmissionValidationError(_) => "SubmissionValidationError",
        mastery_shared::EngineError::LLMProviderError { .. } => "LLMProviderError",
        mastery_shared::EngineError::LLMAggregateError(_) => "LLMAggregateError",
        mastery_shared::EngineError::ParseError(_) => "ParseError",
        mastery_shared::EngineError::StorageError(_) => "StorageError",
    }
}
