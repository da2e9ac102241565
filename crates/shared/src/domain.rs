use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A learner's account-level record. Created once on enrollment; never
/// deleted — status is flipped to `Inactive` instead of destroying the row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub learner_id: String,
    pub name: String,
    pub email: String,
    pub enrollment_date: DateTime<Utc>,
    pub status: LearnerStatus,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LearnerProfile {
    pub fn new(learner_id: impl Into<String>, name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            learner_id: learner_id.into(),
            name: name.into(),
            email: email.into(),
            enrollment_date: now,
            status: LearnerStatus::Active,
            background: None,
            experience_level: None,
            created: now,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearnerStatus {
    Active,
    Inactive,
}

/// Activity type, fixed to the five supported content shapes (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityType {
    CR,
    COD,
    RP,
    SR,
    BR,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::CR => "CR",
            ActivityType::COD => "COD",
            ActivityType::RP => "RP",
            ActivityType::SR => "SR",
            ActivityType::BR => "BR",
        }
    }

    /// Whether this activity type requires a rubric with non-empty `aspects`.
    pub fn requires_rubric(&self) -> bool {
        matches!(self, ActivityType::CR | ActivityType::COD | ActivityType::RP)
    }

    /// Required top-level keys of `content` for this activity type.
    pub fn required_content_keys(&self) -> &'static [&'static str] {
        match self {
            ActivityType::CR => &["prompt", "response_guidelines"],
            ActivityType::COD => &["problem_statement", "starter_code", "test_cases"],
            ActivityType::RP => &["scenario_context", "character_profile", "objectives"],
            ActivityType::SR => &["question", "options", "correct_answer"],
            ActivityType::BR => &["initial_scenario", "decision_points", "paths"],
        }
    }

    /// Checks `content` carries every key this type requires, returning the
    /// names of any that are missing.
    pub fn missing_content_keys(&self, content: &serde_json::Value) -> Vec<&'static str> {
        self.required_content_keys()
            .iter()
            .filter(|key| content.get(**key).is_none())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CognitiveLevel {
    L1,
    L2,
    L3,
    L4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthLevel {
    D1,
    D2,
    D3,
    D4,
}

/// One scored dimension of a rubric, used to extract per-skill evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RubricAspect {
    pub aspect_id: String,
    pub skill_id: String,
    pub description: String,
    pub target_evidence_volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Rubric {
    #[serde(default)]
    pub aspects: Vec<RubricAspect>,
}

/// The on-disk / loaded representation of a learning activity file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySpec {
    pub activity_id: String,
    pub activity_type: ActivityType,
    pub title: String,
    pub description: String,
    pub target_skill: String,
    pub target_evidence_volume: f64,
    pub cognitive_level: CognitiveLevel,
    pub depth_level: DepthLevel,
    #[serde(default)]
    pub rubric: Option<Rubric>,
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub version: Option<String>,
}

impl ActivitySpec {
    /// Structural validation beyond what serde already enforces: positive
    /// evidence volume, rubric presence matching the activity type, and
    /// type-specific `content` shape. Returns the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        if self.target_evidence_volume <= 0.0 {
            return Err("target_evidence_volume must be > 0".to_string());
        }
        let has_rubric = self
            .rubric
            .as_ref()
            .is_some_and(|r| !r.aspects.is_empty());
        if self.activity_type.requires_rubric() && !has_rubric {
            return Err(format!(
                "activity_type {} requires a non-empty rubric",
                self.activity_type.as_str()
            ));
        }
        let missing = self.activity_type.missing_content_keys(&self.content);
        if !missing.is_empty() {
            return Err(format!(
                "content missing required keys for {}: {}",
                self.activity_type.as_str(),
                missing.join(", ")
            ));
        }
        Ok(())
    }
}

/// Engagement data captured during a learner's attempt, nested under the
/// submission envelope's `activity_transcript`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentResponse {
    pub component_id: String,
    pub response_content: serde_json::Value,
    pub response_type: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentEngagement {
    pub start_timestamp: DateTime<Utc>,
    pub submit_timestamp: DateTime<Utc>,
    pub completion_status: String,
    #[serde(default)]
    pub component_responses: Vec<ComponentResponse>,
    #[serde(default)]
    pub assistance_log: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityTranscript {
    pub activity_generation_output: ActivitySpec,
    pub student_engagement: StudentEngagement,
}

/// The envelope a learner's client submits for evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEnvelope {
    pub activity_id: String,
    pub learner_id: String,
    pub activity_transcript: serde_json::Value,
}

/// A single persisted attempt at an activity. Appended once when the pipeline
/// completes, whether it succeeded or failed; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub record_id: i64,
    pub activity_id: String,
    pub learner_id: String,
    pub timestamp: DateTime<Utc>,
    pub evaluation_result: serde_json::Value,
    pub activity_transcript: serde_json::Value,
    pub scored: bool,
}

/// Dual-gate mastery status ladder, ordered least to most advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    NeedsImprovement,
    Developing,
    Approaching,
    Passed,
}

impl GateStatus {
    pub fn from_threshold(value: f64, developing: f64, approaching: f64, passed: f64) -> Self {
        if value >= passed {
            GateStatus::Passed
        } else if value >= approaching {
            GateStatus::Approaching
        } else if value >= developing {
            GateStatus::Developing
        } else {
            GateStatus::NeedsImprovement
        }
    }
}

/// Overall mastery status for a skill: both gates passed collapses to `Mastered`;
/// otherwise the lower of the two gates applies, with a single passed gate
/// demoted to `Approaching` (a lone `Passed` never surfaces as overall status).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    NeedsImprovement,
    Developing,
    Approaching,
    Mastered,
}

impl OverallStatus {
    pub fn from_gates(gate_1: GateStatus, gate_2: GateStatus) -> Self {
        if gate_1 == GateStatus::Passed && gate_2 == GateStatus::Passed {
            return OverallStatus::Mastered;
        }
        match gate_1.min(gate_2) {
            GateStatus::NeedsImprovement => OverallStatus::NeedsImprovement,
            GateStatus::Developing => OverallStatus::Developing,
            GateStatus::Approaching | GateStatus::Passed => OverallStatus::Approaching,
        }
    }
}

/// A learner's current standing on one skill, the queryable summary row.
/// Keyed by `(skill_id, learner_id)`; upserted after each scored activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillProgress {
    pub skill_id: String,
    pub learner_id: String,
    pub skill_name: String,
    pub cumulative_score: f64,
    pub total_adjusted_evidence: f64,
    pub activity_count: u32,
    pub gate_1_status: GateStatus,
    pub gate_2_status: GateStatus,
    pub overall_status: OverallStatus,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
    pub standard_error: f64,
    pub last_updated: DateTime<Utc>,
}

/// One chronological row of evidence toward a skill, emitted by every scored
/// activity. Unique on `(learner_id, activity_id, skill_id)`; insert-or-replace
/// on re-evaluation of the same activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityHistoryRow {
    pub history_id: i64,
    pub learner_id: String,
    pub record_id: i64,
    pub activity_id: String,
    pub skill_id: String,
    pub completion_timestamp: DateTime<Utc>,
    pub activity_type: ActivityType,
    pub activity_title: String,
    pub performance_score: f64,
    pub target_evidence_volume: f64,
    pub validity_modifier: f64,
    pub adjusted_evidence_volume: f64,
    pub cumulative_evidence_weight: f64,
    pub decay_factor: f64,
    pub decay_adjusted_evidence_volume: f64,
    pub cumulative_performance: f64,
    pub cumulative_evidence: f64,
    pub evaluation_result: serde_json::Value,
    pub activity_transcript: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_gates_passed_is_mastered() {
        let status = OverallStatus::from_gates(GateStatus::Passed, GateStatus::Passed);
        assert!(matches!(status, OverallStatus::Mastered));
    }

    #[test]
    fn single_passed_gate_demotes_to_approaching() {
        let status = OverallStatus::from_gates(GateStatus::Passed, GateStatus::Developing);
        assert!(matches!(status, OverallStatus::Developing));

        let status = OverallStatus::from_gates(GateStatus::Passed, GateStatus::Approaching);
        assert!(matches!(status, OverallStatus::Approaching));
    }

    #[test]
    fn lowest_gate_governs_overall() {
        let status = OverallStatus::from_gates(GateStatus::NeedsImprovement, GateStatus::Passed);
        assert!(matches!(status, OverallStatus::NeedsImprovement));
    }

    #[test]
    fn requires_rubric_matches_spec_types() {
        assert!(ActivityType::CR.requires_rubric());
        assert!(ActivityType::COD.requires_rubric());
        assert!(ActivityType::RP.requires_rubric());
        assert!(!ActivityType::SR.requires_rubric());
        assert!(!ActivityType::BR.requires_rubric());
    }

    #[test]
    fn content_shape_reports_missing_keys() {
        let content = serde_json::json!({ "question": "2+2?" });
        let missing = ActivityType::SR.missing_content_keys(&content);
        assert_eq!(missing, vec!["options", "correct_answer"]);
    }

    #[test]
    fn activity_spec_rejects_non_positive_evidence_volume() {
        let spec = ActivitySpec {
            activity_id: "a1".into(),
            activity_type: ActivityType::SR,
            title: "t".into(),
            description: "d".into(),
            target_skill: "S001".into(),
            target_evidence_volume: 0.0,
            cognitive_level: CognitiveLevel::L1,
            depth_level: DepthLevel::D1,
            rubric: None,
            content: serde_json::json!({"question": "q", "options": [], "correct_answer": "a"}),
            metadata: HashMap::new(),
            version: None,
        };
        assert!(spec.validate().is_err());
    }
}
