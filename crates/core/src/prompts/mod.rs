//! Prompt Assembly (§4.3): builds each phase's prompt from composable system
//! components plus a variable-substituted user template, for the phase ×
//! activity-type configuration space the live pipeline actually uses
//! (`combined`, `intelligent_feedback`). The four deprecated compatibility
//! phases (`rubric`, `validity`, `diagnostic`, `feedback`) are omitted —
//! spec.md §4.3 explicitly licenses dropping them in a fresh implementation.

use std::collections::HashMap;

use mastery_shared::error::{EngineError, EngineResult};
use mastery_shared::{ActivitySpec, ActivityType, LearnerProfile};

/// A soft cap on combined system+user prompt length (§4.3 validation (b));
/// exceeding it only logs a warning, it never fails assembly.
const SOFT_LENGTH_CAP: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Combined,
    IntelligentFeedback,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Combined => "combined",
            Phase::IntelligentFeedback => "intelligent_feedback",
        }
    }

    /// Whether `activity_type` is a legal combination for this phase.
    /// `rubric` (not implemented here) would be the only phase restricted to
    /// `{CR, COD, RP}`; `combined` and `intelligent_feedback` apply to every
    /// activity type.
    pub fn allows(self, _activity_type: ActivityType) -> bool {
        true
    }

    fn default_temperature(self) -> f32 {
        match self {
            Phase::Combined => 0.1,
            Phase::IntelligentFeedback => 0.7,
        }
    }

    fn default_max_tokens(self) -> u32 {
        match self {
            Phase::Combined => 6000,
            Phase::IntelligentFeedback => 4000,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Phase::Combined => {
                "You are performing a single combined pass: score every rubric aspect, \
                 assess how much external assistance contaminated the evidence, and \
                 judge whether the submission carries enough evidence volume to count \
                 fully toward the target skill."
            }
            Phase::IntelligentFeedback => {
                "You are producing two layers of feedback from the same evaluation: an \
                 internal diagnostic summary for instructors, and a warmer, actionable \
                 summary written directly to the learner."
            }
        }
    }

    fn required_user_variables(self) -> &'static [&'static str] {
        match self {
            Phase::Combined => &[
                "activity_title",
                "activity_description",
                "rubric",
                "target_skill",
                "target_evidence_volume",
                "transcript",
            ],
            Phase::IntelligentFeedback => &[
                "activity_title",
                "target_skill",
                "combined_evaluation",
                "historical_summary",
            ],
        }
    }

    fn user_template(self) -> &'static str {
        match self {
            Phase::Combined => {
                "## Activity\n\
                 Title: {activity_title}\n\
                 Description: {activity_description}\n\
                 Cognitive level: {cognitive_level}\n\
                 Depth level: {depth_level}\n\
                 Target skill: {target_skill}\n\
                 Target evidence volume: {target_evidence_volume}\n\n\
                 ## Rubric\n\
                 {rubric}\n\n\
                 ## Learner submission\n\
                 {transcript}\n\n\
                 ## Prior performance on this skill\n\
                 {historical_summary}\n\n\
                 Score every rubric aspect, then return the combined evaluation JSON \
                 described in the system prompt."
            }
            Phase::IntelligentFeedback => {
                "## Activity\n\
                 Title: {activity_title}\n\
                 Target skill: {target_skill}\n\n\
                 ## Combined evaluation from the prior phase\n\
                 {combined_evaluation}\n\n\
                 ## Recent history on this skill\n\
                 {historical_summary}\n\n\
                 Write the backend diagnostic and the learner-facing feedback JSON \
                 described in the system prompt."
            }
        }
    }
}

/// Context gathered by the orchestrator before assembling a phase's prompt.
/// Only the fields a given phase needs are populated by the caller; unused
/// fields are simply left at their defaults.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub activity: Option<ActivitySpec>,
    pub learner: Option<LearnerProfile>,
    pub skill_name: Option<String>,
    pub historical_summary: Option<String>,
    pub transcript: Option<serde_json::Value>,
    pub combined_evaluation: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct PhaseLlmConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub user_prompt: String,
    pub output_schema: &'static str,
    pub llm_config: PhaseLlmConfig,
}

/// Serialize a context value to a template-ready string: strings pass
/// through verbatim (no escaping — the spec is explicit that substituted
/// values are inserted without any Markdown-safety guarantee), everything
/// else is pretty-printed JSON.
fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

fn system_role_block() -> &'static str {
    "You are an expert learning-evaluation assistant embedded in a mastery-tracking \
     engine. You evaluate one learner's one submission at a time, strictly and \
     consistently, against the rubric and context given to you."
}

fn system_philosophy_block() -> &'static str {
    "Evaluate what the learner actually demonstrated, not what they could have \
     demonstrated with more time. Assistance that did the learner's thinking for them \
     reduces validity; assistance that merely unblocked them does not. Prefer \
     evidence over inference: do not credit claims the submission does not support."
}

fn system_domain_focus_block(ctx: &PromptContext) -> Option<String> {
    ctx.activity.as_ref().map(|a| {
        format!(
            "This activity targets cognitive level {:?} at depth level {:?}.",
            a.cognitive_level, a.depth_level
        )
    })
}

fn system_skill_focus_block(ctx: &PromptContext) -> Option<String> {
    ctx.skill_name
        .as_ref()
        .map(|name| format!("Focus your evaluation on the single skill: {name}."))
}

fn system_activity_type_block(activity_type: ActivityType) -> String {
    match activity_type {
        ActivityType::CR => {
            "This is a constructed-response activity: judge the written response \
             against the rubric aspects and response guidelines."
                .to_string()
        }
        ActivityType::COD => {
            "This is a coding activity: judge correctness against the stated test \
             cases as well as the rubric, not just whether the code runs."
                .to_string()
        }
        ActivityType::RP => {
            "This is a role-play activity: the transcript is a UI-driven chat log. \
             Evaluate the learner's in-character choices against the scenario \
             objectives and rubric."
                .to_string()
        }
        ActivityType::SR => {
            "This is a selected-response activity: evaluate correctness and, where \
             relevant, the learner's stated reasoning."
                .to_string()
        }
        ActivityType::BR => {
            "This is a branching-scenario activity: evaluate the path the learner \
             took through the decision points against the objectives."
                .to_string()
        }
    }
}

fn system_critical_guidelines_block() -> &'static str {
    "Critical guidelines: never invent rubric aspects that were not given to you; \
     never average scores you were not asked to average; if the submission is \
     empty or off-topic, score it honestly low rather than defaulting to a middle \
     value; validity_modifier reflects contamination of evidence by assistance, not \
     overall quality."
}

fn system_json_only_warning() -> &'static str {
    "Respond with a single JSON object and nothing else: no prose before or after \
     it, no Markdown fences, no trailing commentary."
}

/// Build the phase's system prompt by concatenating its named components in
/// a stable order, skipping any that are blank for this context (§4.3).
fn build_system_prompt(phase: Phase, activity_type: ActivityType, ctx: &PromptContext) -> String {
    let mut blocks = vec![
        system_role_block().to_string(),
        system_philosophy_block().to_string(),
    ];
    if let Some(block) = system_domain_focus_block(ctx) {
        blocks.push(block);
    }
    if let Some(block) = system_skill_focus_block(ctx) {
        blocks.push(block);
    }
    blocks.push(phase.description().to_string());
    blocks.push(system_activity_type_block(activity_type));
    blocks.push(system_critical_guidelines_block().to_string());
    blocks.push(system_json_only_warning().to_string());

    blocks.into_iter().filter(|b| !b.trim().is_empty()).collect::<Vec<_>>().join("\n\n")
}

/// Collect the template variables available for this phase from `ctx`.
fn template_variables(phase: Phase, activity_type: ActivityType, ctx: &PromptContext) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();

    if let Some(activity) = &ctx.activity {
        vars.insert("activity_title", activity.title.clone());
        vars.insert("activity_description", activity.description.clone());
        vars.insert("target_skill", activity.target_skill.clone());
        vars.insert("target_evidence_volume", activity.target_evidence_volume.to_string());
        vars.insert("cognitive_level", format!("{:?}", activity.cognitive_level));
        vars.insert("depth_level", format!("{:?}", activity.depth_level));
        let rubric_json = activity
            .rubric
            .as_ref()
            .map(|r| serde_json::to_value(r).unwrap_or(serde_json::Value::Null))
            .unwrap_or(serde_json::Value::Null);
        vars.insert("rubric", render_value(&rubric_json));
    } else {
        vars.insert("activity_title", String::new());
        vars.insert("activity_description", String::new());
        vars.insert("target_skill", ctx.skill_name.clone().unwrap_or_default());
        vars.insert("target_evidence_volume", String::new());
        vars.insert("cognitive_level", String::new());
        vars.insert("depth_level", String::new());
        vars.insert("rubric", String::new());
    }
    let _ = activity_type;

    if let Some(transcript) = &ctx.transcript {
        vars.insert("transcript", render_value(transcript));
    } else {
        vars.insert("transcript", String::new());
    }

    if let Some(combined) = &ctx.combined_evaluation {
        vars.insert("combined_evaluation", render_value(combined));
    } else {
        vars.insert("combined_evaluation", String::new());
    }

    vars.insert(
        "historical_summary",
        ctx.historical_summary.clone().unwrap_or_else(|| "No prior history on this skill.".to_string()),
    );

    let _ = phase;
    vars
}

fn substitute(template: &str, vars: &HashMap<&'static str, String>) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

/// Every `{name}` placeholder still present after substitution — callers
/// treat a non-empty result as a fail-fast "missing variable" error (§4.3).
fn unresolved_placeholders(rendered: &str) -> Vec<String> {
    let mut found = Vec::new();
    let bytes = rendered.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = rendered[i + 1..].find('}') {
                let candidate = &rendered[i + 1..i + 1 + end];
                if !candidate.is_empty() && candidate.chars().all(|c| c.is_alphanumeric() || c == '_') {
                    found.push(candidate.to_string());
                }
                i += end + 2;
                continue;
            }
        }
        i += 1;
    }
    found
}

/// Assemble the system prompt, user prompt, and output-schema name for one
/// phase × activity-type combination.
pub fn build(phase: Phase, activity_type: ActivityType, ctx: &PromptContext) -> EngineResult<PromptConfig> {
    if !phase.allows(activity_type) {
        return Err(EngineError::ConfigurationError(format!(
            "phase {} does not apply to activity type {}",
            phase.as_str(),
            activity_type.as_str()
        )));
    }

    let system_prompt = build_system_prompt(phase, activity_type, ctx);
    let vars = template_variables(phase, activity_type, ctx);

    for required in phase.required_user_variables() {
        if !vars.contains_key(required) {
            return Err(EngineError::ConfigurationError(format!(
                "prompt assembly for phase {}: missing required variable '{}'",
                phase.as_str(),
                required
            )));
        }
    }

    let user_prompt = substitute(phase.user_template(), &vars);
    let unresolved = unresolved_placeholders(&user_prompt);
    if !unresolved.is_empty() {
        return Err(EngineError::ConfigurationError(format!(
            "prompt assembly for phase {}: unresolved placeholders {:?}",
            phase.as_str(),
            unresolved
        )));
    }

    let combined_len = system_prompt.len() + user_prompt.len();
    if combined_len > SOFT_LENGTH_CAP {
        tracing::warn!(
            phase = phase.as_str(),
            combined_len,
            cap = SOFT_LENGTH_CAP,
            "assembled prompt exceeds soft length cap"
        );
    }

    let output_schema = match phase {
        Phase::Combined => "combined_evaluation_v1",
        Phase::IntelligentFeedback => "intelligent_feedback_v1",
    };

    Ok(PromptConfig {
        system_prompt,
        user_prompt,
        output_schema,
        llm_config: PhaseLlmConfig {
            temperature: phase.default_temperature(),
            max_tokens: phase.default_max_tokens(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mastery_shared::{CognitiveLevel, DepthLevel, Rubric};

    fn sample_activity() -> ActivitySpec {
        ActivitySpec {
            activity_id: "a1".to_string(),
            activity_type: ActivityType::CR,
            title: "Explain recursion".to_string(),
            description: "Write a short explanation of recursion.".to_string(),
            target_skill: "S001".to_string(),
            target_evidence_volume: 4.0,
            cognitive_level: CognitiveLevel::L2,
            depth_level: DepthLevel::D2,
            rubric: Some(Rubric::default()),
            content: serde_json::json!({}),
            metadata: Default::default(),
            version: None,
        }
    }

    #[test]
    fn combined_assembly_substitutes_all_variables() {
        let ctx = PromptContext {
            activity: Some(sample_activity()),
            transcript: Some(serde_json::json!({"response": "..."})),
            ..Default::default()
        };
        let config = build(Phase::Combined, ActivityType::CR, &ctx).unwrap();
        assert!(!config.user_prompt.contains('{'));
        assert!(config.system_prompt.contains("coding activity") == false);
        assert_eq!(config.output_schema, "combined_evaluation_v1");
    }

    #[test]
    fn activity_type_paragraph_varies_by_type() {
        let ctx = PromptContext { activity: Some(sample_activity()), ..Default::default() };
        let cr = build(Phase::Combined, ActivityType::CR, &ctx).unwrap();
        let cod = build(Phase::Combined, ActivityType::COD, &ctx).unwrap();
        assert_ne!(cr.system_prompt, cod.system_prompt);
    }

    #[test]
    fn blank_components_are_skipped() {
        let ctx = PromptContext::default();
        let config = build(Phase::Combined, ActivityType::SR, &ctx).unwrap();
        // No skill_name / activity in context => no double blank lines from
        // skipped components bleeding into the assembled prompt.
        assert!(!config.system_prompt.contains("\n\n\n"));
    }
}
