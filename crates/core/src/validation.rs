//! Request validation (§7 `SubmissionValidationError` / `ActivitySchemaError`).
//! Mirrors the teacher's `validator`-derive + custom-function pattern,
//! retargeted at the submission envelope and the activity spec it carries.

use serde::Deserialize;
use validator::Validate;

use mastery_shared::{ActivityTranscript, EngineError, EngineResult, SubmissionEnvelope};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmissionRequest {
    #[validate(length(min = 1, max = 200, message = "activity_id must be 1-200 characters"))]
    pub activity_id: String,

    #[validate(length(min = 1, max = 200, message = "learner_id must be 1-200 characters"))]
    pub learner_id: String,

    pub activity_transcript: serde_json::Value,
}

/// Validation helper function
pub fn validate_request<T: Validate>(req: &T) -> Result<(), String> {
    req.validate().map_err(|e| format!("Validation error: {e}"))
}

/// Parse and structurally validate a submission payload (§6 submission
/// envelope). A missing or empty `activity_id`/`learner_id` is a
/// `SubmissionValidationError`; per §7 this makes the pipeline return a
/// failed `EvaluationResult` without running any phase.
pub fn parse_submission_envelope(payload: serde_json::Value) -> EngineResult<SubmissionEnvelope> {
    let request: SubmissionRequest = serde_json::from_value(payload)
        .map_err(|e| EngineError::SubmissionValidationError(format!("malformed submission envelope: {e}")))?;
    validate_request(&request).map_err(EngineError::SubmissionValidationError)?;

    Ok(SubmissionEnvelope {
        activity_id: request.activity_id,
        learner_id: request.learner_id,
        activity_transcript: request.activity_transcript,
    })
}

/// Parse the submission's embedded `activity_transcript` into a typed
/// `ActivityTranscript` and structurally validate the `ActivitySpec` it
/// carries (positive evidence volume, rubric presence, content shape).
/// Failures here are `ActivitySchemaError` — the activity itself is
/// malformed, not the envelope.
pub fn parse_activity_transcript(envelope: &SubmissionEnvelope) -> EngineResult<ActivityTranscript> {
    let transcript: ActivityTranscript = serde_json::from_value(envelope.activity_transcript.clone())
        .map_err(|e| EngineError::ActivitySchemaError {
            activity_id: envelope.activity_id.clone(),
            message: format!("malformed activity_transcript: {e}"),
        })?;

    transcript
        .activity_generation_output
        .validate()
        .map_err(|message| EngineError::ActivitySchemaError { activity_id: envelope.activity_id.clone(), message })?;

    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_activity_id() {
        let payload = serde_json::json!({
            "learner_id": "l1",
            "activity_transcript": {},
        });
        let err = parse_submission_envelope(payload).unwrap_err();
        assert!(matches!(err, EngineError::SubmissionValidationError(_)));
    }

    #[test]
    fn rejects_empty_learner_id() {
        let payload = serde_json::json!({
            "activity_id": "a1",
            "learner_id": "",
            "activity_transcript": {},
        });
        let err = parse_submission_envelope(payload).unwrap_err();
        assert!(matches!(err, EngineError::SubmissionValidationError(_)));
    }

    #[test]
    fn accepts_well_formed_envelope() {
        let payload = serde_json::json!({
            "activity_id": "a1",
            "learner_id": "l1",
            "activity_transcript": {"student_engagement": {}},
        });
        assert!(parse_submission_envelope(payload).is_ok());
    }

    #[test]
    fn rejects_activity_with_non_positive_evidence_volume() {
        let envelope = SubmissionEnvelope {
            activity_id: "a1".to_string(),
            learner_id: "l1".to_string(),
            activity_transcript: serde_json::json!({
                "activity_generation_output": {
                    "activity_id": "a1",
                    "activity_type": "SR",
                    "title": "t",
                    "description": "d",
                    "target_skill": "S1",
                    "target_evidence_volume": 0.0,
                    "cognitive_level": "L1",
                    "depth_level": "D1",
                    "content": {"question": "q", "options": [], "correct_answer": "a"},
                    "metadata": {},
                },
                "student_engagement": {
                    "start_timestamp": "2026-01-01T00:00:00Z",
                    "submit_timestamp": "2026-01-01T00:05:00Z",
                    "completion_status": "complete",
                    "component_responses": [],
                    "assistance_log": [],
                },
            }),
        };
        let err = parse_activity_transcript(&envelope).unwrap_err();
        assert!(matches!(err, EngineError::ActivitySchemaError { .. }));
    }

    #[test]
    fn rejects_malformed_transcript_json() {
        let envelope = SubmissionEnvelope {
            activity_id: "a1".to_string(),
            learner_id: "l1".to_string(),
            activity_transcript: serde_json::json!({"nonsense": true}),
        };
        let err = parse_activity_transcript(&envelope).unwrap_err();
        assert!(matches!(err, EngineError::ActivitySchemaError { .. }));
    }
}
