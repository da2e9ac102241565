//! Historical summarization (spec.md §4.1): a compact digest of a learner's
//! prior history for one skill, computed once per `(learner_id, row_count)`
//! and handed to the Intelligent Feedback phase as prompt context.

use mastery_shared::ActivityHistoryRow;
use serde::Serialize;

const RECENT_WINDOW: usize = 5;
const TREND_WINDOW: usize = 3;
/// Standard-deviation thresholds over the full score series for consistency.
const CONSISTENCY_HIGH_STDDEV: f64 = 0.10;
const CONSISTENCY_MODERATE_STDDEV: f64 = 0.20;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecentActivity {
    pub activity_id: String,
    pub activity_title: String,
    pub performance_score: f64,
    pub completion_timestamp: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistoricalSummary {
    pub activity_count: usize,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub average_score: f64,
    pub trend_direction: String,
    pub consistency: String,
    pub last_five_activities: Vec<RecentActivity>,
    pub activity_type_distribution: Vec<(String, usize)>,
}

impl HistoricalSummary {
    /// `rows` must be chronological ascending (oldest first).
    pub fn compute(rows: &[ActivityHistoryRow]) -> Self {
        if rows.is_empty() {
            return Self {
                activity_count: 0,
                date_range_start: None,
                date_range_end: None,
                average_score: 0.0,
                trend_direction: "stable".to_string(),
                consistency: "unknown".to_string(),
                last_five_activities: Vec::new(),
                activity_type_distribution: Vec::new(),
            };
        }

        let activity_count = rows.len();
        let date_range_start = rows.first().map(|r| r.completion_timestamp.to_rfc3339());
        let date_range_end = rows.last().map(|r| r.completion_timestamp.to_rfc3339());
        let average_score = rows.iter().map(|r| r.performance_score).sum::<f64>() / activity_count as f64;

        let trend_direction = trend_direction(rows);
        let consistency = consistency(rows);

        let last_five_activities = rows
            .iter()
            .rev()
            .take(RECENT_WINDOW)
            .map(|r| RecentActivity {
                activity_id: r.activity_id.clone(),
                activity_title: r.activity_title.clone(),
                performance_score: r.performance_score,
                completion_timestamp: r.completion_timestamp.to_rfc3339(),
            })
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let mut distribution: Vec<(String, usize)> = Vec::new();
        for row in rows {
            let type_name = row.activity_type.as_str().to_string();
            match distribution.iter_mut().find(|(t, _)| *t == type_name) {
                Some((_, count)) => *count += 1,
                None => distribution.push((type_name, 1)),
            }
        }

        Self {
            activity_count,
            date_range_start,
            date_range_end,
            average_score,
            trend_direction,
            consistency,
            last_five_activities,
            activity_type_distribution: distribution,
        }
    }

    /// Render as prose for embedding into a prompt's `{historical_summary}`
    /// placeholder (see `prompts::build`).
    pub fn render(&self) -> String {
        if self.activity_count == 0 {
            return "No prior activity history for this skill.".to_string();
        }
        format!(
            "{} prior activities from {} to {}. Average score {:.2}. Trend: {}. Consistency: {}.",
            self.activity_count,
            self.date_range_start.as_deref().unwrap_or("unknown"),
            self.date_range_end.as_deref().unwrap_or("unknown"),
            self.average_score,
            self.trend_direction,
            self.consistency,
        )
    }
}

/// Simple linear trend: compares the last of the trailing 3 scores against
/// the first of that same window. `rows` is chronological ascending.
fn trend_direction(rows: &[ActivityHistoryRow]) -> String {
    if rows.len() < 2 {
        return "stable".to_string();
    }
    let recent: Vec<f64> = rows.iter().rev().take(TREND_WINDOW).map(|r| r.performance_score).rev().collect();
    if recent.len() < 2 {
        return "stable".to_string();
    }
    let first = recent.first().copied().unwrap();
    let last = recent.last().copied().unwrap();

    if last > first {
        "improving".to_string()
    } else if last < first {
        "declining".to_string()
    } else {
        "stable".to_string()
    }
}

/// Standard deviation over the full score series.
fn consistency(rows: &[ActivityHistoryRow]) -> String {
    if rows.len() < 2 {
        return "unknown".to_string();
    }
    let scores: Vec<f64> = rows.iter().map(|r| r.performance_score).collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let stddev = variance.sqrt();

    if stddev < CONSISTENCY_HIGH_STDDEV {
        "high".to_string()
    } else if stddev < CONSISTENCY_MODERATE_STDDEV {
        "moderate".to_string()
    } else {
        "low".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mastery_shared::ActivityType;

    fn row(score: f64, days_ago: i64, activity_type: ActivityType) -> ActivityHistoryRow {
        ActivityHistoryRow {
            history_id: 0,
            learner_id: "l1".to_string(),
            record_id: 1,
            activity_id: format!("a-{days_ago}"),
            skill_id: "S001".to_string(),
            completion_timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::days(days_ago),
            activity_type,
            activity_title: "title".to_string(),
            performance_score: score,
            target_evidence_volume: 5.0,
            validity_modifier: 1.0,
            adjusted_evidence_volume: 5.0,
            cumulative_evidence_weight: 5.0,
            decay_factor: 0.9,
            decay_adjusted_evidence_volume: 5.0,
            cumulative_performance: score,
            cumulative_evidence: 5.0,
            evaluation_result: serde_json::json!({}),
            activity_transcript: serde_json::json!({}),
        }
    }

    #[test]
    fn empty_history_yields_zeroed_summary() {
        let summary = HistoricalSummary::compute(&[]);
        assert_eq!(summary.activity_count, 0);
        assert_eq!(summary.trend_direction, "stable");
        assert_eq!(summary.consistency, "unknown");
    }

    #[test]
    fn improving_trend_detected_across_rising_scores() {
        let rows = vec![
            row(0.3, 0, ActivityType::SR),
            row(0.4, 1, ActivityType::SR),
            row(0.7, 2, ActivityType::CR),
            row(0.8, 3, ActivityType::CR),
        ];
        let summary = HistoricalSummary::compute(&rows);
        assert_eq!(summary.trend_direction, "improving");
        assert_eq!(summary.activity_count, 4);
        assert_eq!(summary.activity_type_distribution, vec![("SR".to_string(), 2), ("CR".to_string(), 2)]);
    }

    #[test]
    fn high_consistency_for_tightly_clustered_scores() {
        let rows = vec![row(0.8, 0, ActivityType::SR), row(0.82, 1, ActivityType::SR), row(0.79, 2, ActivityType::SR)];
        let summary = HistoricalSummary::compute(&rows);
        assert_eq!(summary.consistency, "high");
    }

    #[test]
    fn last_five_activities_preserves_chronological_order() {
        let rows: Vec<_> = (0..8).map(|i| row(0.5, i, ActivityType::SR)).collect();
        let summary = HistoricalSummary::compute(&rows);
        assert_eq!(summary.last_five_activities.len(), 5);
        assert_eq!(summary.last_five_activities.first().unwrap().activity_id, "a-3");
        assert_eq!(summary.last_five_activities.last().unwrap().activity_id, "a-7");
    }
}
