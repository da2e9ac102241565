//! Pure decay-weighted cumulative score math (§4.4.3). No I/O: every
//! function here operates on plain rows already ordered by the caller.

/// One row's contribution to a cumulative score computation. Mirrors the
/// subset of `ActivityHistoryRow` the algorithm actually needs, so the math
/// can be exercised without touching the database or domain module.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInput {
    pub target_evidence_volume: f64,
    pub validity_modifier: f64,
    pub performance_score: f64,
}

/// Per-row decay weighting, computed for a slice ordered newest-first
/// (index 0 = most recent, as the algorithm in §4.4.3 requires).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedRow {
    pub adjusted_evidence: f64,
    pub evidence_after: f64,
    pub decay: f64,
    pub weight: f64,
}

/// Weight every row of a newest-first ordered slice against decay factor `d`.
pub fn weight_rows(rows: &[ScoreInput], d: f64) -> Vec<WeightedRow> {
    let adjusted: Vec<f64> = rows
        .iter()
        .map(|r| r.target_evidence_volume * r.validity_modifier)
        .collect();

    let mut out = Vec::with_capacity(rows.len());
    for i in 0..rows.len() {
        let evidence_after: f64 = adjusted[..i].iter().sum();
        let decay = d.powf(evidence_after);
        let weight = adjusted[i] * decay;
        out.push(WeightedRow {
            adjusted_evidence: adjusted[i],
            evidence_after,
            decay,
            weight,
        });
    }
    out
}

/// Cumulative score and total (undecayed) evidence for a newest-first
/// ordered row slice. `prior_mean` is used when the row set is empty or the
/// weight sum is zero.
pub fn cumulative_score(rows: &[ScoreInput], d: f64, prior_mean: f64) -> (f64, f64) {
    if rows.is_empty() {
        return (prior_mean, 0.0);
    }

    let weighted = weight_rows(rows, d);
    let weight_sum: f64 = weighted.iter().map(|w| w.weight).sum();
    let score = if weight_sum > 0.0 {
        weighted
            .iter()
            .zip(rows)
            .map(|(w, r)| w.weight * r.performance_score)
            .sum::<f64>()
            / weight_sum
    } else {
        prior_mean
    };

    let total_evidence: f64 = weighted.iter().map(|w| w.adjusted_evidence).sum();
    (score, total_evidence)
}

/// Standard error of measurement (§4.4.3), clamped to `[0.05, 0.25]`.
pub fn standard_error(n: usize, total_evidence: f64) -> f64 {
    if n == 0 {
        return 0.25;
    }
    let sem = 0.20 * (1.0 / (n as f64).sqrt()) * (1.0 / total_evidence.max(1.0).sqrt());
    sem.clamp(0.05, 0.25)
}

/// 95% confidence interval around `score`, clamped to `[0,1]`.
pub fn confidence_interval(score: f64, sem: f64) -> (f64, f64) {
    let half = 1.96 * sem;
    ((score - half).clamp(0.0, 1.0), (score + half).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(target: f64, validity: f64, score: f64) -> ScoreInput {
        ScoreInput {
            target_evidence_volume: target,
            validity_modifier: validity,
            performance_score: score,
        }
    }

    #[test]
    fn newest_row_has_no_decay() {
        let rows = [row(5.0, 1.0, 0.5), row(5.0, 1.0, 0.8), row(5.0, 1.0, 1.0)];
        let weighted = weight_rows(&rows, 0.9);
        assert_eq!(weighted[0].decay, 1.0);
        assert_eq!(weighted[0].adjusted_evidence, weighted[0].weight);
    }

    #[test]
    fn decay_monotonicity_lower_d_discounts_more() {
        let rows = [row(5.0, 1.0, 0.2), row(5.0, 1.0, 0.9), row(5.0, 1.0, 0.9)];
        let (low_d_score, _) = cumulative_score(&rows, 0.5, 0.0);
        let (high_d_score, _) = cumulative_score(&rows, 0.99, 0.0);
        // Lower d discounts older (higher-scoring) rows more, so the newest
        // (lowest-scoring) row dominates more heavily under low_d.
        assert!(low_d_score < high_d_score);
    }

    #[test]
    fn e2_decay_applied_matches_spec_example() {
        // spec §8 E2: three rows oldest->newest (0.5, 0.8, 1.0), d=0.9,
        // newest-first for the algorithm is [1.0, 0.8, 0.5].
        let rows = [row(5.0, 1.0, 1.0), row(5.0, 1.0, 0.8), row(5.0, 1.0, 0.5)];
        let (score, total_evidence) = cumulative_score(&rows, 0.9, 0.0);
        assert!((score - 0.833).abs() < 0.01, "score was {score}");
        assert_eq!(total_evidence, 15.0);
    }

    #[test]
    fn empty_rows_yield_prior_mean_and_zero_evidence() {
        let (score, evidence) = cumulative_score(&[], 0.9, 0.42);
        assert_eq!(score, 0.42);
        assert_eq!(evidence, 0.0);
    }

    #[test]
    fn standard_error_is_clamped() {
        assert_eq!(standard_error(0, 0.0), 0.25);
        assert!(standard_error(100, 1000.0) >= 0.05);
    }
}
