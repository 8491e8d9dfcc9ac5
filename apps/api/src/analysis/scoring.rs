use serde::{Deserialize, Serialize};

use crate::models::section::FeatureVector;

/// Whether the semantic signal was available for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    Full,
    /// Embedding capability unavailable; keyword + structural only.
    Degraded,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub keyword: f64,
    pub structural: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.5,
            keyword: 0.3,
            structural: 0.2,
        }
    }
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

impl ScoringWeights {
    /// Weights must be non-negative, sum to 1, and keep semantic > keyword > structural.
    pub fn validate(&self) -> Result<(), String> {
        if self.semantic < 0.0 || self.keyword < 0.0 || self.structural < 0.0 {
            return Err(format!("scoring weights must be non-negative: {self:?}"));
        }
        let sum = self.semantic + self.keyword + self.structural;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(format!("scoring weights must sum to 1.0, got {sum:.6}"));
        }
        if !(self.semantic > self.keyword && self.keyword > self.structural) {
            return Err(format!(
                "scoring weights must keep semantic > keyword > structural: {self:?}"
            ));
        }
        Ok(())
    }

    /// Keyword and structural weights rescaled to sum to 1, semantic dropped.
    pub fn without_semantic(&self) -> Self {
        let rest = self.keyword + self.structural;
        if rest <= 0.0 {
            return Self {
                semantic: 0.0,
                keyword: 0.5,
                structural: 0.5,
            };
        }
        Self {
            semantic: 0.0,
            keyword: self.keyword / rest,
            structural: self.structural / rest,
        }
    }

    pub fn for_mode(&self, mode: SignalMode) -> Self {
        match mode {
            SignalMode::Full => *self,
            SignalMode::Degraded => self.without_semantic(),
        }
    }
}

/// Combined relevance score: w_sem*semantic + w_kw*keyword + w_struct*structural, clamped to [0, 1].
pub fn compute_relevance_score(features: &FeatureVector, weights: &ScoringWeights) -> f64 {
    (weights.semantic * features.semantic_score
        + weights.keyword * features.keyword_score
        + weights.structural * features.structural_score)
        .clamp(0.0, 1.0)
}

/// Pure scorer bound to one weight set. Same inputs always yield the same score.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelevanceScorer {
    weights: ScoringWeights,
}

impl RelevanceScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, features: &FeatureVector, mode: SignalMode) -> f64 {
        compute_relevance_score(features, &self.weights.for_mode(mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fv(semantic: f64, keyword: f64, structural: f64) -> FeatureVector {
        FeatureVector {
            semantic_score: semantic,
            keyword_score: keyword,
            structural_score: structural,
        }
    }

    #[test]
    fn test_default_weights_are_valid() {
        assert!(ScoringWeights::default().validate().is_ok());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let w = ScoringWeights {
            semantic: 0.5,
            keyword: 0.3,
            structural: 0.3,
        };
        assert!(w.validate().unwrap_err().contains("sum to 1.0"));
    }

    #[test]
    fn test_weights_must_keep_relative_order() {
        let w = ScoringWeights {
            semantic: 0.2,
            keyword: 0.3,
            structural: 0.5,
        };
        assert!(w.validate().unwrap_err().contains("semantic > keyword"));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let w = ScoringWeights {
            semantic: 1.2,
            keyword: 0.0,
            structural: -0.2,
        };
        assert!(w.validate().unwrap_err().contains("non-negative"));
    }

    #[test]
    fn test_scenario_composite_scores() {
        let w = ScoringWeights::default();
        // 0.5*0.9 + 0.3*0.2 + 0.2*0.1 = 0.45 + 0.06 + 0.02 = 0.53
        assert!((compute_relevance_score(&fv(0.9, 0.2, 0.1), &w) - 0.53).abs() < 1e-9);
        // 0.5*0.4 + 0.3*0.4 + 0.2*0.4 = 0.40
        assert!((compute_relevance_score(&fv(0.4, 0.4, 0.4), &w) - 0.40).abs() < 1e-9);
        // 0.5*0.9 + 0.3*0.2 + 0.2*0.9 = 0.45 + 0.06 + 0.18 = 0.69
        assert!((compute_relevance_score(&fv(0.9, 0.2, 0.9), &w) - 0.69).abs() < 1e-9);
    }

    #[test]
    fn test_score_full_is_one() {
        let score = compute_relevance_score(&fv(1.0, 1.0, 1.0), &ScoringWeights::default());
        assert!((score - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_score_clamped() {
        let w = ScoringWeights {
            semantic: 1.0,
            keyword: 0.0,
            structural: 0.0,
        };
        assert_eq!(compute_relevance_score(&fv(1.5, 0.0, 0.0), &w), 1.0);
        assert_eq!(compute_relevance_score(&fv(-0.5, 0.0, 0.0), &w), 0.0);
    }

    #[test]
    fn test_degraded_weights_renormalize_keyword_and_structural() {
        let w = ScoringWeights::default().without_semantic();
        assert_eq!(w.semantic, 0.0);
        assert!((w.keyword - 0.6).abs() < 1e-9);
        assert!((w.structural - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_degraded_mode_ignores_semantic_signal() {
        let scorer = RelevanceScorer::default();
        let a = scorer.score(&fv(0.0, 0.5, 0.5), SignalMode::Degraded);
        let b = scorer.score(&fv(1.0, 0.5, 0.5), SignalMode::Degraded);
        assert!((a - b).abs() < f64::EPSILON);
        assert!((a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_scorer_is_deterministic() {
        let scorer = RelevanceScorer::default();
        let features = fv(0.37, 0.81, 0.2);
        assert_eq!(
            scorer.score(&features, SignalMode::Full),
            scorer.score(&features, SignalMode::Full)
        );
    }
}
