//! Score aggregation: merging rule and classifier scores, and folding the
//! category vector into one overall risk score.
//!
//! Weights are normalized once at construction and never mutated; the
//! rules-only fallback is a construction-time decision.

use crate::config::AggregatorPolicy;
use crate::models::{CategoryScores, RiskCategory};

/// Aggregates risk scores from multiple sources.
#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    rules_weight: f64,
    ml_weight: f64,
    policy: AggregatorPolicy,
}

impl ScoreAggregator {
    /// Create an aggregator with normalized weights.
    ///
    /// Weights are scaled to sum to 1. If both are zero or negative the
    /// aggregator falls back to rules-only (1.0 / 0.0).
    pub fn new(rules_weight: f64, ml_weight: f64, policy: AggregatorPolicy) -> Self {
        let total = rules_weight + ml_weight;
        if total > 0.0 && rules_weight >= 0.0 && ml_weight >= 0.0 {
            Self {
                rules_weight: rules_weight / total,
                ml_weight: ml_weight / total,
                policy,
            }
        } else {
            Self {
                rules_weight: 1.0,
                ml_weight: 0.0,
                policy,
            }
        }
    }

    /// Normalized rules weight.
    pub fn rules_weight(&self) -> f64 {
        self.rules_weight
    }

    /// Normalized classifier weight.
    pub fn ml_weight(&self) -> f64 {
        self.ml_weight
    }

    /// Weighted per-category combination over the union of both inputs,
    /// capped at 1.0.
    pub fn aggregate(&self, rules: &CategoryScores, ml: &CategoryScores) -> CategoryScores {
        let mut combined = CategoryScores::new();
        for category in RiskCategory::ALL {
            let rules_score = rules.get(category);
            let ml_score = ml.get(category);
            if rules_score <= 0.0 && ml_score <= 0.0 {
                continue;
            }
            let merged = rules_score * self.rules_weight + ml_score * self.ml_weight;
            combined.set(category, merged.min(1.0));
        }
        combined
    }

    /// Fold the category vector into one overall score.
    ///
    /// A single severe signal dominates unsmoothed; several moderate
    /// categories firing together indicate a systemic pattern and score
    /// higher than any one of them alone.
    pub fn overall_score(&self, scores: &CategoryScores) -> f64 {
        if scores.is_empty() {
            return 0.0;
        }
        let max = scores.max_score();
        if max >= self.policy.severe_shortcut {
            return max;
        }

        let count = scores.len();
        let mean = scores.mean();
        let combined = match count {
            1 => max,
            2 => {
                max * self.policy.dual_max_weight
                    + mean * self.policy.dual_avg_weight
                    + self.policy.dual_boost
            }
            n => {
                let boost = ((n - 2) as f64 * self.policy.multi_boost_step)
                    .min(self.policy.multi_boost_cap);
                max * self.policy.multi_max_weight + mean * self.policy.multi_avg_weight + boost
            }
        };
        combined.min(1.0)
    }
}
