//! Risk-level classification with the evidence gate.
//!
//! Thresholds map the overall score to a traffic-light level, but the
//! evidence gate overrides them: no verdict above GREEN may ever be issued
//! without at least one concrete matched phrase. This keeps every elevated
//! verdict explainable and prevents classifier-only signal, which carries
//! no localizable evidence, from raising the risk level on its own.

use crate::models::{has_any_match, CategoryScores, MatchMap, RiskLevel};

/// RED at or above this overall score.
pub const RED_THRESHOLD: f64 = 0.75;

/// YELLOW at or above this overall score.
pub const YELLOW_THRESHOLD: f64 = 0.3;

/// Classification outcome: the level plus the (possibly reset) score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub level: RiskLevel,
    pub overall_score: f64,
}

/// Map an overall score to a risk level by thresholds alone.
pub fn from_score(score: f64) -> RiskLevel {
    if score >= RED_THRESHOLD {
        RiskLevel::Red
    } else if score >= YELLOW_THRESHOLD {
        RiskLevel::Yellow
    } else {
        RiskLevel::Green
    }
}

/// Classify an analysis, enforcing the evidence gate.
///
/// With zero pattern evidence the verdict is forced to GREEN and the
/// overall score reset to 0, regardless of category scores.
pub fn classify(overall_score: f64, scores: &CategoryScores, matches: &MatchMap) -> Verdict {
    if !has_any_match(matches) {
        if !scores.is_empty() {
            tracing::debug!(
                categories = scores.len(),
                "evidence gate: scores without matches forced to GREEN"
            );
        }
        return Verdict {
            level: RiskLevel::Green,
            overall_score: 0.0,
        };
    }

    Verdict {
        level: from_score(overall_score),
        overall_score,
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::models::RiskCategory;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The evidence gate holds for arbitrary score maps: without
        /// matches the verdict is GREEN with score 0, no matter what the
        /// classifier claimed.
        #[test]
        fn prop_no_evidence_means_green(
            entries in prop::collection::vec(
                (prop::sample::select(RiskCategory::ALL.to_vec()), 0.01f64..=1.0f64),
                0..6,
            ),
            overall in 0.0f64..=1.0f64,
        ) {
            let scores: CategoryScores = entries.into_iter().collect();
            let verdict = classify(overall, &scores, &MatchMap::new());
            prop_assert_eq!(verdict.level, RiskLevel::Green);
            prop_assert_eq!(verdict.overall_score, 0.0);
        }

        /// With evidence present, classification is exactly the threshold
        /// function of the overall score.
        #[test]
        fn prop_thresholds_with_evidence(overall in 0.0f64..=1.0f64) {
            use std::sync::Arc;
            use crate::models::{Pattern, PatternMatch};

            let mut matches = MatchMap::new();
            matches.insert(
                RiskCategory::Bullying,
                vec![PatternMatch {
                    pattern: Arc::new(Pattern {
                        pattern: "x".to_string(),
                        category: RiskCategory::Bullying,
                        confidence: 0.5,
                        description: String::new(),
                    }),
                    matched_text: "x".to_string(),
                    position: 0,
                    confidence: 0.5,
                }],
            );
            let verdict = classify(overall, &CategoryScores::new(), &matches);
            prop_assert_eq!(verdict.level, from_score(overall));
            prop_assert_eq!(verdict.overall_score, overall);
        }
    }
}
