//! Core data models for the beacon detection engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Traffic-light risk verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Green,
    Yellow,
    Red,
}

impl RiskLevel {
    /// Canonical lowercase string form, used at the serialization edge.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Green => "green",
            RiskLevel::Yellow => "yellow",
            RiskLevel::Red => "red",
        }
    }
}

/// The six fixed risk dimensions.
///
/// The category set must remain fixed for pattern configuration, scoring,
/// and explanation templates to stay consistent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    Bullying,
    Manipulation,
    Pressure,
    Secrecy,
    GuiltShifting,
    Grooming,
}

impl RiskCategory {
    /// All categories, in canonical order.
    pub const ALL: [RiskCategory; 6] = [
        RiskCategory::Bullying,
        RiskCategory::Manipulation,
        RiskCategory::Pressure,
        RiskCategory::Secrecy,
        RiskCategory::GuiltShifting,
        RiskCategory::Grooming,
    ];

    /// Canonical snake_case string form, matching the rules configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Bullying => "bullying",
            RiskCategory::Manipulation => "manipulation",
            RiskCategory::Pressure => "pressure",
            RiskCategory::Secrecy => "secrecy",
            RiskCategory::GuiltShifting => "guilt_shifting",
            RiskCategory::Grooming => "grooming",
        }
    }

    /// Parse the canonical string form back into a category.
    pub fn parse(s: &str) -> Option<Self> {
        RiskCategory::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Human-readable label used in explanation text.
    pub fn label(&self) -> &'static str {
        match self {
            RiskCategory::Bullying => "bullying",
            RiskCategory::Manipulation => "manipulation",
            RiskCategory::Pressure => "pressure",
            RiskCategory::Secrecy => "secrecy demands",
            RiskCategory::GuiltShifting => "guilt-tripping",
            RiskCategory::Grooming => "grooming",
        }
    }
}

/// An immutable detection rule loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Regex source string.
    pub pattern: String,
    /// Category this pattern provides evidence for.
    pub category: RiskCategory,
    /// Base confidence in [0, 1].
    pub confidence: f64,
    /// Human-readable description; also drives explanation selection.
    pub description: String,
}

/// One occurrence of a pattern in the analyzed text.
#[derive(Debug, Clone, Serialize)]
pub struct PatternMatch {
    /// The owning pattern definition, for downstream display.
    pub pattern: Arc<Pattern>,
    /// Exact matched substring.
    pub matched_text: String,
    /// Byte offset of the match in the analyzed (normalized) text.
    pub position: usize,
    /// Confidence, copied from the pattern at match time.
    pub confidence: f64,
}

/// Matches grouped by category. Only categories with at least one match
/// carry an entry.
pub type MatchMap = BTreeMap<RiskCategory, Vec<PatternMatch>>;

/// Total number of matches across all categories.
pub fn total_match_count(matches: &MatchMap) -> usize {
    matches.values().map(Vec::len).sum()
}

/// Whether any category has at least one concrete match.
pub fn has_any_match(matches: &MatchMap) -> bool {
    matches.values().any(|m| !m.is_empty())
}

/// Sparse category → score map.
///
/// Invariant: every stored score is in (0, 1]; an absent category means 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryScores(BTreeMap<RiskCategory, f64>);

impl CategoryScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Score for a category; 0 when absent.
    pub fn get(&self, category: RiskCategory) -> f64 {
        self.0.get(&category).copied().unwrap_or(0.0)
    }

    /// Set a score, clamped to [0, 1]. Scores at or below 0 remove the entry.
    pub fn set(&mut self, category: RiskCategory, score: f64) {
        let score = score.clamp(0.0, 1.0);
        if score > 0.0 {
            self.0.insert(category, score);
        } else {
            self.0.remove(&category);
        }
    }

    /// Multiply a category's score by `factor`, keeping the invariant.
    pub fn scale(&mut self, category: RiskCategory, factor: f64) {
        let current = self.get(category);
        if current > 0.0 {
            self.set(category, current * factor);
        }
    }

    /// Remove a category entirely (score becomes 0).
    pub fn remove(&mut self, category: RiskCategory) {
        self.0.remove(&category);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of categories with a non-zero score.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RiskCategory, f64)> + '_ {
        self.0.iter().map(|(c, s)| (*c, *s))
    }

    /// Highest score across categories; 0 when empty.
    pub fn max_score(&self) -> f64 {
        self.0.values().copied().fold(0.0, f64::max)
    }

    /// Highest-scoring category, ties broken by canonical category order.
    pub fn max_entry(&self) -> Option<(RiskCategory, f64)> {
        self.iter()
            .fold(None, |best: Option<(RiskCategory, f64)>, (c, s)| match best {
                Some((_, bs)) if bs >= s => best,
                _ => Some((c, s)),
            })
    }

    /// Mean of all stored scores; 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.0.is_empty() {
            return 0.0;
        }
        self.0.values().sum::<f64>() / self.0.len() as f64
    }
}

impl FromIterator<(RiskCategory, f64)> for CategoryScores {
    fn from_iter<I: IntoIterator<Item = (RiskCategory, f64)>>(iter: I) -> Self {
        let mut scores = CategoryScores::new();
        for (category, score) in iter {
            scores.set(category, score);
        }
        scores
    }
}

/// Terminal value returned to the caller. Not mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    /// Traffic-light verdict.
    pub risk_level: RiskLevel,
    /// Overall risk score in [0, 1].
    pub overall_score: f64,
    /// Per-category aggregated scores.
    pub category_scores: CategoryScores,
    /// Evidence-grounded explanation text.
    pub explanation: String,
    /// Ordered advice messages appropriate to the risk level.
    pub advice: Vec<String>,
    /// Concrete pattern evidence, grouped by category.
    pub matches: MatchMap,
    /// Whether the semantic classifier contributed to this analysis.
    pub ml_available: bool,
    /// When the analysis ran.
    pub analyzed_at: DateTime<Utc>,
}
