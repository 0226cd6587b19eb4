//! Pattern rule engine: detection, contextual gating, and category scoring.
//!
//! Matches the configured regex patterns against normalized text, then
//! applies the pressure context gate (self-report vs demand) and the global
//! "no pressure" suppression before scoring each category.

use std::sync::Arc;

use regex::Regex;

use crate::config::ScoringPolicy;
use crate::conversation::{sentence_spans, span_index_at, SentenceSpan};
use crate::error::Result;
use crate::evidence::EvidenceClassifier;
use crate::models::{CategoryScores, MatchMap, Pattern, PatternMatch, RiskCategory};

/// Structured result of rule analysis.
#[derive(Debug, Clone)]
pub struct RuleAnalysis {
    pub category_scores: CategoryScores,
    pub matches: MatchMap,
}

struct CompiledPattern {
    pattern: Arc<Pattern>,
    regex: Regex,
}

/// Engine for matching configured rules against chat text.
pub struct RuleEngine {
    patterns: Vec<CompiledPattern>,
    scoring: ScoringPolicy,
    evidence: Arc<EvidenceClassifier>,
    self_report_re: Regex,
    demand_re: Regex,
    disclaimer_re: Regex,
}

impl RuleEngine {
    /// Compile the loaded patterns. A malformed regex is a fatal error.
    pub fn new(
        patterns: Vec<Pattern>,
        scoring: ScoringPolicy,
        evidence: Arc<EvidenceClassifier>,
    ) -> Result<Self> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let regex = Regex::new(&pattern.pattern)?;
            compiled.push(CompiledPattern {
                pattern: Arc::new(pattern),
                regex,
            });
        }

        Ok(Self {
            patterns: compiled,
            scoring,
            evidence,
            self_report_re: Regex::new(
                r"\b(?:i'?m busy|i am busy|can'?t|cannot|not (?:right )?now|not available|no pressure|no rush|take your time|maybe later|talk later|be right back|on my way|i'?ll\b|sorry)",
            )?,
            demand_re: Regex::new(
                r"\b(?:answer|reply|respond|call|text|send|do it|come|tell|prove|delete|decide|hurry)\b|\byou (?:have to|must|need to)\b|\b(?:or else|we'?re done|you'?ll regret|unless)\b",
            )?,
            disclaimer_re: Regex::new(
                r"\b(?:no pressure|no rush|no hurry|take your time|no worries|whenever you(?:'re| are) ready)\b",
            )?,
        })
    }

    /// Number of compiled patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Raw detection: every pattern, all non-overlapping matches.
    pub fn detect(&self, text: &str) -> MatchMap {
        let mut matches = MatchMap::new();
        for compiled in &self.patterns {
            for found in compiled.regex.find_iter(text) {
                matches
                    .entry(compiled.pattern.category)
                    .or_default()
                    .push(PatternMatch {
                        pattern: Arc::clone(&compiled.pattern),
                        matched_text: found.as_str().to_string(),
                        position: found.start(),
                        confidence: compiled.pattern.confidence,
                    });
            }
        }
        matches
    }

    /// Full analysis: detection, gating, suppression, scoring.
    pub fn analyze(&self, text: &str) -> RuleAnalysis {
        let mut matches = self.detect(text);
        self.apply_pressure_gate(text, &mut matches);
        self.apply_global_suppression(text, &mut matches);

        let mut category_scores = CategoryScores::new();
        for (category, category_matches) in &matches {
            category_scores.set(*category, self.category_score(category_matches));
        }

        RuleAnalysis {
            category_scores,
            matches,
        }
    }

    /// Aggregate a category's matches: max confidence plus a diminishing
    /// count boost. One or two matches earn no boost; repeated corroborating
    /// matches past that do.
    pub fn category_score(&self, matches: &[PatternMatch]) -> f64 {
        if matches.is_empty() {
            return 0.0;
        }
        let max_confidence = matches.iter().map(|m| m.confidence).fold(0.0, f64::max);
        let boost = if matches.len() >= self.scoring.count_boost_min_matches {
            ((matches.len() - 1) as f64 * self.scoring.count_boost_step)
                .min(self.scoring.count_boost_cap)
        } else {
            0.0
        };
        (max_confidence + boost).min(1.0)
    }

    /// Re-examine bare time-urgency matches ("now", "right now",
    /// "immediately") against a ±1-sentence window. Self-report phrasing
    /// ("i'm busy right now", "can't right now") excludes the match; a
    /// demand indicator in the window retains it; ambiguous cases default
    /// to retained.
    fn apply_pressure_gate(&self, text: &str, matches: &mut MatchMap) {
        let Some(pressure) = matches.get_mut(&RiskCategory::Pressure) else {
            return;
        };
        let spans = sentence_spans(text);

        pressure.retain(|candidate| {
            if !is_bare_urgency(&candidate.matched_text) {
                return true;
            }
            let window = window_text(&spans, candidate.position);
            if self.self_report_re.is_match(&window) {
                tracing::debug!(
                    matched = %candidate.matched_text,
                    "urgency token classified as self-report; excluded"
                );
                return false;
            }
            if self.demand_re.is_match(&window) {
                tracing::debug!(
                    matched = %candidate.matched_text,
                    "urgency token classified as demand; retained"
                );
            } else {
                tracing::debug!(
                    matched = %candidate.matched_text,
                    "urgency token ambiguous; retained by default"
                );
            }
            true
        });

        if pressure.is_empty() {
            matches.remove(&RiskCategory::Pressure);
        }
    }

    /// An explicit "no pressure" disclaimer discards all pressure matches,
    /// unless one of them carries a strong-override token (ultimatum,
    /// "must", "have to") that directly contradicts the disclaimer.
    fn apply_global_suppression(&self, text: &str, matches: &mut MatchMap) {
        if !self.disclaimer_re.is_match(text) {
            return;
        }
        let Some(pressure) = matches.get(&RiskCategory::Pressure) else {
            return;
        };
        let has_override = pressure
            .iter()
            .any(|m| self.evidence.is_strong_override(&m.matched_text));
        if has_override {
            tracing::debug!("disclaimer present but contradicted by override token; kept");
            return;
        }
        tracing::debug!(
            discarded = pressure.len(),
            "no-pressure disclaimer honored; pressure matches discarded"
        );
        matches.remove(&RiskCategory::Pressure);
    }
}

/// Whether a matched substring is a bare urgency token subject to the
/// context gate.
fn is_bare_urgency(matched_text: &str) -> bool {
    matches!(matched_text.trim(), "now" | "right now" | "immediately")
}

/// The sentence containing `position` plus its neighbors on both sides.
fn window_text(spans: &[SentenceSpan], position: usize) -> String {
    let Some(index) = span_index_at(spans, position) else {
        return String::new();
    };
    let start = index.saturating_sub(1);
    let end = (index + 1).min(spans.len().saturating_sub(1));
    spans[start..=end]
        .iter()
        .map(|span| span.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
