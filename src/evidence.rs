//! Shared evidence heuristics: threat phrasing, coercive-control markers,
//! severe insults, joking and repair markers.
//!
//! Both the context classifiers and the explanation generator consult this
//! one module, so threat and coercion detection cannot drift between
//! components.

use regex::Regex;

use crate::error::Result;
use crate::models::{MatchMap, PatternMatch, RiskCategory};

/// How far around a match the threat check scans the analyzed text, in
/// bytes. Catches cross-sentence coercion ("Answer. Right now. Or else.").
const THREAT_WINDOW: usize = 200;

/// Pattern-description keywords that mark a match as coercive control.
/// Matches carrying these are hard blockers for any down-weighting.
const COERCIVE_DESCRIPTION_KEYWORDS: &[&str] = &[
    "coercive control",
    "isolation",
    "proof",
    "secrecy",
    "forced",
    "evidence destruction",
    "disclosure",
];

/// Consolidated classifier over matched evidence and surrounding text.
pub struct EvidenceClassifier {
    threat_re: Regex,
    severe_insult_re: Regex,
    repair_re: Regex,
    joking_re: Regex,
    override_re: Regex,
}

impl EvidenceClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            threat_re: Regex::new(
                r"\b(?:or else|we'?re done|you'?ll regret|you'?ll be sorry|don'?t expect|if you don'?t|unless you|or i(?:'ll| will))\b",
            )?,
            severe_insult_re: Regex::new(
                r"\b(?:worthless|kill yourself|kys|go die|shut up|nobody likes you|pathetic)\b",
            )?,
            repair_re: Regex::new(
                r"\b(?:just kidding|kidding|joking|all good|no worries|my bad|didn'?t mean it)\b",
            )?,
            joking_re: Regex::new(
                r"\b(?:just kidding|kidding|joking|laughing|haha|hehe)\b",
            )?,
            override_re: Regex::new(
                r"\b(?:or else|must|have to|we'?re done|you'?ll regret|unless)\b",
            )?,
        })
    }

    /// Threat or ultimatum phrasing anywhere in the text.
    pub fn has_threat_language(&self, text: &str) -> bool {
        self.threat_re.is_match(text)
    }

    /// Severe insult anywhere in the text (post-normalization forms).
    pub fn has_severe_insult(&self, text: &str) -> bool {
        self.severe_insult_re.is_match(text)
    }

    /// Repair/closure marker ("just kidding", "all good", "my bad", ...).
    pub fn has_repair_marker(&self, text: &str) -> bool {
        self.repair_re.is_match(text)
    }

    /// Joking marker ("laughing", "haha", "kidding", ...).
    pub fn has_joking_marker(&self, text: &str) -> bool {
        self.joking_re.is_match(text)
    }

    /// Strong-override token inside a matched pressure phrase. An explicit
    /// "no pressure" disclaimer never suppresses matches carrying one.
    pub fn is_strong_override(&self, matched_text: &str) -> bool {
        self.override_re.is_match(matched_text)
    }

    /// Whether a match's pattern description marks it as coercive control.
    pub fn is_coercive_match(&self, candidate: &PatternMatch) -> bool {
        let description = candidate.pattern.description.to_lowercase();
        COERCIVE_DESCRIPTION_KEYWORDS
            .iter()
            .any(|keyword| description.contains(keyword))
    }

    /// Any secrecy/manipulation match signalling coercive control.
    pub fn has_coercive_control(&self, matches: &MatchMap) -> bool {
        [RiskCategory::Secrecy, RiskCategory::Manipulation]
            .iter()
            .filter_map(|category| matches.get(category))
            .flatten()
            .any(|candidate| self.is_coercive_match(candidate))
    }

    /// Strict gate for mentioning threats in prose: true only when threat
    /// phrasing appears in a matched substring itself, or in the analyzed
    /// text within [`THREAT_WINDOW`] bytes of a match.
    pub fn threat_in_evidence(&self, matches: &MatchMap, analyzed_text: &str) -> bool {
        for candidate in matches.values().flatten() {
            if self.threat_re.is_match(&candidate.matched_text) {
                return true;
            }
            let window = window_around(analyzed_text, candidate.position, THREAT_WINDOW);
            if self.threat_re.is_match(window) {
                return true;
            }
        }
        false
    }
}

/// Char-boundary-safe window of ±`radius` bytes around `position`.
fn window_around(text: &str, position: usize, radius: usize) -> &str {
    let mut start = position.saturating_sub(radius).min(text.len());
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = position.saturating_add(radius).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}
