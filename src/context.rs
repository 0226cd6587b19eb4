//! Context classifiers: friendly-banter and professional-context detection.
//!
//! Both are advisory down-weighters over the rule engine's output. They
//! decide *whether* a down-weight applies; the pipeline applies the
//! configured multipliers. Neither ever suppresses a category outright,
//! and banter suppression never applies while coercive-control evidence
//! is present.

use std::sync::Arc;

use regex::Regex;

use crate::conversation::{Turn, TurnExtractor};
use crate::error::Result;
use crate::evidence::EvidenceClassifier;
use crate::models::{MatchMap, RiskCategory};
use crate::normalizer::{NormalizedMessage, TextNormalizer};

/// Mutuality looks at the last N turns.
const MUTUALITY_WINDOW: usize = 6;

/// Repair markers must appear in the last N turns.
const REPAIR_WINDOW: usize = 3;

/// Repeated bullying matches without repair block banter suppression.
const UNREPAIRED_INSULT_THRESHOLD: usize = 2;

/// Detects conversational contexts that justify down-weighting.
pub struct ContextClassifier {
    evidence: Arc<EvidenceClassifier>,
    turns: TurnExtractor,
    work_terms_re: Regex,
    personal_attack_re: Regex,
}

impl ContextClassifier {
    pub fn new(evidence: Arc<EvidenceClassifier>) -> Result<Self> {
        Ok(Self {
            evidence,
            turns: TurnExtractor::new()?,
            work_terms_re: Regex::new(
                r"\b(?:bug|fix|code|production|deploy|project|deadline|task|work|job|client|customer|team|meeting|ticket|release|report)\b|\bi'?ll (?:fix|get|handle|resolve|address)\b|\b(?:i'?m so sorry|i apologize|my apologies|my mistake|my fault)\b",
            )?,
            personal_attack_re: Regex::new(
                r"\b(?:you(?:'re| are)|your) (?:so |really |such an? )?(?:stupid|an idiot|idiot|pathetic|ugly|worthless)\b|\b(?:kill yourself|kys|go die|i hate you)\b",
            )?,
        })
    }

    /// Friendly teasing: mutual joking within the recent turns AND a
    /// repair/closure marker near the end, with no hard blocker present.
    ///
    /// Hard blockers win unconditionally: banter suppression must never
    /// mask coercion.
    pub fn is_friendly_banter(
        &self,
        message: &NormalizedMessage,
        matches: &MatchMap,
        normalizer: &TextNormalizer,
    ) -> bool {
        if self.has_hard_blockers(&message.normalized_text, matches) {
            tracing::debug!("banter suppression blocked by hard blocker");
            return false;
        }

        let turns = self.turns.extract(&message.raw_text);
        let mutuality = self.check_mutuality(&turns, normalizer);
        let repair = self.check_repair(&turns, normalizer);

        mutuality && repair
    }

    /// Hard blockers: coercive-control matches, threat/ultimatum phrasing,
    /// severe insults, or repeated insults with no repair marker anywhere.
    fn has_hard_blockers(&self, normalized_text: &str, matches: &MatchMap) -> bool {
        if self.evidence.has_coercive_control(matches) {
            return true;
        }
        if self.evidence.has_threat_language(normalized_text) {
            return true;
        }
        if self.evidence.has_severe_insult(normalized_text) {
            return true;
        }
        let bullying_count = matches
            .get(&RiskCategory::Bullying)
            .map_or(0, |m| m.len());
        if bullying_count >= UNREPAIRED_INSULT_THRESHOLD
            && !self.evidence.has_repair_marker(normalized_text)
        {
            return true;
        }
        false
    }

    /// At least two distinct speakers produce a joking marker within the
    /// last [`MUTUALITY_WINDOW`] turns.
    fn check_mutuality(&self, turns: &[Turn], normalizer: &TextNormalizer) -> bool {
        if turns.len() < 2 {
            return false;
        }
        let recent = &turns[turns.len().saturating_sub(MUTUALITY_WINDOW)..];
        let mut joking_speakers: Vec<&str> = Vec::new();
        for turn in recent {
            let Some(speaker) = turn.speaker.as_deref() else {
                continue;
            };
            let normalized = normalizer.normalize(&turn.message);
            if self.evidence.has_joking_marker(&normalized.normalized_text)
                && !joking_speakers.contains(&speaker)
            {
                joking_speakers.push(speaker);
            }
        }
        joking_speakers.len() >= 2
    }

    /// A repair/closure marker in one of the last [`REPAIR_WINDOW`] turns.
    fn check_repair(&self, turns: &[Turn], normalizer: &TextNormalizer) -> bool {
        turns
            .iter()
            .rev()
            .take(REPAIR_WINDOW)
            .any(|turn| {
                let normalized = normalizer.normalize(&turn.message);
                self.evidence.has_repair_marker(&normalized.normalized_text)
            })
    }

    /// Professional context: workplace vocabulary with no personal attacks.
    /// Ordinary professional urgency and apology are not coercion.
    pub fn is_professional_context(&self, normalized_text: &str) -> bool {
        self.work_terms_re.is_match(normalized_text)
            && !self.personal_attack_re.is_match(normalized_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RulesConfig, ScoringPolicy};
    use crate::rules::RuleEngine;

    struct Fixture {
        classifier: ContextClassifier,
        normalizer: TextNormalizer,
        engine: RuleEngine,
    }

    fn fixture() -> Fixture {
        let evidence = Arc::new(EvidenceClassifier::new().expect("evidence"));
        Fixture {
            classifier: ContextClassifier::new(Arc::clone(&evidence)).expect("classifier"),
            normalizer: TextNormalizer::new().expect("normalizer"),
            engine: RuleEngine::new(
                RulesConfig::builtin().into_patterns().expect("patterns"),
                ScoringPolicy::default(),
                evidence,
            )
            .expect("engine"),
        }
    }

    fn banter(f: &Fixture, text: &str) -> bool {
        let message = f.normalizer.normalize(text);
        let matches = f.engine.analyze(&message.normalized_text).matches;
        f.classifier
            .is_friendly_banter(&message, &matches, &f.normalizer)
    }

    #[test]
    fn mutual_teasing_with_repair_is_banter() {
        let f = fixture();
        let text = "A: bruh ur wild lol\nB: haha u too\nA: jk all good";
        assert!(banter(&f, text));
    }

    #[test]
    fn joking_on_one_side_only_is_not_banter() {
        let f = fixture();
        let text = "A: ur so dumb lol\nB: stop\nA: jk";
        assert!(!banter(&f, text));
    }

    #[test]
    fn no_repair_marker_is_not_banter() {
        let f = fixture();
        let text = "A: ur wild lol\nB: haha whatever\nA: anyway";
        // Both sides joke but nothing near the end repairs the teasing.
        assert!(!banter(&f, text));
    }

    #[test]
    fn single_message_is_never_banter() {
        let f = fixture();
        assert!(!banter(&f, "lol jk you are funny"));
    }

    #[test]
    fn threat_blocks_banter() {
        let f = fixture();
        let text = "A: do it or else lol\nB: haha ok\nA: jk all good";
        assert!(!banter(&f, text));
    }

    #[test]
    fn severe_insult_blocks_banter() {
        let f = fixture();
        let text = "A: ur worthless lol\nB: haha\nA: jk all good";
        assert!(!banter(&f, text));
    }

    #[test]
    fn coercive_control_blocks_banter() {
        let f = fixture();
        let text = "A: delete those messages lol\nB: haha why\nA: jk all good";
        assert!(!banter(&f, text));
    }

    #[test]
    fn repeated_insults_without_repair_block_banter() {
        let f = fixture();
        let text = "A: ur so dumb lol\nB: haha ur an idiot\nA: laughing";
        // Two bullying matches, joking markers on both sides, but no repair
        // marker anywhere.
        assert!(!banter(&f, text));
    }

    #[test]
    fn professional_context_detected() {
        let f = fixture();
        let message = f
            .normalizer
            .normalize("There's a bug in production. I'll fix it immediately. I'm so sorry.");
        assert!(f
            .classifier
            .is_professional_context(&message.normalized_text));
    }

    #[test]
    fn personal_attack_defeats_professional_context() {
        let f = fixture();
        let message = f
            .normalizer
            .normalize("The deadline slipped because you're so stupid.");
        assert!(!f
            .classifier
            .is_professional_context(&message.normalized_text));
    }

    #[test]
    fn casual_chat_is_not_professional() {
        let f = fixture();
        let message = f.normalizer.normalize("want to hang out later?");
        assert!(!f
            .classifier
            .is_professional_context(&message.normalized_text));
    }
}
