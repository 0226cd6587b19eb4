//! Evidence-grounded explanation and advice generation.
//!
//! Every sentence is built strictly from matched evidence: categories with
//! score-only support are never mentioned, and threat language appears in
//! prose only when the shared threat check confirms it in the evidence.
//! When evidence is inconsistent the generator falls back to the most
//! generic truthful phrasing rather than fabricating specifics.

use std::sync::Arc;

use crate::evidence::EvidenceClassifier;
use crate::models::{CategoryScores, MatchMap, PatternMatch, RiskCategory, RiskLevel};

/// Categories at or above this score read as "clear signs".
pub const STRONG_BAND: f64 = 0.6;

/// Categories at or above this score are mentioned at all.
pub const MODERATE_BAND: f64 = 0.3;

/// Grooming is only ever mentioned above this score, even as a secondary
/// category, to keep grooming false positives out of explanations.
const GROOMING_MENTION_FLOOR: f64 = 0.6;

/// Two or more categories at this score escalate the YELLOW footer.
const ESCALATION_SCORE: f64 = 0.75;

/// Maximum terse behavior phrases in the appendix.
const MAX_BEHAVIORS: usize = 4;

const GREEN_EXPLANATION: &str = "We checked this conversation for pressure, guilt-tripping, \
    secrecy demands, and other warning signs. No warning signs detected. Trust your feelings, \
    and talk to someone you trust if anything ever feels off.";

const FALLBACK_EXPLANATION: &str = "Some concerning patterns were detected in this \
    conversation, even though no single category stands out.";

/// Keyword-driven text selection: the first keyword found in any matched
/// pattern's description selects the narrative and behavior phrase.
struct SubPattern {
    keyword: &'static str,
    narrative: &'static str,
    behavior: &'static str,
}

struct CategoryTexts {
    category: RiskCategory,
    sub_patterns: &'static [SubPattern],
    default_narrative: &'static str,
    default_behavior: &'static str,
}

const CATEGORY_TEXTS: &[CategoryTexts] = &[
    CategoryTexts {
        category: RiskCategory::Bullying,
        sub_patterns: &[
            SubPattern {
                keyword: "severe",
                narrative: "The insults here go beyond teasing into deliberately cruel territory.",
                behavior: "severe insults",
            },
            SubPattern {
                keyword: "exclusion",
                narrative: "The messages push social exclusion, insisting that nobody else cares about them.",
                behavior: "social exclusion",
            },
            SubPattern {
                keyword: "demeaning",
                narrative: "The messages use demeaning language meant to make the other person feel small.",
                behavior: "demeaning insults",
            },
            SubPattern {
                keyword: "silencing",
                narrative: "The other person is being told to shut up rather than being heard.",
                behavior: "hostile silencing",
            },
        ],
        default_narrative: "The messages repeatedly put the other person down.",
        default_behavior: "repeated put-downs",
    },
    CategoryTexts {
        category: RiskCategory::Manipulation,
        sub_patterns: &[
            SubPattern {
                keyword: "gaslighting",
                narrative: "What the other person remembers or feels is being denied, a tactic known as gaslighting.",
                behavior: "gaslighting",
            },
            SubPattern {
                keyword: "isolation",
                narrative: "The sender positions themselves as the only person who cares, cutting off other support.",
                behavior: "isolation from other support",
            },
            SubPattern {
                keyword: "conditional",
                narrative: "Affection is being offered or taken away depending on compliance.",
                behavior: "conditional affection",
            },
            SubPattern {
                keyword: "obligation",
                narrative: "Past favors are being used as leverage to demand something in return.",
                behavior: "obligation pressure",
            },
            SubPattern {
                keyword: "boundary",
                narrative: "Friendship itself is being redefined to make refusal look like betrayal.",
                behavior: "friendship leverage",
            },
        ],
        default_narrative: "The messages steer the other person toward something they did not choose.",
        default_behavior: "manipulative framing",
    },
    CategoryTexts {
        category: RiskCategory::Pressure,
        sub_patterns: &[
            SubPattern {
                keyword: "ultimatum",
                narrative: "Demands are being attached to conditions designed to leave no room for refusal.",
                behavior: "ultimatum-style demands",
            },
            SubPattern {
                keyword: "peer",
                narrative: "Peer pressure phrasing is used to make refusal look abnormal.",
                behavior: "peer pressure",
            },
            SubPattern {
                keyword: "response-time",
                narrative: "The sender is piling on urgency about how fast the other person replies.",
                behavior: "response-time pressure",
            },
            SubPattern {
                keyword: "coercive modal",
                narrative: "The wording turns requests into obligations with 'have to' and 'must'.",
                behavior: "obligation wording",
            },
            SubPattern {
                keyword: "time urgency",
                narrative: "Immediate action is being demanded without any room to think.",
                behavior: "demands for instant replies",
            },
            SubPattern {
                keyword: "immediate",
                narrative: "Immediate action is being demanded without any room to think.",
                behavior: "demands for instant replies",
            },
        ],
        default_narrative: "The messages push for compliance faster than is comfortable.",
        default_behavior: "pushy urgency",
    },
    CategoryTexts {
        category: RiskCategory::Secrecy,
        sub_patterns: &[
            SubPattern {
                keyword: "proof",
                narrative: "Proof of compliance is being demanded, which is a strong coercive-control marker.",
                behavior: "demands for proof of compliance",
            },
            SubPattern {
                keyword: "evidence destruction",
                narrative: "Deleting messages is being demanded, destroying the record of the conversation.",
                behavior: "demands to delete messages",
            },
            SubPattern {
                keyword: "isolation",
                narrative: "The other person is being told not to talk to anyone else about this, isolating them from support.",
                behavior: "isolation from friends or family",
            },
            SubPattern {
                keyword: "disclosure",
                narrative: "Telling anyone is being framed as a betrayal with a price attached.",
                behavior: "warnings against telling anyone",
            },
        ],
        default_narrative: "Secrecy is being demanded, which is how unsafe situations stay hidden.",
        default_behavior: "secrecy demands",
    },
    CategoryTexts {
        category: RiskCategory::GuiltShifting,
        sub_patterns: &[
            SubPattern {
                keyword: "victim-blaming",
                narrative: "Responsibility for the sender's behavior is being shifted onto the other person.",
                behavior: "blame shifting",
            },
            SubPattern {
                keyword: "conditional-care",
                narrative: "Care is being questioned to extract compliance: 'if you cared, you would'.",
                behavior: "conditional-care guilt",
            },
            SubPattern {
                keyword: "response-time",
                narrative: "Guilt is being attached to how quickly the other person responds.",
                behavior: "guilt over reply speed",
            },
            SubPattern {
                keyword: "effort",
                narrative: "One-sided effort claims are used to make the other person feel indebted.",
                behavior: "one-sided effort claims",
            },
        ],
        default_narrative: "The messages work to make the other person feel at fault.",
        default_behavior: "guilt-tripping",
    },
    CategoryTexts {
        category: RiskCategory::Grooming,
        sub_patterns: &[
            SubPattern {
                keyword: "age",
                narrative: "Age-gap flattery is being used to build inappropriate trust.",
                behavior: "age-gap flattery",
            },
            SubPattern {
                keyword: "adults",
                narrative: "Trusted adults are being framed as people who would not understand.",
                behavior: "distancing from trusted adults",
            },
            SubPattern {
                keyword: "meeting",
                narrative: "A private meeting is being pushed, away from anyone who could help.",
                behavior: "requests to meet privately",
            },
            SubPattern {
                keyword: "privacy",
                narrative: "Personal images are being solicited.",
                behavior: "image solicitation",
            },
            SubPattern {
                keyword: "trust",
                narrative: "Trust is being accelerated in a way that serves the sender, not the recipient.",
                behavior: "accelerated trust-building",
            },
        ],
        default_narrative: "The pattern of trust-building here is concerning.",
        default_behavior: "inappropriate trust-building",
    },
];

/// Descriptor used in the synthesized first RED advice line.
fn dominant_descriptor(category: RiskCategory) -> &'static str {
    match category {
        RiskCategory::Bullying => "targeted insults",
        RiskCategory::Manipulation => "coercive control",
        RiskCategory::Pressure => "relentless pressure",
        RiskCategory::Secrecy => "secrecy demands",
        RiskCategory::GuiltShifting => "guilt-tripping",
        RiskCategory::Grooming => "predatory trust-building",
    }
}

/// Generates explanations and advice from detection evidence.
pub struct ExplanationGenerator {
    evidence: Arc<EvidenceClassifier>,
}

impl ExplanationGenerator {
    pub fn new(evidence: Arc<EvidenceClassifier>) -> Self {
        Self { evidence }
    }

    /// Build the explanation for a verdict.
    pub fn explain(
        &self,
        level: RiskLevel,
        scores: &CategoryScores,
        matches: &MatchMap,
        overall_score: f64,
        analyzed_text: &str,
    ) -> String {
        if level == RiskLevel::Green {
            return GREEN_EXPLANATION.to_string();
        }

        let evidenced = evidenced_categories(scores, matches);
        if evidenced.is_empty() {
            tracing::debug!(
                overall_score,
                "explanation fallback: no category clears the evidence bands"
            );
            return format!("{} {}", FALLBACK_EXPLANATION, self.footer(level, scores));
        }

        let mut parts = Vec::new();
        parts.push(category_list_sentence(&evidenced));

        let (primary, _) = evidenced[0];
        if let Some(primary_matches) = matches.get(&primary).filter(|m| !m.is_empty()) {
            parts.push(category_narrative(primary, primary_matches).to_string());
        }

        if self.evidence.threat_in_evidence(matches, analyzed_text) {
            parts.push(
                "Threat language is part of the picture: consequences or withdrawal are being \
                 used to force compliance."
                    .to_string(),
            );
        }

        let behaviors = observed_behaviors(&evidenced, matches);
        if !behaviors.is_empty() {
            parts.push(format!("Behaviors observed: {}.", join_natural(&behaviors)));
        }

        parts.push(self.footer(level, scores));
        parts.join(" ")
    }

    /// Severity footer appended to every elevated explanation.
    fn footer(&self, level: RiskLevel, scores: &CategoryScores) -> String {
        match level {
            RiskLevel::Red => "This needs immediate attention: please involve a trusted adult \
                or someone who can help right away."
                .to_string(),
            RiskLevel::Yellow => {
                let serious = scores
                    .iter()
                    .filter(|(_, score)| *score >= ESCALATION_SCORE)
                    .count();
                if serious >= 2 {
                    "Several serious warning signs appear together here; treat this \
                     conversation with real caution."
                        .to_string()
                } else {
                    "Worth paying attention: some warning signs are present, so notice how \
                     this conversation makes you feel."
                        .to_string()
                }
            }
            RiskLevel::Green => String::new(),
        }
    }

    /// Advice list for a verdict. RED's first message is synthesized from
    /// the dominant evidenced categories.
    pub fn advice(
        &self,
        level: RiskLevel,
        _overall_score: f64,
        scores: &CategoryScores,
        matches: &MatchMap,
    ) -> Vec<String> {
        match level {
            RiskLevel::Green => vec![
                "No action needed. Keep chatting with people who respect you.".to_string(),
                "If a conversation ever starts to feel wrong, trust that feeling.".to_string(),
                "You can always show a chat to someone you trust for a second opinion."
                    .to_string(),
            ],
            RiskLevel::Yellow => vec![
                "Trust your feelings. If something feels wrong, it probably is.".to_string(),
                "It's okay to say no, even to friends or people you know.".to_string(),
                "You don't have to reply right away; taking time is always allowed.".to_string(),
                "Talk to someone you trust about this conversation.".to_string(),
            ],
            RiskLevel::Red => {
                let dominant: Vec<&'static str> = scores
                    .iter()
                    .filter(|(category, score)| {
                        *score >= STRONG_BAND
                            && matches.get(category).is_some_and(|m| !m.is_empty())
                    })
                    .map(|(category, _)| dominant_descriptor(category))
                    .collect();
                let first = if dominant.is_empty() {
                    "This chat shows several serious warning signs at once. Please take it \
                     seriously."
                        .to_string()
                } else {
                    format!(
                        "This chat shows signs of {}. Please take it seriously.",
                        join_natural(&dominant)
                    )
                };
                vec![
                    first,
                    "Talk to a trusted adult right away: a parent, teacher, or counselor."
                        .to_string(),
                    "You are not alone, and none of this is your fault.".to_string(),
                    "Keep the messages as they are; you don't have to handle this by yourself."
                        .to_string(),
                ]
            }
        }
    }
}

/// Categories eligible for mention: at least one actual match, score in the
/// moderate band or above, grooming only above its floor. Sorted by score,
/// highest first.
fn evidenced_categories(scores: &CategoryScores, matches: &MatchMap) -> Vec<(RiskCategory, f64)> {
    let mut evidenced: Vec<(RiskCategory, f64)> = scores
        .iter()
        .filter(|(category, score)| {
            if matches.get(category).map_or(true, |m| m.is_empty()) {
                return false;
            }
            if *category == RiskCategory::Grooming {
                return *score >= GROOMING_MENTION_FLOOR;
            }
            *score >= MODERATE_BAND
        })
        .collect();
    evidenced.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    evidenced
}

/// Opening sentence listing detected categories, split into strong and
/// moderate bands.
fn category_list_sentence(evidenced: &[(RiskCategory, f64)]) -> String {
    let strong: Vec<&'static str> = evidenced
        .iter()
        .filter(|(_, score)| *score >= STRONG_BAND)
        .map(|(category, _)| category.label())
        .collect();
    let moderate: Vec<&'static str> = evidenced
        .iter()
        .filter(|(_, score)| *score < STRONG_BAND)
        .map(|(category, _)| category.label())
        .collect();

    match (strong.is_empty(), moderate.is_empty()) {
        (false, false) => format!(
            "This conversation shows clear signs of {} and milder signs of {}.",
            join_natural(&strong),
            join_natural(&moderate)
        ),
        (false, true) => format!(
            "This conversation shows clear signs of {}.",
            join_natural(&strong)
        ),
        (true, false) => format!(
            "This conversation shows signs of {}.",
            join_natural(&moderate)
        ),
        (true, true) => String::new(),
    }
}

/// Behavioral narrative for the primary category, selected by the
/// sub-pattern keywords present in its matched patterns' descriptions.
fn category_narrative(category: RiskCategory, matches: &[PatternMatch]) -> &'static str {
    let Some(texts) = CATEGORY_TEXTS.iter().find(|t| t.category == category) else {
        return FALLBACK_EXPLANATION;
    };
    for sub_pattern in texts.sub_patterns {
        let found = matches.iter().any(|m| {
            m.pattern
                .description
                .to_lowercase()
                .contains(sub_pattern.keyword)
        });
        if found {
            return sub_pattern.narrative;
        }
    }
    texts.default_narrative
}

/// Up to [`MAX_BEHAVIORS`] terse behavior phrases, derived from the same
/// evidence-gated keyword tables as the narratives.
fn observed_behaviors(
    evidenced: &[(RiskCategory, f64)],
    matches: &MatchMap,
) -> Vec<&'static str> {
    let mut behaviors: Vec<&'static str> = Vec::new();
    for (category, _) in evidenced {
        let Some(category_matches) = matches.get(category).filter(|m| !m.is_empty()) else {
            continue;
        };
        let Some(texts) = CATEGORY_TEXTS.iter().find(|t| t.category == *category) else {
            continue;
        };
        let mut found_any = false;
        for sub_pattern in texts.sub_patterns {
            let found = category_matches.iter().any(|m| {
                m.pattern
                    .description
                    .to_lowercase()
                    .contains(sub_pattern.keyword)
            });
            if found {
                found_any = true;
                if !behaviors.contains(&sub_pattern.behavior) {
                    behaviors.push(sub_pattern.behavior);
                }
                if behaviors.len() >= MAX_BEHAVIORS {
                    return behaviors;
                }
            }
        }
        if !found_any && !behaviors.contains(&texts.default_behavior) {
            behaviors.push(texts.default_behavior);
            if behaviors.len() >= MAX_BEHAVIORS {
                return behaviors;
            }
        }
    }
    behaviors
}

/// Natural-language list: "a", "a and b", "a, b, and c".
fn join_natural(items: &[&str]) -> String {
    match items {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{} and {}", first, second),
        [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
    }
}
