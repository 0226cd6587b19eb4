//! Configuration loading for rules and engine tuning.
//!
//! Reads the declarative pattern configuration from a JSON file or falls
//! back to the built-in set, and exposes the tunable scoring policy
//! constants as explicit, immutable configuration objects.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BeaconError, Result};
use crate::models::{Pattern, RiskCategory};

/// One pattern entry in the rules document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDef {
    /// Regex source string.
    pub pattern: String,
    /// Base confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Human-readable description; drives explanation selection.
    #[serde(default)]
    pub description: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Patterns for a single category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryRules {
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
}

/// Declarative rules document: category name → pattern list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub rules: BTreeMap<String, CategoryRules>,
}

impl RulesConfig {
    /// Load a rules document from a JSON file.
    ///
    /// A missing or malformed file is a fatal configuration error: rules
    /// are the only mandatory evidence source and there is no silent
    /// fallback.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BeaconError::Config(format!(
                "rules config not found: {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| BeaconError::Io(format!("failed to read rules config: {}", e)))?;
        serde_json::from_str(&content)
            .map_err(|e| BeaconError::Config(format!("failed to parse rules config: {}", e)))
    }

    /// The built-in default pattern set.
    pub fn builtin() -> Self {
        builtin_rules()
    }

    /// Flatten into validated `Pattern` values.
    ///
    /// Unknown category names and out-of-range confidences are
    /// configuration errors.
    pub fn into_patterns(self) -> Result<Vec<Pattern>> {
        let mut patterns = Vec::new();
        for (name, category_rules) in self.rules {
            let category = RiskCategory::parse(&name).ok_or_else(|| {
                BeaconError::Config(format!("unknown risk category in rules config: {}", name))
            })?;
            for def in category_rules.patterns {
                if !(0.0..=1.0).contains(&def.confidence) {
                    return Err(BeaconError::Config(format!(
                        "confidence {} out of range for pattern {:?}",
                        def.confidence, def.pattern
                    )));
                }
                patterns.push(Pattern {
                    pattern: def.pattern,
                    category,
                    confidence: def.confidence,
                    description: def.description,
                });
            }
        }
        Ok(patterns)
    }
}

/// Resolve the rules document the way the binary does: an explicit
/// `RULES_CONFIG_PATH` env var wins, otherwise the built-in set is used.
pub fn load_rules() -> Result<RulesConfig> {
    match env::var("RULES_CONFIG_PATH") {
        Ok(path) => RulesConfig::from_file(Path::new(&path)),
        Err(_) => Ok(RulesConfig::builtin()),
    }
}

/// Per-category count-boost policy for rule scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Boost added per corroborating match beyond the first.
    pub count_boost_step: f64,
    /// Cap on the total count boost.
    pub count_boost_cap: f64,
    /// Minimum number of matches before any boost applies.
    pub count_boost_min_matches: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            count_boost_step: 0.05,
            count_boost_cap: 0.1,
            count_boost_min_matches: 3,
        }
    }
}

/// Overall-score combination policy.
///
/// These constants are empirically tuned policy values, not derived from a
/// principled model; they are exposed here so deployments can adjust them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorPolicy {
    /// A single category at or above this score dominates unsmoothed.
    pub severe_shortcut: f64,
    /// Max-score weight when three or more categories fire.
    pub multi_max_weight: f64,
    /// Mean-score weight when three or more categories fire.
    pub multi_avg_weight: f64,
    /// Cumulative boost per category beyond the second.
    pub multi_boost_step: f64,
    /// Cap on the cumulative boost.
    pub multi_boost_cap: f64,
    /// Max-score weight when exactly two categories fire.
    pub dual_max_weight: f64,
    /// Mean-score weight when exactly two categories fire.
    pub dual_avg_weight: f64,
    /// Flat boost when exactly two categories fire.
    pub dual_boost: f64,
}

impl Default for AggregatorPolicy {
    fn default() -> Self {
        Self {
            severe_shortcut: 0.8,
            multi_max_weight: 0.55,
            multi_avg_weight: 0.35,
            multi_boost_step: 0.12,
            multi_boost_cap: 0.25,
            dual_max_weight: 0.65,
            dual_avg_weight: 0.25,
            dual_boost: 0.10,
        }
    }
}

/// Engine-level configuration, fixed at pipeline construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Weight for rule-derived category scores.
    pub rules_weight: f64,
    /// Weight for classifier-derived category scores.
    pub ml_weight: f64,
    /// Multiplier applied to the bullying score when friendly banter is
    /// detected.
    pub banter_multiplier: f64,
    /// Multiplier applied to pressure/manipulation scores in professional
    /// contexts.
    pub professional_multiplier: f64,
    pub scoring: ScoringPolicy,
    pub aggregator: AggregatorPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rules_weight: 0.6,
            ml_weight: 0.4,
            banter_multiplier: 0.35,
            professional_multiplier: 0.4,
            scoring: ScoringPolicy::default(),
            aggregator: AggregatorPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration with environment overrides.
    ///
    /// Optional environment variables:
    /// - `RULES_WEIGHT`: weight for rule-based scores (default: 0.6)
    /// - `ML_WEIGHT`: weight for classifier scores (default: 0.4)
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(weight) = parse_env_f64("RULES_WEIGHT") {
            config.rules_weight = weight;
        }
        if let Some(weight) = parse_env_f64("ML_WEIGHT") {
            config.ml_weight = weight;
        }
        config
    }
}

fn parse_env_f64(var_name: &str) -> Option<f64> {
    env::var(var_name).ok().and_then(|s| s.parse().ok())
}

fn rule(pattern: &str, confidence: f64, description: &str) -> PatternDef {
    PatternDef {
        pattern: pattern.to_string(),
        confidence,
        description: description.to_string(),
    }
}

/// Built-in pattern set covering all six categories.
///
/// Patterns match the normalized text, so slang is already expanded
/// ("ur" → "your", "stfu" → "shut up", "rn" → "right now") and everything
/// is lowercase.
fn builtin_rules() -> RulesConfig {
    let mut rules = BTreeMap::new();

    rules.insert(
        "bullying".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\b(?:you(?:'re| are)|your) (?:so |really |such an? )?(?:stupid|dumb|an idiot|idiot|ugly|pathetic|a loser|loser|lame|trash)\b",
                    0.55,
                    "Demeaning language aimed directly at the recipient",
                ),
                rule(
                    r"\b(?:you(?:'re| are)|your) worthless\b",
                    0.7,
                    "Severe demeaning language",
                ),
                rule(
                    r"\bnobody likes you\b",
                    0.7,
                    "Social exclusion, severe demeaning message",
                ),
                rule(
                    r"\b(?:everyone|every one) (?:hates|laughs at) you\b",
                    0.7,
                    "Social exclusion",
                ),
                rule(
                    r"\bno one (?:wants|likes) you\b",
                    0.7,
                    "Social exclusion",
                ),
                rule(
                    r"\b(?:kill yourself|go die)\b",
                    0.95,
                    "Severe self-harm directive, maximum severity",
                ),
                rule(r"\bshut up\b", 0.5, "Hostile silencing"),
                rule(
                    r"\byou (?:suck|always ruin everything)\b",
                    0.5,
                    "Demeaning put-down",
                ),
            ],
        },
    );

    rules.insert(
        "manipulation".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\bif you (?:really )?(?:cared about|loved) me\b",
                    0.65,
                    "Conditional affection used as leverage",
                ),
                rule(r"\byou owe me\b", 0.6, "Obligation framing"),
                rule(
                    r"\bafter (?:all|everything) i(?:'ve)? done for you\b",
                    0.6,
                    "Obligation framing, effort leverage",
                ),
                rule(
                    r"\bi'?m the only one who (?:understands|cares about|gets) you\b",
                    0.8,
                    "Isolation from other support, coercive control",
                ),
                rule(
                    r"\bno one else (?:cares about you|would put up with you|will ever love you)\b",
                    0.8,
                    "Isolation from other support, coercive control",
                ),
                rule(
                    r"\b(?:that never happened|you'?re imagining (?:it|things)|you'?re making (?:it|things) up)\b",
                    0.7,
                    "Gaslighting, denying the other person's reality",
                ),
                rule(
                    r"\byou'?re (?:overreacting|being dramatic|too sensitive|being crazy)\b",
                    0.55,
                    "Gaslighting, dismissing feelings",
                ),
                rule(
                    r"\b(?:real friends would|if you were really my friend)\b",
                    0.6,
                    "Boundary-framing, friendship used as leverage",
                ),
            ],
        },
    );

    rules.insert(
        "pressure".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\b(?:answer|reply|respond|call|text|decide|do it|send it)(?: me)?(?: back)? (?:right )?now\b",
                    0.6,
                    "Demand for an immediate response",
                ),
                rule(
                    r"\b(?:right )?now\b",
                    0.45,
                    "Time urgency, context dependent",
                ),
                rule(
                    r"\bimmediately\b",
                    0.45,
                    "Time urgency, context dependent",
                ),
                rule(
                    r"\byou (?:have to|must|need to)\b",
                    0.55,
                    "Coercive modal, obligation demand",
                ),
                rule(
                    r"\b(?:hurry up|answer faster|reply faster|text back faster)\b",
                    0.5,
                    "Response-time pressure",
                ),
                rule(
                    r"\bstop ignoring me\b",
                    0.55,
                    "Response-time pressure, accusation of ignoring",
                ),
                rule(
                    r"\bwhy (?:haven'?t|didn'?t) you (?:answered|replied|responded)\b",
                    0.5,
                    "Response-time pressure",
                ),
                rule(
                    r"\b(?:everyone else (?:does|is doing) it|don'?t be (?:a baby|boring|lame))\b",
                    0.6,
                    "Peer pressure",
                ),
                rule(
                    r"\b(?:or else|or we'?re done|we'?re done if|if you .{0,40}we'?re done|you'?ll regret (?:it|this))\b",
                    0.85,
                    "Ultimatum, conditional relationship withdrawal",
                ),
            ],
        },
    );

    rules.insert(
        "secrecy".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\bdon'?t tell (?:anyone|anybody|your (?:mom|dad|parents|friends|family))\b",
                    0.8,
                    "Forced secrecy, blocking disclosure",
                ),
                rule(
                    r"\bkeep (?:this|it) (?:a |our )?secret\b",
                    0.8,
                    "Secrecy demand",
                ),
                rule(r"\bour (?:little )?secret\b", 0.8, "Secrecy demand"),
                rule(
                    r"\bdelete (?:th(?:is|ese|ose) )?(?:messages?|chats?|texts?|conversation)\b",
                    0.85,
                    "Evidence destruction demand, coercive control",
                ),
                rule(
                    r"\b(?:send|show) me (?:a )?(?:screenshot|proof)\b",
                    0.8,
                    "Proof-of-compliance demand, coercive control",
                ),
                rule(
                    r"\bprove (?:it|that you did)\b",
                    0.6,
                    "Proof-of-compliance demand",
                ),
                rule(
                    r"\bdon'?t talk to (?:other people|others|anyone else|anyone)\b",
                    0.85,
                    "Isolation from support, coercive control",
                ),
                rule(
                    r"\bif you tell (?:anyone|anybody|someone)\b",
                    0.85,
                    "Retaliation warning against disclosure, coercive control",
                ),
                rule(
                    r"\bthis (?:stays|is just) between us\b",
                    0.7,
                    "Secrecy demand",
                ),
            ],
        },
    );

    rules.insert(
        "guilt_shifting".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\bif you (?:really )?cared(?: about me)?,? you would\b",
                    0.6,
                    "Conditional-care guilt",
                ),
                rule(
                    r"\byou don'?t (?:even )?care(?: about me)?\b",
                    0.55,
                    "Conditional-care guilt, accusation of indifference",
                ),
                rule(
                    r"\b(?:this is|it'?s) (?:all )?your fault\b",
                    0.7,
                    "Victim-blaming",
                ),
                rule(
                    r"\byou made me (?:do (?:this|it)|feel like this|angry)\b",
                    0.7,
                    "Victim-blaming, responsibility shift",
                ),
                rule(
                    r"\bi'?m the only one (?:trying|making an effort|putting in effort)\b",
                    0.55,
                    "Effort-comparison guilt",
                ),
                rule(
                    r"\byou (?:took|take) (?:so long|forever) to (?:answer|reply|respond)\b",
                    0.5,
                    "Response-time guilt",
                ),
                rule(
                    r"\byou (?:would|should) have answered sooner\b",
                    0.5,
                    "Response-time guilt",
                ),
                rule(
                    r"\byou never (?:listen|care|have time for me)\b",
                    0.45,
                    "Generalized blame",
                ),
                rule(
                    r"\bi guess i (?:just )?don'?t matter to you\b",
                    0.55,
                    "Guilt through self-dismissal",
                ),
            ],
        },
    );

    rules.insert(
        "grooming".to_string(),
        CategoryRules {
            patterns: vec![
                rule(
                    r"\byou'?re so mature for your age\b",
                    0.85,
                    "Age-gap flattery, trust building",
                ),
                rule(
                    r"\b(?:adults|your parents|grown-?ups) (?:wouldn'?t|won'?t|don'?t|can'?t) understand\b",
                    0.8,
                    "Isolation from adults",
                ),
                rule(
                    r"\bmeet me (?:alone|in person|somewhere private)\b",
                    0.85,
                    "Meeting request, isolation",
                ),
                rule(
                    r"\bdon'?t tell your parents about (?:us|me|this)\b",
                    0.9,
                    "Relationship secrecy, isolation from adults",
                ),
                rule(
                    r"\bour (?:relationship|friendship) is special\b",
                    0.6,
                    "Special-relationship framing, trust building",
                ),
                rule(
                    r"\bsend me (?:a )?(?:photo|pic|picture)s?(?: of (?:you|yourself))?\b",
                    0.8,
                    "Image solicitation, privacy invasion",
                ),
                rule(
                    r"\byou can trust me,? i won'?t tell\b",
                    0.65,
                    "Trust building with secrecy",
                ),
            ],
        },
    );

    RulesConfig { rules }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn builtin_covers_all_categories() {
        let config = RulesConfig::builtin();
        for category in RiskCategory::ALL {
            let rules = config
                .rules
                .get(category.as_str())
                .unwrap_or_else(|| panic!("missing category {}", category.as_str()));
            assert!(!rules.patterns.is_empty());
        }
    }

    #[test]
    fn builtin_flattens_and_validates() {
        let patterns = RulesConfig::builtin()
            .into_patterns()
            .expect("builtin rules should validate");
        assert!(patterns.len() > 30);
        for pattern in &patterns {
            assert!((0.0..=1.0).contains(&pattern.confidence));
            assert!(!pattern.description.is_empty());
            regex::Regex::new(&pattern.pattern).expect("builtin pattern should compile");
        }
    }

    #[test]
    fn from_file_round_trips() {
        let config = RulesConfig::builtin();
        let json = serde_json::to_string(&config).expect("serialize");

        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(json.as_bytes()).expect("write");

        let loaded = RulesConfig::from_file(file.path()).expect("load");
        assert_eq!(loaded.rules.len(), config.rules.len());
    }

    #[test]
    fn from_file_missing_is_config_error() {
        let err = RulesConfig::from_file(Path::new("/nonexistent/rules.json"))
            .expect_err("missing file should error");
        assert!(matches!(err, BeaconError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn from_file_malformed_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{not valid json").expect("write");

        let err = RulesConfig::from_file(file.path()).expect_err("malformed should error");
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn unknown_category_is_config_error() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "spam".to_string(),
            CategoryRules {
                patterns: vec![rule("x", 0.5, "")],
            },
        );
        let err = RulesConfig { rules }
            .into_patterns()
            .expect_err("unknown category should error");
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn out_of_range_confidence_is_config_error() {
        let mut rules = BTreeMap::new();
        rules.insert(
            "bullying".to_string(),
            CategoryRules {
                patterns: vec![rule("x", 1.5, "")],
            },
        );
        let err = RulesConfig { rules }
            .into_patterns()
            .expect_err("bad confidence should error");
        assert!(matches!(err, BeaconError::Config(_)));
    }

    #[test]
    fn missing_confidence_defaults() {
        let json = r#"{"rules":{"bullying":{"patterns":[{"pattern":"x"}]}}}"#;
        let config: RulesConfig = serde_json::from_str(json).expect("parse");
        let patterns = config.into_patterns().expect("validate");
        assert_eq!(patterns[0].confidence, 0.5);
        assert!(patterns[0].description.is_empty());
    }

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rules_weight, 0.6);
        assert_eq!(config.ml_weight, 0.4);
        assert!(config.banter_multiplier >= 0.3 && config.banter_multiplier <= 0.4);
    }
}
