//! Semantic classification: pluggable trait plus a lexical reference
//! implementation.
//!
//! The pipeline treats semantic scores as a strictly best-effort, additive
//! signal: an unavailable or failing classifier degrades the analysis to
//! rules-only mode, and semantic scores alone can never raise the risk
//! level past the evidence gate.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::models::{CategoryScores, RiskCategory};

/// Sentence-level category scorer injected into the pipeline.
///
/// Implementations return one score map per input sentence, with an empty
/// map where the sentence carries no signal. Errors are caught by the
/// pipeline and treated as "unavailable for this call".
pub trait SemanticClassifier: Send + Sync {
    /// Whether the underlying model is loaded and usable.
    fn is_available(&self) -> bool;

    /// Score each sentence against every category.
    fn classify_batch(&self, sentences: &[String]) -> Result<Vec<CategoryScores>>;
}

/// Fold per-sentence score maps into one map by taking, per category, the
/// maximum score across all sentences.
pub fn max_per_category(per_sentence: &[CategoryScores]) -> CategoryScores {
    let mut merged = CategoryScores::new();
    for scores in per_sentence {
        for (category, score) in scores.iter() {
            if score > merged.get(category) {
                merged.set(category, score);
            }
        }
    }
    merged
}

/// Similarities below this are treated as no signal at all, so lexical
/// noise does not inflate the category count during aggregation.
const SIMILARITY_FLOOR: f64 = 0.3;

/// Reference phrases representing each risk category.
const REFERENCE_PHRASES: &[(RiskCategory, &[&str])] = &[
    (
        RiskCategory::Bullying,
        &[
            "you are ugly and stupid",
            "nobody likes you",
            "everyone hates you",
        ],
    ),
    (
        RiskCategory::Manipulation,
        &[
            "if you really cared about me, you would do this",
            "you owe me after all i did for you",
            "i'm the only one who understands you",
        ],
    ),
    (
        RiskCategory::Pressure,
        &[
            "you have to do this right now",
            "don't be a baby, everyone else does it",
            "you must send this immediately",
        ],
    ),
    (
        RiskCategory::Secrecy,
        &[
            "don't tell anyone about this",
            "keep this our secret",
            "delete these messages",
        ],
    ),
    (
        RiskCategory::GuiltShifting,
        &[
            "this is all your fault",
            "you made me do this",
            "this is because of you",
        ],
    ),
    (
        RiskCategory::Grooming,
        &[
            "you're so mature for your age",
            "adults won't understand us",
            "meet me alone without telling anyone",
        ],
    ),
];

/// Function words dropped before similarity scoring.
const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "and", "are", "be", "because", "did", "do",
    "for", "i", "i'm", "is", "it", "me", "my", "of", "so", "the", "this",
    "to", "us", "would", "you", "your",
];

/// Deterministic token-overlap classifier against the reference phrases.
///
/// Stands in where no embedding provider is injected: cosine similarity
/// over binary token sets, maximum across a category's reference phrases.
/// Always available, never fails.
pub struct LexicalClassifier {
    references: Vec<(RiskCategory, Vec<BTreeSet<String>>)>,
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalClassifier {
    pub fn new() -> Self {
        let references = REFERENCE_PHRASES
            .iter()
            .map(|(category, phrases)| {
                let token_sets = phrases.iter().map(|p| tokenize(p)).collect();
                (*category, token_sets)
            })
            .collect();
        Self { references }
    }

    /// Score one sentence against every category.
    pub fn classify(&self, sentence: &str) -> CategoryScores {
        let tokens = tokenize(sentence);
        let mut scores = CategoryScores::new();
        if tokens.is_empty() {
            return scores;
        }
        for (category, reference_sets) in &self.references {
            let best = reference_sets
                .iter()
                .map(|reference| cosine(&tokens, reference))
                .fold(0.0, f64::max);
            if best >= SIMILARITY_FLOOR {
                scores.set(*category, best);
            }
        }
        scores
    }
}

impl SemanticClassifier for LexicalClassifier {
    fn is_available(&self) -> bool {
        true
    }

    fn classify_batch(&self, sentences: &[String]) -> Result<Vec<CategoryScores>> {
        Ok(sentences.iter().map(|s| self.classify(s)).collect())
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|token| token.trim_matches('\''))
        .filter(|token| !token.is_empty() && !STOPWORDS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Cosine similarity over binary token sets.
fn cosine(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let overlap = a.intersection(b).count() as f64;
    overlap / ((a.len() as f64).sqrt() * (b.len() as f64).sqrt())
}
