//! Detection pipeline orchestration.
//!
//! Composes the normalizer, rule engine, context classifiers, optional
//! semantic classifier, aggregator, risk classifier, and explainer into
//! one synchronous `analyze` call. All components are immutable after
//! construction; each call works on fresh intermediate values, so a
//! pipeline can be shared behind an `Arc` freely.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::aggregator::ScoreAggregator;
use crate::classifier::{max_per_category, SemanticClassifier};
use crate::config::{EngineConfig, RulesConfig};
use crate::context::ContextClassifier;
use crate::conversation::segment_sentences;
use crate::error::Result;
use crate::evidence::EvidenceClassifier;
use crate::explainer::ExplanationGenerator;
use crate::models::{CategoryScores, DetectionResult, RiskCategory};
use crate::normalizer::TextNormalizer;
use crate::risk;
use crate::rules::RuleEngine;

/// The complete detection pipeline.
pub struct DetectionPipeline {
    normalizer: TextNormalizer,
    rule_engine: RuleEngine,
    context: ContextClassifier,
    classifier: Option<Box<dyn SemanticClassifier>>,
    aggregator: ScoreAggregator,
    explainer: ExplanationGenerator,
    config: EngineConfig,
}

impl DetectionPipeline {
    /// Build a rules-only pipeline from configuration.
    ///
    /// This is the only place that performs I/O-adjacent work (rules were
    /// already loaded into `rules_config`); a malformed pattern is fatal
    /// here, never at analysis time.
    pub fn new(rules_config: RulesConfig, config: EngineConfig) -> Result<Self> {
        let evidence = Arc::new(EvidenceClassifier::new()?);
        let patterns = rules_config.into_patterns()?;
        let rule_engine = RuleEngine::new(
            patterns,
            config.scoring.clone(),
            Arc::clone(&evidence),
        )?;
        tracing::info!(
            patterns = rule_engine.pattern_count(),
            "detection pipeline initialized in rules-only mode"
        );

        Ok(Self {
            normalizer: TextNormalizer::new()?,
            rule_engine,
            context: ContextClassifier::new(Arc::clone(&evidence))?,
            classifier: None,
            aggregator: ScoreAggregator::new(
                config.rules_weight,
                config.ml_weight,
                config.aggregator.clone(),
            ),
            explainer: ExplanationGenerator::new(evidence),
            config,
        })
    }

    /// Attach a semantic classifier. Its scores become a second, additive
    /// signal source; the pipeline stays fully functional without it.
    pub fn with_classifier(mut self, classifier: Box<dyn SemanticClassifier>) -> Self {
        if classifier.is_available() {
            tracing::info!("detection pipeline running in hybrid mode (rules + semantic)");
        } else {
            tracing::info!("semantic classifier attached but unavailable; rules-only mode");
        }
        self.classifier = Some(classifier);
        self
    }

    /// Analyze chat text. Never fails: every degradation path resolves to
    /// a valid, conservative result.
    pub fn analyze(&self, text: &str) -> DetectionResult {
        let request_id = Uuid::new_v4();
        let message = self.normalizer.normalize(text);

        let analysis = self.rule_engine.analyze(&message.normalized_text);
        let rules_scores = analysis.category_scores;
        let matches = analysis.matches;

        let banter = self
            .context
            .is_friendly_banter(&message, &matches, &self.normalizer);
        let professional = self
            .context
            .is_professional_context(&message.normalized_text);

        let (ml_scores, ml_available) = self.semantic_scores(&message.normalized_text);

        let mut scores = if ml_available && !ml_scores.is_empty() {
            self.aggregator.aggregate(&rules_scores, &ml_scores)
        } else {
            rules_scores
        };

        // Context down-weights, applied once to the merged scores so the
        // net factor is the same for the rules and semantic contributions.
        // Banter touches bullying only; the channels coercive control flows
        // through are never down-weighted (the hard-blocker check inside
        // the banter classifier already refused those cases).
        if banter {
            let before = scores.get(RiskCategory::Bullying);
            scores.scale(RiskCategory::Bullying, self.config.banter_multiplier);
            tracing::debug!(
                request_id = %request_id,
                before,
                after = scores.get(RiskCategory::Bullying),
                "friendly banter detected; bullying down-weighted"
            );
        }
        if professional {
            for category in [RiskCategory::Pressure, RiskCategory::Manipulation] {
                let before = scores.get(category);
                if before > 0.0 {
                    scores.scale(category, self.config.professional_multiplier);
                    tracing::debug!(
                        request_id = %request_id,
                        category = category.as_str(),
                        before,
                        after = scores.get(category),
                        "professional context; score down-weighted"
                    );
                }
            }
        }

        let overall = self.aggregator.overall_score(&scores);
        let verdict = risk::classify(overall, &scores, &matches);

        let explanation = self.explainer.explain(
            verdict.level,
            &scores,
            &matches,
            verdict.overall_score,
            &message.normalized_text,
        );
        let advice =
            self.explainer
                .advice(verdict.level, verdict.overall_score, &scores, &matches);

        tracing::debug!(
            request_id = %request_id,
            level = verdict.level.as_str(),
            score = verdict.overall_score,
            matches = crate::models::total_match_count(&matches),
            ml_available,
            "analysis complete"
        );

        DetectionResult {
            risk_level: verdict.level,
            overall_score: verdict.overall_score,
            category_scores: scores,
            explanation,
            advice,
            matches,
            ml_available,
            analyzed_at: Utc::now(),
        }
    }

    /// Run the semantic classifier, degrading silently to rules-only on
    /// absence, unavailability, or error.
    fn semantic_scores(&self, normalized_text: &str) -> (CategoryScores, bool) {
        let Some(classifier) = &self.classifier else {
            return (CategoryScores::new(), false);
        };
        if !classifier.is_available() {
            return (CategoryScores::new(), false);
        }
        let sentences = segment_sentences(normalized_text);
        match classifier.classify_batch(&sentences) {
            Ok(per_sentence) => (max_per_category(&per_sentence), true),
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    "semantic classifier failed; continuing rules-only"
                );
                (CategoryScores::new(), false)
            }
        }
    }
}
