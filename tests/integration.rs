//! End-to-end scenarios for the detection pipeline through the public API.

use beacon::classifier::{LexicalClassifier, SemanticClassifier};
use beacon::config::{EngineConfig, RulesConfig};
use beacon::models::{CategoryScores, RiskCategory, RiskLevel};
use beacon::pipeline::DetectionPipeline;

fn rules_only() -> DetectionPipeline {
    DetectionPipeline::new(RulesConfig::builtin(), EngineConfig::default())
        .expect("pipeline should build from built-in rules")
}

fn hybrid() -> DetectionPipeline {
    rules_only().with_classifier(Box::new(LexicalClassifier::new()))
}

#[test]
fn neutral_time_phrase_with_disclaimer_is_green() {
    let result = rules_only().analyze("I'm busy right now, can we talk later? no pressure");

    assert_eq!(
        result.risk_level,
        RiskLevel::Green,
        "expected GREEN, score was {}",
        result.overall_score
    );
    assert_eq!(result.overall_score, 0.0);
    assert_eq!(
        result
            .matches
            .get(&RiskCategory::Pressure)
            .map_or(0, Vec::len),
        0
    );
    assert!(!result.explanation.to_lowercase().contains("mild patterns"));
}

#[test]
fn demand_with_ultimatum_mentions_threat_or_consequence() {
    let result = rules_only().analyze("Answer me right now or we're done");

    assert!(
        matches!(result.risk_level, RiskLevel::Yellow | RiskLevel::Red),
        "expected elevated verdict, got {:?} at {}",
        result.risk_level,
        result.overall_score
    );
    let lowered = result.explanation.to_lowercase();
    assert!(
        lowered.contains("threat") || lowered.contains("consequence"),
        "explanation should mention threat or consequence: {}",
        result.explanation
    );
}

#[test]
fn conditional_care_demand_flags_guilt_shifting() {
    let result = rules_only().analyze("if you cared about me, you would answer right now");

    assert!(matches!(
        result.risk_level,
        RiskLevel::Yellow | RiskLevel::Red
    ));
    let guilt_score = result.category_scores.get(RiskCategory::GuiltShifting);
    let guilt_matches = result
        .matches
        .get(&RiskCategory::GuiltShifting)
        .map_or(0, Vec::len);
    assert!(
        guilt_score >= 0.18 && guilt_matches >= 1,
        "guilt_shifting score {guilt_score}, matches {guilt_matches}"
    );
}

#[test]
fn coercive_control_conversation_is_red() {
    let text = "Person: Delete those messages and prove it\n\
                You: Why?\n\
                Person: Don't talk to other people about this\n\
                You: But...\n\
                Person: If you tell anyone, we're done";
    let result = rules_only().analyze(text);

    assert_eq!(
        result.risk_level,
        RiskLevel::Red,
        "expected RED, score was {}",
        result.overall_score
    );
    let total: usize = result.matches.values().map(Vec::len).sum();
    assert!(total > 1, "expected multiple matches, got {total}");
    let lowered = result.explanation.to_lowercase();
    assert!(lowered.contains("secrecy") || lowered.contains("isolat"));
}

#[test]
fn mutual_teasing_with_repair_is_green() {
    let text = "A: ur so silly lol\nB: haha u too\nA: jk all good";
    let result = rules_only().analyze(text);
    assert_eq!(result.risk_level, RiskLevel::Green);
}

#[test]
fn banter_never_masks_coercion() {
    // Joking markers everywhere, but a secrecy demand and an ultimatum are
    // present: the banter path must not reduce the verdict.
    let text = "A: delete those messages lol\nB: haha why\nA: jk do it or else";
    let result = rules_only().analyze(text);
    assert!(matches!(
        result.risk_level,
        RiskLevel::Yellow | RiskLevel::Red
    ));
    assert!(result
        .matches
        .get(&RiskCategory::Secrecy)
        .is_some_and(|m| !m.is_empty()));
}

#[test]
fn disclaimer_does_not_suppress_ultimatum_pressure() {
    let result = rules_only().analyze("no rush but you have to decide or we're done");
    assert!(result
        .matches
        .get(&RiskCategory::Pressure)
        .is_some_and(|m| !m.is_empty()));
    assert!(result.category_scores.get(RiskCategory::Pressure) > 0.0);
}

#[test]
fn empty_input_is_green_with_no_evidence() {
    let result = rules_only().analyze("   \n  ");
    assert_eq!(result.risk_level, RiskLevel::Green);
    assert_eq!(result.overall_score, 0.0);
    assert!(result.matches.is_empty());
}

#[test]
fn hybrid_mode_reports_ml_available() {
    let result = hybrid().analyze("hello there, how are you?");
    assert!(result.ml_available);
    assert_eq!(result.risk_level, RiskLevel::Green);
}

#[test]
fn classifier_scores_alone_never_elevate_risk() {
    struct Alarmist;

    impl SemanticClassifier for Alarmist {
        fn is_available(&self) -> bool {
            true
        }
        fn classify_batch(
            &self,
            sentences: &[String],
        ) -> beacon::Result<Vec<CategoryScores>> {
            Ok(sentences
                .iter()
                .map(|_| {
                    RiskCategory::ALL
                        .into_iter()
                        .map(|category| (category, 1.0))
                        .collect()
                })
                .collect())
        }
    }

    let pipeline = rules_only().with_classifier(Box::new(Alarmist));
    let result = pipeline.analyze("completely ordinary message about lunch plans");
    assert_eq!(result.risk_level, RiskLevel::Green);
    assert_eq!(result.overall_score, 0.0);
}

#[test]
fn hostile_message_elevates_in_hybrid_mode_too() {
    let result = hybrid().analyze("nobody likes you. everyone hates you.");
    assert!(matches!(
        result.risk_level,
        RiskLevel::Yellow | RiskLevel::Red
    ));
    assert!(result.category_scores.get(RiskCategory::Bullying) > 0.3);
}

#[test]
fn obfuscated_slang_is_still_detected() {
    let result = rules_only().analyze("stf*u ur so dumb");
    assert!(result
        .matches
        .get(&RiskCategory::Bullying)
        .is_some_and(|m| !m.is_empty()));
    assert!(matches!(
        result.risk_level,
        RiskLevel::Yellow | RiskLevel::Red
    ));
}

#[test]
fn spaced_urgency_demand_is_detected() {
    let result = rules_only().analyze("call me r n");
    assert!(result
        .matches
        .get(&RiskCategory::Pressure)
        .is_some_and(|m| !m.is_empty()));
}

#[test]
fn scheduling_reply_is_green() {
    let result = rules_only().analyze("not rn, tmr ok?");
    assert_eq!(result.risk_level, RiskLevel::Green);
}

#[test]
fn custom_rules_file_drives_detection() {
    use std::io::Write;

    let config_json = r#"{
        "rules": {
            "secrecy": {
                "patterns": [
                    {
                        "pattern": "\\bburn the letter\\b",
                        "confidence": 0.9,
                        "description": "Evidence destruction demand, coercive control"
                    }
                ]
            }
        }
    }"#;
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(config_json.as_bytes()).expect("write");

    let rules = RulesConfig::from_file(file.path()).expect("load custom rules");
    let pipeline =
        DetectionPipeline::new(rules, EngineConfig::default()).expect("pipeline");
    let result = pipeline.analyze("please burn the letter after reading");

    assert!(result
        .matches
        .get(&RiskCategory::Secrecy)
        .is_some_and(|m| !m.is_empty()));
    assert!(matches!(
        result.risk_level,
        RiskLevel::Yellow | RiskLevel::Red
    ));
}
