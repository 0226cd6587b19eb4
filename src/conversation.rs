//! Sentence segmentation and speaker-turn extraction.
//!
//! Sentences feed the semantic classifier and the pressure context gate;
//! turns feed the friendly-banter detector. Both are simple, deterministic
//! splits: punctuation runs for sentences, the "Speaker: message"
//! convention (else per-line alternation) for turns.

use regex::Regex;

use crate::error::Result;

/// A sentence with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSpan {
    pub text: String,
    /// Byte offset of the sentence start in the source text.
    pub start: usize,
    /// Byte offset one past the sentence end (exclusive, pre-trim).
    pub end: usize,
}

/// Split text into sentence-like units on `.`, `!`, `?` runs.
pub fn segment_sentences(text: &str) -> Vec<String> {
    sentence_spans(text)
        .into_iter()
        .map(|span| span.text)
        .collect()
}

/// Like [`segment_sentences`], but keeps byte offsets so callers can map a
/// match position back to its sentence.
pub fn sentence_spans(text: &str) -> Vec<SentenceSpan> {
    let mut spans = Vec::new();
    let mut start = 0usize;

    for (index, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            push_span(text, start, index, &mut spans);
            start = index + c.len_utf8();
        }
    }
    push_span(text, start, text.len(), &mut spans);
    spans
}

fn push_span(text: &str, start: usize, end: usize, spans: &mut Vec<SentenceSpan>) {
    let raw = &text[start..end];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = raw.len() - raw.trim_start().len();
    spans.push(SentenceSpan {
        text: trimmed.to_string(),
        start: start + lead,
        end,
    });
}

/// Index of the sentence span containing byte offset `position`.
///
/// Falls back to the last span that starts at or before the position, so a
/// match inside trailing punctuation still resolves to its sentence.
pub fn span_index_at(spans: &[SentenceSpan], position: usize) -> Option<usize> {
    spans
        .iter()
        .rposition(|span| span.start <= position)
        .or(if spans.is_empty() { None } else { Some(0) })
}

/// One speaker turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// Speaker label when the text carries one; synthetic "a"/"b" labels in
    /// alternation mode; `None` for unstructured single messages.
    pub speaker: Option<String>,
    pub message: String,
}

/// Extracts speaker turns from conversation text.
pub struct TurnExtractor {
    label_re: Regex,
}

impl TurnExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            label_re: Regex::new(r"^\s*(\w+)\s*:\s*(.+)$")?,
        })
    }

    /// Split text into (speaker, message) turns.
    ///
    /// When at least two lines follow the "Speaker: message" convention the
    /// labels are used (unlabeled continuation lines attach to the previous
    /// turn). Otherwise multi-line text alternates synthetic "a"/"b"
    /// speakers per line, and single-line text is one unattributed turn.
    pub fn extract(&self, text: &str) -> Vec<Turn> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let labeled = lines
            .iter()
            .filter(|line| self.label_re.is_match(line))
            .count();

        if labeled >= 2 {
            let mut turns: Vec<Turn> = Vec::new();
            for line in lines {
                if let Some(caps) = self.label_re.captures(line) {
                    turns.push(Turn {
                        speaker: Some(caps[1].to_lowercase()),
                        message: caps[2].trim().to_string(),
                    });
                } else if let Some(last) = turns.last_mut() {
                    last.message.push(' ');
                    last.message.push_str(line);
                } else {
                    turns.push(Turn {
                        speaker: None,
                        message: line.to_string(),
                    });
                }
            }
            return turns;
        }

        if lines.len() > 1 {
            return lines
                .iter()
                .enumerate()
                .map(|(i, line)| Turn {
                    speaker: Some(if i % 2 == 0 { "a" } else { "b" }.to_string()),
                    message: line.to_string(),
                })
                .collect();
        }

        vec![Turn {
            speaker: None,
            message: text.trim().to_string(),
        }]
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every span's text is a trimmed slice of the source at its offsets.
        #[test]
        fn prop_spans_index_into_source(text in "[a-zA-Z .!?]{0,80}") {
            for span in sentence_spans(&text) {
                prop_assert!(span.start <= span.end);
                prop_assert!(span.end <= text.len());
                prop_assert_eq!(text[span.start..span.end].trim(), span.text.as_str());
            }
        }

        /// Turn extraction never loses non-empty lines.
        #[test]
        fn prop_turns_cover_lines(
            lines in prop::collection::vec("[a-z ]{1,20}", 1..6)
        ) {
            let text = lines.join("\n");
            let extractor = TurnExtractor::new().expect("extractor");
            let turns = extractor.extract(&text);
            let non_empty = lines.iter().filter(|l| !l.trim().is_empty()).count();
            prop_assert!(turns.len() <= non_empty.max(1));
            prop_assert!(!turns.is_empty());
        }
    }
}
