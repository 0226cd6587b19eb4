//! Text normalization for chat slang, obfuscation, and tone markers.
//!
//! Produces the canonical lowercase form that all pattern matching runs
//! against. Normalization is a pure function: it never fails, and
//! unrecognized tokens pass through unchanged.

use regex::Regex;
use serde::Serialize;

use crate::error::Result;

/// Tone flags derived from emoji and address tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ToneMarkers {
    /// Joking emoji present (😂 🤣 😅 ...).
    pub joking: bool,
    /// Annoyed emoji present (😒 🙄 💢 ...).
    pub annoyed: bool,
    /// Friendly address token present ("bruh", "bro").
    pub friendly: bool,
    /// Intensity token present ("lowkey", "highkey").
    pub intense: bool,
}

/// One slang substitution that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Replacement {
    pub original: String,
    pub normalized: String,
}

/// Result of normalization. Immutable after construction.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedMessage {
    /// The input text, untouched.
    pub raw_text: String,
    /// Fully normalized lowercase text.
    pub normalized_text: String,
    /// Slang substitutions applied, in order.
    pub replacements: Vec<Replacement>,
    /// Whether any tone-set emoji was present.
    pub has_emoji: bool,
    pub tone: ToneMarkers,
}

const JOKING_EMOJIS: [char; 6] = ['😂', '🤣', '😅', '😆', '😊', '😄'];
const ANNOYED_EMOJIS: [char; 6] = ['😒', '😑', '🙄', '💢', '😤', '😠'];

/// Abbreviation → expansion table. All expansions are lowercase so a second
/// normalization pass is a no-op. Intensity and hostility are preserved
/// ("wtf", "stfu"); pure filler laughter collapses to "laughing".
const SLANG_TABLE: &[(&str, &str)] = &[
    ("ur", "your"),
    ("u", "you"),
    ("r", "are"),
    ("y", "why"),
    ("c", "see"),
    ("b", "be"),
    ("n", "and"),
    ("idk", "i don't know"),
    ("idc", "i don't care"),
    ("idgaf", "i don't give a fuck"),
    ("brb", "be right back"),
    ("btw", "by the way"),
    ("omg", "oh my god"),
    ("jk", "just kidding"),
    ("fr", "for real"),
    ("ngl", "not going to lie"),
    ("wyd", "what are you doing"),
    ("smh", "shaking my head"),
    ("smfh", "shaking my head"),
    ("tbh", "to be honest"),
    ("imo", "in my opinion"),
    ("fyi", "for your information"),
    ("np", "no problem"),
    ("ty", "thank you"),
    ("thx", "thank you"),
    ("yw", "you're welcome"),
    ("gg", "good game"),
    ("gl", "good luck"),
    ("hf", "have fun"),
    ("gtg", "got to go"),
    ("af", "as fuck"),
    ("rn", "right now"),
    ("asap", "as soon as possible"),
    ("tmr", "tomorrow"),
    ("tmrw", "tomorrow"),
    ("ttyl", "talk to you later"),
    ("ily", "i love you"),
    ("ily2", "i love you too"),
    ("imy", "i miss you"),
    ("hbu", "how about you"),
    ("wbu", "what about you"),
    ("nvm", "never mind"),
    ("ikr", "i know right"),
    ("fml", "fuck my life"),
    ("wtf", "what the fuck"),
    ("ffs", "for fuck's sake"),
    ("omw", "on my way"),
    ("tmi", "too much information"),
    ("irl", "in real life"),
    ("dm", "direct message"),
    ("bff", "best friend"),
    ("sry", "sorry"),
    ("stfu", "shut up"),
    ("lol", "laughing"),
    ("lmao", "laughing"),
    ("lmfao", "laughing"),
    ("rofl", "laughing"),
];

/// Common typo corrections, phrase-scoped to avoid false hits.
const TYPO_TABLE: &[(&str, &str)] = &[
    (r"\brite now\b", "right now"),
    (r"\bpls\b", "please"),
    (r"\bplz\b", "please"),
    (r"\bgonna\b", "going to"),
    (r"\bwanna\b", "want to"),
    (r"\bcuz\b", "because"),
    (r"\bbc\b", "because"),
];

/// Normalizes chat text: obfuscation repair, slang expansion, tone flags.
pub struct TextNormalizer {
    slang: Vec<(Regex, &'static str)>,
    typos: Vec<(Regex, &'static str)>,
    spacing: Vec<(Regex, &'static str)>,
    whitespace_re: Regex,
    friendly_re: Regex,
    intense_re: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        // Longest keys first so "ily2" wins over "ily".
        let mut table: Vec<(&str, &str)> = SLANG_TABLE.to_vec();
        table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut slang = Vec::with_capacity(table.len());
        for (abbrev, expansion) in table {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(abbrev)))?;
            slang.push((re, expansion));
        }

        let mut typos = Vec::with_capacity(TYPO_TABLE.len());
        for (pattern, replacement) in TYPO_TABLE {
            typos.push((Regex::new(pattern)?, *replacement));
        }

        let spacing = vec![
            (Regex::new(r"\br\s+n\b")?, "rn"),
            (Regex::new(r"\bj\s+k\b")?, "jk"),
        ];

        Ok(Self {
            slang,
            typos,
            spacing,
            whitespace_re: Regex::new(r"\s+")?,
            friendly_re: Regex::new(r"\b(?:bruh|bro)\b")?,
            intense_re: Regex::new(r"\b(?:lowkey|highkey)\b")?,
        })
    }

    /// Normalize chat text. Pure: never fails, never mutates shared state.
    pub fn normalize(&self, text: &str) -> NormalizedMessage {
        let raw_text = text.to_string();

        let mut tone = ToneMarkers::default();
        let mut has_emoji = false;
        if JOKING_EMOJIS.iter().any(|e| text.contains(*e)) {
            has_emoji = true;
            tone.joking = true;
        }
        if ANNOYED_EMOJIS.iter().any(|e| text.contains(*e)) {
            has_emoji = true;
            tone.annoyed = true;
        }

        // Stage 1: strip zero-width/format characters.
        let mut normalized: String = text.chars().filter(|c| !is_zero_width(*c)).collect();

        // Stage 2: case-fold.
        normalized = normalized.to_lowercase();

        // Stage 3: collapse single obfuscation characters between word
        // characters ("stf*u" → "stfu").
        normalized = deobfuscate(&normalized);

        // Stage 4: spacing variants of known abbreviations ("r n" → "rn").
        for (re, replacement) in &self.spacing {
            normalized = re.replace_all(&normalized, *replacement).into_owned();
        }

        // Stage 5: collapse runs of 3+ identical letters to exactly 2.
        normalized = collapse_letter_runs(&normalized);

        // Stage 6: fixed typo corrections.
        for (re, replacement) in &self.typos {
            normalized = re.replace_all(&normalized, *replacement).into_owned();
        }

        // Stage 7: slang expansion, longest match first.
        let mut replacements = Vec::new();
        for (re, expansion) in &self.slang {
            if !re.is_match(&normalized) {
                continue;
            }
            for found in re.find_iter(&normalized) {
                replacements.push(Replacement {
                    original: found.as_str().to_string(),
                    normalized: (*expansion).to_string(),
                });
            }
            normalized = re.replace_all(&normalized, *expansion).into_owned();
        }

        // Stage 8: whitespace collapse.
        normalized = self
            .whitespace_re
            .replace_all(&normalized, " ")
            .trim()
            .to_string();

        tone.friendly = self.friendly_re.is_match(&normalized);
        tone.intense = self.intense_re.is_match(&normalized);

        NormalizedMessage {
            raw_text,
            normalized_text: normalized,
            replacements,
            has_emoji,
            tone,
        }
    }
}

/// Zero-width and bidi-format characters. Newline, tab, and carriage return
/// are ordinary whitespace and survive this stage.
fn is_zero_width(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{FEFF}'
    )
}

/// Drop a single `*`, `_`, `-`, or `.` sitting between two word characters.
fn deobfuscate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    for (i, &c) in chars.iter().enumerate() {
        let masked = matches!(c, '*' | '_' | '-' | '.')
            && i > 0
            && chars[i - 1].is_alphanumeric()
            && chars.get(i + 1).is_some_and(|n| n.is_alphanumeric());
        if !masked {
            out.push(c);
        }
    }
    out
}

/// Collapse runs of three or more identical letters down to two, defeating
/// emphasis obfuscation without touching legitimate doubled letters.
fn collapse_letter_runs(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last: Option<char> = None;
    let mut run = 0usize;
    for c in text.chars() {
        if Some(c) == last && c.is_alphabetic() {
            run += 1;
        } else {
            last = Some(c);
            run = 1;
        }
        if run <= 2 {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().expect("normalizer should build")
    }

    #[test]
    fn expands_basic_abbreviations() {
        let result = normalizer().normalize("idk what u mean");
        assert_eq!(result.normalized_text, "i don't know what you mean");
    }

    #[test]
    fn preserves_hostile_intensity() {
        let result = normalizer().normalize("stfu wtf");
        assert_eq!(result.normalized_text, "shut up what the fuck");
    }

    #[test]
    fn laughter_collapses_to_one_form() {
        for input in ["lol", "lmao", "lmfao", "rofl"] {
            let result = normalizer().normalize(input);
            assert_eq!(result.normalized_text, "laughing", "input {input}");
        }
    }

    #[test]
    fn masked_slang_is_repaired() {
        let result = normalizer().normalize("stf*u you are so dumb");
        assert!(result.normalized_text.starts_with("shut up"));
    }

    #[test]
    fn spaced_abbreviations_are_repaired() {
        let result = normalizer().normalize("call me r n");
        assert_eq!(result.normalized_text, "call me right now");

        let result = normalizer().normalize("r.n.");
        assert_eq!(result.normalized_text, "right now.");
    }

    #[test]
    fn letter_runs_collapse_to_two() {
        let result = normalizer().normalize("soooo cool");
        assert_eq!(result.normalized_text, "soo cool");
        // Legitimate doubles are untouched.
        let result = normalizer().normalize("all good");
        assert_eq!(result.normalized_text, "all good");
    }

    #[test]
    fn typo_corrections_apply() {
        let result = normalizer().normalize("rite now pls");
        assert_eq!(result.normalized_text, "right now please");
    }

    #[test]
    fn zero_width_characters_are_stripped() {
        let result = normalizer().normalize("he\u{200B}llo\u{FEFF} there");
        assert_eq!(result.normalized_text, "hello there");
    }

    #[test]
    fn newlines_and_tabs_survive_to_whitespace_collapse() {
        let result = normalizer().normalize("line one\nline\ttwo");
        assert_eq!(result.normalized_text, "line one line two");
    }

    #[test]
    fn emoji_tone_detection() {
        let result = normalizer().normalize("that's funny 😂");
        assert!(result.has_emoji);
        assert!(result.tone.joking);
        assert!(!result.tone.annoyed);

        let result = normalizer().normalize("whatever 🙄");
        assert!(result.has_emoji);
        assert!(result.tone.annoyed);
    }

    #[test]
    fn friendly_and_intensity_flags() {
        let result = normalizer().normalize("bruh that's lowkey wild");
        assert!(result.tone.friendly);
        assert!(result.tone.intense);
    }

    #[test]
    fn replacements_are_tracked() {
        let result = normalizer().normalize("idk lol brb");
        assert_eq!(result.replacements.len(), 3);
        assert!(result.replacements.iter().any(|r| r.original == "idk"));
        assert!(result.replacements.iter().any(|r| r.original == "lol"));
        assert!(result.replacements.iter().any(|r| r.original == "brb"));
    }

    #[test]
    fn longest_abbreviation_wins() {
        let result = normalizer().normalize("ily2");
        assert_eq!(result.normalized_text, "i love you too");
    }

    #[test]
    fn empty_and_whitespace_input() {
        assert_eq!(normalizer().normalize("").normalized_text, "");
        assert_eq!(normalizer().normalize("   \n\t ").normalized_text, "");
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let result = normalizer().normalize("xyzzy quux");
        assert_eq!(result.normalized_text, "xyzzy quux");
        assert!(result.replacements.is_empty());
    }

    #[test]
    fn normalization_is_idempotent_on_representative_inputs() {
        let n = normalizer();
        for input in [
            "idk what u mean lol",
            "stf*u ur so dumb",
            "call me r n or else",
            "im busy rn sry no pressure 😂",
            "brb ttyl",
            "answer me riiiight now",
        ] {
            let once = n.normalize(input);
            let twice = n.normalize(&once.normalized_text);
            assert_eq!(
                once.normalized_text, twice.normalized_text,
                "second pass changed output for {input:?}"
            );
        }
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Normalization is idempotent: a second pass never changes the text.
        #[test]
        fn prop_normalize_idempotent(input in "[a-zA-Z0-9 .!?*_'-]{0,60}") {
            let n = TextNormalizer::new().expect("normalizer");
            let once = n.normalize(&input);
            let twice = n.normalize(&once.normalized_text);
            prop_assert_eq!(once.normalized_text, twice.normalized_text);
        }

        /// Normalization never panics and always produces lowercase output
        /// for alphabetic input.
        #[test]
        fn prop_normalize_lowercases(input in "[a-zA-Z ]{0,80}") {
            let n = TextNormalizer::new().expect("normalizer");
            let result = n.normalize(&input);
            prop_assert!(!result.normalized_text.chars().any(|c| c.is_uppercase()));
        }

        /// Arbitrary unicode input never breaks normalization.
        #[test]
        fn prop_normalize_total(input in "\\PC{0,40}") {
            let n = TextNormalizer::new().expect("normalizer");
            let _ = n.normalize(&input);
        }
    }
}
