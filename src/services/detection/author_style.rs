// Author Style Profiler
// Lexical statistics fingerprint plus a heuristic style label

use std::collections::HashSet;

use super::round2;
use crate::models::{PosRatios, PunctuationStyle, StyleLabel, StyleSignal};
use crate::services::lexicons::is_stopword;
use crate::services::text_processor::tokenize;

const EXPRESSIVE_EXCLAMATION_DENSITY: f64 = 1.0;
const FORMAL_SENTENCE_LEN: f64 = 20.0;
const FORMAL_DIVERSITY: f64 = 0.6;
const TERSE_SENTENCE_LEN: f64 = 10.0;
const REPETITIVE_DIVERSITY: f64 = 0.4;

/// First matching rule wins; inputs are the unrounded statistics
pub fn determine_style(avg_sentence_len: f64, vocab_diversity: f64, exclamation_density: f64) -> StyleLabel {
    if exclamation_density > EXPRESSIVE_EXCLAMATION_DENSITY {
        StyleLabel::Expressive
    } else if avg_sentence_len > FORMAL_SENTENCE_LEN && vocab_diversity > FORMAL_DIVERSITY {
        StyleLabel::Formal
    } else if avg_sentence_len < TERSE_SENTENCE_LEN {
        StyleLabel::Terse
    } else if vocab_diversity < REPETITIVE_DIVERSITY {
        StyleLabel::Repetitive
    } else {
        StyleLabel::Standard
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StyleProfiler;

impl StyleProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Profile one review. Empty or whitespace-only input yields zeros and `Unknown`.
    pub fn analyze(&self, text: &str) -> StyleSignal {
        if text.trim().is_empty() {
            return StyleSignal::default();
        }

        let tokens = tokenize(text);

        let avg_sentence_len = if tokens.sentences.is_empty() {
            0.0
        } else {
            tokens.words.len() as f64 / tokens.sentences.len() as f64
        };

        let alpha_total = tokens.alpha_words.len();
        let distinct: HashSet<&str> = tokens.alpha_words.iter().map(String::as_str).collect();
        let vocab_diversity = ratio(distinct.len(), alpha_total);
        let stopwords = tokens.alpha_words.iter().filter(|w| is_stopword(w)).count();
        let stopword_ratio = ratio(stopwords, alpha_total);

        let (mut nouns, mut verbs, mut adjs) = (0usize, 0usize, 0usize);
        for tag in &tokens.pos_tags {
            match tag.get(..2) {
                Some("NN") => nouns += 1,
                Some("VB") => verbs += 1,
                Some("JJ") => adjs += 1,
                _ => {}
            }
        }
        let tagged = tokens.pos_tags.len();

        let total_chars = text.chars().count();
        let exclamations = text.chars().filter(|c| *c == '!').count();
        let questions = text.chars().filter(|c| *c == '?').count();
        let exclamation_density = ratio(exclamations, total_chars) * 100.0;
        let question_density = ratio(questions, total_chars) * 100.0;

        StyleSignal {
            avg_sentence_len: round2(avg_sentence_len),
            vocab_diversity: round2(vocab_diversity),
            stopword_ratio: round2(stopword_ratio),
            pos_ratios: PosRatios {
                noun: round2(ratio(nouns, tagged)),
                verb: round2(ratio(verbs, tagged)),
                adj: round2(ratio(adjs, tagged)),
            },
            punctuation: PunctuationStyle {
                exclamation_density: round2(exclamation_density),
                question_density: round2(question_density),
            },
            style_label: determine_style(avg_sentence_len, vocab_diversity, exclamation_density),
        }
    }
}
