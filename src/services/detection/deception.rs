// Deception Scorer
// Phrase, lexicon and sentiment heuristics turning one review into five bounded sub-scores

use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::round2;
use crate::models::{DeceptionDetails, DeceptionSignal};
use crate::services::lexicons::{
    deceptive_patterns, exaggeration_words, promotional_patterns, DEFAULT_REPETITION_EXCEPTIONS,
};
use crate::services::sentiment::{LexiconSentiment, SentimentAnalyzer};

const DECEPTIVE_PENALTY: f64 = 20.0;
const PROMOTIONAL_PENALTY: f64 = 50.0;
const REPETITION_PENALTY: f64 = 30.0;
const EXAGGERATION_SCALE: f64 = 10.0;
const SCORE_CAP: f64 = 100.0;

/// Below this many words repetition is not scored
const REPETITION_MIN_WORDS: usize = 10;
/// Share of all words a single word must exceed to count as dominant
const REPETITION_DOMINANCE: f64 = 0.2;
const REPETITION_TOP_K: usize = 3;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\w+").expect("word regex"))
}

fn lower_words(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    word_re().find_iter(&lower).map(|m| m.as_str().to_string()).collect()
}

/// Number of distinct patterns found anywhere in `lower`
fn distinct_matches(patterns: &[Regex], lower: &str) -> usize {
    patterns.iter().filter(|re| re.is_match(lower)).count()
}

pub struct DeceptionScorer {
    sentiment: Arc<dyn SentimentAnalyzer>,
    repetition_exceptions: Vec<String>,
}

impl Default for DeceptionScorer {
    fn default() -> Self {
        Self::new(Arc::new(LexiconSentiment::new()))
    }
}

impl DeceptionScorer {
    pub fn new(sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        Self {
            sentiment,
            repetition_exceptions: DEFAULT_REPETITION_EXCEPTIONS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }

    pub fn with_repetition_exceptions(mut self, exceptions: Vec<String>) -> Self {
        self.repetition_exceptions = exceptions.into_iter().map(|w| w.to_lowercase()).collect();
        self
    }

    /// Score one review. Empty or whitespace-only input yields the all-zero signal.
    pub fn score(&self, text: &str) -> DeceptionSignal {
        if text.trim().is_empty() {
            return DeceptionSignal::default();
        }

        let lower = text.to_lowercase();
        let words = lower_words(text);
        let sentiment = self.sentiment.analyze(text);

        DeceptionSignal {
            deception_score: deceptive_score(&lower),
            exaggeration_score: exaggeration_score(&words),
            emotional_intensity: emotional_intensity(sentiment.polarity, sentiment.subjectivity),
            repetition_score: self.repetition_score(&words),
            promotional_score: promotional_score(&lower),
            details: DeceptionDetails {
                subjectivity: sentiment.subjectivity.clamp(0.0, 1.0),
                word_count: text.split_whitespace().count(),
            },
        }
    }

    fn repetition_score(&self, words: &[String]) -> f64 {
        if words.len() < REPETITION_MIN_WORDS {
            return 0.0;
        }

        // Count, remembering first occurrence so ties rank by order of appearance
        let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
        for (idx, w) in words.iter().enumerate() {
            counts.entry(w.as_str()).or_insert((0, idx)).0 += 1;
        }
        let mut ranked: Vec<(&str, usize, usize)> =
            counts.into_iter().map(|(w, (c, first))| (w, c, first)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        let threshold = words.len() as f64 * REPETITION_DOMINANCE;
        let penalty: f64 = ranked
            .iter()
            .take(REPETITION_TOP_K)
            .filter(|(w, _, _)| !self.repetition_exceptions.iter().any(|e| e == w))
            .filter(|(_, count, _)| *count as f64 > threshold)
            .map(|_| REPETITION_PENALTY)
            .sum();

        penalty.min(SCORE_CAP)
    }
}

fn deceptive_score(lower: &str) -> f64 {
    let hits = distinct_matches(deceptive_patterns(), lower);
    (hits as f64 * DECEPTIVE_PENALTY).min(SCORE_CAP)
}

fn promotional_score(lower: &str) -> f64 {
    let hits = distinct_matches(promotional_patterns(), lower);
    (hits as f64 * PROMOTIONAL_PENALTY).min(SCORE_CAP)
}

fn exaggeration_score(words: &[String]) -> f64 {
    if words.is_empty() {
        return 0.0;
    }
    let lexicon = exaggeration_words();
    let count = words.iter().filter(|w| lexicon.contains(w.as_str())).count();
    let density = count as f64 / words.len() as f64 * 100.0;
    round2((density * EXAGGERATION_SCALE).min(SCORE_CAP))
}

fn emotional_intensity(polarity: f64, subjectivity: f64) -> f64 {
    let p = polarity.abs().min(1.0);
    let s = subjectivity.clamp(0.0, 1.0);
    round2((p + s) / 2.0 * 100.0)
}
