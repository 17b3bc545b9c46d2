// Sentiment Service
// Lexicon-based polarity/subjectivity scoring with negation and intensifier handling

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

use super::text_processor::{split_sentences, tokenize_words};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SentimentScore {
    /// [-1, 1]
    pub polarity: f64,
    /// [0, 1]
    pub subjectivity: f64,
    pub sentence_count: usize,
}

/// Sentiment capability consumed by the scorers
pub trait SentimentAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> SentimentScore;
}

/// (polarity, subjectivity)
const LEXICON: &[(&str, f64, f64)] = &[
    ("good", 0.7, 0.6),
    ("great", 0.8, 0.75),
    ("nice", 0.6, 1.0),
    ("excellent", 1.0, 1.0),
    ("amazing", 0.6, 0.9),
    ("awesome", 1.0, 1.0),
    ("fantastic", 0.4, 0.9),
    ("incredible", 0.9, 0.9),
    ("perfect", 1.0, 1.0),
    ("best", 1.0, 0.3),
    ("better", 0.5, 0.5),
    ("love", 0.5, 0.6),
    ("loved", 0.7, 0.8),
    ("happy", 0.8, 1.0),
    ("beautiful", 0.85, 1.0),
    ("wonderful", 1.0, 1.0),
    ("superb", 1.0, 1.0),
    ("outstanding", 0.5, 0.6),
    ("magnificent", 1.0, 1.0),
    ("recommend", 0.3, 0.4),
    ("recommended", 0.3, 0.4),
    ("comfortable", 0.4, 0.6),
    ("sturdy", 0.4, 0.5),
    ("solid", 0.3, 0.4),
    ("fine", 0.4, 0.5),
    ("decent", 0.17, 0.5),
    ("easy", 0.43, 0.83),
    ("fast", 0.2, 0.6),
    ("cheap", 0.4, 0.7),
    ("worth", 0.3, 0.1),
    ("genuine", 0.4, 0.6),
    ("satisfied", 0.5, 0.5),
    ("bad", -0.7, 0.67),
    ("worst", -1.0, 1.0),
    ("worse", -0.4, 0.6),
    ("terrible", -1.0, 1.0),
    ("horrible", -1.0, 1.0),
    ("awful", -1.0, 1.0),
    ("poor", -0.4, 0.6),
    ("hate", -0.8, 0.9),
    ("hated", -0.9, 0.7),
    ("disappointed", -0.75, 0.75),
    ("disappointing", -0.6, 0.7),
    ("useless", -0.5, 0.0),
    ("broken", -0.4, 0.4),
    ("flimsy", -0.5, 0.6),
    ("expensive", -0.5, 0.7),
    ("overpriced", -0.5, 0.7),
    ("slow", -0.3, 0.4),
    ("cheaply", -0.4, 0.6),
    ("fake", -0.5, 1.0),
    ("scam", -0.8, 0.9),
    ("waste", -0.2, 0.0),
    ("rude", -0.3, 0.6),
    ("damaged", -0.4, 0.4),
    ("defective", -0.6, 0.6),
    ("sad", -0.5, 1.0),
    ("angry", -0.5, 1.0),
    ("unbelievable", 0.0, 0.9),
    ("honestly", 0.6, 0.9),
    ("literally", 0.0, 0.0),
    ("ok", 0.5, 0.5),
    ("okay", 0.5, 0.5),
];

/// Multipliers applied to the next lexicon hit
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.3),
    ("really", 1.2),
    ("extremely", 1.5),
    ("super", 1.3),
    ("so", 1.2),
    ("totally", 1.3),
    ("completely", 1.3),
    ("absolutely", 1.5),
    ("utterly", 1.5),
    ("incredibly", 1.4),
    ("highly", 1.3),
    ("pretty", 1.1),
    ("quite", 1.1),
    ("slightly", 0.5),
    ("somewhat", 0.6),
];

const NEGATIONS: &[&str] = &["not", "n't", "never", "no", "hardly", "barely", "nothing"];

/// Window (in tokens) in which a negation flips the next sentiment word
const NEGATION_WINDOW: usize = 3;
/// Negated polarity is flipped and damped
const NEGATION_FACTOR: f64 = -0.5;

fn lexicon() -> &'static HashMap<&'static str, (f64, f64)> {
    static MAP: OnceLock<HashMap<&'static str, (f64, f64)>> = OnceLock::new();
    MAP.get_or_init(|| LEXICON.iter().map(|(w, p, s)| (*w, (*p, *s))).collect())
}

fn intensifier(word: &str) -> Option<f64> {
    INTENSIFIERS.iter().find(|(w, _)| *w == word).map(|(_, m)| *m)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentiment;

impl LexiconSentiment {
    pub fn new() -> Self {
        Self
    }
}

impl SentimentAnalyzer for LexiconSentiment {
    fn analyze(&self, text: &str) -> SentimentScore {
        if text.trim().is_empty() {
            return SentimentScore::default();
        }

        let tokens: Vec<String> = tokenize_words(text).iter().map(|t| t.to_lowercase()).collect();
        let mut assessments: Vec<(f64, f64)> = Vec::new();
        let mut pending_multiplier: Option<f64> = None;
        let mut negation_distance: Option<usize> = None;

        for token in &tokens {
            if NEGATIONS.contains(&token.as_str()) {
                negation_distance = Some(0);
                continue;
            }
            if let Some(m) = intensifier(token) {
                pending_multiplier = Some(pending_multiplier.unwrap_or(1.0) * m);
                continue;
            }

            if let Some(&(polarity, subjectivity)) = lexicon().get(token.as_str()) {
                let multiplier = pending_multiplier.take().unwrap_or(1.0);
                let mut p = (polarity * multiplier).clamp(-1.0, 1.0);
                let s = (subjectivity * multiplier).clamp(0.0, 1.0);
                if negation_distance.take().is_some() {
                    p *= NEGATION_FACTOR;
                }
                assessments.push((p, s));
                continue;
            }

            if token.chars().all(char::is_alphabetic) {
                pending_multiplier = None;
            }
            negation_distance = match negation_distance {
                Some(d) if d + 1 < NEGATION_WINDOW => Some(d + 1),
                _ => None,
            };
        }

        let sentence_count = split_sentences(text).len();
        if assessments.is_empty() {
            return SentimentScore {
                polarity: 0.0,
                subjectivity: 0.0,
                sentence_count,
            };
        }

        let n = assessments.len() as f64;
        let polarity = assessments.iter().map(|(p, _)| p).sum::<f64>() / n;
        let subjectivity = assessments.iter().map(|(_, s)| s).sum::<f64>() / n;

        SentimentScore {
            polarity: polarity.clamp(-1.0, 1.0),
            subjectivity: subjectivity.clamp(0.0, 1.0),
            sentence_count,
        }
    }
}
