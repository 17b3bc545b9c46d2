// Text Processing Service
// Sentence/word segmentation, alphabetic filtering and POS tagging for English review text

use regex::Regex;
use std::sync::OnceLock;

use super::pos_tagger::tag_words;

/// Abbreviations whose trailing period does not end a sentence
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "sr", "jr", "st", "vs", "etc", "e.g", "i.e", "inc", "ltd",
    "co", "no", "approx", "dept", "est", "fig", "min", "max",
];

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\d+(?:[.,]\d+)+|(?:[A-Za-z]\.){2,}|\w+(?:[-']\w+)*|\.\.\.|[^\w\s]")
            .expect("word regex")
    })
}

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?' | '\u{2026}')
}

fn is_closer(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

/// Word immediately preceding byte index `end`, lowercased
fn preceding_word(text: &str, end: usize) -> String {
    let head = &text[..end];
    let start = head
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || matches!(c, '(' | '"' | '['))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    head[start..].to_lowercase()
}

fn ends_with_abbreviation(text: &str, dot_idx: usize) -> bool {
    let word = preceding_word(text, dot_idx);
    if word.is_empty() {
        return false;
    }
    // Single-letter initials ("J. Smith")
    if word.chars().count() == 1 && word.chars().all(|c| c.is_alphabetic()) {
        return true;
    }
    ABBREVIATIONS.contains(&word.as_str())
}

/// Split text into trimmed sentences.
/// Runs of terminators ("!!!", "?!", "...") close a single sentence; a boundary
/// needs whitespace or end of input after the run.
pub fn split_sentences(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut current_start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        let (idx, ch) = chars[i];
        if !is_terminator(ch) {
            i += 1;
            continue;
        }

        // Decimal numbers
        if ch == '.' && i > 0 && i + 1 < chars.len() {
            if chars[i - 1].1.is_ascii_digit() && chars[i + 1].1.is_ascii_digit() {
                i += 1;
                continue;
            }
        }

        let single_dot = ch == '.' && chars.get(i + 1).map_or(true, |(_, c)| *c != '.');
        if single_dot && ends_with_abbreviation(text, idx) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
            j += 1;
        }

        if j < chars.len() && !chars[j].1.is_whitespace() {
            i = j;
            continue;
        }

        let end = chars.get(j).map(|(b, _)| *b).unwrap_or(text.len());
        push_sentence(text, current_start, end, &mut sentences);
        current_start = end;
        i = j;
    }

    if current_start < text.len() {
        push_sentence(text, current_start, text.len(), &mut sentences);
    }

    sentences
}

fn push_sentence(text: &str, start: usize, end: usize, out: &mut Vec<String>) {
    let trimmed = text[start..end].trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Split a raw token into its Treebank-style pieces ("don't" -> "do" + "n't", "it's" -> "it" + "'s")
fn split_contraction(token: &str) -> Vec<String> {
    let Some(pos) = token.find('\'') else {
        return vec![token.to_string()];
    };
    let lower = token.to_lowercase();
    if lower.ends_with("n't") {
        if token.len() == 3 {
            return vec![token.to_string()];
        }
        let cut = token.len() - 3;
        return vec![token[..cut].to_string(), token[cut..].to_string()];
    }
    if pos == 0 || pos + 1 >= token.len() {
        return vec![token.to_string()];
    }
    vec![token[..pos].to_string(), token[pos..].to_string()]
}

/// Word tokens in order, punctuation included as separate tokens
pub fn tokenize_words(text: &str) -> Vec<String> {
    if text.is_empty() {
        return vec![];
    }
    word_re()
        .find_iter(text)
        .flat_map(|m| split_contraction(m.as_str()))
        .collect()
}

pub fn is_alpha_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

/// Alphabetic-only tokens, lowercased
pub fn alpha_words(words: &[String]) -> Vec<String> {
    words
        .iter()
        .filter(|w| is_alpha_token(w))
        .map(|w| w.to_lowercase())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct TokenizedText {
    pub sentences: Vec<String>,
    pub words: Vec<String>,
    pub alpha_words: Vec<String>,
    /// One tag per entry of `words`
    pub pos_tags: Vec<String>,
}

/// Run the full segmentation pipeline. Empty input yields empty sequences.
pub fn tokenize(text: &str) -> TokenizedText {
    if text.trim().is_empty() {
        return TokenizedText::default();
    }
    let sentences = split_sentences(text);
    let words = tokenize_words(text);
    let alpha = alpha_words(&words);
    let pos_tags = tag_words(&words);
    TokenizedText {
        sentences,
        words,
        alpha_words: alpha,
        pos_tags,
    }
}
