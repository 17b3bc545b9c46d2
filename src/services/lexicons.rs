// Lexicons
// Fixed English word lists and phrase patterns shared by the analyzers

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// English stopword set
const ENGLISH_STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Superlatives and intensifiers typical of inflated reviews
const EXAGGERATION_WORDS: &[&str] = &[
    "amazing", "awesome", "best", "worst", "incredible", "perfect", "terrible", "horrible",
    "excellent", "outstanding", "fantastic", "superb", "sublime", "magnificent", "unbelievable",
    "absolute", "extremely", "totally", "completely", "utterly",
];

/// Phrases writers reach for when asserting their own honesty
pub const DECEPTIVE_PHRASES: &[&str] = &[
    "trust me",
    "believe me",
    "honestly",
    "to be honest",
    "truth be told",
    "i swear",
    "literally",
];

/// Marketing speak
pub const PROMOTIONAL_PHRASES: &[&str] = &[
    "check out",
    "click here",
    "link in bio",
    "buy now",
    "discount",
    "coupon",
    "use code",
    "visit my",
    "subscribe",
];

/// Function words that never trigger the repetition penalty
pub const DEFAULT_REPETITION_EXCEPTIONS: &[&str] =
    &["the", "and", "a", "to", "of", "it", "is", "i", "in"];

pub fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| ENGLISH_STOPWORDS.iter().copied().collect())
}

pub fn is_stopword(word: &str) -> bool {
    stopwords().contains(word)
}

pub fn exaggeration_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| EXAGGERATION_WORDS.iter().copied().collect())
}

/// Compile a phrase list into word-bounded regexes, one per phrase.
/// Matching is done against lowercased text.
pub fn phrase_patterns(phrases: &[&str]) -> Vec<Regex> {
    phrases
        .iter()
        .map(|p| Regex::new(&format!(r"\b({})\b", regex::escape(p))).expect("phrase regex"))
        .collect()
}

pub fn deceptive_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| phrase_patterns(DECEPTIVE_PHRASES))
}

pub fn promotional_patterns() -> &'static [Regex] {
    static RE: OnceLock<Vec<Regex>> = OnceLock::new();
    RE.get_or_init(|| phrase_patterns(PROMOTIONAL_PHRASES))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopword_lookup() {
        assert!(is_stopword("the"));
        assert!(is_stopword("wouldn't"));
        assert!(!is_stopword("battery"));
        assert_eq!(stopwords().len(), ENGLISH_STOPWORDS.len());
    }

    #[test]
    fn test_phrase_patterns_respect_word_boundaries() {
        let patterns = phrase_patterns(&["use code"]);
        assert!(patterns[0].is_match("just use code save10"));
        assert!(!patterns[0].is_match("reuse codependent"));
    }
}
