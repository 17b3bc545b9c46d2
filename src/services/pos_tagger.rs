// POS Tagger
// Lexicon + suffix rule tagger emitting Penn Treebank tags, tuned for review prose.
// Only the tag families matter downstream (NN*, VB*, JJ*), so fine-grained
// distinctions are best effort.

use std::collections::HashMap;
use std::sync::OnceLock;

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "every", "each", "some", "any", "no",
    "another", "all", "both", "either", "neither",
];

const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "from", "up", "down", "out", "off", "over",
    "under", "of", "since", "until", "upon", "within", "without", "across", "along", "around",
    "behind", "beside", "toward", "towards", "near", "because", "although", "though", "while",
    "if", "unless", "whereas", "whether", "than", "as",
];

const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "myself", "yourself",
    "himself", "herself", "itself", "ourselves", "themselves", "yourselves",
];

const POSSESSIVES: &[&str] = &["my", "your", "his", "her", "its", "our", "their"];

const MODALS: &[&str] = &[
    "can", "could", "will", "would", "shall", "should", "may", "might", "must",
];

const ADVERBS: &[&str] = &[
    "very", "really", "not", "never", "always", "also", "just", "too", "so", "quite", "rather",
    "often", "still", "even", "ever", "almost", "already", "soon", "here", "now", "then",
    "again", "once", "only", "well", "definitely", "absolutely", "totally", "literally",
    "honestly", "seriously", "pretty", "super",
];

const ADJECTIVES: &[&str] = &[
    "good", "great", "bad", "nice", "poor", "cheap", "happy", "sad", "new", "old", "big",
    "small", "little", "amazing", "awesome", "perfect", "terrible", "horrible", "excellent",
    "fantastic", "incredible", "fine", "real", "fake", "easy", "hard", "ok", "okay", "high",
    "low", "long", "short", "fast", "slow", "strong", "weak", "beautiful", "ugly", "useless",
    "worth", "broken", "solid", "sturdy", "flimsy", "comfortable", "awful", "superb", "absolute",
    "genuine", "original", "decent", "average", "expensive", "overpriced", "outstanding",
    "unbelievable", "magnificent", "sublime", "complete", "total", "full", "empty", "first",
    "last", "same", "other", "own", "whole", "main", "free", "sure", "wrong", "right", "true",
];

const VERBS: &[&str] = &[
    "love", "like", "buy", "use", "recommend", "work", "need", "want", "get", "make", "go",
    "come", "take", "give", "know", "think", "say", "see", "look", "feel", "try", "return",
    "order", "arrive", "break", "stop", "keep", "fit", "charge", "last", "expect", "waste",
    "hate", "enjoy", "purchase", "help", "seem", "deliver", "ship", "check", "subscribe",
    "visit", "click", "swear", "believe", "trust", "regret", "suggest", "avoid", "receive",
    "send", "pay", "save", "change", "replace", "wash", "wear", "install", "open", "turn",
];

const IRREGULAR_PAST: &[&str] = &[
    "bought", "got", "made", "went", "came", "took", "gave", "knew", "thought", "said", "saw",
    "felt", "broke", "kept", "sent", "paid", "wore", "told", "found", "left", "put", "tried",
];

const PARTICIPLES: &[&str] = &["been", "done", "gone", "seen", "taken", "given", "broken", "worn", "known"];

fn lexicon() -> &'static HashMap<&'static str, &'static str> {
    static MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for w in ADJECTIVES {
            map.insert(*w, "JJ");
        }
        for w in ADVERBS {
            map.insert(*w, "RB");
        }
        for w in PREPOSITIONS {
            map.insert(*w, "IN");
        }
        for w in DETERMINERS {
            map.insert(*w, "DT");
        }
        for w in PRONOUNS {
            map.insert(*w, "PRP");
        }
        for w in POSSESSIVES {
            map.insert(*w, "PRP$");
        }
        for w in MODALS {
            map.insert(*w, "MD");
        }
        for w in IRREGULAR_PAST {
            map.insert(*w, "VBD");
        }
        for w in PARTICIPLES {
            map.insert(*w, "VBN");
        }
        for (w, t) in [
            ("and", "CC"), ("or", "CC"), ("but", "CC"), ("nor", "CC"), ("yet", "CC"),
            ("to", "TO"), ("there", "EX"),
            ("what", "WP"), ("who", "WP"), ("whom", "WP"), ("whose", "WP$"), ("which", "WDT"),
            ("when", "WRB"), ("where", "WRB"), ("why", "WRB"), ("how", "WRB"),
            ("is", "VBZ"), ("am", "VBP"), ("are", "VBP"), ("was", "VBD"), ("were", "VBD"),
            ("be", "VB"), ("being", "VBG"),
            ("has", "VBZ"), ("have", "VBP"), ("had", "VBD"), ("having", "VBG"),
            ("does", "VBZ"), ("do", "VBP"), ("did", "VBD"),
            ("best", "JJS"), ("worst", "JJS"), ("better", "JJR"), ("worse", "JJR"),
            ("most", "JJS"), ("more", "JJR"), ("less", "JJR"),
            ("n't", "RB"), ("'m", "VBP"), ("'re", "VBP"), ("'ve", "VBP"), ("'ll", "MD"), ("'d", "MD"),
        ] {
            map.insert(w, t);
        }
        map
    })
}

fn is_verb_base(word: &str) -> bool {
    VERBS.contains(&word)
}

fn punctuation_tag(token: &str) -> Option<&'static str> {
    let tag = match token {
        "." | "!" | "?" | "..." => ".",
        "," => ",",
        ":" | ";" | "-" | "--" => ":",
        "(" | "[" | "{" => "(",
        ")" | "]" | "}" => ")",
        "\"" | "'" | "`" => "''",
        "$" => "$",
        "#" => "#",
        _ => {
            if token.chars().all(|c| !c.is_alphanumeric()) {
                "SYM"
            } else {
                return None;
            }
        }
    };
    Some(tag)
}

fn is_number(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
}

fn is_nominal_context(prev: &str) -> bool {
    matches!(prev, "DT" | "PRP$" | "JJ" | "JJS" | "JJR" | "IN" | "POS" | "CD")
}

fn is_be_or_have(prev_word: &str) -> bool {
    matches!(
        prev_word,
        "is" | "am" | "are" | "was" | "were" | "be" | "been" | "has" | "have" | "had" | "'s" | "'ve"
    )
}

fn tag_one(word: &str, lower: &str, prev_tag: &str, prev_word: &str, sentence_start: bool) -> &'static str {
    if let Some(tag) = punctuation_tag(word) {
        return tag;
    }
    if is_number(word) {
        return "CD";
    }
    if lower == "'s" {
        return if prev_tag.starts_with("NN") { "POS" } else { "VBZ" };
    }
    if let Some(tag) = lexicon().get(lower) {
        return *tag;
    }
    if is_verb_base(lower) {
        return match prev_tag {
            "TO" | "MD" => "VB",
            t if is_nominal_context(t) => "NN",
            _ => "VBP",
        };
    }

    // Proper nouns: capitalized away from a sentence start
    let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
    if capitalized && !sentence_start && prev_tag != "''" {
        return if lower.ends_with('s') && lower.len() > 3 { "NNPS" } else { "NNP" };
    }

    let len = lower.chars().count();
    if len > 4 && lower.ends_with("ly") {
        return "RB";
    }
    if len > 4 && lower.ends_with("ing") {
        return if is_nominal_context(prev_tag) { "NN" } else { "VBG" };
    }
    if len > 3 && lower.ends_with("ed") {
        return if is_be_or_have(prev_word) { "VBN" } else { "VBD" };
    }
    if len > 4
        && ["ous", "ful", "able", "ible", "ive", "less", "ic", "ish", "al", "ary"]
            .iter()
            .any(|s| lower.ends_with(s))
    {
        return "JJ";
    }
    if len > 5 && lower.ends_with("est") {
        return "JJS";
    }
    if len > 3
        && lower.ends_with('s')
        && !["ss", "us", "is"].iter().any(|s| lower.ends_with(s))
    {
        let stem = &lower[..lower.len() - 1];
        let verb_like = is_verb_base(stem) || is_verb_base(lower.trim_end_matches("es"));
        if verb_like && !is_nominal_context(prev_tag) {
            return "VBZ";
        }
        if matches!(prev_tag, "PRP" | "NN" | "NNP") && verb_like {
            return "VBZ";
        }
        return "NNS";
    }
    if matches!(prev_tag, "TO" | "MD") {
        return "VB";
    }
    "NN"
}

/// Tag each token; output is aligned 1:1 with `words`
pub fn tag_words(words: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::with_capacity(words.len());
    let mut prev_tag = ".";
    let mut prev_word = String::new();

    for word in words {
        let lower = word.to_lowercase();
        let sentence_start = prev_tag == ".";
        let tag = tag_one(word, &lower, prev_tag, &prev_word, sentence_start);
        tags.push(tag.to_string());
        prev_tag = tag;
        prev_word = lower;
    }

    tags
}
