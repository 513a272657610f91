/// Text utilities shared by every detector
///
/// Normalization, stop-word filtering, key-term extraction and the overlap
/// ratios used for similarity comparisons across the pipeline.

use std::collections::HashSet;

// Tokens shorter than this never count as key terms
const MIN_KEY_TERM_LENGTH: usize = 3;

// Word-overlap comparisons only consider tokens longer than this
const MIN_OVERLAP_TOKEN_LENGTH: usize = 3;

/// Stop words excluded from key-term extraction
const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "nor", "for", "yet", "so", "i", "you", "he", "she", "it",
    "we", "they", "me", "him", "her", "us", "them", "my", "your", "his", "its", "our", "their",
    "this", "that", "these", "those", "who", "whom", "which", "what", "whose", "is", "am", "are",
    "was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does", "did",
    "doing", "will", "would", "shall", "should", "can", "could", "may", "might", "must", "in",
    "on", "at", "to", "from", "by", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "up", "down", "out", "off", "over", "under",
    "again", "further", "here", "there", "where", "when", "why", "how", "all", "each", "every",
    "both", "few", "more", "most", "other", "some", "any", "no", "not", "only", "own", "same",
    "than", "too", "very", "just", "also", "now", "then", "once", "always", "never", "if",
    "because", "as", "until", "while", "although", "though", "yes", "maybe", "going", "get",
    "got", "like", "really", "okay", "right", "well", "thing", "things",
];

/// Lowercase and trim, collapsing internal whitespace runs to single spaces
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check whether a word is a stop word
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.to_lowercase().as_str())
}

/// Tokenize text into lowercase words, dropping punctuation
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-')
        .filter(|w| !w.is_empty())
        .map(|w| w.trim_matches('\'').to_string())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Extract significant tokens: stop words removed, short and purely numeric
/// tokens dropped
pub fn key_terms(text: &str) -> HashSet<String> {
    tokenize(text)
        .into_iter()
        .filter(|w| {
            w.len() >= MIN_KEY_TERM_LENGTH
                && !is_stop_word(w)
                && !w.chars().all(|c| c.is_numeric())
        })
        .collect()
}

/// Ratio of shared terms to the smaller of the two sets
///
/// Returns 0.0 when either set is empty. This is the similarity measure used
/// by the analyzer's dedup/merge step and the emphasis detector's cross-call
/// comparison.
pub fn term_overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let shared = a.intersection(b).count();
    let smaller = a.len().min(b.len());

    shared as f64 / smaller as f64
}

/// Word-overlap ratio between two raw texts, considering only tokens longer
/// than three characters
pub fn word_overlap_ratio(a: &str, b: &str) -> f64 {
    let set_a: HashSet<String> = tokenize(a)
        .into_iter()
        .filter(|w| w.len() > MIN_OVERLAP_TOKEN_LENGTH)
        .collect();
    let set_b: HashSet<String> = tokenize(b)
        .into_iter()
        .filter(|w| w.len() > MIN_OVERLAP_TOKEN_LENGTH)
        .collect();

    term_overlap_ratio(&set_a, &set_b)
}

/// Trim surrounding punctuation and whitespace from extracted content
pub fn trim_content(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?' | '"' | '\'' | '(' | ')' | '-'))
}

/// Count sentences by terminal punctuation
pub fn sentence_count(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|s| s.chars().any(|c| c.is_alphanumeric()))
        .count()
}
