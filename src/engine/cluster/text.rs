//! Proposal text normalisation for the clusterer

use std::collections::HashSet;

/// Common English function words
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each", "few",
    "for", "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers",
    "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of",
    "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs",
    "them", "themselves", "then", "there", "these", "they", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Words every conference proposal uses; they carry no topic signal
const NOISE_WORDS: &[&str] = &[
    "talk", "python", "will", "also", "use", "using", "used", "attendees", "audience", "learn",
    "presentation", "session", "slides", "minutes", "min", "example", "examples",
    "introduction", "overview", "discuss", "discussion", "show", "get", "like", "one", "way",
    "make", "new", "need", "want", "see", "know", "people", "time", "look", "well", "first",
    "including", "many", "much", "etc", "us", "ll", "ve", "re", "s", "t", "d", "m", "going",
    "cover", "covered", "questions", "q", "brief", "able", "take", "work", "lets",
];

/// Lowercases, strips non-alphabetic characters and drops stop words
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
}

impl Tokenizer {
    /// Tokenizer with the built-in stop words plus `extra` noise terms
    pub fn new<I, T>(extra: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut stop_words: HashSet<String> = STOP_WORDS
            .iter()
            .chain(NOISE_WORDS)
            .map(|w| w.to_string())
            .collect();
        stop_words.extend(extra.into_iter().map(|w| w.as_ref().to_lowercase()));
        Self { stop_words }
    }

    /// Split `text` into normalised tokens, in order of appearance
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphabetic() || c.is_whitespace())
            .collect();

        cleaned
            .split_whitespace()
            .filter(|w| !self.stop_words.contains(*w))
            .map(str::to_string)
            .collect()
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}
