//! Keyword tokenization and overlap scoring
//!
//! Shared by the deterministic fallback (score every candidate, pick the
//! max) and the reflection engine (decide whether a low-confidence commodity
//! pick overlaps the input enough to trust).

use std::collections::HashSet;

/// Dropped before fallback scoring. Connectives plus the catalogue filler
/// words that appear in nearly every taxonomy description.
const FALLBACK_STOP_WORDS: [&str; 12] = [
    "and",
    "or",
    "the",
    "of",
    "for",
    "in",
    "to",
    "a",
    "an",
    "components",
    "supplies",
    "equipment",
];

/// Dropped from reflection overlap; only words longer than 3 characters are
/// considered there, so this list holds the common 4-letter function words.
const OVERLAP_STOP_WORDS: [&str; 7] = ["with", "from", "that", "this", "they", "have", "were"];

/// Lowercased word set, split on non-alphanumeric boundaries so punctuation
/// ("pump," vs "pump") never defeats a match.
pub(crate) fn word_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fallback score: how many meaningful words the item description shares
/// with a candidate description.
pub(crate) fn keyword_score(description: &str, candidate_description: &str) -> usize {
    let description_words = word_set(description);
    let candidate_words = word_set(candidate_description);

    description_words
        .intersection(&candidate_words)
        .filter(|word| !FALLBACK_STOP_WORDS.contains(&word.as_str()))
        .count()
}

/// Meaningful overlap for reflection: shared words longer than 3 characters,
/// minus stop words. Returned sorted so reasoning strings are deterministic.
pub(crate) fn meaningful_overlap(description: &str, candidate_description: &str) -> Vec<String> {
    let description_words = word_set(description);
    let candidate_words = word_set(candidate_description);

    let mut overlap: Vec<String> = description_words
        .intersection(&candidate_words)
        .filter(|word| word.len() > 3 && !OVERLAP_STOP_WORDS.contains(&word.as_str()))
        .cloned()
        .collect();
    overlap.sort();
    overlap
}
