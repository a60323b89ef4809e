//! Text normalization shared by the classifier, extractor and store.

use std::collections::BTreeSet;

/// Lower-case `text` and collapse every whitespace run to a single space.
///
/// This is the canonical form of a stored question and the key used for
/// exact lookup.
#[must_use]
pub fn normalize_question(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split normalized text into a set of tokens.
///
/// Whitespace split, with leading/trailing punctuation trimmed from each
/// token (`"python?"` and `"python"` are the same token). Tokens left empty
/// by the trim are dropped.
#[must_use]
pub fn tokenize(text: &str) -> BTreeSet<String> {
    text.split_whitespace()
        .map(|raw| raw.trim_matches(|c: char| c.is_ascii_punctuation()))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of tokens present in both sets.
#[must_use]
pub fn common_tokens(a: &BTreeSet<String>, b: &BTreeSet<String>) -> usize {
    a.intersection(b).count()
}

/// Build the haystack used for keyword matching.
///
/// Lower-cased, every character that is not alphanumeric (and not listed in
/// `keep`) folded to a space, wrapped in one leading and one trailing space.
/// A trigger written as `" hi "` therefore only matches the whole word.
#[must_use]
pub fn keyword_haystack(message: &str, keep: &[char]) -> String {
    let mut out = String::with_capacity(message.len() + 2);
    out.push(' ');
    for c in message.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || keep.contains(&c) {
            out.push(c);
        } else {
            out.push(' ');
        }
    }
    out.push(' ');
    out
}
