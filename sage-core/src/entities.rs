//! Entity Extractor: known technology names in a message.
//!
//! Matching is a case-insensitive substring test against a fixed
//! vocabulary, run on the same padded haystack as the intent classifier
//! (with `+`, `#` and `.` preserved so `C++`, `C#` and `node.js` survive).

use crate::text::keyword_haystack;

/// Characters that are part of technology names.
const KEEP: &[char] = &['+', '#', '.'];

/// `(canonical name, triggers)` in output order.
const VOCABULARY: &[(&str, &[&str])] = &[
    ("Python", &["python", "питон", " django ", " flask ", " pip "]),
    ("JavaScript", &["javascript", " js ", "node.js", " nodejs ", " npm "]),
    ("TypeScript", &["typescript", " ts "]),
    ("Java", &[" java ", " jvm ", " spring "]),
    ("Rust", &[" rust ", " cargo ", "rustc", " crate "]),
    ("Go", &[" golang ", " go "]),
    ("C++", &[" c++ ", " cpp "]),
    ("C#", &[" c# ", " csharp ", " .net "]),
    ("C", &[" c "]),
    ("Ruby", &[" ruby ", " rails "]),
    ("PHP", &[" php ", " laravel "]),
    ("Swift", &[" swift "]),
    ("Kotlin", &[" kotlin "]),
    ("SQL", &[" sql ", "mysql", "postgres", "sqlite"]),
    ("HTML", &[" html "]),
    ("CSS", &[" css "]),
    ("React", &[" react "]),
    ("Docker", &["docker"]),
    ("Git", &[" git ", "github", "gitlab"]),
    ("Linux", &["linux", " bash ", " shell "]),
];

/// Extract recognized technology names, in vocabulary order, without
/// duplicates.
#[must_use]
pub fn extract(message: &str) -> Vec<&'static str> {
    let haystack = keyword_haystack(message, KEEP);
    // Trailing dots ("in Go.") would otherwise glue onto the name.
    let haystack = haystack.replace(". ", "  ");

    VOCABULARY
        .iter()
        .filter(|(_, triggers)| triggers.iter().any(|t| haystack.contains(t)))
        .map(|(name, _)| *name)
        .collect()
}

/// The entity used to categorise knowledge derived from a message.
#[must_use]
pub fn primary_category(entities: &[&str]) -> String {
    entities
        .first()
        .map_or_else(|| "general".to_string(), |e| e.to_lowercase())
}
