//! Starter entries inserted into an empty store.

use std::collections::BTreeSet;

use super::KnowledgeEntry;
use crate::intent::Intent;

/// Confidence of every seed entry.
pub const SEED_CONFIDENCE: f32 = 0.9;

const SEED: &[(&str, &str, Intent, &str)] = &[
    (
        "python",
        "how to read a file in python",
        Intent::CodeRequest,
        "Open it with a context manager so the handle is always closed:\n\n\
         ```python\n\
         with open(\"data.txt\", encoding=\"utf-8\") as f:\n    \
             content = f.read()\n\
         ```",
    ),
    (
        "python",
        "what is a list comprehension in python",
        Intent::Explanation,
        "A compact way to build a list from an iterable:\n\n\
         ```python\n\
         squares = [x * x for x in range(10) if x % 2 == 0]\n\
         ```",
    ),
    (
        "python",
        "what is a decorator in python",
        Intent::Explanation,
        "A decorator is a function that takes a function and returns a new one, \
         usually wrapping it with extra behaviour:\n\n\
         ```python\n\
         def logged(fn):\n    \
             def wrapper(*args, **kwargs):\n        \
                 print(f\"calling {fn.__name__}\")\n        \
                 return fn(*args, **kwargs)\n    \
             return wrapper\n\
         ```",
    ),
    (
        "rust",
        "what is ownership in rust",
        Intent::Explanation,
        "Every value has exactly one owner. When the owner goes out of scope \
         the value is dropped. Ownership can be moved, or borrowed through \
         `&T` (shared) and `&mut T` (exclusive) references.",
    ),
    (
        "rust",
        "how to read a file in rust",
        Intent::CodeRequest,
        "```rust\n\
         let content = std::fs::read_to_string(\"data.txt\")?;\n\
         ```",
    ),
    (
        "javascript",
        "what is the difference between let and var in javascript",
        Intent::Comparison,
        "`let` is block-scoped and cannot be redeclared in the same scope. \
         `var` is function-scoped and hoisted with an `undefined` value.",
    ),
    (
        "javascript",
        "how to fetch json in javascript",
        Intent::CodeRequest,
        "```javascript\n\
         const response = await fetch(url);\n\
         const data = await response.json();\n\
         ```",
    ),
    (
        "git",
        "how to undo the last commit in git",
        Intent::CodeRequest,
        "Keep the changes staged and drop the commit:\n\n\
         ```bash\n\
         git reset --soft HEAD~1\n\
         ```",
    ),
];

/// Fresh copies of the starter entries, tagged `seed` and their category.
#[must_use]
pub fn entries() -> Vec<KnowledgeEntry> {
    SEED.iter()
        .map(|&(category, question, intent, answer)| {
            let tags: BTreeSet<String> = ["seed", category].iter().map(|t| (*t).to_string()).collect();
            KnowledgeEntry::new(category, question, answer, intent, tags, SEED_CONFIDENCE)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_entries_are_tagged_and_unique() {
        let entries = entries();
        assert_eq!(entries.len(), SEED.len());
        assert!(entries.iter().all(|e| e.has_tag("seed") && e.has_tag(&e.category)));

        let questions: BTreeSet<&str> = entries.iter().map(|e| e.question.as_str()).collect();
        assert_eq!(questions.len(), entries.len());
    }
}
