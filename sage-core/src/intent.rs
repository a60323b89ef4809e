//! Intent Classifier: keyword table → ordered intent labels.
//!
//! Each [`Intent`] owns a fixed list of trigger phrases. A label is emitted
//! when at least one of its triggers occurs in the padded, lower-cased
//! message (see [`keyword_haystack`]). Labels are ranked by how many distinct
//! triggers fired; equal counts keep table declaration order.
//!
//! Triggers wrapped in spaces (`" hi "`) match whole words only; bare
//! triggers (`"привет"`) match anywhere.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::text::keyword_haystack;

/// What the user is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Hello, hi, привет.
    Greeting,
    /// Bye, thanks-and-goodbye.
    Farewell,
    /// Asking what the assistant can do, or for general help.
    Help,
    /// Asking for code to be written or shown.
    CodeRequest,
    /// Comparing two technologies or approaches.
    Comparison,
    /// Asking for an explanation of a concept.
    Explanation,
    /// Nothing in the table matched.
    Unknown,
}

impl Intent {
    /// Stable snake_case label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::Help => "help",
            Self::CodeRequest => "code_request",
            Self::Comparison => "comparison",
            Self::Explanation => "explanation",
            Self::Unknown => "unknown",
        }
    }

    /// Small talk that never warrants a web search.
    #[must_use]
    pub fn is_conversational(self) -> bool {
        matches!(self, Self::Greeting | Self::Farewell)
    }

    /// The first label of a classification, or [`Intent::Unknown`].
    #[must_use]
    pub fn primary(intents: &[Intent]) -> Intent {
        intents.first().copied().unwrap_or(Intent::Unknown)
    }

    /// Whether a classification holds nothing but small talk. An empty
    /// classification is not small talk.
    #[must_use]
    pub fn only_conversational(intents: &[Intent]) -> bool {
        !intents.is_empty() && intents.iter().all(|i| i.is_conversational())
    }

    /// The first label that is not small talk, so "hi, how do I ..." is
    /// treated as the question it carries. Falls back to [`Intent::primary`].
    #[must_use]
    pub fn topical(intents: &[Intent]) -> Intent {
        intents
            .iter()
            .copied()
            .find(|i| !i.is_conversational())
            .unwrap_or_else(|| Intent::primary(intents))
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Declaration order is the tie-break order.
const INTENT_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::Greeting,
        &[
            " hi ", " hello ", " hey ", " greetings ", "good morning", "good afternoon",
            "good evening", "привет", "здравствуй", "добрый день",
        ],
    ),
    (
        Intent::Farewell,
        &[
            " bye ", "goodbye", "see you", " farewell ", "good night", "пока ", "до свидания",
        ],
    ),
    (
        Intent::Help,
        &[
            " help ", "what can you do", "how can you help", " assist ", " support ", "помощь",
            "помоги",
        ],
    ),
    (
        Intent::CodeRequest,
        &[
            " code ", " example ", " snippet ", " write ", " implement ", " function ",
            " script ", "show me", "how to ", "how do i ", "пример", "код ", "напиши",
        ],
    ),
    (
        Intent::Comparison,
        &[
            " vs ", " versus ", "compare", "difference between", " better ", " or ",
            "pros and cons", "разница", "сравни", "лучше",
        ],
    ),
    (
        Intent::Explanation,
        &[
            "what is ", "what are ", "what does ", "explain", " why ", "how does ",
            "how do ", " meaning ", " define ", "что такое", "объясни", "почему",
        ],
    ),
];

/// Classify a message into intent labels, most likely first.
///
/// Returns an empty vector when nothing matches; callers treat that as
/// [`Intent::Unknown`] via [`Intent::primary`].
#[must_use]
pub fn classify(message: &str) -> Vec<Intent> {
    let haystack = keyword_haystack(message, &[]);

    let mut scored: Vec<(Intent, usize)> = INTENT_TABLE
        .iter()
        .filter_map(|(intent, triggers)| {
            let hits = triggers.iter().filter(|t| haystack.contains(*t)).count();
            (hits > 0).then_some((*intent, hits))
        })
        .collect();

    // Stable: equal hit counts stay in table order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(intent, _)| intent).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_in_russian() {
        assert_eq!(classify("привет"), vec![Intent::Greeting]);
        assert_eq!(classify("Привет!"), vec![Intent::Greeting]);
    }

    #[test]
    fn short_triggers_match_whole_words_only() {
        // "hi" inside "this"/"which" must not fire.
        let intents = classify("which of this is right");
        assert!(!intents.contains(&Intent::Greeting));
    }

    #[test]
    fn unmatched_is_empty_and_primary_unknown() {
        let intents = classify("zzz qqq");
        assert!(intents.is_empty());
        assert_eq!(Intent::primary(&intents), Intent::Unknown);
    }

    #[test]
    fn more_triggers_rank_first() {
        // comparison: "difference between", " vs "  → 2; explanation: "what is " → 1
        let intents = classify("what is the difference between rust vs go");
        assert_eq!(intents[0], Intent::Comparison);
        assert!(intents.contains(&Intent::Explanation));
    }

    #[test]
    fn ties_break_by_declaration_order() {
        // one trigger each: Help (" help ") and Explanation ("explain")
        let intents = classify("help me, explain closures");
        assert_eq!(intents, vec![Intent::Help, Intent::Explanation]);
    }

    #[test]
    fn code_request() {
        let intents = classify("Show me an example of a python decorator");
        assert_eq!(Intent::primary(&intents), Intent::CodeRequest);
    }

    #[test]
    fn conversational_flags() {
        assert!(Intent::Greeting.is_conversational());
        assert!(Intent::Farewell.is_conversational());
        assert!(!Intent::Explanation.is_conversational());
        assert!(!Intent::Unknown.is_conversational());
    }

    #[test]
    fn greeting_prefix_does_not_hide_the_question() {
        let intents = classify("hi, how do I reverse a list in python?");
        assert_eq!(intents[0], Intent::Greeting);
        assert!(!Intent::only_conversational(&intents));
        assert_eq!(Intent::topical(&intents), Intent::CodeRequest);
    }

    #[test]
    fn small_talk_only() {
        assert!(Intent::only_conversational(&classify("hello")));
        assert!(Intent::only_conversational(&classify("goodbye and good night")));
        assert!(!Intent::only_conversational(&[]));
        assert_eq!(Intent::topical(&classify("hello")), Intent::Greeting);
        assert_eq!(Intent::topical(&[]), Intent::Unknown);
    }
}
