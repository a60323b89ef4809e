//! Templated replies for the last pipeline stage.
//!
//! Each intent has its own template. Placeholders in `{braces}` are filled
//! from the message context by [`render_template`]:
//!
//! | placeholder | value |
//! |-------------|-------|
//! | `{topic}`   | recognised technologies joined with ", ", or "programming" |
//! | `{first}`   | the first recognised technology, or "your language" |
//! | `{second}`  | the second recognised technology, or "the alternative" |
//! | `{message}` | the trimmed user message |
//!
//! Replies are never written to the knowledge store, so each intent reports
//! a fixed confidence.

use crate::intent::Intent;

/// A templated reply with its fixed confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedReply {
    /// Rendered reply text.
    pub text: String,
    /// Confidence reported for this intent.
    pub confidence: f32,
}

const GREETING: &str = "Hello! I'm SAGE, a programming assistant. Ask me about \
    {topic} and I'll look in my knowledge base, then on the web if I have to.";

const FAREWELL: &str = "Goodbye! Good luck with {topic}. Come back any time.";

const HELP: &str = "I answer programming questions. Things you can try:\n\
    - \"how to read a file in python\"\n\
    - \"what is ownership in rust\"\n\
    - \"difference between let and var in javascript\"\n\
    I check my knowledge base first, then search the web, and I remember \
    what I find.";

const CODE_REQUEST: &str = "I don't have a ready example for \"{message}\" yet. \
    A good way in is to write the smallest {first} program that shows the \
    problem, then grow it. If you rephrase with the exact function or \
    library you are using, I can look again.";

const COMPARISON: &str = "I don't have a stored comparison of {first} and \
    {second}. Compare them on performance, ecosystem, learning curve and how \
    well each fits the project you have in mind.";

const EXPLANATION: &str = "I don't have an explanation of \"{message}\" in my \
    knowledge base yet. The official {first} documentation is the most \
    reliable place to start; ask again with a more specific term and I'll \
    search for it.";

const UNKNOWN: &str = "I'm not sure what you mean by \"{message}\". I work \
    best with programming questions about {topic}. Type \"help\" for examples.";

/// Fill `{key}` placeholders in `template`.
///
/// Unknown placeholders are left as-is.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// The template for an intent.
#[must_use]
pub fn template_for(intent: Intent) -> &'static str {
    match intent {
        Intent::Greeting => GREETING,
        Intent::Farewell => FAREWELL,
        Intent::Help => HELP,
        Intent::CodeRequest => CODE_REQUEST,
        Intent::Comparison => COMPARISON,
        Intent::Explanation => EXPLANATION,
        Intent::Unknown => UNKNOWN,
    }
}

/// Fixed confidence reported for a generated reply.
#[must_use]
pub fn confidence_for(intent: Intent) -> f32 {
    match intent {
        Intent::Greeting | Intent::Farewell => 0.95,
        Intent::Help => 0.9,
        Intent::CodeRequest | Intent::Comparison | Intent::Explanation => 0.4,
        Intent::Unknown => 0.3,
    }
}

/// Render the reply for `intent` using the message context.
#[must_use]
pub fn generate(intent: Intent, entities: &[&str], message: &str) -> GeneratedReply {
    let topic = if entities.is_empty() {
        "programming".to_string()
    } else {
        entities.join(", ")
    };
    let first = entities.first().copied().unwrap_or("your language");
    let second = entities.get(1).copied().unwrap_or("the alternative");

    let text = render_template(
        template_for(intent),
        &[
            ("topic", topic.as_str()),
            ("first", first),
            ("second", second),
            ("message", message.trim()),
        ],
    );

    GeneratedReply {
        text,
        confidence: confidence_for(intent),
    }
}
