//! Provider response payloads and their conversion into [`SearchHit`]s.

use sage_core::SearchHit;
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DuckDuckGo Instant Answer API
// ---------------------------------------------------------------------------

/// Subset of the DuckDuckGo Instant Answer response (`format=json`).
///
/// Every field is optional in practice; missing ones default to empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DuckDuckGoResponse {
    /// Topic heading, e.g. "Rust (programming language)".
    pub heading: String,
    /// Abstract text, usually from Wikipedia.
    pub abstract_text: String,
    /// Link to the abstract's source.
    #[serde(rename = "AbstractURL")]
    pub abstract_url: String,
    /// Instant answer. A string for most queries, an object for widgets.
    pub answer: serde_json::Value,
    /// Dictionary definition.
    pub definition: String,
    /// Link to the definition's source.
    #[serde(rename = "DefinitionURL")]
    pub definition_url: String,
    /// Related topics, possibly grouped.
    pub related_topics: Vec<RelatedTopic>,
}

/// One entry of `RelatedTopics`: a topic, or a named group of topics.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RelatedTopic {
    /// A single topic.
    Topic {
        /// Topic text; starts with the topic name.
        #[serde(rename = "Text")]
        text: String,
        /// Link to the topic page.
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    /// A named group.
    Group {
        /// Group name.
        #[serde(rename = "Name")]
        name: String,
        /// Topics in the group.
        #[serde(rename = "Topics", default)]
        topics: Vec<RelatedTopic>,
    },
}

impl DuckDuckGoResponse {
    /// Flatten into hits, best first: abstract, answer, definition, then
    /// related topics in document order.
    #[must_use]
    pub fn into_hits(self, limit: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();

        if !self.abstract_text.trim().is_empty() {
            hits.push(SearchHit::new(&self.heading, &self.abstract_text, &self.abstract_url));
        }
        if let Some(answer) = self.answer.as_str().filter(|a| !a.trim().is_empty()) {
            hits.push(SearchHit::new(&self.heading, answer, ""));
        }
        if !self.definition.trim().is_empty() {
            hits.push(SearchHit::new(&self.heading, &self.definition, &self.definition_url));
        }
        flatten_topics(self.related_topics, &mut hits);

        hits.truncate(limit);
        hits
    }
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<SearchHit>) {
    for topic in topics {
        match topic {
            RelatedTopic::Topic { text, first_url } if !text.trim().is_empty() => {
                let title = topic_title(&text, &first_url);
                out.push(SearchHit::new(title, text, first_url));
            }
            RelatedTopic::Topic { .. } => {}
            RelatedTopic::Group { topics, .. } => flatten_topics(topics, out),
        }
    }
}

/// DuckDuckGo topic texts read "Name - description"; the URL's last path
/// segment is the fallback title.
fn topic_title(text: &str, url: &str) -> String {
    if let Some((name, _)) = text.split_once(" - ") {
        return name.trim().to_string();
    }
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| segment.replace('_', " "))
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// SearxNG
// ---------------------------------------------------------------------------

/// SearxNG `/search?format=json` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearxResponse {
    /// Ranked results.
    pub results: Vec<SearxResult>,
}

/// One SearxNG result.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearxResult {
    /// Result title.
    pub title: String,
    /// Result link.
    pub url: String,
    /// Excerpt.
    pub content: String,
}

impl SearxResponse {
    /// Results with a non-empty excerpt, in rank order.
    #[must_use]
    pub fn into_hits(self, limit: usize) -> Vec<SearchHit> {
        self.results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .take(limit)
            .map(|r| SearchHit::new(r.title, r.content, r.url))
            .collect()
    }
}
