//! Keyword search over a small in-memory knowledge base.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::debug;

use crate::core::types::RetrievedItem;

static WORD: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\w+").ok());

/// Topic words shorter than this never match.
const MIN_TERM_LEN: usize = 3;

const STOPWORDS: &[&str] = &[
    "about", "and", "any", "are", "can", "does", "for", "from", "has", "have", "how", "into",
    "not", "the", "their", "there", "this", "was", "were", "what", "when", "where", "which",
    "who", "why", "with",
];

/// Content search used by the retriever.
pub trait SearchIndex {
    /// Items relevant to `topic`, most relevant first. An empty list is a valid answer.
    fn search(&self, topic: &str) -> Result<Vec<RetrievedItem>>;
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<RetrievedItem>,
    top_n: usize,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<RetrievedItem>, top_n: usize) -> Self {
        Self { entries, top_n }
    }

    /// Built-in security briefing entries.
    pub fn builtin(top_n: usize) -> Self {
        Self::new(builtin_entries(), top_n)
    }

    /// Load entries from a JSON array of `{source, timestamp, snippet, relevance_score}`.
    pub fn from_path(path: &Path, top_n: usize) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("read knowledge base {}", path.display()))?;
        let entries: Vec<RetrievedItem> = serde_json::from_str(&contents)
            .with_context(|| format!("parse knowledge base {}", path.display()))?;
        Ok(Self::new(entries, top_n))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tokens(text: &str) -> Vec<String> {
    let Some(word) = WORD.as_ref() else {
        return Vec::new();
    };
    word.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Topic words worth matching on, with stopwords and short words removed.
fn search_terms(topic: &str) -> Vec<String> {
    tokens(topic)
        .into_iter()
        .filter(|token| {
            token.chars().count() >= MIN_TERM_LEN && !STOPWORDS.contains(&token.as_str())
        })
        .collect()
}

impl SearchIndex for KnowledgeBase {
    /// An entry matches when a topic word starts one of its snippet words or occurs
    /// inside its source name. Case is ignored.
    fn search(&self, topic: &str) -> Result<Vec<RetrievedItem>> {
        let topic_tokens = search_terms(topic);
        let mut hits: Vec<RetrievedItem> = self
            .entries
            .iter()
            .filter(|entry| {
                let snippet_tokens = tokens(&entry.snippet);
                let source = entry.source.to_lowercase();
                topic_tokens.iter().any(|token| {
                    snippet_tokens.iter().any(|word| word.starts_with(token.as_str()))
                        || source.contains(token.as_str())
                })
            })
            .cloned()
            .collect();

        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        hits.truncate(self.top_n);
        debug!(topic, hits = hits.len(), "knowledge base search");
        Ok(hits)
    }
}

fn entry(source: &str, timestamp: &str, snippet: &str, relevance_score: f64) -> RetrievedItem {
    RetrievedItem {
        source: source.to_string(),
        timestamp: timestamp.to_string(),
        snippet: snippet.to_string(),
        relevance_score,
    }
}

fn builtin_entries() -> Vec<RetrievedItem> {
    vec![
        entry(
            "NewsWire-A",
            "2025-11-20T08:00:00Z",
            "Reports from independent observers confirm a temporary disruption to regional \
             fiber optic lines near the capital, citing 'unscheduled maintenance.'",
            0.95,
        ),
        entry(
            "Policy-Doc-B",
            "2025-11-19T14:30:00Z",
            "Ministry of Infrastructure released a statement denying any widespread outage, \
             attributing localized issues to severe weather patterns.",
            0.88,
        ),
        entry(
            "Social-Feed-C (Unverified)",
            "2025-11-21T02:15:00Z",
            "Local posts suggest power outages have spread beyond the capital's perimeter, \
             hinting at deliberate action.",
            0.70,
        ),
        entry(
            "Policy-Doc-D",
            "2025-11-22T10:00:00Z",
            "Government emergency response protocol R-34 specifies immediate media blackout \
             if critical infrastructure is confirmed offline.",
            0.98,
        ),
        entry(
            "Policy-Doc-D",
            "2025-11-22T10:00:00Z",
            "Security personnel deployed to states kwara, kogi and abuja to curb rising tensions",
            0.78,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(hits: &[RetrievedItem]) -> Vec<&str> {
        hits.iter().map(|hit| hit.source.as_str()).collect()
    }

    #[test]
    fn word_prefix_matches_plural_forms() {
        let hits = KnowledgeBase::builtin(3)
            .search("network outage")
            .expect("search");
        assert_eq!(
            sources(&hits),
            vec!["Policy-Doc-B", "Social-Feed-C (Unverified)"]
        );
    }

    #[test]
    fn filler_words_do_not_widen_the_match() {
        let kb = KnowledgeBase::builtin(5);
        let question = kb.search("is there a network outage").expect("search");
        assert_eq!(
            sources(&question),
            vec!["Policy-Doc-B", "Social-Feed-C (Unverified)"]
        );
        assert!(kb.search("is it a the of").expect("search").is_empty());
    }

    #[test]
    fn unmatched_topic_yields_empty_list() {
        let hits = KnowledgeBase::builtin(3)
            .search("quantum cryptography")
            .expect("search");
        assert!(hits.is_empty());
    }

    #[test]
    fn source_names_match_and_results_are_truncated_by_relevance() {
        let hits = KnowledgeBase::builtin(2).search("Policy").expect("search");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].relevance_score, 0.98);
        assert_eq!(hits[1].source, "Policy-Doc-B");
    }

    #[test]
    fn loads_entries_from_json_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("kb.json");
        fs::write(
            &path,
            r#"[{"source":"Field-Note","timestamp":"2025-01-01T00:00:00Z","snippet":"Bridge closed","relevance_score":0.5}]"#,
        )
        .expect("write");
        let kb = KnowledgeBase::from_path(&path, 3).expect("load");
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.search("bridge").expect("search").len(), 1);
    }
}
