//! Content retrieval collaborator.
//!
//! The ContentKeeper agent is the only consumer. Any retrieval service can
//! sit behind [`ContentRetriever`]; [`KeywordIndex`] is a small in-memory
//! term-overlap index for local lore.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Words that carry no retrieval signal.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "of", "to", "in", "on", "at", "for", "with", "is", "are",
    "was", "were", "be", "i", "me", "my", "we", "you", "it", "this", "that", "what", "who",
    "where", "when", "how", "do", "does", "did", "about", "there", "here", "can", "tell",
];

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("content index unavailable: {0}")]
    Unavailable(String),

    #[error("retrieval backend error: {0}")]
    Backend(String),
}

/// A retrieved chunk of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub source: String,
    pub text: String,
    /// 0.0 (unrelated) to 1.0 (every query term matched).
    pub relevance: f32,
}

#[async_trait]
pub trait ContentRetriever: Send + Sync {
    /// Up to `top_k` passages, most relevant first.
    async fn query_content(&self, text: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError>;
}

/// Lowercased content terms of `text`, without stopwords.
pub fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| w.len() > 1 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
struct Document {
    source: String,
    text: String,
    terms: BTreeSet<String>,
}

/// In-memory term-overlap index.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    documents: Vec<Document>,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, source: impl Into<String>, text: impl Into<String>) -> Self {
        self.add(source, text);
        self
    }

    pub fn add(&mut self, source: impl Into<String>, text: impl Into<String>) {
        let text = text.into();
        self.documents.push(Document {
            source: source.into(),
            terms: terms(&text),
            text,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Synchronous search; ties keep insertion order.
    pub fn search(&self, text: &str, top_k: usize) -> Vec<Passage> {
        let query = terms(text);
        if query.is_empty() || top_k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f32)> = self
            .documents
            .iter()
            .enumerate()
            .filter_map(|(i, doc)| {
                let matched = query.intersection(&doc.terms).count();
                (matched > 0).then(|| (i, matched as f32 / query.len() as f32))
            })
            .collect();
        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(i, relevance)| Passage {
                source: self.documents[i].source.clone(),
                text: self.documents[i].text.clone(),
                relevance,
            })
            .collect()
    }
}

#[async_trait]
impl ContentRetriever for KeywordIndex {
    async fn query_content(&self, text: &str, top_k: usize) -> Result<Vec<Passage>, RetrievalError> {
        Ok(self.search(text, top_k))
    }
}
