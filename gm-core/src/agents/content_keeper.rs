//! ContentKeeper: lore retrieval. Never writes narrative of its own.

use super::{AgentError, AgentTask};
use crate::content::{ContentRetriever, Passage};
use std::sync::Arc;
use tokio::time::timeout_at;
use tracing::debug;

pub struct ContentKeeper {
    retriever: Arc<dyn ContentRetriever>,
    top_k: usize,
    min_relevance: f32,
}

impl ContentKeeper {
    pub fn new(retriever: Arc<dyn ContentRetriever>) -> Self {
        Self {
            retriever,
            top_k: 3,
            min_relevance: 0.3,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub(super) async fn run(&self, task: &AgentTask) -> Result<Vec<Passage>, AgentError> {
        let query = self
            .retriever
            .query_content(&task.input.player_text, self.top_k);
        let passages = timeout_at(task.deadline, query)
            .await
            .map_err(|_| AgentError::DeadlineExceeded)??;

        let total = passages.len();
        let kept: Vec<Passage> = passages
            .into_iter()
            .filter(|p| p.relevance >= self.min_relevance)
            .take(self.top_k)
            .collect();
        debug!(
            correlation_id = %task.correlation_id,
            retrieved = total,
            kept = kept.len(),
            "content retrieved"
        );
        Ok(kept)
    }
}
