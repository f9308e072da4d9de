//! Simple in-memory retriever backing the optional per-agent knowledge
//! hook. Scores documents by token overlap with the query; no
//! embeddings, no external index.

use async_trait::async_trait;
use dialogue_core::{ConversationContext, Document, Result, RetrieveOptions, Retriever};
use parking_lot::RwLock;

pub struct InMemoryRetriever {
    name: String,
    documents: RwLock<Vec<Document>>,
}

impl InMemoryRetriever {
    pub fn new(name: impl Into<String>, documents: Vec<Document>) -> Self {
        Self { name: name.into(), documents: RwLock::new(documents) }
    }

    pub fn add_document(&self, document: Document) {
        self.documents.write().push(document);
    }

    fn score(query_tokens: &[String], content: &str) -> f32 {
        if query_tokens.is_empty() {
            return 0.0;
        }
        let content_lower = content.to_lowercase();
        let hits = query_tokens.iter().filter(|t| content_lower.contains(t.as_str())).count();
        hits as f32 / query_tokens.len() as f32
    }

    fn tokenize(query: &str) -> Vec<String> {
        query
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect()
    }
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn retrieve(&self, query: &str, options: &RetrieveOptions) -> Result<Vec<Document>> {
        let tokens = Self::tokenize(query);
        let docs = self.documents.read();
        let mut scored: Vec<Document> = docs
            .iter()
            .map(|d| {
                let mut d = d.clone();
                d.score = Self::score(&tokens, &d.content);
                d
            })
            .filter(|d| d.score >= options.min_score)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(options.top_k);
        Ok(scored)
    }

    async fn retrieve_agentic(
        &self,
        query: &str,
        _context: &ConversationContext,
        _max_iterations: usize,
    ) -> Result<Vec<Document>> {
        self.retrieve(query, &RetrieveOptions::default()).await
    }

    fn prefetch(&self, _partial_query: &str) {}

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InMemoryRetriever {
        InMemoryRetriever::new(
            "test",
            vec![
                Document::new("d1", "We agreed on a 20% budget reserve last session", 0.0),
                Document::new("d2", "Unrelated note about scheduling", 0.0),
            ],
        )
    }

    #[tokio::test]
    async fn retrieve_ranks_by_overlap() {
        let retriever = sample();
        let results = retriever
            .retrieve("what budget reserve did we agree", &RetrieveOptions::default())
            .await
            .unwrap();
        assert_eq!(results[0].id, "d1");
    }

    #[tokio::test]
    async fn min_score_filters_out_weak_matches() {
        let retriever = sample();
        let options = RetrieveOptions::default().with_min_score(0.9);
        let results = retriever.retrieve("scheduling", &options).await.unwrap();
        assert!(results.is_empty() || results[0].score >= 0.9);
    }
}
