//! In-memory [`DocumentStore`] for tests and embedding without a database.
//!
//! Documents are chunked on upsert and kept in a `Vec` behind a
//! `std::sync::RwLock`. Without an embedder, passages are ranked by how many
//! query terms they contain; with one, by cosine similarity to the query
//! vector. Both rankings are stable, so equal scores keep insertion order.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::chunk::chunk_text;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::error::StoreError;
use crate::models::{Document, RetrievedPassage};

use super::DocumentStore;

const MAX_TOKENS: usize = 700;

struct StoredChunk {
    title: String,
    text: String,
    vector: Option<Vec<f32>>,
}

/// In-memory store; see the module docs for ranking rules.
pub struct InMemoryStore {
    chunks: RwLock<Vec<StoredChunk>>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            embedder: None,
        }
    }

    /// Rank by cosine similarity using `embedder` for chunks and queries.
    pub fn with_embedder(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder: Some(embedder),
            ..Self::new()
        }
    }

    /// Distinct titles in insertion order.
    pub fn titles(&self) -> Vec<String> {
        let mut titles: Vec<String> = Vec::new();
        if let Ok(chunks) = self.chunks.read() {
            for c in chunks.iter() {
                if !titles.contains(&c.title) {
                    titles.push(c.title.clone());
                }
            }
        }
        titles
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::backend("in-memory store lock poisoned")
}

fn query_terms(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        let mut fresh: Vec<StoredChunk> = Vec::new();
        for doc in documents {
            let pieces = chunk_text(&doc.title, &doc.text, MAX_TOKENS);
            let mut vectors = match &self.embedder {
                Some(e) if !pieces.is_empty() => {
                    let texts: Vec<String> = pieces.iter().map(|c| c.text.clone()).collect();
                    let vectors = e.embed(&texts).await?;
                    if vectors.len() != pieces.len() {
                        return Err(StoreError::backend(format!(
                            "embedding provider returned {} vectors for {} chunks of '{}'",
                            vectors.len(),
                            pieces.len(),
                            doc.title
                        )));
                    }
                    Some(vectors.into_iter())
                }
                _ => None,
            };
            for piece in pieces {
                fresh.push(StoredChunk {
                    title: doc.title.clone(),
                    text: piece.text,
                    vector: vectors.as_mut().and_then(Iterator::next),
                });
            }
        }

        let mut chunks = self.chunks.write().map_err(poisoned)?;
        chunks.retain(|c| !documents.iter().any(|d| d.title == c.title));
        chunks.extend(fresh);
        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, StoreError> {
        let query_vec = match &self.embedder {
            Some(e) => Some(e.embed_query(query).await?),
            None => None,
        };
        let terms = query_terms(query);

        let chunks = self.chunks.read().map_err(poisoned)?;
        let mut scored: Vec<RetrievedPassage> = chunks
            .iter()
            .filter_map(|c| {
                let score = match (&query_vec, &c.vector) {
                    (Some(q), Some(v)) => cosine_similarity(q, v) as f64,
                    (Some(_), None) => return None,
                    (None, _) => {
                        let text = c.text.to_lowercase();
                        let hits = terms.iter().filter(|t| text.contains(t.as_str())).count();
                        if hits == 0 {
                            return None;
                        }
                        hits as f64
                    }
                };
                Some(RetrievedPassage {
                    text: c.text.clone(),
                    title: c.title.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bag-of-letters embedder: deterministic and good enough to rank.
    struct LetterEmbedder;

    #[async_trait]
    impl EmbeddingProvider for LetterEmbedder {
        fn model_name(&self) -> &str {
            "letters"
        }
        fn dims(&self) -> usize {
            26
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0f32; 26];
                    for c in t.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                        v[(c as u8 - b'a') as usize] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    /// Returns one vector too few.
    struct ShortEmbedder;

    #[async_trait]
    impl EmbeddingProvider for ShortEmbedder {
        fn model_name(&self) -> &str {
            "short"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    #[tokio::test]
    async fn missing_vectors_fail_the_upsert() {
        let store = InMemoryStore::with_embedder(Arc::new(ShortEmbedder));
        let err = store
            .upsert(&[Document::new("a.pdf", "some text")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("0 vectors for 1 chunks"));
        assert_eq!(store.chunk_count(), 0);
    }

    #[tokio::test]
    async fn keyword_search_finds_matching_passage() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                Document::new("policy.pdf", "Refunds are allowed within 30 days."),
                Document::new("shipping.pdf", "Orders ship in two business days."),
            ])
            .await
            .unwrap();

        let hits = store.search("What is the refund window?", 3).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "policy.pdf");
        assert!(hits[0].text.contains("30 days"));
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = InMemoryStore::new();
        assert!(store.search("anything", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn upsert_same_title_replaces() {
        let store = InMemoryStore::new();
        store
            .upsert(&[Document::new("a.pdf", "old refund text")])
            .await
            .unwrap();
        store
            .upsert(&[Document::new("a.pdf", "new refund text")])
            .await
            .unwrap();
        assert_eq!(store.chunk_count(), 1);
        let hits = store.search("refund", 3).await.unwrap();
        assert_eq!(hits[0].text, "new refund text");
    }

    #[tokio::test]
    async fn ties_keep_insertion_order() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                Document::new("one.pdf", "alpha"),
                Document::new("two.pdf", "alpha"),
                Document::new("three.pdf", "alpha"),
            ])
            .await
            .unwrap();
        let titles: Vec<String> = store
            .search("alpha", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["one.pdf", "two.pdf"]);
    }

    #[tokio::test]
    async fn embedder_ranks_by_cosine() {
        let store = InMemoryStore::with_embedder(Arc::new(LetterEmbedder));
        store
            .upsert(&[
                Document::new("z.pdf", "zzzz zzz"),
                Document::new("a.pdf", "aaaa aaa"),
            ])
            .await
            .unwrap();
        let hits = store.search("aa", 3).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].title, "a.pdf");
        assert!(hits[0].score > hits[1].score);
        assert_eq!(store.titles(), vec!["z.pdf", "a.pdf"]);
    }
}
