//! Document store abstraction.
//!
//! The [`DocumentStore`] trait is everything the turn graph and the
//! ingestion pipeline need from a similarity index: put documents in, get
//! ranked passages out. The embedding space and the persistence format are
//! the implementation's concern.
//!
//! | Implementation | Crate | Ranking |
//! |----------------|-------|---------|
//! | [`memory::InMemoryStore`] | `askit-core` | term overlap, or cosine with an embedder |
//! | `SqliteStore` | `askit` | cosine over stored vectors, or FTS5 BM25 |

pub mod memory;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::{Document, RetrievedPassage};

/// A persistent (or in-memory) similarity-search index.
///
/// Implementations must be `Send + Sync`: one store is typically shared by
/// every conversation in the process.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Index `documents`. A document whose title is already indexed
    /// replaces the previous version.
    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError>;

    /// Return at most `k` passages for `query`, most similar first.
    ///
    /// Ranking must be deterministic per call; ties keep the store's native
    /// order.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, StoreError>;
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for Arc<S> {
    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        (**self).upsert(documents).await
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, StoreError> {
        (**self).search(query, k).await
    }
}
