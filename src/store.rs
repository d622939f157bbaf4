//! SQLite-backed [`DocumentStore`].
//!
//! Documents are chunked with the core chunker and written to `chunks` and
//! the `chunks_fts` FTS5 index; with an embedding provider configured, each
//! chunk also gets a row in `chunk_vectors`. Everything is scoped to one
//! collection so providers with different embedding spaces can share a
//! database file.
//!
//! Ranking:
//! - embeddings enabled: cosine similarity between the query vector and
//!   every chunk vector of the collection's model;
//! - otherwise: FTS5 BM25, negated so larger means more similar.
//!
//! Ties keep insertion order in both modes.

use anyhow::{Context, Result};
use askit_core::chunk::chunk_text;
use askit_core::embedding::{blob_to_vec, cosine_similarity, vec_to_blob, EmbeddingProvider};
use askit_core::models::Chunk;
use askit_core::{Document, DocumentStore, RetrievedPassage, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::{db, embedding, migrate};

/// One row of `askit docs`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub title: String,
    pub chunks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct SqliteStore {
    pool: SqlitePool,
    collection: String,
    max_tokens: usize,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
}

/// A document ready to be written: chunked, and embedded when a provider
/// is configured.
struct PreparedDocument<'a> {
    doc: &'a Document,
    doc_id: String,
    dedup_hash: String,
    chunks: Vec<Chunk>,
    vectors: Option<Vec<Vec<f32>>>,
}

impl SqliteStore {
    pub fn new(
        pool: SqlitePool,
        collection: impl Into<String>,
        max_tokens: usize,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        Self {
            pool,
            collection: collection.into(),
            max_tokens,
            embedder,
        }
    }

    /// Connect, make sure the schema exists, and build the configured
    /// embedding provider.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::migrate(&pool).await?;
        let embedder = embedding::create_provider(&config.embedding())?;
        Ok(Self::new(
            pool,
            config.collection(),
            config.chunking.max_tokens,
            embedder,
        ))
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Documents in this collection, oldest first, with their chunk counts.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT d.title, d.created_at, d.updated_at, COUNT(c.id) AS chunks
            FROM documents d
            LEFT JOIN chunks c ON c.document_id = d.id
            WHERE d.collection = ?
            GROUP BY d.id
            ORDER BY d.created_at, d.rowid
            "#,
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DocumentSummary {
                title: row.get("title"),
                chunks: row.get("chunks"),
                created_at: timestamp(row.get("created_at")),
                updated_at: timestamp(row.get("updated_at")),
            })
            .collect())
    }

    /// Upsert the whole batch atomically: every document is chunked and
    /// embedded first, then all writes happen in one transaction. Any
    /// failure leaves the store as it was before the call.
    async fn upsert_all(&self, documents: &[Document]) -> Result<()> {
        // Last occurrence of a title wins within a batch.
        let mut batch: Vec<&Document> = Vec::with_capacity(documents.len());
        for doc in documents {
            batch.retain(|d| d.title != doc.title);
            batch.push(doc);
        }

        let mut prepared = Vec::with_capacity(batch.len());
        for doc in batch {
            if let Some(p) = self.prepare_document(doc).await? {
                prepared.push(p);
            }
        }

        if !prepared.is_empty() {
            let now = Utc::now().timestamp();
            let mut tx = self.pool.begin().await?;
            for p in &prepared {
                self.write_document(&mut tx, p, now).await?;
            }
            tx.commit().await?;
        }

        tracing::debug!(
            collection = %self.collection,
            received = documents.len(),
            written = prepared.len(),
            "upserted documents"
        );
        Ok(())
    }

    /// Chunk and embed `doc`, or return `None` when the stored version is
    /// already current.
    async fn prepare_document<'a>(
        &self,
        doc: &'a Document,
    ) -> Result<Option<PreparedDocument<'a>>> {
        let dedup_hash = dedup_hash(&self.collection, doc);

        let existing: Option<(String, String)> = sqlx::query_as(
            "SELECT id, dedup_hash FROM documents WHERE collection = ? AND title = ?",
        )
        .bind(&self.collection)
        .bind(&doc.title)
        .fetch_optional(&self.pool)
        .await?;

        if let Some((_, ref hash)) = existing {
            if *hash == dedup_hash && self.vectors_current(&doc.title).await? {
                tracing::debug!(title = %doc.title, "document unchanged, skipping");
                return Ok(None);
            }
        }

        let doc_id = existing
            .map(|(id, _)| id)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let chunks = chunk_text(&doc_id, &doc.text, self.max_tokens);

        let vectors = match &self.embedder {
            Some(e) if !chunks.is_empty() => {
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let vectors = e
                    .embed(&texts)
                    .await
                    .with_context(|| format!("Failed to embed '{}'", doc.title))?;
                if vectors.len() != chunks.len() {
                    anyhow::bail!(
                        "Embedding provider returned {} vectors for {} chunks",
                        vectors.len(),
                        chunks.len()
                    );
                }
                Some(vectors)
            }
            _ => None,
        };

        Ok(Some(PreparedDocument {
            doc,
            doc_id,
            dedup_hash,
            chunks,
            vectors,
        }))
    }

    async fn write_document(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        p: &PreparedDocument<'_>,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, collection, title, body, dedup_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(collection, title) DO UPDATE SET
                body = excluded.body,
                dedup_hash = excluded.dedup_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&p.doc_id)
        .bind(&self.collection)
        .bind(&p.doc.title)
        .bind(&p.doc.text)
        .bind(&p.dedup_hash)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        replace_chunks(tx, &p.doc_id, &p.chunks).await?;

        if let (Some(embedder), Some(vectors)) = (&self.embedder, &p.vectors) {
            for (chunk, vector) in p.chunks.iter().zip(vectors) {
                sqlx::query(
                    "INSERT INTO chunk_vectors (chunk_id, document_id, model, dims, embedding) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&chunk.id)
                .bind(&p.doc_id)
                .bind(embedder.model_name())
                .bind(vector.len() as i64)
                .bind(vec_to_blob(vector))
                .execute(&mut **tx)
                .await?;
            }
        }

        Ok(())
    }

    /// Whether the stored vectors of `title` (if any are needed) came from
    /// the current embedding model.
    async fn vectors_current(&self, title: &str) -> Result<bool> {
        let Some(embedder) = &self.embedder else {
            return Ok(true);
        };
        let stale: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM chunks c
            JOIN documents d ON d.id = c.document_id
            LEFT JOIN chunk_vectors v ON v.chunk_id = c.id AND v.model = ?
            WHERE d.collection = ? AND d.title = ? AND v.chunk_id IS NULL
            "#,
        )
        .bind(embedder.model_name())
        .bind(&self.collection)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        Ok(stale == 0)
    }

    async fn search_keyword(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>> {
        let Some(match_expr) = fts_match_expression(query) else {
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            r#"
            SELECT c.text AS text, d.title AS title, chunks_fts.rank AS rank
            FROM chunks_fts
            JOIN chunks c ON c.id = chunks_fts.chunk_id
            JOIN documents d ON d.id = c.document_id
            WHERE chunks_fts MATCH ? AND d.collection = ?
            ORDER BY chunks_fts.rank, chunks_fts.rowid
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(&self.collection)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let rank: f64 = row.get("rank");
                RetrievedPassage {
                    text: row.get("text"),
                    title: row.get("title"),
                    score: -rank,
                }
            })
            .collect())
    }

    async fn search_vector(
        &self,
        embedder: &dyn EmbeddingProvider,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let query_vec = embedder.embed_query(query).await?;

        let rows = sqlx::query(
            r#"
            SELECT c.text AS text, d.title AS title, v.embedding AS embedding
            FROM chunk_vectors v
            JOIN chunks c ON c.id = v.chunk_id
            JOIN documents d ON d.id = c.document_id
            WHERE d.collection = ? AND v.model = ?
            ORDER BY d.created_at, d.rowid, c.chunk_index
            "#,
        )
        .bind(&self.collection)
        .bind(embedder.model_name())
        .fetch_all(&self.pool)
        .await?;

        let mut passages: Vec<RetrievedPassage> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                RetrievedPassage {
                    text: row.get("text"),
                    title: row.get("title"),
                    score: cosine_similarity(&query_vec, &blob_to_vec(&blob)) as f64,
                }
            })
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(k);
        Ok(passages)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn upsert(&self, documents: &[Document]) -> Result<(), StoreError> {
        self.upsert_all(documents).await.map_err(StoreError::from)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedPassage>, StoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let result = match &self.embedder {
            Some(embedder) => self.search_vector(embedder.as_ref(), query, k).await,
            None => self.search_keyword(query, k).await,
        };
        result.map_err(StoreError::from)
    }
}

async fn replace_chunks(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    document_id: &str,
    chunks: &[Chunk],
) -> Result<()> {
    sqlx::query(
        "DELETE FROM chunk_vectors WHERE chunk_id IN (SELECT id FROM chunks WHERE document_id = ?)",
    )
    .bind(document_id)
    .execute(&mut **tx)
    .await?;
    sqlx::query("DELETE FROM chunks_fts WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;
    sqlx::query("DELETE FROM chunks WHERE document_id = ?")
        .bind(document_id)
        .execute(&mut **tx)
        .await?;

    for chunk in chunks {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text) VALUES (?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&chunk.document_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .execute(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO chunks_fts (chunk_id, document_id, text) VALUES (?, ?, ?)")
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(&chunk.text)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}

fn dedup_hash(collection: &str, doc: &Document) -> String {
    let mut hasher = Sha256::new();
    hasher.update(collection.as_bytes());
    hasher.update([0u8]);
    hasher.update(doc.title.as_bytes());
    hasher.update([0u8]);
    hasher.update(doc.text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Turn free text into an FTS5 query: every alphanumeric term, quoted,
/// joined with `OR`. Returns `None` when the text has no terms.
///
/// Quoting keeps FTS5 operators and punctuation in questions ("?", "-",
/// "NOT") from being parsed as query syntax.
pub fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}
