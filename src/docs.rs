use anyhow::Result;

use crate::config::Config;
use crate::store::{DocumentSummary, SqliteStore};

/// `askit docs`: list the documents indexed in the active collection.
pub async fn run_docs(config: &Config) -> Result<()> {
    let store = SqliteStore::open(config).await?;
    let docs = store.list_documents().await?;

    print!("{}", render(store.collection(), &docs));

    store.close().await;
    Ok(())
}

fn render(collection: &str, docs: &[DocumentSummary]) -> String {
    if docs.is_empty() {
        return format!("No documents in collection '{}'.\n", collection);
    }

    let mut out = format!("Documents in '{}':\n", collection);
    let total_chunks: i64 = docs.iter().map(|d| d.chunks).sum();
    for doc in docs {
        out.push_str(&format!(
            "  {}  ({} chunk{}, updated {})\n",
            doc.title,
            doc.chunks,
            if doc.chunks == 1 { "" } else { "s" },
            doc.updated_at.format("%Y-%m-%d %H:%M")
        ));
    }
    out.push_str(&format!(
        "{} document(s), {} chunk(s)\n",
        docs.len(),
        total_chunks
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn empty_collection_message() {
        assert_eq!(
            render("openai_embeddings", &[]),
            "No documents in collection 'openai_embeddings'.\n"
        );
    }

    #[test]
    fn lists_titles_and_totals() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let docs = vec![
            DocumentSummary {
                title: "policy.pdf".to_string(),
                chunks: 1,
                created_at: at,
                updated_at: at,
            },
            DocumentSummary {
                title: "handbook.pdf".to_string(),
                chunks: 4,
                created_at: at,
                updated_at: at,
            },
        ];
        let out = render("huggingface_embeddings", &docs);
        assert!(out.starts_with("Documents in 'huggingface_embeddings':\n"));
        assert!(out.contains("  policy.pdf  (1 chunk, updated 2024-05-01 09:30)\n"));
        assert!(out.contains("  handbook.pdf  (4 chunks, updated 2024-05-01 09:30)\n"));
        assert!(out.ends_with("2 document(s), 5 chunk(s)\n"));
    }
}
