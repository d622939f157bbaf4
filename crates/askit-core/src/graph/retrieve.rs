//! Retriever stage: turns the latest question into a `Context` message.

use std::sync::Arc;

use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::models::{ConversationState, Message, MessageKind, RetrievedPassage};
use crate::store::DocumentStore;

use super::StageOutput;

/// `source_name` stamped on every context message.
pub const CONTEXT_SOURCE_NAME: &str = "stored_documents_retrieved";

/// Title used for passages whose source has none.
pub const UNTITLED: &str = "untitled";

/// Render passages as `Title:`/`Content:` blocks separated by a blank line,
/// keeping the given order.
pub fn format_passages(passages: &[RetrievedPassage]) -> String {
    passages
        .iter()
        .map(|p| {
            let title = if p.title.trim().is_empty() {
                UNTITLED
            } else {
                p.title.as_str()
            };
            format!("Title: {}\nContent: {}", title, p.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    top_k: usize,
}

impl Retriever {
    pub fn new(store: Arc<dyn DocumentStore>, top_k: usize) -> Self {
        Self { store, top_k }
    }

    /// Search with the most recent user message and wrap the hits in one
    /// `Context` message.
    ///
    /// An empty result is not an error: the context is simply empty. A
    /// store failure aborts the stage as [`OrchestratorError::Retrieval`].
    pub async fn retrieve(
        &self,
        state: &ConversationState,
    ) -> Result<StageOutput, OrchestratorError> {
        let query = state
            .find_latest(MessageKind::User)
            .map(Message::content)
            .ok_or(OrchestratorError::NoQuery)?;

        let mut passages = self
            .store
            .search(query, self.top_k)
            .await
            .map_err(OrchestratorError::Retrieval)?;
        passages.truncate(self.top_k);

        let correlation_id = Uuid::new_v4().to_string();
        tracing::debug!(
            passages = passages.len(),
            k = self.top_k,
            correlation_id = %correlation_id,
            "retrieved context"
        );

        Ok(StageOutput {
            new_messages: vec![Message::context(
                format_passages(&passages),
                CONTEXT_SOURCE_NAME,
                correlation_id,
            )],
        })
    }
}
