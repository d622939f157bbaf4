//! Error taxonomy for the turn graph and its collaborators.
//!
//! Collaborator failures ([`StoreError`], [`ModelError`]) are wrapped, never
//! translated: the original cause is reachable only through
//! [`std::error::Error::source`], so chain printers show it once. Nothing in
//! the core retries.

use crate::models::{ConversationState, MessageKind};

/// Failure reported by a [`DocumentStore`](crate::store::DocumentStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend reported a failure (timeout, unavailable service, ...).
    #[error("{0}")]
    Backend(String),
    /// Any other error raised while talking to the backend.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend(message.into())
    }
}

/// Failure reported by a [`LanguageModel`](crate::llm::LanguageModel).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The model endpoint answered with a non-success status.
    #[error("model API error {status}: {body}")]
    Api { status: u16, body: String },
    /// The response could not be interpreted.
    #[error("invalid model response: {0}")]
    InvalidResponse(String),
    #[error("{0}")]
    Backend(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ModelError {
    pub fn backend(message: impl Into<String>) -> Self {
        ModelError::Backend(message.into())
    }
}

/// Why a single turn was aborted.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// An expected message variant is missing from history. Indicates a
    /// stage ran out of order.
    #[error("no {kind} message found in history")]
    NotFound { kind: MessageKind },
    /// The retriever found no user message to use as its query.
    #[error("no user query in history")]
    NoQuery,
    #[error("retrieval failed")]
    Retrieval(#[source] StoreError),
    #[error("generation failed")]
    Generation(#[source] ModelError),
}

/// A failed turn: the error plus the state as it stood when the turn
/// aborted.
///
/// `partial` includes every message appended before the failure. Callers
/// that want to roll back simply keep their own copy of the input state and
/// drop `partial`.
#[derive(Debug, thiserror::Error)]
#[error("turn aborted")]
pub struct TurnError {
    #[source]
    pub error: OrchestratorError,
    pub partial: ConversationState,
}

impl TurnError {
    pub fn into_parts(self) -> (OrchestratorError, ConversationState) {
        (self.error, self.partial)
    }
}
