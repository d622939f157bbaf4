//! Answer stage: grounded prompt in, assistant message out.

use std::sync::Arc;

use crate::error::OrchestratorError;
use crate::llm::LanguageModel;
use crate::models::{ConversationState, Message, MessageKind};

use super::StageOutput;

/// Fixed instruction opening every answer prompt.
pub const ANSWER_INSTRUCTION: &str =
    "You are a helpful assistant answering queries based strictly on the context provided.";

/// Build the grounded prompt. Context and query are inserted verbatim.
pub fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "{}\n\nContext:\n{}\n\nQuery: {}\n",
        ANSWER_INSTRUCTION, context, query
    )
}

pub struct Answerer {
    llm: Arc<dyn LanguageModel>,
}

impl Answerer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Answer the latest question from the latest retrieved context.
    ///
    /// Fails with [`OrchestratorError::NotFound`] when history holds no
    /// `Context` (or no `User`) message; it never answers ungrounded.
    pub async fn answer(&self, state: &ConversationState) -> Result<StageOutput, OrchestratorError> {
        let context = state.require_latest(MessageKind::Context)?.content();
        let query = state.require_latest(MessageKind::User)?.content();

        let prompt = build_prompt(context, query);
        tracing::debug!(
            model = self.llm.model_name(),
            prompt_chars = prompt.len(),
            "generating answer"
        );

        let text = self
            .llm
            .complete(&prompt)
            .await
            .map_err(OrchestratorError::Generation)?;

        Ok(StageOutput {
            new_messages: vec![Message::assistant(text)],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_layout() {
        let prompt = build_prompt("Title: a\nContent: b", "why?");
        assert!(prompt.starts_with(ANSWER_INSTRUCTION));
        assert!(prompt.contains("\n\nContext:\nTitle: a\nContent: b\n\n"));
        assert!(prompt.ends_with("Query: why?\n"));
    }

    #[test]
    fn empty_context_still_has_section() {
        let prompt = build_prompt("", "q");
        assert!(prompt.contains("Context:\n\n\nQuery: q"));
    }
}
