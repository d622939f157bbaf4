//! Language model abstraction.
//!
//! The core only needs single-shot completion: one prompt in, one text out.
//! Streaming, chat roles and retries are the client's business. Concrete
//! clients (OpenAI, Hugging Face inference endpoints, Ollama) live in the
//! `askit` app crate.

use async_trait::async_trait;

use crate::error::ModelError;

/// A stateless text-completion backend.
///
/// Implementations must be `Send + Sync` so one client can be shared by
/// several orchestrators.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the model identifier used in logs (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Complete `prompt` and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}
