//! Language-model clients.
//!
//! Both clients are single-shot: one prompt in, one completion out. They do
//! not retry; a failed call surfaces as a [`ModelError`] and aborts the turn.
//! Timeouts come from `[llm] timeout_secs`.

use anyhow::{anyhow, Result};
use askit_core::{LanguageModel, ModelError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, Provider};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const HUGGINGFACE_DEFAULT_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/mistralai/Mistral-7B-Instruct-v0.2";

/// Build the chat client for the configured provider.
pub fn create_language_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.llm.timeout_secs))
        .build()?;

    let model: Arc<dyn LanguageModel> = match config.provider {
        Provider::OpenAi => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
            Arc::new(OpenAiChat {
                client,
                base_url: config
                    .llm
                    .endpoint_url
                    .clone()
                    .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
                api_key,
                model: config.chat_model(),
                temperature: config.llm.temperature,
                max_tokens: config.llm.max_new_tokens,
            })
        }
        Provider::HuggingFace => {
            let token = std::env::var("HUGGINGFACEHUB_API_TOKEN")
                .map_err(|_| anyhow!("HUGGINGFACEHUB_API_TOKEN environment variable not set"))?;
            Arc::new(HuggingFaceEndpoint {
                client,
                endpoint_url: config
                    .llm
                    .endpoint_url
                    .clone()
                    .unwrap_or_else(|| HUGGINGFACE_DEFAULT_ENDPOINT.to_string()),
                token,
                model: config.chat_model(),
                temperature: config.llm.temperature,
                max_new_tokens: config.llm.max_new_tokens,
            })
        }
    };

    tracing::debug!(
        provider = config.provider.as_str(),
        model = model.model_name(),
        "language model ready"
    );
    Ok(model)
}

/// Send `body` and return the JSON response, mapping non-2xx statuses to
/// [`ModelError::Api`].
async fn post_json(
    client: &reqwest::Client,
    url: &str,
    token: &str,
    body: &Value,
) -> Result<Value, ModelError> {
    let response = client
        .post(url)
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .map_err(|e| ModelError::backend(format!("request to {} failed: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ModelError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ModelError::InvalidResponse(e.to_string()))
}

// ============ OpenAI ============

/// OpenAI (or compatible) `POST /chat/completions`.
pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: u32,
}

fn parse_chat_completion(json: &Value) -> Result<String, ModelError> {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            ModelError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}

#[async_trait]
impl LanguageModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "max_tokens": self.max_tokens,
        });
        if let Some(t) = self.temperature {
            body["temperature"] = json!(t);
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let json = post_json(&self.client, &url, &self.api_key, &body).await?;
        parse_chat_completion(&json)
    }
}

// ============ Hugging Face ============

/// Hugging Face text-generation inference endpoint.
pub struct HuggingFaceEndpoint {
    client: reqwest::Client,
    endpoint_url: String,
    token: String,
    model: String,
    temperature: Option<f32>,
    max_new_tokens: u32,
}

/// Accepts both `[{"generated_text": ...}]` and `{"generated_text": ...}`;
/// an `{"error": ...}` body is reported as such.
fn parse_generated_text(json: &Value) -> Result<String, ModelError> {
    if let Some(err) = json.get("error").and_then(Value::as_str) {
        return Err(ModelError::backend(err));
    }

    let item = match json {
        Value::Array(items) => items.first(),
        other => Some(other),
    };
    item.and_then(|v| v.get("generated_text"))
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| ModelError::InvalidResponse("missing generated_text".to_string()))
}

#[async_trait]
impl LanguageModel for HuggingFaceEndpoint {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let mut parameters = json!({
            "max_new_tokens": self.max_new_tokens,
            "return_full_text": false,
        });
        if let Some(t) = self.temperature {
            parameters["temperature"] = json!(t);
        }
        let body = json!({ "inputs": prompt, "parameters": parameters });

        let json = post_json(&self.client, &self.endpoint_url, &self.token, &body).await?;
        parse_generated_text(&json)
    }
}
