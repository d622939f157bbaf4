//! TOML configuration.
//!
//! The file is read once at startup, overlaid with the `USE_PROVIDER`
//! environment variable, and validated. Secrets never live in the file:
//! API tokens come from the environment (optionally a `.env` file).
//!
//! See `config/askit.example.toml` for every key.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable that overrides the top-level `provider` key.
pub const PROVIDER_ENV: &str = "USE_PROVIDER";

/// Model provider family. Decides the chat model, the default embedding
/// model and the collection documents are indexed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    #[default]
    #[serde(rename = "huggingface")]
    HuggingFace,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::HuggingFace => "huggingface",
        }
    }

    /// Each provider indexes into its own collection so vectors from
    /// different embedding models never mix.
    pub fn default_collection(&self) -> String {
        format!("{}_embeddings", self.as_str())
    }

    pub fn default_chat_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::HuggingFace => "mistralai/Mistral-7B-Instruct-v0.2",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "huggingface" => Ok(Provider::HuggingFace),
            other => bail!(
                "Unknown provider: '{}'. Must be openai or huggingface.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub provider: Provider,
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Explicit embedding settings. When absent the provider's defaults
    /// apply; see [`Config::embedding`].
    #[serde(default, rename = "embedding")]
    pub embedding_override: Option<EmbeddingConfig>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub collection: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    700
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    askit_core::graph::DEFAULT_TOP_K
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for the Ollama provider.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }

    /// Embedding settings implied by a model provider.
    pub fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::OpenAi => Self {
                provider: "openai".to_string(),
                model: Some("text-embedding-3-large".to_string()),
                dims: Some(3072),
                ..Self::default()
            },
            Provider::HuggingFace => Self {
                provider: "local".to_string(),
                model: Some("all-minilm-l6-v2".to_string()),
                dims: Some(384),
                ..Self::default()
            },
        }
    }
}

fn default_embedding_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embedding_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Chat model name. Defaults per provider.
    #[serde(default)]
    pub model: Option<String>,
    /// Inference endpoint. For `huggingface` this is the model endpoint;
    /// for `openai` an OpenAI-compatible base URL.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: None,
            endpoint_url: None,
            timeout_secs: default_llm_timeout(),
            max_new_tokens: default_max_new_tokens(),
            temperature: None,
        }
    }
}

fn default_llm_timeout() -> u64 {
    60
}
fn default_max_new_tokens() -> u32 {
    512
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("./uploaded_files")
}

impl Config {
    /// Parse and validate a config from TOML text, without consulting the
    /// environment.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the provider when `value` names one. A set-but-empty value
    /// is ignored.
    pub fn with_provider_override(mut self, value: Option<&str>) -> Result<Self> {
        if let Some(raw) = value.filter(|v| !v.trim().is_empty()) {
            self.provider = raw
                .parse()
                .with_context(|| format!("Invalid {} value", PROVIDER_ENV))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Collection this config reads from and writes to.
    pub fn collection(&self) -> String {
        self.db
            .collection
            .clone()
            .unwrap_or_else(|| self.provider.default_collection())
    }

    /// Effective embedding settings: the `[embedding]` table if present,
    /// otherwise the provider's defaults.
    pub fn embedding(&self) -> EmbeddingConfig {
        self.embedding_override
            .clone()
            .unwrap_or_else(|| EmbeddingConfig::for_provider(self.provider))
    }

    pub fn chat_model(&self) -> String {
        self.llm
            .model
            .clone()
            .unwrap_or_else(|| self.provider.default_chat_model().to_string())
    }

    fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 {
            bail!("chunking.max_tokens must be > 0");
        }

        if self.retrieval.top_k < 1 {
            bail!("retrieval.top_k must be >= 1");
        }

        let embedding = self.embedding();
        match embedding.provider.as_str() {
            "disabled" | "openai" | "ollama" | "local" => {}
            other => bail!(
                "Unknown embedding provider: '{}'. Must be disabled, openai, ollama, or local.",
                other
            ),
        }

        if embedding.is_enabled() {
            if embedding.dims.is_none() || embedding.dims == Some(0) {
                bail!(
                    "embedding.dims must be > 0 when provider is '{}'",
                    embedding.provider
                );
            }
            if embedding.model.is_none() {
                bail!(
                    "embedding.model must be specified when provider is '{}'",
                    embedding.provider
                );
            }
            if embedding.timeout_secs == 0 {
                bail!("embedding.timeout_secs must be > 0");
            }
        }

        if self.llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be > 0");
        }

        Ok(())
    }
}

/// Read, overlay `USE_PROVIDER`, and validate the config at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = Config::from_toml(&content)?;
    let env_provider = std::env::var(PROVIDER_ENV).ok();
    let config = config.with_provider_override(env_provider.as_deref())?;

    tracing::debug!(
        provider = config.provider.as_str(),
        collection = %config.collection(),
        "loaded config from {}",
        path.display()
    );
    Ok(config)
}
