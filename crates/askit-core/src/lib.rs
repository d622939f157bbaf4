//! # ASKiT Core
//!
//! Runtime-agnostic logic for ASKiT: the conversation data model, the
//! collaborator traits (document store, language model, embedding provider),
//! and the retrieve-then-answer turn graph.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Concrete
//! collaborators (SQLite store, OpenAI / Hugging Face clients) live in the
//! `askit` application crate.
//!
//! ## Turn flow
//!
//! ```text
//!  user text
//!      │
//!      ▼
//! ┌──────────┐ Retrieve ┌───────────┐        ┌──────────┐
//! │  Router  │─────────▶│ Retriever │───────▶│  Answer  │──▶ done
//! └────┬─────┘          └─────┬─────┘        └────┬─────┘
//!      │ End                  │ DocumentStore     │ LanguageModel
//!      ▼                      ▼                   ▼
//!    done                 search(q, k)       complete(prompt)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | `Message`, `ConversationState`, `RetrievedPassage`, `Document`, `Chunk` |
//! | [`error`] | Error taxonomy for stores, models, and turns |
//! | [`store`] | `DocumentStore` trait and the in-memory implementation |
//! | [`llm`] | `LanguageModel` trait |
//! | [`embedding`] | `EmbeddingProvider` trait and vector helpers |
//! | [`chunk`] | Paragraph-boundary chunker used at ingestion |
//! | [`graph`] | Router, retriever, answer stages and the `Orchestrator` |

pub mod chunk;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod llm;
pub mod models;
pub mod store;

pub use error::{ModelError, OrchestratorError, StoreError, TurnError};
pub use graph::{Decision, Orchestrator, OrchestratorConfig};
pub use llm::LanguageModel;
pub use models::{ConversationState, Document, Message, MessageKind, RetrievedPassage};
pub use store::DocumentStore;
