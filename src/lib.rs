//! # ASKiT
//!
//! Ask questions about your PDF documents. ASKiT ingests PDFs into a local
//! SQLite index, retrieves the passages most relevant to a question, and
//! asks a language model to answer from those passages only.
//!
//! The turn logic (router, retriever, answer stage) lives in
//! [`askit_core`]; this crate supplies the concrete collaborators and the
//! `askit` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────┐
//! │ PDF upload │──▶│ Extract +    │──▶│  SQLite   │
//! │ directory  │   │ chunk+embed  │   │ FTS5+Vec  │
//! └────────────┘   └──────────────┘   └─────┬─────┘
//!                                           │ search(q, k)
//!                  ┌──────────────┐   ┌─────▼─────┐
//!    question ────▶│ Orchestrator │◀──│ Retriever │
//!                  └──────┬───────┘   └───────────┘
//!                         │ complete(prompt)
//!                  ┌──────▼───────┐
//!                  │ OpenAI / HF  │
//!                  └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! askit init                        # create database
//! askit upload ~/Downloads/*.pdf    # copy PDFs into the upload directory
//! askit ingest                      # extract, chunk, embed, index
//! askit ask "What is the refund window?"
//! askit chat --show-context
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and provider selection |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`store`] | SQLite `DocumentStore` |
//! | [`embedding`] | OpenAI, Ollama and local embedding providers |
//! | [`llm`] | OpenAI and Hugging Face chat clients |
//! | [`extract`] | PDF text extraction |
//! | [`ingest`] | Upload and ingestion pipeline |
//! | [`docs`] | Indexed document listing |
//! | [`chat`] | Chat and single-question front-ends |
//! | [`logging`] | Tracing subscriber setup |

pub mod chat;
pub mod config;
pub mod db;
pub mod docs;
pub mod embedding;
pub mod extract;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod store;
