//! # ASKiT CLI (`askit`)
//!
//! ## Usage
//!
//! ```bash
//! askit --config ./config/askit.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `askit init` | Create the SQLite database and run schema migrations |
//! | `askit upload FILE...` | Copy PDFs into the upload directory |
//! | `askit ingest [DIR]` | Extract, chunk, embed and index every PDF in the upload directory |
//! | `askit docs` | List indexed documents of the active collection |
//! | `askit ask "<question>"` | Answer one question |
//! | `askit chat` | Interactive question loop |
//!
//! The provider (`openai` or `huggingface`) comes from the config file and
//! can be overridden with the `USE_PROVIDER` environment variable. API
//! tokens are read from the environment or a `.env` file.

use askit::{chat, config, docs, ingest, logging, migrate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ASKiT: ask questions about your PDF documents.
#[derive(Parser)]
#[command(
    name = "askit",
    about = "ASKiT: ask questions about your PDF documents",
    version,
    long_about = "ASKiT ingests PDF files into a local SQLite index, retrieves the passages \
    most relevant to each question, and asks a language model (OpenAI or a Hugging Face \
    inference endpoint) to answer strictly from that context."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/askit.toml")]
    config: PathBuf,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all tables. Idempotent.
    Init,

    /// Copy PDF files into the upload directory.
    Upload {
        /// PDF files to copy. Other files are skipped.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Ingest the upload directory after copying.
        #[arg(long)]
        ingest: bool,
    },

    /// Ingest every PDF in the upload directory.
    ///
    /// Files with no extractable text, or that fail to parse, are reported
    /// and skipped. Re-ingesting a file replaces its previous version.
    Ingest {
        /// Directory to ingest instead of `[ingest].upload_dir`.
        dir: Option<PathBuf>,
    },

    /// List indexed documents and their chunk counts.
    Docs,

    /// Answer a single question.
    Ask {
        question: String,

        /// Also print the retrieved context.
        #[arg(long)]
        show_context: bool,

        /// Load and save the conversation from/to this JSON file.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },

    /// Start an interactive chat.
    Chat {
        /// Also print the retrieved context for each answer.
        #[arg(long)]
        show_context: bool,

        /// Load and save the conversation from/to this JSON file.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    logging::init(cli.verbose)?;

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload { files, ingest } => {
            ingest::run_upload(&cfg, &files, ingest).await?;
        }
        Commands::Ingest { dir } => {
            ingest::run_ingest(&cfg, dir).await?;
        }
        Commands::Docs => {
            docs::run_docs(&cfg).await?;
        }
        Commands::Ask {
            question,
            show_context,
            transcript,
        } => {
            chat::run_ask(&cfg, &question, show_context, transcript).await?;
        }
        Commands::Chat {
            show_context,
            transcript,
        } => {
            chat::run_chat(&cfg, show_context, transcript).await?;
        }
    }

    Ok(())
}
