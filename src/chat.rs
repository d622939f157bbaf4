//! Terminal chat front-end: `askit chat` and `askit ask`.
//!
//! A [`ChatSession`] owns the conversation state between turns and hands
//! it to the [`Orchestrator`] for each question. Route messages are never
//! printed; retrieved context is printed only with `--show-context`.
//! With `--transcript FILE` the state is loaded from and saved to JSON so a
//! session can be resumed later.

use anyhow::{Context, Result};
use askit_core::{
    ConversationState, Message, Orchestrator, OrchestratorConfig, OrchestratorError,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::llm::create_language_model;
use crate::store::SqliteStore;

pub struct ChatSession {
    orchestrator: Orchestrator,
    state: ConversationState,
    show_context: bool,
}

impl ChatSession {
    pub fn new(orchestrator: Orchestrator, state: ConversationState, show_context: bool) -> Self {
        Self {
            orchestrator,
            state,
            show_context,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Run one turn and return the messages it appended after the user's
    /// question.
    ///
    /// A failed turn keeps whatever it recorded before failing (at least the
    /// question and the route), so the history shows what happened.
    pub async fn ask(&mut self, question: &str) -> Result<Vec<Message>, OrchestratorError> {
        let before = self.state.len();
        let state = std::mem::take(&mut self.state);

        match self.orchestrator.run_turn(state, question).await {
            Ok(state) => {
                self.state = state;
                Ok(self.state.history()[before + 1..].to_vec())
            }
            Err(err) => {
                let (error, partial) = err.into_parts();
                self.state = partial;
                Err(error)
            }
        }
    }

    pub fn render(&self, messages: &[Message]) -> String {
        render_reply(messages, self.show_context)
    }
}

/// Text printed for one turn's new messages.
pub fn render_reply(messages: &[Message], show_context: bool) -> String {
    let mut out = String::new();
    for message in messages {
        match message {
            Message::Context { content, .. } if show_context => {
                out.push_str("--- context ---\n");
                if content.is_empty() {
                    out.push_str("(no matching passages)\n");
                } else {
                    out.push_str(content);
                    out.push('\n');
                }
                out.push_str("---------------\n");
            }
            Message::Assistant { content } => {
                out.push_str(content);
                out.push('\n');
            }
            _ => {}
        }
    }
    out
}

/// Load a transcript, or start a fresh state tagged with the provider when
/// `path` is `None` or does not exist yet.
pub fn load_transcript(path: Option<&Path>, config: &Config) -> Result<ConversationState> {
    let fresh = || ConversationState::new().with_provider(config.provider.as_str());

    let Some(path) = path else {
        return Ok(fresh());
    };
    if !path.exists() {
        return Ok(fresh());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
    let state: ConversationState = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse transcript: {}", path.display()))?;

    if let Some(recorded) = state.provider() {
        if recorded != config.provider.as_str() {
            tracing::warn!(
                recorded,
                active = config.provider.as_str(),
                "transcript was recorded with a different provider"
            );
        }
    }
    tracing::debug!(messages = state.len(), "loaded transcript from {}", path.display());
    Ok(state)
}

pub fn save_transcript(path: &Path, state: &ConversationState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(state)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write transcript: {}", path.display()))?;
    Ok(())
}

/// Wire the configured store and language model into an orchestrator.
pub async fn build_orchestrator(config: &Config) -> Result<(Orchestrator, Arc<SqliteStore>)> {
    let store = Arc::new(SqliteStore::open(config).await?);
    let llm = create_language_model(config)?;
    let orchestrator = Orchestrator::new(
        OrchestratorConfig::new(store.clone(), llm).with_top_k(config.retrieval.top_k),
    );
    Ok((orchestrator, store))
}

/// `askit ask "<question>"`: one turn, answer on stdout.
pub async fn run_ask(
    config: &Config,
    question: &str,
    show_context: bool,
    transcript: Option<PathBuf>,
) -> Result<()> {
    let (orchestrator, store) = build_orchestrator(config).await?;
    let state = load_transcript(transcript.as_deref(), config)?;
    let mut session = ChatSession::new(orchestrator, state, show_context);

    let result = session.ask(question).await;
    if let Some(path) = &transcript {
        save_transcript(path, session.state())?;
    }
    store.close().await;

    let messages = result.context("Failed to answer question")?;
    print!("{}", session.render(&messages));
    Ok(())
}

/// `askit chat`: read questions from stdin until EOF or `exit`.
pub async fn run_chat(config: &Config, show_context: bool, transcript: Option<PathBuf>) -> Result<()> {
    let (orchestrator, store) = build_orchestrator(config).await?;
    let state = load_transcript(transcript.as_deref(), config)?;
    let mut session = ChatSession::new(orchestrator, state, show_context);

    println!(
        "Ask a question about your documents ({} / {}). Type 'exit' to quit.",
        config.provider,
        store.collection()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question, "exit" | "quit" | "/exit" | "/quit") {
            break;
        }

        match session.ask(question).await {
            Ok(messages) => print!("{}", session.render(&messages)),
            Err(e) => eprintln!("error: {}", error_chain(&e)),
        }

        if let Some(path) = &transcript {
            save_transcript(path, session.state())?;
        }
    }

    store.close().await;
    Ok(())
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
