//! Core data models used throughout ASKiT.
//!
//! A conversation is an append-only sequence of [`Message`]s plus an open
//! metadata map. Retrieval produces transient [`RetrievedPassage`]s, and
//! ingestion hands [`Document`]s to the store, which splits them into
//! [`Chunk`]s.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::OrchestratorError;

/// Metadata key holding the selected model-provider identifier.
pub const META_PROVIDER: &str = "provider";

/// One unit of conversation history.
///
/// `Context` and `Route` are pseudo-turns: `Context` carries retrieved
/// passages so later stages can find them by scanning history, and `Route`
/// records the branch the router took. Neither is shown to the user as a
/// chat bubble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User {
        content: String,
    },
    Assistant {
        content: String,
    },
    Context {
        content: String,
        source_name: String,
        correlation_id: String,
    },
    Route {
        content: String,
    },
}

/// Discriminant of [`Message`], used for history lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    User,
    Assistant,
    Context,
    Route,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Assistant => "assistant",
            MessageKind::Context => "context",
            MessageKind::Route => "route",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    pub fn context(
        content: impl Into<String>,
        source_name: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Message::Context {
            content: content.into(),
            source_name: source_name.into(),
            correlation_id: correlation_id.into(),
        }
    }

    pub fn route(content: impl Into<String>) -> Self {
        Message::Route {
            content: content.into(),
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::User { .. } => MessageKind::User,
            Message::Assistant { .. } => MessageKind::Assistant,
            Message::Context { .. } => MessageKind::Context,
            Message::Route { .. } => MessageKind::Route,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::User { content }
            | Message::Assistant { content }
            | Message::Context { content, .. }
            | Message::Route { content } => content,
        }
    }

    /// Whether a chat front-end should ever render this message.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Message::Route { .. })
    }
}

/// Return the most recent message of `kind`, scanning from the end.
pub fn find_latest(history: &[Message], kind: MessageKind) -> Option<&Message> {
    history.iter().rev().find(|m| m.kind() == kind)
}

/// The mutable record of one conversation.
///
/// History is append-only: the only mutators are [`push`](Self::push) and
/// [`extend`](Self::extend). Metadata is an open string-keyed map so new
/// routing hints can be added without a schema change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    history: Vec<Message>,
    #[serde(default)]
    meta: Map<String, Value>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a conversation from previously recorded history.
    pub fn from_history(history: Vec<Message>) -> Self {
        Self {
            history,
            meta: Map::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn with_provider(self, provider: &str) -> Self {
        self.with_meta(META_PROVIDER, provider)
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }

    pub fn provider(&self) -> Option<&str> {
        self.meta.get(META_PROVIDER).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.history.extend(messages);
    }

    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn find_latest(&self, kind: MessageKind) -> Option<&Message> {
        find_latest(&self.history, kind)
    }

    /// Like [`find_latest`](Self::find_latest), but absence is an invariant
    /// violation reported as [`OrchestratorError::NotFound`].
    pub fn require_latest(&self, kind: MessageKind) -> Result<&Message, OrchestratorError> {
        self.find_latest(kind)
            .ok_or(OrchestratorError::NotFound { kind })
    }

    /// Messages a chat front-end should render (route signals excluded).
    pub fn visible(&self) -> impl Iterator<Item = &Message> {
        self.history.iter().filter(|m| m.is_visible())
    }
}

/// A passage returned by [`DocumentStore::search`](crate::store::DocumentStore::search).
///
/// `score` follows the store's convention: larger means more similar, with
/// no fixed range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub title: String,
    pub score: f64,
}

/// A source document at ingestion time: extracted text plus the source
/// filename as its title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub title: String,
}

impl Document {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}

/// A chunk of a document's text, as stored in the index.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Message> {
        vec![
            Message::user("first question"),
            Message::route("retrieve"),
            Message::context("ctx one", "stored_documents_retrieved", "id-1"),
            Message::assistant("first answer"),
            Message::user("second question"),
            Message::route("retrieve"),
            Message::context("ctx two", "stored_documents_retrieved", "id-2"),
        ]
    }

    #[test]
    fn find_latest_scans_backwards() {
        let h = history();
        assert_eq!(
            find_latest(&h, MessageKind::User).map(Message::content),
            Some("second question")
        );
        assert_eq!(
            find_latest(&h, MessageKind::Context).map(Message::content),
            Some("ctx two")
        );
        assert_eq!(
            find_latest(&h, MessageKind::Assistant).map(Message::content),
            Some("first answer")
        );
    }

    #[test]
    fn find_latest_absent_is_none() {
        let h = vec![Message::user("hi")];
        assert!(find_latest(&h, MessageKind::Context).is_none());
        assert!(find_latest(&[], MessageKind::User).is_none());
    }

    #[test]
    fn require_latest_reports_kind() {
        let state = ConversationState::from_history(vec![Message::user("hi")]);
        let err = state.require_latest(MessageKind::Context).unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::NotFound {
                kind: MessageKind::Context
            }
        ));
    }

    #[test]
    fn route_messages_are_hidden() {
        let state = ConversationState::from_history(history());
        assert!(state.visible().all(|m| m.kind() != MessageKind::Route));
        assert_eq!(state.visible().count(), 5);
    }

    #[test]
    fn provider_lives_in_meta() {
        let state = ConversationState::new().with_provider("openai");
        assert_eq!(state.provider(), Some("openai"));
        assert_eq!(state.meta().len(), 1);
    }

    #[test]
    fn state_serializes_with_role_tags() {
        let state = ConversationState::from_history(vec![
            Message::user("q"),
            Message::context("c", "stored_documents_retrieved", "abc"),
        ])
        .with_provider("huggingface");
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["history"][0]["role"], "user");
        assert_eq!(json["history"][1]["role"], "context");
        assert_eq!(json["history"][1]["correlation_id"], "abc");
        assert_eq!(json["meta"]["provider"], "huggingface");

        let back: ConversationState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
