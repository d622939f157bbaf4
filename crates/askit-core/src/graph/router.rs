//! Router stage: picks the branch a turn takes.
//!
//! The router is pure. It asks its [`RoutePolicy`] for a [`Decision`] and
//! records that decision as a `Route` message so the branch taken is
//! visible in history. A conditional-retrieval policy (skip retrieval for
//! greetings, say) plugs in as another `RoutePolicy` without touching the
//! retriever or answer stages.

use std::fmt;
use std::sync::Arc;

use crate::models::{ConversationState, Message};

/// The router's verdict for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// Search the document store, then answer.
    Retrieve,
    /// Stop the turn without retrieving or answering.
    End,
}

impl Decision {
    /// The label written into the `Route` message.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Retrieve => "retrieve",
            Decision::End => "end",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy deciding whether a turn needs retrieval.
pub trait RoutePolicy: Send + Sync {
    fn decide(&self, state: &ConversationState) -> Decision;
}

/// Always retrieve before answering.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetrieve;

impl RoutePolicy for AlwaysRetrieve {
    fn decide(&self, _state: &ConversationState) -> Decision {
        Decision::Retrieve
    }
}

/// Result of [`Router::route`].
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub decision: Decision,
    /// Exactly one `Route` message carrying `decision`.
    pub new_messages: Vec<Message>,
}

pub struct Router {
    policy: Arc<dyn RoutePolicy>,
}

impl Router {
    pub fn new(policy: Arc<dyn RoutePolicy>) -> Self {
        Self { policy }
    }

    pub fn route(&self, state: &ConversationState) -> RouteOutcome {
        let decision = self.policy.decide(state);
        tracing::debug!(decision = decision.as_str(), "router decided");
        RouteOutcome {
            decision,
            new_messages: vec![Message::route(decision.as_str())],
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(Arc::new(AlwaysRetrieve))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageKind;

    struct NeverRetrieve;

    impl RoutePolicy for NeverRetrieve {
        fn decide(&self, _state: &ConversationState) -> Decision {
            Decision::End
        }
    }

    #[test]
    fn default_router_retrieves() {
        let state = ConversationState::from_history(vec![Message::user("hello")]);
        let outcome = Router::default().route(&state);
        assert_eq!(outcome.decision, Decision::Retrieve);
        assert_eq!(outcome.new_messages, vec![Message::route("retrieve")]);
    }

    #[test]
    fn route_does_not_touch_state() {
        let state = ConversationState::from_history(vec![Message::user("hello")]);
        let before = state.clone();
        let _ = Router::default().route(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn custom_policy_is_recorded() {
        let router = Router::new(Arc::new(NeverRetrieve));
        let outcome = router.route(&ConversationState::new());
        assert_eq!(outcome.decision, Decision::End);
        assert_eq!(outcome.new_messages.len(), 1);
        assert_eq!(outcome.new_messages[0].kind(), MessageKind::Route);
        assert_eq!(outcome.new_messages[0].content(), "end");
    }
}
