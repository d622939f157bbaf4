//! The turn graph.
//!
//! Three nodes wired with one conditional edge:
//!
//! ```text
//! Start ─▶ Router ─┬─ Retrieve ─▶ Retriever ─▶ Answer ─▶ End
//!                  └─ End ──────────────────────────────▶ End
//! ```
//!
//! Each node reads the state, returns the messages it wants appended, and
//! the [`Orchestrator`] appends them before following the next edge. No
//! node runs twice in a turn, so a run executes at most three nodes.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use askit_core::{ConversationState, Orchestrator, OrchestratorConfig};
//! # async fn demo(
//! #     store: Arc<dyn askit_core::DocumentStore>,
//! #     llm: Arc<dyn askit_core::LanguageModel>,
//! # ) -> Result<(), askit_core::TurnError> {
//! let orchestrator = Orchestrator::new(OrchestratorConfig::new(store, llm));
//! let state = orchestrator
//!     .run_turn(ConversationState::new(), "What is the refund window?")
//!     .await?;
//! println!("{}", state.last().map(|m| m.content()).unwrap_or_default());
//! # Ok(())
//! # }
//! ```

pub mod answer;
pub mod retrieve;
pub mod router;

use std::fmt;
use std::sync::Arc;

use crate::error::{OrchestratorError, TurnError};
use crate::llm::LanguageModel;
use crate::models::{ConversationState, Message};
use crate::store::DocumentStore;

pub use answer::{build_prompt, Answerer, ANSWER_INSTRUCTION};
pub use retrieve::{format_passages, Retriever, CONTEXT_SOURCE_NAME, UNTITLED};
pub use router::{AlwaysRetrieve, Decision, RouteOutcome, RoutePolicy, Router};

/// Passages requested per retrieval unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 3;

/// Messages a stage wants appended to history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageOutput {
    pub new_messages: Vec<Message>,
}

/// Graph nodes, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    Router,
    Retrieve,
    Answer,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::Router => "router",
            NodeId::Retrieve => "retrieve",
            NodeId::Answer => "answer",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The graph's edges. `decision` only matters when leaving the router;
/// `None` means the turn is over.
pub fn next_node(from: NodeId, decision: Decision) -> Option<NodeId> {
    match (from, decision) {
        (NodeId::Router, Decision::Retrieve) => Some(NodeId::Retrieve),
        (NodeId::Router, Decision::End) => None,
        (NodeId::Retrieve, _) => Some(NodeId::Answer),
        (NodeId::Answer, _) => None,
    }
}

/// Everything an [`Orchestrator`] is built from.
///
/// There are no process-wide defaults: two orchestrators with different
/// stores or models can live side by side.
#[derive(Clone)]
pub struct OrchestratorConfig {
    pub store: Arc<dyn DocumentStore>,
    pub llm: Arc<dyn LanguageModel>,
    pub policy: Arc<dyn RoutePolicy>,
    pub top_k: usize,
}

impl OrchestratorConfig {
    pub fn new(store: Arc<dyn DocumentStore>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            store,
            llm,
            policy: Arc::new(AlwaysRetrieve),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn RoutePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Which nodes a completed run visited and what the router decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTrace {
    pub decision: Decision,
    pub visited: Vec<NodeId>,
}

/// Runs the turn graph. Holds no conversation state between calls.
pub struct Orchestrator {
    router: Router,
    retriever: Retriever,
    answerer: Answerer,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self {
            router: Router::new(config.policy),
            retriever: Retriever::new(config.store, config.top_k),
            answerer: Answerer::new(config.llm),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn answerer(&self) -> &Answerer {
        &self.answerer
    }

    /// Append `user_text` as a user message and run one turn.
    ///
    /// On failure the returned [`TurnError`] carries the state as it stood
    /// when the failing node aborted, so callers can show what was recorded.
    pub async fn run_turn(
        &self,
        mut state: ConversationState,
        user_text: &str,
    ) -> Result<ConversationState, TurnError> {
        state.push(Message::user(user_text));
        match self.run(&mut state).await {
            Ok(trace) => {
                tracing::info!(
                    decision = trace.decision.as_str(),
                    nodes = trace.visited.len(),
                    history = state.len(),
                    "turn complete"
                );
                Ok(state)
            }
            Err(error) => {
                let cause = std::error::Error::source(&error)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                tracing::warn!(
                    error = %error,
                    cause = %cause,
                    history = state.len(),
                    "turn aborted"
                );
                Err(TurnError {
                    error,
                    partial: state,
                })
            }
        }
    }

    /// Run the graph over `state`, whose newest entry should be the user
    /// message for this turn. Messages are appended as each node finishes.
    pub async fn run(&self, state: &mut ConversationState) -> Result<RunTrace, OrchestratorError> {
        let mut visited = Vec::with_capacity(3);
        let mut decision = Decision::Retrieve;
        let mut current = Some(NodeId::Router);

        while let Some(node) = current {
            tracing::debug!(node = node.as_str(), step = visited.len(), "executing node");
            visited.push(node);

            let output = match node {
                NodeId::Router => {
                    let outcome = self.router.route(state);
                    decision = outcome.decision;
                    StageOutput {
                        new_messages: outcome.new_messages,
                    }
                }
                NodeId::Retrieve => self.retriever.retrieve(state).await?,
                NodeId::Answer => self.answerer.answer(state).await?,
            };
            state.extend(output.new_messages);
            current = next_node(node, decision);
        }

        Ok(RunTrace { decision, visited })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges() {
        assert_eq!(
            next_node(NodeId::Router, Decision::Retrieve),
            Some(NodeId::Retrieve)
        );
        assert_eq!(next_node(NodeId::Router, Decision::End), None);
        assert_eq!(
            next_node(NodeId::Retrieve, Decision::Retrieve),
            Some(NodeId::Answer)
        );
        assert_eq!(next_node(NodeId::Answer, Decision::Retrieve), None);
    }

    #[test]
    fn every_path_terminates_within_three_nodes() {
        for decision in [Decision::Retrieve, Decision::End] {
            let mut node = Some(NodeId::Router);
            let mut steps = 0;
            while let Some(n) = node {
                steps += 1;
                node = next_node(n, decision);
            }
            assert!(steps <= 3);
        }
    }
}
