//! The reasoning-engine contract consumed by the research session controller.
//!
//! An engine accepts a prompt and a tool set, reports progress as a stream of
//! [`EngineEvent`]s, and stops at its next safe point once its cancellation
//! token fires.

use std::sync::Arc;

use async_trait::async_trait;
use scout_tools::{ToolRegistry, Workspace};
use scout_types::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Everything an engine needs for one run.
#[derive(Clone)]
pub struct EnginePrompt {
    pub system_prompt: String,
    pub user_prompt: String,
    pub tools: Arc<ToolRegistry>,
    pub workspace: Arc<dyn Workspace>,
}

/// Lifecycle events emitted by an engine, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    AgentStart,
    TurnStart {
        turn: usize,
    },
    MessageEnd {
        text: String,
    },
    ToolExecutionStart {
        call_id: String,
        tool: String,
        arguments: serde_json::Value,
    },
    ToolExecutionEnd {
        call_id: String,
        tool: String,
        result: serde_json::Value,
        is_error: bool,
    },
    /// The turn boundary counted against the session's turn cap.
    TurnEnd {
        turn: usize,
        tool_calls: usize,
    },
    AgentEnd {
        cancelled: bool,
    },
}

/// How an engine run ended, when it ended without an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutcome {
    /// Text of the last assistant message.
    pub final_text: String,
    pub turns: usize,
    /// The engine stopped because its token was cancelled.
    pub cancelled: bool,
}

/// Sending half of an engine's event stream.
///
/// Emitting never blocks; events sent after the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

impl EventSink {
    /// Create a sink and the receiver that consumes it.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: EngineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Engine event dropped: receiver closed");
        }
    }
}

/// A conversation engine that drives tools until it decides it is done.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn run(
        &self,
        prompt: EnginePrompt,
        events: EventSink,
        cancel: CancellationToken,
    ) -> Result<EngineOutcome>;
}
