//! Session event fan-out.
//!
//! The controller re-emits every engine event, plus its own lifecycle events,
//! through a [`tokio::sync::broadcast`] channel. Subscribers never slow the
//! controller down; a subscriber that falls behind sees `Lagged` and skips.

use std::path::PathBuf;

use scout_agent::EngineEvent;
use serde::{Deserialize, Serialize};

use crate::validation::ReportValidation;

/// Events observable while a research run is in progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    RunStarted {
        run_id: String,
        seed_url: String,
        slug: String,
        report_path: PathBuf,
    },
    Status {
        message: String,
    },
    /// An engine event, passed through unchanged.
    Engine(EngineEvent),
    SourceAdded {
        url: String,
        provenance: Option<String>,
    },
    TurnCapReached {
        max_turns: usize,
    },
    Finalized {
        report_path: PathBuf,
        html_path: PathBuf,
        sources_path: PathBuf,
        validation: ReportValidation,
    },
    RunFailed {
        error: String,
    },
}

/// Event emitter wrapping a broadcast sender.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: tokio::sync::broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all current subscribers.
    ///
    /// If there are no active receivers the event is silently dropped.
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(1024)
    }
}
