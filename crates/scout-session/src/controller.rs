//! The research session controller.
//!
//! One controller runs at most one research session at a time. A run drives
//! the reasoning engine with a single prompt, consumes its events in order,
//! harvests source provenance from tool results, enforces the turn cap, and
//! finalizes the report the engine wrote.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use scout_agent::{EngineEvent, EnginePrompt, EventSink, ReasoningEngine};
use scout_tools::{LocalWorkspace, ToolRegistry, Workspace};
use scout_types::{Result, ScoutError, SourceReference};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::config::ResearchConfig;
use crate::events::{EventEmitter, SessionEvent};
use crate::harvest::parse_tool_payload;
use crate::prompt::{initial_user_prompt, research_system_prompt};
use crate::render::render_html;
use crate::slug::{derive_slug, parse_seed_url};
use crate::sources::{MergeOutcome, SourceObservation, SourceTable, SourcesRecord, SEED_PROVENANCE};
use crate::validation::{validate_report, ReportValidation};

pub const REPORT_FILE: &str = "report.md";
pub const HTML_FILE: &str = "report.html";
pub const SOURCES_FILE: &str = "sources.json";

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Mutable state of one run. Lives only inside a single `run()` call.
#[derive(Debug)]
pub struct RunState {
    pub turn_count: usize,
    pub turn_cap_exceeded: bool,
    pub sources: SourceTable,
    max_turns: usize,
}

impl RunState {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turn_count: 0,
            turn_cap_exceeded: false,
            sources: SourceTable::new(),
            max_turns,
        }
    }

    /// Count a turn boundary.
    ///
    /// Returns `true` only on the boundary that first reaches the cap, so the
    /// caller cancels the engine exactly once.
    pub fn on_turn_end(&mut self) -> bool {
        self.turn_count += 1;
        if !self.turn_cap_exceeded && self.turn_count >= self.max_turns {
            self.turn_cap_exceeded = true;
            return true;
        }
        false
    }
}

/// Artifacts and diagnostics of a finalized run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: String,
    pub seed_url: String,
    pub slug: String,
    pub report_path: PathBuf,
    pub html_path: PathBuf,
    pub sources_path: PathBuf,
    pub validation: ReportValidation,
    pub sources: Vec<SourceReference>,
    pub turns: usize,
}

// ---------------------------------------------------------------------------
// ResearchController
// ---------------------------------------------------------------------------

/// Drives research runs against a [`ReasoningEngine`].
pub struct ResearchController {
    engine: Arc<dyn ReasoningEngine>,
    tools: Arc<ToolRegistry>,
    workspace: Arc<dyn Workspace>,
    config: ResearchConfig,
    emitter: EventEmitter,
    active: Mutex<Option<CancellationToken>>,
}

/// Clears the controller's active-run slot when dropped.
struct ActiveRun<'a> {
    slot: &'a Mutex<Option<CancellationToken>>,
}

impl Drop for ActiveRun<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}

/// Paths of one run, relative to the workspace root.
struct RunPaths {
    dir: PathBuf,
    report: PathBuf,
    html: PathBuf,
    sources: PathBuf,
}

impl RunPaths {
    fn new(reports_dir: &Path, slug: &str) -> Self {
        let dir = reports_dir.join(slug);
        Self {
            report: dir.join(REPORT_FILE),
            html: dir.join(HTML_FILE),
            sources: dir.join(SOURCES_FILE),
            dir,
        }
    }
}

impl ResearchController {
    /// Create a controller whose workspace is a [`LocalWorkspace`] rooted at
    /// `config.workdir`.
    pub fn new(
        engine: Arc<dyn ReasoningEngine>,
        tools: ToolRegistry,
        config: ResearchConfig,
    ) -> Result<Self> {
        let workspace = LocalWorkspace::new(config.workdir.clone())?;
        Ok(Self::with_workspace(engine, tools, Arc::new(workspace), config))
    }

    pub fn with_workspace(
        engine: Arc<dyn ReasoningEngine>,
        tools: ToolRegistry,
        workspace: Arc<dyn Workspace>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            engine,
            tools: Arc::new(tools),
            workspace,
            config,
            emitter: EventEmitter::default(),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    pub fn events(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.emitter.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Ask the running engine to stop at its next safe point.
    ///
    /// A no-op when no run is active.
    pub fn abort(&self) {
        if let Some(token) = self.lock_active().as_ref() {
            tracing::info!("Abort requested");
            token.cancel();
        }
    }

    /// Run one research session for `seed_url`.
    ///
    /// Fails immediately with [`ScoutError::RunInProgress`] if another run is
    /// active, or [`ScoutError::InvalidSeedUrl`] if the URL is unusable.
    pub async fn run(&self, seed_url: &str) -> Result<RunResult> {
        let seed = parse_seed_url(seed_url)?;
        let cancel = CancellationToken::new();
        let _active = self.begin_run(cancel.clone())?;

        let result = self.execute(&seed, &cancel).await;
        if let Err(e) = &result {
            tracing::error!(seed_url = %seed, error = %e, "Research run failed");
            self.emitter.emit(SessionEvent::RunFailed {
                error: e.to_string(),
            });
        }
        result
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin_run(&self, cancel: CancellationToken) -> Result<ActiveRun<'_>> {
        let mut slot = self.lock_active();
        if slot.is_some() {
            return Err(ScoutError::RunInProgress);
        }
        *slot = Some(cancel);
        Ok(ActiveRun { slot: &self.active })
    }

    async fn execute(&self, seed: &Url, cancel: &CancellationToken) -> Result<RunResult> {
        let run_id = Uuid::new_v4().to_string();
        let slug = derive_slug(seed, self.config.slug_max_len);
        let paths = RunPaths::new(&self.config.reports_dir, &slug);
        self.workspace.create_dir_all(&paths.dir).await?;

        let mut state = RunState::new(self.config.max_turns);
        state.sources.merge(
            SourceObservation::new(seed.as_str()).provenance(SEED_PROVENANCE),
            Utc::now(),
        );

        tracing::info!(run_id = %run_id, seed_url = %seed, slug = %slug, "Research run started");
        self.emitter.emit(SessionEvent::RunStarted {
            run_id: run_id.clone(),
            seed_url: seed.to_string(),
            slug: slug.clone(),
            report_path: self.workspace.resolve(&paths.report)?,
        });
        self.emitter.emit(SessionEvent::Status {
            message: format!("Researching {}", seed),
        });

        let prompt = EnginePrompt {
            system_prompt: research_system_prompt(
                &self.config.template,
                &paths.report,
                &self.tools.definitions(),
            ),
            user_prompt: initial_user_prompt(seed.as_str(), &paths.report),
            tools: self.tools.clone(),
            workspace: self.workspace.clone(),
        };

        let (sink, mut rx) = EventSink::channel();
        let engine_result = {
            let mut engine_run = std::pin::pin!(self.engine.run(prompt, sink, cancel.clone()));
            // Armed once the turn cap fires; bounds how long a cancelled engine may linger.
            let mut cap_grace = std::pin::pin!(tokio::time::sleep(self.config.cap_grace_period));
            let mut grace_armed = false;
            loop {
                tokio::select! {
                    biased;
                    Some(event) = rx.recv() => {
                        self.handle_event(&mut state, event, cancel);
                        if state.turn_cap_exceeded && !grace_armed {
                            grace_armed = true;
                            cap_grace
                                .as_mut()
                                .reset(Instant::now() + self.config.cap_grace_period);
                        }
                    }
                    result = &mut engine_run => break result,
                    () = &mut cap_grace, if grace_armed => {
                        tracing::warn!(
                            grace_ms = self.config.cap_grace_period.as_millis() as u64,
                            "Engine still running after turn cap grace period, abandoning it"
                        );
                        break Err(ScoutError::TurnCapExceeded {
                            max_turns: self.config.max_turns,
                        });
                    }
                }
            }
        };
        while let Ok(event) = rx.try_recv() {
            self.handle_event(&mut state, event, cancel);
        }

        if state.turn_cap_exceeded {
            return Err(ScoutError::TurnCapExceeded {
                max_turns: self.config.max_turns,
            });
        }
        let outcome = engine_result?;
        if outcome.cancelled || cancel.is_cancelled() {
            return Err(ScoutError::Cancelled);
        }

        self.finalize(run_id, seed, slug, &paths, &state).await
    }

    /// Process one engine event, then re-emit it and anything it caused.
    fn handle_event(&self, state: &mut RunState, event: EngineEvent, cancel: &CancellationToken) {
        let mut derived = Vec::new();

        match &event {
            EngineEvent::TurnEnd { turn, .. } => {
                if state.on_turn_end() {
                    tracing::warn!(
                        turn,
                        max_turns = self.config.max_turns,
                        "Turn cap reached, cancelling engine"
                    );
                    cancel.cancel();
                    derived.push(SessionEvent::TurnCapReached {
                        max_turns: self.config.max_turns,
                    });
                }
            }
            EngineEvent::ToolExecutionEnd {
                tool,
                result,
                is_error: false,
                ..
            } => {
                if let Some(payload) = parse_tool_payload(tool, result) {
                    let now = Utc::now();
                    for observation in payload.observations() {
                        let url = observation.url.clone();
                        if state.sources.merge(observation, now) != MergeOutcome::Added {
                            continue;
                        }
                        if let Some(added) = state.sources.get(&url) {
                            tracing::debug!(url = %added.url, tool = %tool, "Source added");
                            derived.push(SessionEvent::SourceAdded {
                                url: added.url.clone(),
                                provenance: added.provenance.clone(),
                            });
                        }
                    }
                }
            }
            _ => {}
        }

        self.emitter.emit(SessionEvent::Engine(event));
        for event in derived {
            self.emitter.emit(event);
        }
    }

    async fn finalize(
        &self,
        run_id: String,
        seed: &Url,
        slug: String,
        paths: &RunPaths,
        state: &RunState,
    ) -> Result<RunResult> {
        let report_path = self.workspace.resolve(&paths.report)?;
        if !self.workspace.file_exists(&paths.report).await? {
            return Err(ScoutError::ArtifactMissing {
                path: report_path.display().to_string(),
            });
        }
        let markdown = self.workspace.read_file(&paths.report).await?;

        self.workspace
            .write_file(&paths.html, &render_html(&markdown, &slug))
            .await?;
        SourcesRecord::new(seed.as_str(), &state.sources)
            .save(self.workspace.as_ref(), &paths.sources)
            .await?;

        let validation = validate_report(&markdown, &self.config.template);
        let html_path = self.workspace.resolve(&paths.html)?;
        let sources_path = self.workspace.resolve(&paths.sources)?;

        tracing::info!(
            slug = %slug,
            turns = state.turn_count,
            sources = state.sources.len(),
            complete = validation.is_complete,
            "Research run finalized"
        );
        self.emitter.emit(SessionEvent::Finalized {
            report_path: report_path.clone(),
            html_path: html_path.clone(),
            sources_path: sources_path.clone(),
            validation: validation.clone(),
        });

        Ok(RunResult {
            run_id,
            seed_url: seed.to_string(),
            slug,
            report_path,
            html_path,
            sources_path,
            validation,
            sources: state.sources.to_vec(),
            turns: state.turn_count,
        })
    }
}
