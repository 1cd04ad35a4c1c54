//! Turn-bounded research sessions for Scout.
//!
//! A [`ResearchController`] turns a seed document URL into a report, a
//! rendered HTML copy and a `sources.json` provenance record, then checks the
//! report against the [`ReportTemplate`] with [`validate_report`].

pub mod config;
pub mod controller;
pub mod events;
pub mod harvest;
pub mod prompt;
pub mod render;
pub mod slug;
pub mod sources;
pub mod validation;

pub use config::{ReportTemplate, ResearchConfig};
pub use controller::{ResearchController, RunResult, RunState};
pub use events::{EventEmitter, SessionEvent};
pub use harvest::{parse_tool_payload, ToolPayload};
pub use render::render_html;
pub use slug::{derive_slug, parse_seed_url};
pub use sources::{SourceObservation, SourceTable, SourcesRecord};
pub use validation::{validate_report, ReportValidation};
