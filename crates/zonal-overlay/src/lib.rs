//! Feasibility overlay orchestration.
//!
//! For each source geometry in a project the engine acquires an advisory
//! evaluation lock, rebuilds the graph from its persisted export, derives
//! site metrics, matches the published zoning rules for the resolved zone
//! code, runs heuristic and rule-threshold checks, and reconciles the
//! resulting suggestion set against previously stored suggestions —
//! updating matching codes in place and inserting new ones, never
//! deleting. The lock is released on every exit path.
//!
//! Persistence is out of scope: the engine depends only on the port
//! traits in [`ports`], with an in-memory reference backend in [`memory`].

mod engine;
mod error;
mod heuristics;
pub mod memory;
mod ports;
mod records;
mod suggestion;
mod thresholds;

pub use engine::{EngineConfig, OverlayEngine, RunOutcome, ENGINE_VERSION};
pub use error::OverlayError;
pub use heuristics::heuristic_suggestions;
pub use ports::{AuditSink, GeometryStore, LockStore, Result, RuleStore, SuggestionStore};
pub use records::{EvaluationLock, LockKind, SourceGeometryRecord, ZoningRule};
pub use suggestion::{OverlaySuggestion, Severity, SuggestionDraft, SuggestionStatus};
pub use thresholds::{metric_for_parameter, threshold_suggestions};
