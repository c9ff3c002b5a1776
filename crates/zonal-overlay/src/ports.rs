//! Storage port traits for the overlay engine.
//! Implemented by the surrounding persistence layer — the engine depends
//! only on these traits. A reference in-memory backend lives in
//! [`crate::memory`].

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::OverlayError;
use crate::records::{EvaluationLock, LockKind, SourceGeometryRecord, ZoningRule};
use crate::suggestion::OverlaySuggestion;

pub type Result<T> = std::result::Result<T, OverlayError>;

/// Source geometry imports, by project.
#[async_trait]
pub trait GeometryStore: Send + Sync {
    /// All source geometries belonging to a project, in a stable order.
    async fn list_for_project(&self, project_id: Uuid) -> Result<Vec<SourceGeometryRecord>>;
}

/// Published jurisdictional rules.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Published, review-approved rules whose applicability names this
    /// zone code. The engine caches the result per zone for one run.
    async fn rules_for_zone(&self, zone_code: &str) -> Result<Vec<ZoningRule>>;
}

/// Suggestion rows, keyed by `(project, source geometry, code)`.
#[async_trait]
pub trait SuggestionStore: Send + Sync {
    async fn list_for_geometry(
        &self,
        project_id: Uuid,
        source_geometry_id: Uuid,
    ) -> Result<Vec<OverlaySuggestion>>;

    async fn insert(&self, suggestion: &OverlaySuggestion) -> Result<()>;

    /// Overwrite the row matching the suggestion's
    /// `(project, source geometry, code)` key.
    async fn update(&self, suggestion: &OverlaySuggestion) -> Result<()>;
}

/// Advisory evaluation locks, one record per (source geometry, kind).
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Re-stamp or create the lock record: `is_active = true`, fresh
    /// `acquired_at`, cleared `released_at`. Advisory only — an already
    /// active record is re-stamped, not refused, and both runs proceed.
    /// Returns the stamped record.
    async fn acquire(
        &self,
        source_geometry_id: Uuid,
        kind: LockKind,
    ) -> Result<EvaluationLock>;

    /// Mark the lock released. A missing record is not an error.
    async fn release(&self, source_geometry_id: Uuid, kind: LockKind) -> Result<()>;
}

/// Audit trail sink. Fire-and-forget: the engine logs append failures and
/// moves on.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append_event(
        &self,
        project_id: Uuid,
        event_type: &str,
        baseline_seconds: Option<f64>,
        actual_seconds: Option<f64>,
        context: &Value,
    ) -> Result<()>;
}
