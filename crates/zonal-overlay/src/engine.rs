//! The overlay orchestrator.
//!
//! Per source geometry, one run invocation walks:
//! lock-acquire → graph import + fingerprint → metrics → zone resolve →
//! rule load (cached per zone for the run) → heuristic + threshold
//! checks → suggestion reconciliation → lock-release.
//!
//! Geometries are processed sequentially within a run; concurrency only
//! arises across run invocations, guarded by the advisory evaluation
//! lock. The lock is released on every exit path — an evaluation error
//! still releases before propagating, and takes precedence over any
//! release error.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use zonal_geometry::{build_metrics, GeometryGraph};

use crate::heuristics::heuristic_suggestions;
use crate::ports::{AuditSink, GeometryStore, LockStore, Result, RuleStore, SuggestionStore};
use crate::records::{LockKind, SourceGeometryRecord, ZoningRule};
use crate::suggestion::{OverlaySuggestion, SuggestionDraft};
use crate::thresholds::threshold_suggestions;

/// Stamped onto every suggestion this engine writes.
pub const ENGINE_VERSION: &str = concat!("zonal-overlay/", env!("CARGO_PKG_VERSION"));

/// Audit event type recorded once per run.
const RUN_EVENT_TYPE: &str = "overlay_evaluation";

/// Tunable evaluation thresholds. The defaults are the jurisdictional
/// review triggers the engine ships with.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Declared height at or above which a tall-building review fires.
    pub tall_building_height_m: f64,
    /// Site area above which a large-site planning review fires.
    pub large_site_area_m2: f64,
    /// Unit area at or above which a unit summary is medium severity.
    pub large_unit_area_m2: f64,
    /// Float noise absorbed by rule-threshold comparisons.
    pub threshold_tolerance: f64,
    /// Expected evaluation seconds per geometry, recorded as the audit
    /// baseline.
    pub baseline_seconds_per_geometry: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tall_building_height_m: 45.0,
            large_site_area_m2: 10_000.0,
            large_unit_area_m2: 120.0,
            threshold_tolerance: 1e-6,
            baseline_seconds_per_geometry: 5.0,
        }
    }
}

/// What one run invocation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub project_id: Uuid,
    /// Source geometries processed.
    pub evaluated: usize,
    /// Suggestions inserted this run.
    pub created: usize,
    /// Suggestions updated in place this run.
    pub updated: usize,
}

/// The overlay evaluation engine.
pub struct OverlayEngine {
    geometries: Arc<dyn GeometryStore>,
    rules: Arc<dyn RuleStore>,
    suggestions: Arc<dyn SuggestionStore>,
    locks: Arc<dyn LockStore>,
    audit: Arc<dyn AuditSink>,
    config: EngineConfig,
}

impl OverlayEngine {
    pub fn new(
        geometries: Arc<dyn GeometryStore>,
        rules: Arc<dyn RuleStore>,
        suggestions: Arc<dyn SuggestionStore>,
        locks: Arc<dyn LockStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::with_config(
            geometries,
            rules,
            suggestions,
            locks,
            audit,
            EngineConfig::default(),
        )
    }

    pub fn with_config(
        geometries: Arc<dyn GeometryStore>,
        rules: Arc<dyn RuleStore>,
        suggestions: Arc<dyn SuggestionStore>,
        locks: Arc<dyn LockStore>,
        audit: Arc<dyn AuditSink>,
        config: EngineConfig,
    ) -> Self {
        Self {
            geometries,
            rules,
            suggestions,
            locks,
            audit,
            config,
        }
    }

    /// Evaluate every source geometry belonging to a project and
    /// reconcile the resulting suggestion sets.
    pub async fn run_project(&self, project_id: Uuid) -> Result<RunOutcome> {
        let started = Instant::now();
        let records = self.geometries.list_for_project(project_id).await?;
        // Rule cache is scoped to this run on purpose: rules may change
        // between runs, so nothing is shared across invocations.
        let mut rule_cache: HashMap<String, Vec<ZoningRule>> = HashMap::new();

        let mut outcome = RunOutcome {
            project_id,
            evaluated: 0,
            created: 0,
            updated: 0,
        };

        for record in &records {
            let lock = self
                .locks
                .acquire(record.id, LockKind::OverlayEvaluation)
                .await?;
            debug!(
                geometry = %record.id,
                acquired_at = %lock.acquired_at,
                "evaluation lock acquired"
            );

            let result = self.evaluate_geometry(record, &mut rule_cache).await;
            let release = self
                .locks
                .release(record.id, LockKind::OverlayEvaluation)
                .await;

            // The evaluation error is the one the caller needs; a release
            // failure only surfaces when evaluation itself succeeded.
            let (created, updated) = result?;
            release?;

            outcome.evaluated += 1;
            outcome.created += created;
            outcome.updated += updated;
        }

        let actual_seconds = started.elapsed().as_secs_f64();
        let baseline_seconds =
            outcome.evaluated as f64 * self.config.baseline_seconds_per_geometry;
        let context = json!({
            "evaluated": outcome.evaluated,
            "created": outcome.created,
            "updated": outcome.updated,
            "engine_version": ENGINE_VERSION,
        });
        if let Err(err) = self
            .audit
            .append_event(
                project_id,
                RUN_EVENT_TYPE,
                Some(baseline_seconds),
                Some(actual_seconds),
                &context,
            )
            .await
        {
            warn!(error = %err, "audit event append failed");
        }

        info!(
            project = %project_id,
            evaluated = outcome.evaluated,
            created = outcome.created,
            updated = outcome.updated,
            "overlay evaluation run complete"
        );
        Ok(outcome)
    }

    /// Evaluate one source geometry and reconcile its suggestions.
    /// Returns `(created, updated)`.
    async fn evaluate_geometry(
        &self,
        record: &SourceGeometryRecord,
        rule_cache: &mut HashMap<String, Vec<ZoningRule>>,
    ) -> Result<(usize, usize)> {
        let graph = GeometryGraph::from_export(&record.payload)?;
        let checksum = graph.fingerprint();
        let metrics = build_metrics(&graph, &record.import_metadata);

        let mut drafts = heuristic_suggestions(&graph, &metrics, &self.config);

        if let Some(zone) = record.zone_code.as_deref() {
            if !rule_cache.contains_key(zone) {
                let fetched = self.rules.rules_for_zone(zone).await?;
                debug!(zone, count = fetched.len(), "cached zoning rules");
                rule_cache.insert(zone.to_string(), fetched);
            }
            let rules = rule_cache.get(zone).map(Vec::as_slice).unwrap_or(&[]);
            drafts.extend(threshold_suggestions(
                rules,
                &metrics,
                zone,
                self.config.threshold_tolerance,
            ));
        } else {
            debug!(geometry = %record.id, "no zone code resolved; skipping rule thresholds");
        }

        let existing = self
            .suggestions
            .list_for_geometry(record.project_id, record.id)
            .await?;
        self.reconcile(record, &checksum, drafts, existing).await
    }

    /// Upsert the drafted suggestions against the stored set, keyed by
    /// `code`. Stored codes not drafted this run are left untouched —
    /// reviewer decisions on stale suggestions must survive reruns.
    async fn reconcile(
        &self,
        record: &SourceGeometryRecord,
        checksum: &str,
        drafts: Vec<SuggestionDraft>,
        existing: Vec<OverlaySuggestion>,
    ) -> Result<(usize, usize)> {
        let mut by_code: HashMap<String, OverlaySuggestion> = existing
            .into_iter()
            .map(|s| (s.code.clone(), s))
            .collect();
        let mut processed: HashSet<String> = HashSet::new();
        let now = Utc::now();
        let mut created = 0usize;
        let mut updated = 0usize;

        for draft in drafts {
            if !processed.insert(draft.code.clone()) {
                debug!(code = %draft.code, "duplicate suggestion code in run; first wins");
                continue;
            }
            match by_code.remove(&draft.code) {
                Some(mut stored) => {
                    stored.apply_draft(&draft, ENGINE_VERSION, checksum, now);
                    self.suggestions.update(&stored).await?;
                    updated += 1;
                }
                None => {
                    let row = OverlaySuggestion::from_draft(
                        record.project_id,
                        record.id,
                        draft,
                        ENGINE_VERSION,
                        checksum,
                        now,
                    );
                    self.suggestions.insert(&row).await?;
                    created += 1;
                }
            }
        }

        debug!(
            geometry = %record.id,
            created,
            updated,
            "suggestions reconciled"
        );
        Ok((created, updated))
    }
}
