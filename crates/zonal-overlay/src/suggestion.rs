//! Overlay suggestions: the reviewable findings the engine produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// Reviewer lifecycle. Only an external reviewer workflow moves a
/// suggestion out of `Pending`; the engine never touches `status` on
/// update.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

/// A stored, reviewable suggestion.
///
/// `code` is the reconciliation key: unique within one source geometry,
/// stable across reruns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlaySuggestion {
    pub project_id: Uuid,
    pub source_geometry_id: Uuid,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub rationale: String,
    pub severity: Severity,
    pub status: SuggestionStatus,
    pub engine_version: String,
    /// Opaque trace data; `triggers` always lists the heuristic(s) that
    /// fired.
    pub engine_payload: Value,
    /// Entity ids the suggestion refers to.
    pub target_ids: Vec<String>,
    /// Always includes the originating `trigger` keyword.
    pub props: Value,
    pub rule_refs: Vec<String>,
    pub score: Option<f64>,
    /// Graph fingerprint at generation time.
    pub geometry_checksum: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What one check produces before reconciliation ties it to a stored row.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestionDraft {
    pub code: String,
    pub kind: String,
    pub title: String,
    pub rationale: String,
    pub severity: Severity,
    pub target_ids: Vec<String>,
    pub props: Value,
    pub rule_refs: Vec<String>,
    pub score: Option<f64>,
    /// Heuristic trigger keywords, recorded in `engine_payload.triggers`.
    pub triggers: Vec<String>,
}

impl SuggestionDraft {
    /// Extra `props` entries are merged on top of the mandatory `trigger`
    /// keyword.
    pub fn new(
        code: impl Into<String>,
        kind: &str,
        title: impl Into<String>,
        rationale: impl Into<String>,
        severity: Severity,
        trigger: &str,
    ) -> Self {
        Self {
            code: code.into(),
            kind: kind.to_string(),
            title: title.into(),
            rationale: rationale.into(),
            severity,
            target_ids: Vec::new(),
            props: json!({ "trigger": trigger }),
            rule_refs: Vec::new(),
            score: None,
            triggers: vec![trigger.to_string()],
        }
    }

    pub fn with_targets(mut self, target_ids: Vec<String>) -> Self {
        self.target_ids = target_ids;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    pub fn with_prop(mut self, key: &str, value: Value) -> Self {
        if let Value::Object(map) = &mut self.props {
            map.insert(key.to_string(), value);
        }
        self
    }
}

impl OverlaySuggestion {
    /// Materialize a draft as a fresh pending suggestion.
    pub fn from_draft(
        project_id: Uuid,
        source_geometry_id: Uuid,
        draft: SuggestionDraft,
        engine_version: &str,
        geometry_checksum: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            project_id,
            source_geometry_id,
            code: draft.code,
            kind: draft.kind,
            title: draft.title,
            rationale: draft.rationale,
            severity: draft.severity,
            status: SuggestionStatus::Pending,
            engine_version: engine_version.to_string(),
            engine_payload: json!({ "triggers": draft.triggers }),
            target_ids: draft.target_ids,
            props: draft.props,
            rule_refs: draft.rule_refs,
            score: draft.score,
            geometry_checksum: geometry_checksum.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the engine-owned fields from a rerun draft. `status` and
    /// `created_at` belong to the reviewer workflow and are preserved.
    pub fn apply_draft(
        &mut self,
        draft: &SuggestionDraft,
        engine_version: &str,
        geometry_checksum: &str,
        now: DateTime<Utc>,
    ) {
        self.kind = draft.kind.clone();
        self.title = draft.title.clone();
        self.rationale = draft.rationale.clone();
        self.severity = draft.severity;
        self.engine_version = engine_version.to_string();
        self.engine_payload = json!({ "triggers": draft.triggers });
        self.target_ids = draft.target_ids.clone();
        self.props = draft.props.clone();
        self.rule_refs = draft.rule_refs.clone();
        self.score = draft.score;
        self.geometry_checksum = geometry_checksum.to_string();
        self.updated_at = now;
    }
}
