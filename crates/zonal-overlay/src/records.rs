//! Stored records the orchestrator consumes: source geometries, zoning
//! rule rows, and evaluation locks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// One persisted geometry import belonging to a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceGeometryRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Jurisdictional zoning classification for the site, when resolved.
    pub zone_code: Option<String>,
    /// Surveyor-declared overrides (land area, GFA, setbacks).
    pub import_metadata: Value,
    /// The persisted graph export payload.
    pub payload: Value,
}

/// A published jurisdictional zoning rule row. Read-only to this engine;
/// authored and reviewed by an out-of-scope seeding process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoningRule {
    pub jurisdiction: String,
    pub authority: String,
    pub topic: String,
    /// Dotted parameter namespace, e.g. `zoning.max_building_height_m`.
    pub parameter_key: String,
    /// String-encoded comparison operator: `<=`, `<`, `>=`, `>`, `=`, `==`.
    pub operator: String,
    /// String-encoded numeric threshold.
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    /// At minimum carries a `zone_code`.
    pub applicability: Value,
    pub review_status: String,
    pub is_published: bool,
}

impl ZoningRule {
    pub fn zone_code(&self) -> Option<&str> {
        self.applicability.get("zone_code").and_then(Value::as_str)
    }

    /// The numeric threshold, when the stored string parses.
    pub fn limit(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    }

    /// Stable reference string recorded on suggestions this rule produced.
    pub fn rule_ref(&self) -> String {
        format!("{}:{}", self.authority, self.parameter_key)
    }
}

/// Kinds of evaluation lock. One record exists per
/// (source geometry, kind) pair.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LockKind {
    OverlayEvaluation,
}

/// Advisory evaluation lock. Re-acquiring an active lock re-stamps it
/// rather than creating a duplicate; `is_active` on the returned record
/// lets callers observe overlapping runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationLock {
    pub source_geometry_id: Uuid,
    pub kind: LockKind,
    pub is_active: bool,
    pub acquired_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(value: &str) -> ZoningRule {
        ZoningRule {
            jurisdiction: "SG".into(),
            authority: "URA".into(),
            topic: "zoning".into(),
            parameter_key: "zoning.max_building_height_m".into(),
            operator: "<=".into(),
            value: value.into(),
            unit: Some("m".into()),
            applicability: json!({"zone_code": "SG:residential"}),
            review_status: "approved".into(),
            is_published: true,
        }
    }

    #[test]
    fn limit_parses_numeric_strings() {
        assert_eq!(rule("36").limit(), Some(36.0));
        assert_eq!(rule(" 2.8 ").limit(), Some(2.8));
        assert_eq!(rule("tall").limit(), None);
    }

    #[test]
    fn zone_code_reads_applicability() {
        assert_eq!(rule("36").zone_code(), Some("SG:residential"));
    }

    #[test]
    fn rule_ref_is_authority_scoped() {
        assert_eq!(rule("36").rule_ref(), "URA:zoning.max_building_height_m");
    }
}
