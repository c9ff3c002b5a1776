//! Rule packs and the pack runner.
//!
//! A pack is immutable once loaded for a run. Loading is where
//! configuration errors surface: an unparseable predicate shape, a missing
//! `predicate` field, or a duplicate rule id fails the load — a bad pack
//! must never produce a false "passed" report.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use zonal_geometry::{EntityKind, EntityRef, GeometryGraph};

use crate::error::RuleError;
use crate::eval::{evaluate, Fact};
use crate::predicate::Predicate;

/// A named collection of rule definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulePack {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub rules: Vec<RuleDef>,
}

/// One declarative rule: a target collection, an optional pre-filter, and
/// the predicate every surviving entity must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDef {
    pub id: String,
    pub title: String,
    /// Entity-type selector, case-insensitive singular or plural
    /// (`space`/`spaces`, `level`/`levels`, ...).
    pub target: String,
    /// Entities failing the pre-filter are excluded from `checked`, not
    /// counted as violations.
    #[serde(default, rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_: Option<Predicate>,
    pub predicate: Predicate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Value>,
}

impl RulePack {
    pub fn from_yaml_str(source: &str) -> Result<Self, RuleError> {
        let pack: RulePack = serde_yaml::from_str(source)?;
        pack.check()?;
        Ok(pack)
    }

    pub fn from_json_value(source: &Value) -> Result<Self, RuleError> {
        let pack: RulePack = serde_json::from_value(source.clone())?;
        pack.check()?;
        Ok(pack)
    }

    fn check(&self) -> Result<(), RuleError> {
        let mut seen = std::collections::BTreeSet::new();
        for rule in &self.rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::InvalidPack(format!(
                    "duplicate rule id '{}'",
                    rule.id
                )));
            }
        }
        Ok(())
    }
}

/// Per-rule validation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleReport {
    pub rule_id: String,
    pub title: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation: Option<Value>,
    pub passed: bool,
    /// Entities evaluated after the `where` pre-filter.
    pub checked: usize,
    pub violations: Vec<Violation>,
}

/// One entity that failed a rule's predicate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub entity_id: String,
    pub messages: Vec<String>,
    pub facts: Vec<Fact>,
    /// Small snapshot of the entity for report rendering.
    pub attributes: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackSummary {
    pub total_rules: usize,
    pub evaluated_rules: usize,
    pub violations: usize,
    pub checked_entities: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackReport {
    pub results: Vec<RuleReport>,
    pub summary: PackSummary,
}

fn resolve_target(target: &str) -> Option<EntityKind> {
    match target.to_ascii_lowercase().as_str() {
        "level" | "levels" => Some(EntityKind::Level),
        "space" | "spaces" => Some(EntityKind::Space),
        "wall" | "walls" => Some(EntityKind::Wall),
        "door" | "doors" => Some(EntityKind::Door),
        "fixture" | "fixtures" => Some(EntityKind::Fixture),
        _ => None,
    }
}

fn attribute_snapshot(entity: EntityRef<'_>) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("target".into(), Value::String(entity.kind().to_string()));
    if let Some(name) = entity.name() {
        map.insert("name".into(), Value::String(name.to_string()));
    }
    if let Some(level_id) = entity.level_id() {
        map.insert("level_id".into(), Value::String(level_id.to_string()));
    }
    let metadata = entity.metadata();
    if !metadata.is_empty() {
        map.insert("metadata".into(), Value::Object(metadata.clone()));
    }
    Value::Object(map)
}

/// Run every rule in a pack over its target collection.
///
/// A rule whose target matches no entities reports `checked: 0` and
/// passes — that is a data situation, not an error. An unrecognized
/// target is a configuration error and fails the whole run.
pub fn evaluate_pack(pack: &RulePack, graph: &GeometryGraph) -> Result<PackReport, RuleError> {
    let mut results = Vec::with_capacity(pack.rules.len());
    let mut violations_total = 0usize;
    let mut checked_total = 0usize;

    for rule in &pack.rules {
        let kind = resolve_target(&rule.target).ok_or_else(|| RuleError::UnsupportedTarget {
            rule_id: rule.id.clone(),
            target: rule.target.clone(),
        })?;

        let mut checked = 0usize;
        let mut violations = Vec::new();
        for entity in graph.entities_of(kind) {
            if let Some(pre) = &rule.where_ {
                if !evaluate(pre, entity, graph).passed {
                    continue;
                }
            }
            checked += 1;
            let outcome = evaluate(&rule.predicate, entity, graph);
            if !outcome.passed {
                violations.push(Violation {
                    entity_id: entity.id().to_string(),
                    messages: outcome.messages,
                    facts: outcome.facts,
                    attributes: attribute_snapshot(entity),
                });
            }
        }

        tracing::debug!(
            rule_id = %rule.id,
            checked,
            violations = violations.len(),
            "rule evaluated"
        );

        violations_total += violations.len();
        checked_total += checked;
        results.push(RuleReport {
            rule_id: rule.id.clone(),
            title: rule.title.clone(),
            target: rule.target.clone(),
            citation: rule.citation.clone(),
            passed: violations.is_empty(),
            checked,
            violations,
        });
    }

    let summary = PackSummary {
        total_rules: pack.rules.len(),
        evaluated_rules: results.len(),
        violations: violations_total,
        checked_entities: checked_total,
    };
    Ok(PackReport { results, summary })
}
