//! The geometry graph: typed entity collections plus relationships.
//!
//! Collections are `BTreeMap`s so iteration order is stable across runs —
//! rule evaluation output and the content fingerprint both depend on it.
//!
//! # Invariants
//!
//! - Entity IDs are unique within their collection (checked on import).
//! - Every `level_id` back-reference and every relationship endpoint names
//!   an entity present in the graph (checked on import, never re-checked
//!   at evaluation time).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::entity::{Door, EntityKind, EntityRef, Fixture, Level, Space, Wall};
use crate::error::GeometryError;
use crate::FINGERPRINT_VERSION;

/// A typed, ordered relationship between two entities (e.g. a level
/// "contains" a space).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub kind: String,
    pub from_id: String,
    pub to_id: String,
}

/// In-memory model of one imported building design.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GeometryGraph {
    levels: BTreeMap<String, Level>,
    spaces: BTreeMap<String, Space>,
    walls: BTreeMap<String, Wall>,
    doors: BTreeMap<String, Door>,
    fixtures: BTreeMap<String, Fixture>,
    relationships: Vec<Relationship>,
}

/// Persisted export payload shape: flat arrays per entity kind.
#[derive(Debug, Default, Deserialize)]
struct GraphExport {
    #[serde(default)]
    levels: Vec<Level>,
    #[serde(default)]
    spaces: Vec<Space>,
    #[serde(default)]
    walls: Vec<Wall>,
    #[serde(default)]
    doors: Vec<Door>,
    #[serde(default)]
    fixtures: Vec<Fixture>,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

fn index_by_id<T>(
    kind: EntityKind,
    items: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Result<BTreeMap<String, T>, GeometryError> {
    let mut map = BTreeMap::new();
    for item in items {
        let id = id_of(&item);
        if map.insert(id.clone(), item).is_some() {
            return Err(GeometryError::DuplicateId { kind, id });
        }
    }
    Ok(map)
}

impl GeometryGraph {
    /// Build a graph from a persisted JSON export payload.
    ///
    /// Referential integrity is validated here, once: a dangling
    /// `level_id` or relationship endpoint is an import error, so the
    /// evaluator can assume lookups succeed.
    pub fn from_export(payload: &serde_json::Value) -> Result<Self, GeometryError> {
        let export: GraphExport = serde_json::from_value(payload.clone())?;

        let graph = Self {
            levels: index_by_id(EntityKind::Level, export.levels, |e| e.id.clone())?,
            spaces: index_by_id(EntityKind::Space, export.spaces, |e| e.id.clone())?,
            walls: index_by_id(EntityKind::Wall, export.walls, |e| e.id.clone())?,
            doors: index_by_id(EntityKind::Door, export.doors, |e| e.id.clone())?,
            fixtures: index_by_id(EntityKind::Fixture, export.fixtures, |e| e.id.clone())?,
            relationships: export.relationships,
        };

        graph.validate()?;
        tracing::debug!(
            levels = graph.levels.len(),
            spaces = graph.spaces.len(),
            walls = graph.walls.len(),
            doors = graph.doors.len(),
            fixtures = graph.fixtures.len(),
            relationships = graph.relationships.len(),
            "geometry graph imported"
        );
        Ok(graph)
    }

    fn validate(&self) -> Result<(), GeometryError> {
        for space in self.spaces.values() {
            if let Some(level_id) = &space.level_id {
                if !self.levels.contains_key(level_id) {
                    return Err(GeometryError::DanglingLevel {
                        kind: EntityKind::Space,
                        id: space.id.clone(),
                        level_id: level_id.clone(),
                    });
                }
            }
        }
        for wall in self.walls.values() {
            if let Some(level_id) = &wall.level_id {
                if !self.levels.contains_key(level_id) {
                    return Err(GeometryError::DanglingLevel {
                        kind: EntityKind::Wall,
                        id: wall.id.clone(),
                        level_id: level_id.clone(),
                    });
                }
            }
        }
        for rel in &self.relationships {
            for endpoint in [&rel.from_id, &rel.to_id] {
                if self.entity(endpoint).is_none() {
                    return Err(GeometryError::DanglingRelationship {
                        kind: rel.kind.clone(),
                        id: endpoint.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Versioned SHA-256 content hash over the canonical serialization.
    ///
    /// `BTreeMap` key order makes the JSON deterministic, so equal graphs
    /// hash equal regardless of export array order.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_VERSION.as_bytes());
        hasher.update(b":");
        hasher.update(canonical.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn level(&self, id: &str) -> Option<&Level> {
        self.levels.get(id)
    }

    pub fn space(&self, id: &str) -> Option<&Space> {
        self.spaces.get(id)
    }

    pub fn wall(&self, id: &str) -> Option<&Wall> {
        self.walls.get(id)
    }

    pub fn door(&self, id: &str) -> Option<&Door> {
        self.doors.get(id)
    }

    pub fn fixture(&self, id: &str) -> Option<&Fixture> {
        self.fixtures.get(id)
    }

    pub fn levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.values()
    }

    pub fn spaces(&self) -> impl Iterator<Item = &Space> {
        self.spaces.values()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    /// Cross-kind lookup by entity id.
    pub fn entity(&self, id: &str) -> Option<EntityRef<'_>> {
        self.levels
            .get(id)
            .map(EntityRef::Level)
            .or_else(|| self.spaces.get(id).map(EntityRef::Space))
            .or_else(|| self.walls.get(id).map(EntityRef::Wall))
            .or_else(|| self.doors.get(id).map(EntityRef::Door))
            .or_else(|| self.fixtures.get(id).map(EntityRef::Fixture))
    }

    /// All entities of one kind, in stable id order.
    pub fn entities_of(&self, kind: EntityKind) -> Vec<EntityRef<'_>> {
        match kind {
            EntityKind::Level => self.levels.values().map(EntityRef::Level).collect(),
            EntityKind::Space => self.spaces.values().map(EntityRef::Space).collect(),
            EntityKind::Wall => self.walls.values().map(EntityRef::Wall).collect(),
            EntityKind::Door => self.doors.values().map(EntityRef::Door).collect(),
            EntityKind::Fixture => self.fixtures.values().map(EntityRef::Fixture).collect(),
        }
    }

    /// Every entity in the graph, grouped by kind, in stable order.
    pub fn all_entities(&self) -> Vec<EntityRef<'_>> {
        let mut all = Vec::new();
        for kind in [
            EntityKind::Level,
            EntityKind::Space,
            EntityKind::Wall,
            EntityKind::Door,
            EntityKind::Fixture,
        ] {
            all.extend(self.entities_of(kind));
        }
        all
    }

    /// Resolve a space's owning level via its back-reference.
    pub fn level_of(&self, space: &Space) -> Option<&Level> {
        space.level_id.as_deref().and_then(|id| self.levels.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_payload() -> serde_json::Value {
        json!({
            "levels": [
                {"id": "L1", "name": "Ground", "metadata": {"heritage_zone": true}}
            ],
            "spaces": [
                {"id": "S1", "name": "Unit A", "level_id": "L1",
                 "boundary": [{"x": 0.0, "y": 0.0}, {"x": 8.0, "y": 0.0},
                              {"x": 8.0, "y": 5.0}, {"x": 0.0, "y": 5.0}]},
                {"id": "S2", "level_id": "L1", "boundary": []}
            ],
            "doors": [{"id": "D1", "width_m": 0.9}],
            "relationships": [
                {"kind": "contains", "from_id": "L1", "to_id": "S1"}
            ]
        })
    }

    #[test]
    fn import_builds_collections() {
        let graph = GeometryGraph::from_export(&sample_payload()).unwrap();
        assert_eq!(graph.levels().count(), 1);
        assert_eq!(graph.spaces().count(), 2);
        assert!(graph.door("D1").is_some());
        assert_eq!(graph.relationships().len(), 1);
    }

    #[test]
    fn import_rejects_duplicate_ids() {
        let payload = json!({"spaces": [{"id": "S1"}, {"id": "S1"}]});
        let err = GeometryGraph::from_export(&payload).unwrap_err();
        assert!(matches!(err, GeometryError::DuplicateId { .. }));
    }

    #[test]
    fn import_rejects_dangling_level_reference() {
        let payload = json!({"spaces": [{"id": "S1", "level_id": "missing"}]});
        let err = GeometryGraph::from_export(&payload).unwrap_err();
        assert!(matches!(err, GeometryError::DanglingLevel { .. }));
    }

    #[test]
    fn import_rejects_dangling_relationship() {
        let payload = json!({
            "levels": [{"id": "L1"}],
            "relationships": [{"kind": "contains", "from_id": "L1", "to_id": "ghost"}]
        });
        let err = GeometryGraph::from_export(&payload).unwrap_err();
        assert!(matches!(err, GeometryError::DanglingRelationship { .. }));
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = GeometryGraph::from_export(&sample_payload()).unwrap();
        let b = GeometryGraph::from_export(&sample_payload()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn fingerprint_ignores_export_array_order() {
        let reordered = json!({
            "levels": [{"id": "L1", "name": "Ground", "metadata": {"heritage_zone": true}}],
            "spaces": [
                {"id": "S2", "level_id": "L1", "boundary": []},
                {"id": "S1", "name": "Unit A", "level_id": "L1",
                 "boundary": [{"x": 0.0, "y": 0.0}, {"x": 8.0, "y": 0.0},
                              {"x": 8.0, "y": 5.0}, {"x": 0.0, "y": 5.0}]}
            ],
            "doors": [{"id": "D1", "width_m": 0.9}],
            "relationships": [{"kind": "contains", "from_id": "L1", "to_id": "S1"}]
        });
        let a = GeometryGraph::from_export(&sample_payload()).unwrap();
        let b = GeometryGraph::from_export(&reordered).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_content() {
        let a = GeometryGraph::from_export(&sample_payload()).unwrap();
        let mut payload = sample_payload();
        payload["doors"][0]["width_m"] = json!(1.2);
        let b = GeometryGraph::from_export(&payload).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn level_of_resolves_back_reference() {
        let graph = GeometryGraph::from_export(&sample_payload()).unwrap();
        let space = graph.space("S1").unwrap();
        assert_eq!(graph.level_of(space).unwrap().id, "L1");
    }

    #[test]
    fn entities_of_iterates_in_id_order() {
        let graph = GeometryGraph::from_export(&sample_payload()).unwrap();
        let ids: Vec<_> = graph
            .entities_of(EntityKind::Space)
            .iter()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }
}
