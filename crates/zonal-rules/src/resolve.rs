//! Dotted field-path resolution against an entity plus graph context.
//!
//! Absent values resolve to `Null`, never an error — a predicate over a
//! field an entity doesn't carry is a failing comparison, not a crash.
//!
//! Namespaces:
//! - `graph.<collection>.<id>.<rest>` resolves against any entity in the
//!   graph (cross-entity predicates),
//! - `computed.area` / `computed.perimeter` / `computed.level[...]`
//!   dispatch to derived values,
//! - anything else walks the entity itself: built-in attributes first,
//!   then metadata, then nested JSON.

use serde_json::{json, Value};

use zonal_geometry::{polygon_area, polygon_perimeter, EntityKind, EntityRef, GeometryGraph};

/// Resolve a dotted path to a JSON value.
pub fn resolve_field(path: &str, entity: EntityRef<'_>, graph: &GeometryGraph) -> Value {
    let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    match segments.split_first() {
        None => Value::Null,
        Some((&"graph", rest)) => resolve_graph_path(rest, graph),
        Some((&"computed", rest)) => resolve_computed(rest, entity, graph),
        _ => resolve_entity_path(&segments, entity),
    }
}

fn collection_kind(name: &str) -> Option<EntityKind> {
    match name {
        "level" | "levels" => Some(EntityKind::Level),
        "space" | "spaces" => Some(EntityKind::Space),
        "wall" | "walls" => Some(EntityKind::Wall),
        "door" | "doors" => Some(EntityKind::Door),
        "fixture" | "fixtures" => Some(EntityKind::Fixture),
        _ => None,
    }
}

fn resolve_graph_path(segments: &[&str], graph: &GeometryGraph) -> Value {
    let (&collection, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return Value::Null,
    };
    let Some(kind) = collection_kind(collection) else {
        return Value::Null;
    };
    let (&id, rest) = match rest.split_first() {
        Some(parts) => parts,
        None => return Value::Null,
    };
    let Some(entity) = graph.entity(id).filter(|e| e.kind() == kind) else {
        return Value::Null;
    };
    if rest.is_empty() {
        Value::String(entity.id().to_string())
    } else {
        resolve_entity_path(rest, entity)
    }
}

fn resolve_computed(segments: &[&str], entity: EntityRef<'_>, graph: &GeometryGraph) -> Value {
    let (&derived, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return Value::Null,
    };
    match derived {
        "area" => match entity {
            EntityRef::Space(space) => json!(polygon_area(&space.boundary)),
            _ => Value::Null,
        },
        "perimeter" => match entity {
            EntityRef::Space(space) => json!(polygon_perimeter(&space.boundary)),
            _ => Value::Null,
        },
        "level" => {
            let Some(level) = entity.level_id().and_then(|id| graph.level(id)) else {
                return Value::Null;
            };
            if rest.is_empty() {
                Value::String(level.id.clone())
            } else {
                resolve_entity_path(rest, EntityRef::Level(level))
            }
        }
        _ => Value::Null,
    }
}

fn resolve_entity_path(segments: &[&str], entity: EntityRef<'_>) -> Value {
    let (&attr, rest) = match segments.split_first() {
        Some(parts) => parts,
        None => return Value::Null,
    };
    let base = match attr {
        "id" => Value::String(entity.id().to_string()),
        "name" => entity
            .name()
            .map(|n| Value::String(n.to_string()))
            .unwrap_or(Value::Null),
        "kind" | "entity_type" => Value::String(entity.kind().to_string()),
        "level_id" => entity
            .level_id()
            .map(|id| Value::String(id.to_string()))
            .unwrap_or(Value::Null),
        "width_m" | "width" => match entity {
            EntityRef::Door(door) => door.width_m.map(|w| json!(w)).unwrap_or(Value::Null),
            _ => Value::Null,
        },
        "boundary" => match entity {
            EntityRef::Space(space) => {
                serde_json::to_value(&space.boundary).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        },
        "metadata" => Value::Object(entity.metadata().clone()),
        // Bare metadata key shorthand: `height_m` reads metadata.height_m.
        other => entity.metadata().get(other).cloned().unwrap_or(Value::Null),
    };
    walk_value(base, rest)
}

fn walk_value(value: Value, segments: &[&str]) -> Value {
    let mut current = value;
    for seg in segments {
        current = match &current {
            Value::Object(map) => map.get(*seg).cloned().unwrap_or(Value::Null),
            Value::Array(items) => seg
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Null),
            _ => Value::Null,
        };
        if current.is_null() {
            return Value::Null;
        }
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_graph() -> GeometryGraph {
        GeometryGraph::from_export(&json!({
            "levels": [{"id": "L1", "name": "Ground",
                        "metadata": {"heritage_zone": true, "limits": {"far": 2.8}}}],
            "spaces": [{"id": "S1", "name": "Unit A", "level_id": "L1",
                        "metadata": {"height_m": 3.0},
                        "boundary": [{"x": 0.0, "y": 0.0}, {"x": 8.0, "y": 0.0},
                                     {"x": 8.0, "y": 5.0}, {"x": 0.0, "y": 5.0}]}],
            "doors": [{"id": "D1", "width_m": 0.9}]
        }))
        .unwrap()
    }

    #[test]
    fn resolves_builtin_attributes() {
        let graph = sample_graph();
        let space = EntityRef::Space(graph.space("S1").unwrap());
        assert_eq!(resolve_field("id", space, &graph), json!("S1"));
        assert_eq!(resolve_field("name", space, &graph), json!("Unit A"));
        assert_eq!(resolve_field("level_id", space, &graph), json!("L1"));
        assert_eq!(resolve_field("kind", space, &graph), json!("space"));
    }

    #[test]
    fn resolves_metadata_with_and_without_prefix() {
        let graph = sample_graph();
        let space = EntityRef::Space(graph.space("S1").unwrap());
        assert_eq!(resolve_field("metadata.height_m", space, &graph), json!(3.0));
        assert_eq!(resolve_field("height_m", space, &graph), json!(3.0));
    }

    #[test]
    fn resolves_computed_area_and_perimeter() {
        let graph = sample_graph();
        let space = EntityRef::Space(graph.space("S1").unwrap());
        assert_eq!(resolve_field("computed.area", space, &graph), json!(40.0));
        assert_eq!(resolve_field("computed.perimeter", space, &graph), json!(26.0));
    }

    #[test]
    fn computed_level_resolves_owning_level() {
        let graph = sample_graph();
        let space = EntityRef::Space(graph.space("S1").unwrap());
        assert_eq!(resolve_field("computed.level", space, &graph), json!("L1"));
        assert_eq!(
            resolve_field("computed.level.metadata.heritage_zone", space, &graph),
            json!(true)
        );
    }

    #[test]
    fn computed_area_on_non_space_is_null() {
        let graph = sample_graph();
        let door = EntityRef::Door(graph.door("D1").unwrap());
        assert_eq!(resolve_field("computed.area", door, &graph), Value::Null);
    }

    #[test]
    fn graph_namespace_reaches_other_entities() {
        let graph = sample_graph();
        let door = EntityRef::Door(graph.door("D1").unwrap());
        assert_eq!(
            resolve_field("graph.levels.L1.metadata.limits.far", door, &graph),
            json!(2.8)
        );
        assert_eq!(resolve_field("graph.spaces.S1", door, &graph), json!("S1"));
    }

    #[test]
    fn absent_paths_resolve_to_null() {
        let graph = sample_graph();
        let space = EntityRef::Space(graph.space("S1").unwrap());
        assert_eq!(resolve_field("metadata.nope", space, &graph), Value::Null);
        assert_eq!(resolve_field("metadata.nope.deeper", space, &graph), Value::Null);
        assert_eq!(resolve_field("graph.levels.ghost.name", space, &graph), Value::Null);
        assert_eq!(resolve_field("", space, &graph), Value::Null);
    }

    #[test]
    fn door_width_aliases() {
        let graph = sample_graph();
        let door = EntityRef::Door(graph.door("D1").unwrap());
        assert_eq!(resolve_field("width_m", door, &graph), json!(0.9));
        assert_eq!(resolve_field("width", door, &graph), json!(0.9));
    }
}
