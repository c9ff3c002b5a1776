//! Geometry entity types.
//!
//! Each entity kind is a typed struct; [`EntityRef`] is the borrowed sum
//! type the rule evaluator works against. Back-references (`level_id`) are
//! plain IDs, never owning pointers — integrity is enforced once, when the
//! graph is built.

use serde::{Deserialize, Serialize};

use crate::numeric::try_parse_number;

/// Arbitrary per-entity JSON metadata, keyed by attribute name.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A 2D point in metres, site-local coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// The five entity kinds a geometry graph contains.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
    Level,
    Space,
    Wall,
    Door,
    Fixture,
}

/// A storey of the building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A unit or room, bounded by an ordered 2D polygon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Ordered boundary vertices. The ring may or may not repeat the first
    /// vertex at the end; the polygon math closes it either way.
    #[serde(default)]
    pub boundary: Vec<Point>,
    /// Weak reference to the owning level.
    #[serde(default)]
    pub level_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Weak reference to the owning level.
    #[serde(default)]
    pub level_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Door {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub width_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Borrowed view over any entity, giving the evaluator uniform access to
/// the shared fields without giving up the typed variants.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Level(&'a Level),
    Space(&'a Space),
    Wall(&'a Wall),
    Door(&'a Door),
    Fixture(&'a Fixture),
}

impl<'a> EntityRef<'a> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Level(_) => EntityKind::Level,
            Self::Space(_) => EntityKind::Space,
            Self::Wall(_) => EntityKind::Wall,
            Self::Door(_) => EntityKind::Door,
            Self::Fixture(_) => EntityKind::Fixture,
        }
    }

    pub fn id(&self) -> &'a str {
        match self {
            Self::Level(e) => &e.id,
            Self::Space(e) => &e.id,
            Self::Wall(e) => &e.id,
            Self::Door(e) => &e.id,
            Self::Fixture(e) => &e.id,
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        match self {
            Self::Level(e) => e.name.as_deref(),
            Self::Space(e) => e.name.as_deref(),
            Self::Wall(e) => e.name.as_deref(),
            Self::Door(e) => e.name.as_deref(),
            Self::Fixture(e) => e.name.as_deref(),
        }
    }

    pub fn metadata(&self) -> &'a Metadata {
        match self {
            Self::Level(e) => &e.metadata,
            Self::Space(e) => &e.metadata,
            Self::Wall(e) => &e.metadata,
            Self::Door(e) => &e.metadata,
            Self::Fixture(e) => &e.metadata,
        }
    }

    /// Weak back-reference to the owning level, where the kind carries one.
    pub fn level_id(&self) -> Option<&'a str> {
        match self {
            Self::Space(e) => e.level_id.as_deref(),
            Self::Wall(e) => e.level_id.as_deref(),
            _ => None,
        }
    }

    /// Declared height in metres, read from `height_m` (alias `height`)
    /// metadata. Any entity kind may declare one.
    pub fn height_m(&self) -> Option<f64> {
        let meta = self.metadata();
        meta.get("height_m")
            .or_else(|| meta.get("height"))
            .and_then(try_parse_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn space_with_metadata(pairs: &[(&str, serde_json::Value)]) -> Space {
        let mut metadata = Metadata::new();
        for (k, v) in pairs {
            metadata.insert((*k).to_string(), v.clone());
        }
        Space {
            id: "s1".into(),
            metadata,
            ..Default::default()
        }
    }

    #[test]
    fn height_reads_height_m_first() {
        let space = space_with_metadata(&[("height_m", json!(3.2)), ("height", json!(99))]);
        assert_eq!(EntityRef::Space(&space).height_m(), Some(3.2));
    }

    #[test]
    fn height_falls_back_to_height_alias() {
        let space = space_with_metadata(&[("height", json!("4.5"))]);
        assert_eq!(EntityRef::Space(&space).height_m(), Some(4.5));
    }

    #[test]
    fn height_absent_is_none() {
        let space = space_with_metadata(&[]);
        assert_eq!(EntityRef::Space(&space).height_m(), None);
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(EntityKind::Space.to_string(), "space");
        assert_eq!(EntityKind::Fixture.to_string(), "fixture");
    }

    #[test]
    fn point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance(b), 5.0);
    }
}
