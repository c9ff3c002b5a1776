//! Geometry graph domain model for zoning feasibility screening.
//!
//! This crate owns the in-memory representation of an imported building
//! design — levels, spaces, walls, doors, and fixtures plus their
//! relationships — together with everything derivable from it without
//! touching storage:
//!
//! - import from a persisted JSON export ([`GeometryGraph::from_export`])
//!   with referential-integrity validation at construction time,
//! - a deterministic content fingerprint ([`GeometryGraph::fingerprint`])
//!   used as a version stamp by the overlay engine,
//! - polygon math (shoelace area, perimeter) and the site-level
//!   feasibility metrics ([`build_metrics`]).
//!
//! Pure logic only: no async, no persistence dependencies.

mod entity;
mod error;
mod graph;
mod metrics;
mod numeric;

pub use entity::{Door, EntityKind, EntityRef, Fixture, Level, Metadata, Point, Space, Wall};
pub use error::GeometryError;
pub use graph::{GeometryGraph, Relationship};
pub use metrics::{build_metrics, polygon_area, polygon_perimeter, MetricKey, SiteMetrics};
pub use numeric::try_parse_number;

/// Fingerprint format version, hashed into every graph checksum so a
/// change to the canonical serialization invalidates stored checksums.
pub const FINGERPRINT_VERSION: &str = "v1";
