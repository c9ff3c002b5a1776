//! Polygon math and the site-level feasibility metrics builder.
//!
//! All derived metrics are `Option<f64>`: a missing input yields `None`,
//! never an error and never a division by zero.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::{EntityRef, Point};
use crate::graph::GeometryGraph;
use crate::numeric::try_parse_number;

/// Metadata keys accepted as an explicit land/site area override.
const LAND_AREA_KEYS: &[&str] = &["land_area_m2", "site_area_m2", "site_area"];
/// Metadata keys accepted as an explicit gross floor area override.
const GFA_KEYS: &[&str] = &["gross_floor_area_m2", "gfa_m2"];
/// Metadata keys accepted as an explicit front setback declaration.
const FRONT_SETBACK_KEYS: &[&str] = &["front_setback_m"];

/// Footprint bucket for spaces without a level back-reference.
const DEFAULT_LEVEL_BUCKET: &str = "default";

/// Polygon area via the shoelace formula.
///
/// The ring is closed implicitly; an explicitly closed ring (last vertex
/// repeats the first) contributes a zero-length segment and the same area.
/// Fewer than 3 vertices is a degenerate polygon with area 0.
pub fn polygon_area(boundary: &[Point]) -> f64 {
    if boundary.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..boundary.len() {
        let a = boundary[i];
        let b = boundary[(i + 1) % boundary.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    (sum / 2.0).abs()
}

/// Polygon perimeter, closing the ring if the export left it open.
pub fn polygon_perimeter(boundary: &[Point]) -> f64 {
    if boundary.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    for pair in boundary.windows(2) {
        total += pair[0].distance(pair[1]);
    }
    let first = boundary[0];
    let last = boundary[boundary.len() - 1];
    if first != last {
        total += last.distance(first);
    }
    total
}

/// The metrics a zoning rule threshold can bind to.
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
pub enum MetricKey {
    PlotRatio,
    MaxHeightM,
    FrontSetbackM,
    SiteCoveragePercent,
}

/// Whole-site aggregate metrics derived from one geometry graph plus its
/// import metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteMetrics {
    pub total_unit_area_m2: Option<f64>,
    pub footprint_by_level_m2: BTreeMap<String, f64>,
    pub max_height_m: Option<f64>,
    pub land_area_m2: Option<f64>,
    pub gross_floor_area_m2: Option<f64>,
    pub plot_ratio: Option<f64>,
    pub site_coverage_percent: Option<f64>,
    pub front_setback_m: Option<f64>,
}

impl SiteMetrics {
    /// Rule-binding accessor: the measured value for a metric key.
    pub fn get(&self, key: MetricKey) -> Option<f64> {
        match key {
            MetricKey::PlotRatio => self.plot_ratio,
            MetricKey::MaxHeightM => self.max_height_m,
            MetricKey::FrontSetbackM => self.front_setback_m,
            MetricKey::SiteCoveragePercent => self.site_coverage_percent,
        }
    }
}

fn metadata_number(metadata: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| metadata.get(*k))
        .find_map(try_parse_number)
}

/// Derive the site metrics for a graph.
///
/// `import_metadata` carries surveyor-declared overrides (land area, GFA,
/// front setback) that take precedence over geometric estimates.
pub fn build_metrics(graph: &GeometryGraph, import_metadata: &Value) -> SiteMetrics {
    let mut metrics = SiteMetrics::default();

    // Per-space areas; spaces without a usable boundary are skipped, not
    // counted as zero.
    let mut total_area = None;
    for space in graph.spaces() {
        if space.boundary.len() < 3 {
            continue;
        }
        let area = polygon_area(&space.boundary);
        *total_area.get_or_insert(0.0) += area;
        let bucket = space
            .level_id
            .clone()
            .unwrap_or_else(|| DEFAULT_LEVEL_BUCKET.to_string());
        *metrics.footprint_by_level_m2.entry(bucket).or_insert(0.0) += area;
    }
    metrics.total_unit_area_m2 = total_area;

    metrics.max_height_m = graph
        .spaces()
        .filter_map(|s| EntityRef::Space(s).height_m())
        .fold(None, |acc: Option<f64>, h| {
            Some(acc.map_or(h, |a| a.max(h)))
        });

    metrics.land_area_m2 = metadata_number(import_metadata, LAND_AREA_KEYS)
        .or_else(|| bounding_box_area(graph))
        .filter(|a| *a > 0.0);

    metrics.gross_floor_area_m2 =
        metadata_number(import_metadata, GFA_KEYS).or(metrics.total_unit_area_m2);

    metrics.front_setback_m = metadata_number(import_metadata, FRONT_SETBACK_KEYS);

    metrics.plot_ratio = match (metrics.gross_floor_area_m2, metrics.land_area_m2) {
        (Some(gfa), Some(land)) if gfa > 0.0 && land > 0.0 => Some(gfa / land),
        _ => None,
    };

    metrics.site_coverage_percent = match (
        metrics
            .footprint_by_level_m2
            .values()
            .fold(None, |acc: Option<f64>, &v| Some(acc.map_or(v, |a| a.max(v)))),
        metrics.land_area_m2,
    ) {
        (Some(footprint), Some(land)) if land > 0.0 => Some(footprint / land * 100.0),
        _ => None,
    };

    metrics
}

/// Width × depth of the bounding box over all space boundary points —
/// the fallback land-area estimate when no override is declared.
fn bounding_box_area(graph: &GeometryGraph) -> Option<f64> {
    let mut points = graph.spaces().flat_map(|s| s.boundary.iter());
    let first = points.next()?;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.x, first.x, first.y, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }
    Some((max_x - min_x) * (max_y - min_y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn rect_boundary() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(8.0, 0.0),
            Point::new(8.0, 5.0),
            Point::new(0.0, 5.0),
        ]
    }

    #[test]
    fn shoelace_rectangle_area_and_perimeter() {
        let boundary = rect_boundary();
        assert_eq!(polygon_area(&boundary), 40.0);
        assert_eq!(polygon_perimeter(&boundary), 26.0);
    }

    #[test]
    fn shoelace_accepts_closed_ring() {
        let mut boundary = rect_boundary();
        boundary.push(boundary[0]);
        assert_eq!(polygon_area(&boundary), 40.0);
        assert_eq!(polygon_perimeter(&boundary), 26.0);
    }

    #[test]
    fn degenerate_polygon_has_zero_area() {
        assert_eq!(polygon_area(&[]), 0.0);
        assert_eq!(polygon_area(&[Point::new(0.0, 0.0), Point::new(1.0, 1.0)]), 0.0);
    }

    fn graph_with_two_units() -> GeometryGraph {
        GeometryGraph::from_export(&json!({
            "levels": [{"id": "L1"}, {"id": "L2"}],
            "spaces": [
                {"id": "S1", "level_id": "L1", "metadata": {"height_m": 12},
                 "boundary": [{"x": 0.0, "y": 0.0}, {"x": 8.0, "y": 0.0},
                              {"x": 8.0, "y": 5.0}, {"x": 0.0, "y": 5.0}]},
                {"id": "S2", "level_id": "L2", "metadata": {"height": "9.5"},
                 "boundary": [{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 0.0},
                              {"x": 10.0, "y": 10.0}, {"x": 0.0, "y": 10.0}]},
                {"id": "S3", "boundary": [{"x": 0.0, "y": 0.0}]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn total_area_skips_degenerate_spaces() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({}));
        assert_eq!(metrics.total_unit_area_m2, Some(140.0));
    }

    #[test]
    fn footprints_group_by_level() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({}));
        assert_eq!(metrics.footprint_by_level_m2.get("L1"), Some(&40.0));
        assert_eq!(metrics.footprint_by_level_m2.get("L2"), Some(&100.0));
    }

    #[test]
    fn default_bucket_for_missing_level() {
        let graph = GeometryGraph::from_export(&json!({
            "spaces": [{"id": "S1",
                "boundary": [{"x": 0.0, "y": 0.0}, {"x": 2.0, "y": 0.0}, {"x": 2.0, "y": 2.0}]}]
        }))
        .unwrap();
        let metrics = build_metrics(&graph, &json!({}));
        assert!(metrics.footprint_by_level_m2.contains_key("default"));
    }

    #[test]
    fn max_height_reads_both_aliases() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({}));
        assert_eq!(metrics.max_height_m, Some(12.0));
    }

    #[test]
    fn land_area_prefers_override() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({"land_area_m2": 500}));
        assert_eq!(metrics.land_area_m2, Some(500.0));
        // GFA falls back to total unit area; plot ratio derives from both.
        assert_eq!(metrics.gross_floor_area_m2, Some(140.0));
        assert_eq!(metrics.plot_ratio, Some(140.0 / 500.0));
    }

    #[test]
    fn land_area_falls_back_to_bounding_box() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({}));
        // All boundary points span a 10 x 10 box.
        assert_eq!(metrics.land_area_m2, Some(100.0));
    }

    #[test]
    fn site_coverage_uses_max_footprint() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({"land_area_m2": 200}));
        assert_eq!(metrics.site_coverage_percent, Some(50.0));
    }

    #[test]
    fn empty_graph_yields_none_not_errors() {
        let graph = GeometryGraph::from_export(&json!({})).unwrap();
        let metrics = build_metrics(&graph, &json!({}));
        assert_eq!(metrics.total_unit_area_m2, None);
        assert_eq!(metrics.land_area_m2, None);
        assert_eq!(metrics.plot_ratio, None);
        assert_eq!(metrics.site_coverage_percent, None);
        assert_eq!(metrics.max_height_m, None);
    }

    #[test]
    fn front_setback_is_override_only() {
        let metrics = build_metrics(&graph_with_two_units(), &json!({"front_setback_m": "6.0"}));
        assert_eq!(metrics.front_setback_m, Some(6.0));
        assert_eq!(metrics.get(MetricKey::FrontSetbackM), Some(6.0));
    }
}
