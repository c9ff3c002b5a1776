//! Heuristic triggers — independent of any stored zoning rule.
//!
//! Each trigger is a small pure function of the graph and the derived
//! site metrics, producing suggestion drafts with stable codes.

use serde_json::{json, Value};

use zonal_geometry::{polygon_area, GeometryGraph, SiteMetrics};
use zonal_rules::is_truthy;

use crate::engine::EngineConfig;
use crate::suggestion::{Severity, SuggestionDraft};

/// Flood-zone metadata values that warrant mitigation planning.
const FLOOD_ZONES: &[&str] = &["coastal", "river", "flood"];

/// Run every heuristic trigger over one geometry.
pub fn heuristic_suggestions(
    graph: &GeometryGraph,
    metrics: &SiteMetrics,
    config: &EngineConfig,
) -> Vec<SuggestionDraft> {
    let mut drafts = Vec::new();

    // Heritage conservation: any level flagged as heritage zone.
    let heritage_levels: Vec<String> = graph
        .levels()
        .filter(|level| level.metadata.get("heritage_zone").map(is_truthy).unwrap_or(false))
        .map(|level| level.id.clone())
        .collect();
    if !heritage_levels.is_empty() {
        drafts.push(
            SuggestionDraft::new(
                "heritage_conservation",
                "risk_flag",
                "Heritage conservation review",
                format!(
                    "{} level(s) carry a heritage zone flag; a conservation review is \
                     required before redevelopment consent.",
                    heritage_levels.len()
                ),
                Severity::Medium,
                "heritage_zone",
            )
            .with_targets(heritage_levels),
        );
    }

    // Tall-building scan feeds both its own trigger and the combined
    // coastal evacuation check below.
    let mut tall_entities: Vec<(String, f64)> = Vec::new();
    for entity in graph.all_entities() {
        if let Some(height) = entity.height_m() {
            if height >= config.tall_building_height_m {
                tall_entities.push((entity.id().to_string(), height));
            }
        }
    }

    // Flood zone: first declared flood-zone value anywhere in the graph.
    let flood = graph.all_entities().into_iter().find_map(|entity| {
        entity
            .metadata()
            .get("flood_zone")
            .and_then(Value::as_str)
            .map(str::to_ascii_lowercase)
            .filter(|zone| FLOOD_ZONES.contains(&zone.as_str()))
            .map(|zone| (entity.id().to_string(), zone))
    });
    if let Some((entity_id, zone)) = &flood {
        drafts.push(
            SuggestionDraft::new(
                "flood_mitigation",
                "risk_flag",
                "Flood mitigation measures",
                format!("The site is declared in a {zone} flood zone; mitigation measures apply."),
                Severity::Medium,
                "flood_zone",
            )
            .with_prop("flood_zone", json!(zone))
            .with_targets(vec![entity_id.clone()]),
        );

        if zone.as_str() == "coastal" && !tall_entities.is_empty() {
            let mut combined = SuggestionDraft::new(
                "coastal_evacuation_planning",
                "risk_flag",
                "Coastal evacuation planning",
                "A tall building in a coastal flood zone requires an evacuation plan \
                 as part of the development submission."
                    .to_string(),
                Severity::High,
                "flood_zone",
            )
            .with_prop("flood_zone", json!(zone))
            .with_targets(tall_entities.iter().map(|(id, _)| id.clone()).collect());
            combined.triggers.push("tall_building".to_string());
            drafts.push(combined);
        }
    }

    // Large site.
    if let Some(land) = metrics.land_area_m2 {
        if land > config.large_site_area_m2 {
            drafts.push(
                SuggestionDraft::new(
                    "large_site_review",
                    "risk_flag",
                    "Large site planning review",
                    format!(
                        "Site area {land:.0} m2 exceeds the {:.0} m2 large-site threshold; \
                         a planning review applies.",
                        config.large_site_area_m2
                    ),
                    Severity::Medium,
                    "large_site",
                )
                .with_prop("site_area_m2", json!(land)),
            );
        }
    }

    // Tall building impact assessment.
    if !tall_entities.is_empty() {
        let max_height = tall_entities
            .iter()
            .map(|(_, h)| *h)
            .fold(f64::NEG_INFINITY, f64::max);
        drafts.push(
            SuggestionDraft::new(
                "tall_building_review",
                "risk_flag",
                "Tall building impact assessment",
                format!(
                    "Tallest declared height {max_height:.1} m meets or exceeds the \
                     {:.0} m review trigger.",
                    config.tall_building_height_m
                ),
                Severity::High,
                "tall_building",
            )
            .with_score(max_height / config.tall_building_height_m)
            .with_prop("max_height_m", json!(max_height))
            .with_targets(tall_entities.iter().map(|(id, _)| id.clone()).collect()),
        );
    }

    // Per-space unit summaries.
    let mut unit_count = 0usize;
    for space in graph.spaces() {
        if space.boundary.len() < 3 {
            continue;
        }
        unit_count += 1;
        let area = polygon_area(&space.boundary);
        let severity = if area >= config.large_unit_area_m2 {
            Severity::Medium
        } else {
            Severity::Low
        };
        let label = space.name.clone().unwrap_or_else(|| space.id.clone());
        drafts.push(
            SuggestionDraft::new(
                format!("unit_space_{}", space.id),
                "information",
                format!("Unit summary: {label}"),
                format!("Unit {label} has a floor area of {area:.1} m2."),
                severity,
                "unit_summary",
            )
            .with_prop("area_m2", json!(area))
            .with_prop(
                "level_id",
                space
                    .level_id
                    .as_deref()
                    .map(|id| json!(id))
                    .unwrap_or(Value::Null),
            )
            .with_targets(vec![space.id.clone()]),
        );
    }

    // Aggregate unit area coverage.
    if let Some(total) = metrics.total_unit_area_m2 {
        if total > 0.0 {
            let mut draft = SuggestionDraft::new(
                "unit_area_coverage",
                "information",
                "Unit area coverage",
                format!("{unit_count} unit(s) totalling {total:.1} m2 of floor area."),
                Severity::Low,
                "unit_area",
            )
            .with_prop("total_unit_area_m2", json!(total))
            .with_prop("unit_count", json!(unit_count));
            if let Some(coverage) = metrics.site_coverage_percent {
                draft = draft.with_prop("site_coverage_percent", json!(coverage));
            }
            drafts.push(draft);
        }
    }

    drafts
}
