//! Rule-threshold checks: bind published zoning rules to derived site
//! metrics and compare with a small numeric tolerance.

use std::collections::BTreeSet;

use serde_json::json;

use zonal_geometry::{MetricKey, SiteMetrics};
use zonal_rules::ComparisonOp;

use crate::records::ZoningRule;
use crate::suggestion::{Severity, SuggestionDraft};

/// Map a rule's dotted `parameter_key` to a derivable metric. Keys this
/// engine cannot measure return `None` and the rule is skipped — those
/// belong to jurisdiction checklist tooling, not the overlay.
pub fn metric_for_parameter(parameter_key: &str) -> Option<MetricKey> {
    let leaf = parameter_key.rsplit('.').next().unwrap_or(parameter_key);
    match leaf {
        "plot_ratio" | "max_plot_ratio" => Some(MetricKey::PlotRatio),
        "max_height_m" | "max_building_height_m" | "building_height_m" => {
            Some(MetricKey::MaxHeightM)
        }
        "front_setback_m" | "min_front_setback_m" => Some(MetricKey::FrontSetbackM),
        "site_coverage" | "site_coverage_percent" | "max_site_coverage_percent" => {
            Some(MetricKey::SiteCoveragePercent)
        }
        _ => None,
    }
}

/// Compare a measured value against a rule limit, absorbing float noise
/// up to `tolerance` in the rule's favor. Returns `None` for operators a
/// threshold row cannot carry.
fn compare_with_tolerance(
    op: ComparisonOp,
    measured: f64,
    limit: f64,
    tolerance: f64,
) -> Option<bool> {
    match op {
        ComparisonOp::Le => Some(measured <= limit + tolerance),
        ComparisonOp::Lt => Some(measured < limit + tolerance),
        ComparisonOp::Ge => Some(measured >= limit - tolerance),
        ComparisonOp::Gt => Some(measured > limit - tolerance),
        ComparisonOp::Eq => Some((measured - limit).abs() <= tolerance),
        _ => None,
    }
}

fn severity_for_metric(metric: MetricKey) -> Severity {
    match metric {
        MetricKey::PlotRatio | MetricKey::MaxHeightM => Severity::High,
        MetricKey::FrontSetbackM | MetricKey::SiteCoveragePercent => Severity::Medium,
    }
}

/// Evaluate every cached rule for the resolved zone against the site
/// metrics.
///
/// A metric that no derivation produced yields exactly one `data_gap`
/// suggestion per metric, however many rules bind it. A present metric
/// that fails its comparison yields a `regulatory` suggestion scored
/// `measured / limit`.
pub fn threshold_suggestions(
    rules: &[ZoningRule],
    metrics: &SiteMetrics,
    zone_code: &str,
    tolerance: f64,
) -> Vec<SuggestionDraft> {
    let mut drafts = Vec::new();
    let mut missing_reported: BTreeSet<MetricKey> = BTreeSet::new();

    for rule in rules {
        let Some(metric) = metric_for_parameter(&rule.parameter_key) else {
            continue;
        };
        if rule.zone_code() != Some(zone_code) {
            continue;
        }

        let Some(measured) = metrics.get(metric) else {
            if missing_reported.insert(metric) {
                let mut draft = SuggestionDraft::new(
                    format!("missing_metric_{metric}"),
                    "data_gap",
                    format!("Provide {metric} data"),
                    format!(
                        "A published {} rule binds {metric}, but it is not derivable \
                         from the imported geometry. Enter the measurement to enable \
                         the check.",
                        rule.authority
                    ),
                    Severity::Low,
                    "missing_metric",
                )
                .with_prop("metric", json!(metric.to_string()))
                .with_prop("zone_code", json!(zone_code));
                draft.rule_refs = vec![rule.rule_ref()];
                drafts.push(draft);
            }
            continue;
        };

        let Some(limit) = rule.limit() else {
            tracing::warn!(
                parameter_key = %rule.parameter_key,
                value = %rule.value,
                "zoning rule value is not numeric; skipping"
            );
            continue;
        };
        let op = match rule.operator.parse::<ComparisonOp>() {
            Ok(op) => op,
            Err(reason) => {
                tracing::warn!(parameter_key = %rule.parameter_key, %reason, "skipping rule");
                continue;
            }
        };
        let Some(passed) = compare_with_tolerance(op, measured, limit, tolerance) else {
            tracing::warn!(
                parameter_key = %rule.parameter_key,
                operator = %rule.operator,
                "operator is not a threshold comparison; skipping"
            );
            continue;
        };
        if passed {
            continue;
        }

        let unit = rule.unit.as_deref().unwrap_or("");
        let mut draft = SuggestionDraft::new(
            format!("rule_violation_{}", rule.parameter_key.replace('.', "_")),
            "regulatory",
            format!("Limit breached: {}", rule.parameter_key),
            format!(
                "Measured {metric} {measured:.3} violates the {} requirement \
                 {} {} {}{unit}.",
                rule.authority, rule.parameter_key, rule.operator, rule.value
            ),
            severity_for_metric(metric),
            "rule_threshold",
        )
        .with_prop("parameter_key", json!(rule.parameter_key))
        .with_prop("measured", json!(measured))
        .with_prop("limit", json!(limit))
        .with_prop("operator", json!(rule.operator))
        .with_prop("zone_code", json!(zone_code));
        if limit != 0.0 {
            draft = draft.with_score(measured / limit);
        }
        draft.rule_refs = vec![rule.rule_ref()];
        drafts.push(draft);
    }

    drafts
}
