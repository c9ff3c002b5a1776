use thiserror::Error;

use zonal_geometry::GeometryError;
use zonal_rules::RuleError;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}
