use thiserror::Error;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("invalid geometry payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("{kind} {id} references missing level {level_id}")]
    DanglingLevel {
        kind: EntityKind,
        id: String,
        level_id: String,
    },

    #[error("relationship '{kind}' references missing entity {id}")]
    DanglingRelationship { kind: String, id: String },
}
