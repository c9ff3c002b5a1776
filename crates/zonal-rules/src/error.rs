use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule '{rule_id}' has unsupported target '{target}'")]
    UnsupportedTarget { rule_id: String, target: String },

    #[error("invalid rule pack: {0}")]
    InvalidPack(String),

    #[error("rule pack parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("rule pack parse error: {0}")]
    Json(#[from] serde_json::Error),
}
