//! The predicate grammar as a closed sum type.
//!
//! Config sources (YAML or JSON) write predicates as mappings keyed by
//! their kind — `{"all": [...]}`, `{"field": ..., "operator": ...}` — and
//! serde picks the variant from the keys present. A mapping that matches
//! no variant is a deserialization error, which the pack loader surfaces
//! as a configuration error.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One node of a predicate tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    /// Passes only if every child passes. Children are all evaluated —
    /// no short-circuit — so the report carries every failure.
    All {
        all: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Passes on the first passing child.
    Any {
        any: Vec<Predicate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Inverts a single child.
    Not {
        not: Box<Predicate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Passes iff the resolved field value is not absent (null).
    Exists { exists: String },

    /// Leaf comparison.
    Field(FieldPredicate),
}

/// A leaf comparison: resolved field vs. an expected value.
///
/// Exactly one of `value` / `value_field` / `value_path` supplies the
/// right-hand side; a plain string `value` beginning with `$` is itself
/// resolved as a field path (value-to-value comparison).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: String,
    pub operator: ComparisonOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_path: Option<String>,
    /// Overrides the operator-specific failure message template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Comparison operators accepted by leaf predicates and by stored
/// zoning-rule rows (`=` and `==` are synonyms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = "==", alias = "=", alias = "eq")]
    Eq,
    #[serde(rename = "!=", alias = "ne")]
    Ne,
    #[serde(rename = ">", alias = "gt")]
    Gt,
    #[serde(rename = ">=", alias = "gte")]
    Ge,
    #[serde(rename = "<", alias = "lt")]
    Lt,
    #[serde(rename = "<=", alias = "lte")]
    Le,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not_in")]
    NotIn,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "not_contains")]
    NotContains,
    #[serde(rename = "is_truthy")]
    IsTruthy,
    #[serde(rename = "is_falsy")]
    IsFalsy,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::IsTruthy => "is_truthy",
            Self::IsFalsy => "is_falsy",
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "=" | "eq" => Ok(Self::Eq),
            "!=" | "ne" => Ok(Self::Ne),
            ">" | "gt" => Ok(Self::Gt),
            ">=" | "gte" => Ok(Self::Ge),
            "<" | "lt" => Ok(Self::Lt),
            "<=" | "lte" => Ok(Self::Le),
            "in" => Ok(Self::In),
            "not_in" => Ok(Self::NotIn),
            "contains" => Ok(Self::Contains),
            "not_contains" => Ok(Self::NotContains),
            "is_truthy" => Ok(Self::IsTruthy),
            "is_falsy" => Ok(Self::IsFalsy),
            other => Err(format!("unknown comparison operator '{other}'")),
        }
    }
}
