//! Abstract join plan types.
//!
//! The join planner does not render SQL text; it produces ordered,
//! alias-resolved join clauses plus the `physical path → alias` map the
//! execution collaborator needs to qualify columns.

pub mod errors;
pub mod join_builder;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query_planner::types::PathSegment;
use crate::relation_catalog::Operator;

pub use join_builder::{build_join_plan, JoinPlannerOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Left,
    Inner,
    Right,
    Full,
}

impl JoinType {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            JoinType::Left => "LEFT JOIN",
            JoinType::Inner => "INNER JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL OUTER JOIN",
        }
    }
}

/// A relation's static extra condition, bound for emission: `Some` binds
/// the literal as a parameter, `None` stands for a SQL NULL literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCondition {
    pub field: String,
    pub operator: Operator,
    pub value: Option<Value>,
}

/// `join_type` `table` AS `alias` ON `parent_alias.parent_key` =
/// `alias.child_key` [AND one bound comparison per static condition].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    pub join_type: JoinType,
    pub table: String,
    pub alias: String,
    pub parent_alias: String,
    pub parent_key: String,
    pub child_key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_conditions: Vec<BoundCondition>,
}

/// Ordered join clauses (parents always precede children), the segment
/// list they were emitted from, and the alias map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinPlan {
    pub segments: Vec<PathSegment>,
    pub joins: Vec<JoinClause>,
    /// Dot-joined physical path → alias.
    pub alias_map: HashMap<String, String>,
}
