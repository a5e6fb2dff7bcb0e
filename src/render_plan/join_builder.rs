//! Join clause emission.
//!
//! Takes the resolved segment list restricted to hops that need a physical
//! join — the explicit join request plus, in auto-join mode, every path a
//! condition spec touches — and emits alias-resolved join clauses in
//! parent-before-child order.
//!
//! Alias rule: the default alias is the dot-joined physical path, collapsed
//! to the bare table name only when that does not collide with an alias
//! already in the plan (the root table claims its name first). Collisions
//! are resolved deterministically, never errors.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::errors::RenderBuildError;
use super::{BoundCondition, JoinClause, JoinPlan, JoinType};
use crate::query_planner::conditions::ConditionSpec;
use crate::query_planner::types::{path_key, PathSegment};
use crate::relation_catalog::RelationCatalog;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinPlannerOptions {
    /// Join type for explicitly requested joins. Auto-injected joins are
    /// always LEFT.
    pub join_type: JoinType,
    /// Inject joins for every physical path referenced by a condition.
    pub auto_join: bool,
    /// When non-empty, only conditions whose path ends in one of these
    /// relation names trigger auto-join injection. An admitted path admits
    /// its whole prefix chain.
    pub auto_join_relations: Vec<String>,
}

pub fn build_join_plan(
    catalog: &RelationCatalog,
    root_model: &str,
    explicit: &[PathSegment],
    conditions: &[ConditionSpec],
    condition_segments: &[PathSegment],
    options: &JoinPlannerOptions,
) -> Result<JoinPlan, RenderBuildError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut joined: Vec<(PathSegment, JoinType)> = Vec::new();

    for segment in explicit {
        if seen.insert(path_key(&segment.physical_path)) {
            joined.push((segment.clone(), options.join_type));
        }
    }

    if options.auto_join {
        let admitted =
            admitted_condition_paths(conditions, condition_segments, &options.auto_join_relations);
        for segment in condition_segments {
            let key = path_key(&segment.physical_path);
            if admitted.contains(&key) && seen.insert(key) {
                log::debug!(
                    "auto-joining `{}` referenced by a condition",
                    path_key(&segment.physical_path)
                );
                joined.push((segment.clone(), JoinType::Left));
            }
        }
    }

    // Refuse the whole plan before emitting anything.
    for (segment, _) in &joined {
        if segment.is_polymorphic() {
            return Err(RenderBuildError::PolymorphicJoin {
                path: path_key(&segment.physical_path),
            });
        }
    }

    let root_table = catalog.model(root_model)?.table_name.clone();
    let mut used_aliases: HashSet<String> = HashSet::new();
    used_aliases.insert(root_table.clone());
    let mut alias_map: HashMap<String, String> = HashMap::new();
    let mut joins = Vec::with_capacity(joined.len());

    for (segment, join_type) in &joined {
        let target = catalog.target_model(&segment.relation)?;
        let key = path_key(&segment.physical_path);
        let alias = if used_aliases.contains(&target.table_name) {
            log::debug!(
                "alias `{}` taken, keeping path alias `{key}`",
                target.table_name
            );
            key.clone()
        } else {
            target.table_name.clone()
        };
        used_aliases.insert(alias.clone());
        alias_map.insert(key, alias.clone());

        let parent_key = path_key(&segment.parent_path);
        let parent_alias = if segment.parent_path.is_empty() {
            root_table.clone()
        } else {
            alias_map.get(&parent_key).cloned().unwrap_or(parent_key)
        };

        joins.push(JoinClause {
            join_type: *join_type,
            table: target.table_name.clone(),
            alias,
            parent_alias,
            parent_key: segment.relation.primary_key_field.clone(),
            child_key: segment.relation.foreign_key_field.clone(),
            static_conditions: segment
                .relation
                .static_conditions
                .iter()
                .map(|condition| BoundCondition {
                    field: condition.field.clone(),
                    operator: condition.operator,
                    value: condition.value.clone().filter(|v| !is_falsy(v)),
                })
                .collect(),
        });
    }

    Ok(JoinPlan {
        segments: joined.into_iter().map(|(segment, _)| segment).collect(),
        joins,
        alias_map,
    })
}

fn admitted_condition_paths(
    conditions: &[ConditionSpec],
    condition_segments: &[PathSegment],
    allow_list: &[String],
) -> HashSet<String> {
    let by_key: HashMap<String, &PathSegment> = condition_segments
        .iter()
        .map(|segment| (path_key(&segment.physical_path), segment))
        .collect();
    let mut admitted = HashSet::new();
    for condition in conditions {
        let ConditionSpec::Field { physical_path, .. } = condition else {
            continue;
        };
        if physical_path.is_empty() {
            continue;
        }
        // The allow-list names relations the way the caller wrote them, so
        // a collapsed through hop is matched by its logical name.
        let key = path_key(physical_path);
        let visible_name = by_key
            .get(&key)
            .map(|segment| {
                segment
                    .logical_path
                    .as_ref()
                    .and_then(|logical| logical.last())
                    .map(String::as_str)
                    .unwrap_or_else(|| segment.name())
            })
            .unwrap_or_else(|| physical_path.last().map(String::as_str).unwrap_or_default());
        if !allow_list.is_empty() && !allow_list.iter().any(|name| name == visible_name) {
            continue;
        }
        for end in 1..=physical_path.len() {
            admitted.insert(path_key(&physical_path[..end]));
        }
    }
    admitted
}

/// A declared static-condition value binds as a parameter unless it is
/// absent or falsy, in which case the clause compares against a SQL NULL
/// literal.
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
