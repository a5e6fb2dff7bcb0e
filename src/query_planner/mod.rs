//! Query planning facade.
//!
//! Planning is an ordered list of pure passes over the caller's input:
//!
//! 1. request resolution — the relation request tree expands into ordered
//!    [`PathSegment`](types::PathSegment)s
//! 2. condition translation — nested condition objects and raw templates
//!    become [`ConditionSpec`](conditions::ConditionSpec)s
//! 3. auto-join injection — condition paths are added to the join set when
//!    enabled
//! 4. join emission — the join set becomes an alias-resolved
//!    [`JoinPlan`](crate::render_plan::JoinPlan)
//!
//! Each pass is a function of the previous pass's output; nothing here
//! blocks, suspends, or shares mutable state between invocations. Running
//! the plan and feeding the flat rows back through
//! [`result_assembler::assemble`](crate::result_assembler::assemble) is the
//! execution collaborator's side of the contract.
//!
//! [`plan`] is the joined-query path and refuses polymorphic hops. For
//! include-style loading across polymorphic relations, resolve with
//! [`resolve_request`] and hand the hops from [`polymorphic_hops`] to the
//! per-row resolution cycle.

pub mod conditions;
pub mod errors;
pub mod path_resolver;
pub mod request;
pub mod types;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub use conditions::{
    translate_conditions, ConditionInput, ConditionSpec, RawArgs, RenderShape,
    TranslatedConditions,
};
pub use errors::QueryPlannerError;
pub use path_resolver::{resolve_request, MAX_RESOLVE_DEPTH};
pub use request::RelationRequest;
pub use types::{path_key, polymorphic_hops, PathSegment, PolymorphicHop};

use crate::relation_catalog::RelationCatalog;
use crate::render_plan::{build_join_plan, JoinPlan, JoinPlannerOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort entry carried on the plan untranslated, in caller order, for the
/// execution collaborator's ORDER BY rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderSpec {
    pub fn asc(column: impl Into<String>) -> Self {
        OrderSpec {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        OrderSpec {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Everything the execution collaborator needs to render and run the
/// query, and everything the assembler needs afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub conditions: Vec<ConditionSpec>,
    pub order: Vec<OrderSpec>,
    pub joins: JoinPlan,
}

impl QueryPlan {
    /// The segment list the joins were emitted from; feed it back into the
    /// result assembler together with the flat rows.
    pub fn segments(&self) -> &[PathSegment] {
        &self.joins.segments
    }
}

pub fn plan(
    catalog: &RelationCatalog,
    root_model: &str,
    request: Option<&RelationRequest>,
    conditions: &[ConditionInput],
    order: &[OrderSpec],
    options: &JoinPlannerOptions,
) -> Result<QueryPlan, QueryPlannerError> {
    let segments = match request {
        Some(request) => resolve_request(catalog, root_model, request)?,
        None => Vec::new(),
    };
    let translated = translate_conditions(catalog, root_model, conditions)?;
    let joins = build_join_plan(
        catalog,
        root_model,
        &segments,
        &translated.specs,
        &translated.segments,
        options,
    )?;
    log::debug!(
        "planned `{root_model}` query: {} joins, {} conditions",
        joins.joins.len(),
        translated.specs.len()
    );
    Ok(QueryPlan {
        conditions: translated.specs,
        order: order.to_vec(),
        joins,
    })
}
