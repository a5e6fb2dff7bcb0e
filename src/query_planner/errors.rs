//! Error types for request resolution and condition translation.

use thiserror::Error;

use crate::relation_catalog::CatalogError;
use crate::render_plan::errors::RenderBuildError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryPlannerError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// A requested name was absent at its current path. Carries the full
    /// physical path at the point of failure.
    #[error("No relation named `{relation}` on model `{model}` (requested path `{at}`)")]
    UnknownRelation {
        model: String,
        relation: String,
        at: String,
    },

    #[error("Relation resolution exceeded {max} hops at `{at}`")]
    MaxDepthExceeded { max: usize, at: String },

    #[error("Relation request must be a name, a list, or a mapping, got {got}")]
    InvalidRequestShape { got: String },

    #[error("Conditions must be given as a mapping, got {got}")]
    InvalidConditionShape { got: String },

    #[error(transparent)]
    Join(#[from] RenderBuildError),
}
