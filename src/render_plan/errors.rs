//! Error types for join plan construction.

use thiserror::Error;

use crate::relation_catalog::CatalogError;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RenderBuildError {
    /// A polymorphic relation cannot be joined physically: its target table
    /// is not fixed until the discriminator is read per row.
    #[error("Cannot join polymorphic relation at `{path}`")]
    PolymorphicJoin { path: String },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
