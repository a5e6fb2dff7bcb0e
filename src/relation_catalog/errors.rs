//! Error types for relation catalog registration and lookup.
//!
//! Registration-time failures (`DuplicateRelation`, `MalformedThroughChain`)
//! are fatal at startup and never surface at query time. Lookup failures
//! (`UnknownRelation`, `UnresolvedModel`) surface synchronously to the
//! caller and are never retried.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CatalogError {
    #[error("Model `{model}` is already registered")]
    DuplicateModel { model: String },

    #[error("Model `{model}` already defines a relation named `{relation}`")]
    DuplicateRelation { model: String, relation: String },

    #[error("No relation named `{relation}` on model `{model}`")]
    UnknownRelation { model: String, relation: String },

    #[error("Model `{model}` is not registered")]
    UnresolvedModel { model: String },

    #[error("Relation `{model}.{relation}` has no resolvable target model")]
    UnresolvedTarget { model: String, relation: String },

    #[error("Malformed through chain for `{model}.{relation}`: {reason}")]
    MalformedThroughChain {
        model: String,
        relation: String,
        reason: String,
    },

    #[error("Failed to read catalog definition: {error}")]
    ConfigRead { error: String },

    #[error("Failed to parse catalog definition: {error}")]
    ConfigParse { error: String },
}

impl CatalogError {
    pub fn malformed_through(
        model: impl Into<String>,
        relation: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        CatalogError::MalformedThroughChain {
            model: model.into(),
            relation: relation.into(),
            reason: reason.into(),
        }
    }
}
