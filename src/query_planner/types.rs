//! Plan data types shared between the resolver, the join planner, and the
//! result assembler.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::request::RelationRequest;
use crate::relation_catalog::{RelationDescriptor, RelationKind};

/// One physical join hop.
///
/// `physical_path` is the SQL-join identity: the ordered relation names
/// from the query root, including every hidden through-junction hop.
/// `logical_path` is set only when the caller reached this hop under a
/// different name than the physical default (a through expansion collapsed
/// one or more hidden hops); junction hops themselves never carry one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub physical_path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_path: Option<Vec<String>>,
    #[serde(with = "crate::utils::serde_arc")]
    pub relation: Arc<RelationDescriptor>,
    pub parent_path: Vec<String>,
    /// Unresolved nested request, carried only by polymorphic hops for the
    /// polymorphic-resolution collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_sub_request: Option<RelationRequest>,
}

impl PathSegment {
    /// The relation name this hop nests under in assembled records.
    pub fn name(&self) -> &str {
        self.physical_path
            .last()
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn is_to_many(&self) -> bool {
        self.relation.kind == RelationKind::ToMany
    }

    pub fn is_polymorphic(&self) -> bool {
        self.relation.kind == RelationKind::Polymorphic
    }
}

/// Dot-joined path key used for alias maps and de-duplication.
pub fn path_key(path: &[String]) -> String {
    path.join(".")
}

/// Path rendering for error messages; the empty path is the query root.
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(".")
    }
}

/// Hand-off record for the polymorphic-resolution collaborator: the
/// discriminator column to read per concrete row, and the sub-request to
/// resolve against the concrete target model's own relation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct PolymorphicHop<'a> {
    pub segment: &'a PathSegment,
    pub discriminator_field: &'a str,
    pub deferred_sub_request: Option<&'a RelationRequest>,
}

pub fn polymorphic_hops(segments: &[PathSegment]) -> Vec<PolymorphicHop<'_>> {
    segments
        .iter()
        .filter(|segment| segment.is_polymorphic())
        .filter_map(|segment| {
            segment
                .relation
                .discriminator_field
                .as_deref()
                .map(|discriminator_field| PolymorphicHop {
                    segment,
                    discriminator_field,
                    deferred_sub_request: segment.deferred_sub_request.as_ref(),
                })
        })
        .collect()
}
