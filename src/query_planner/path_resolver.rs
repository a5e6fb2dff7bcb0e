//! Request-tree expansion into ordered physical join hops.
//!
//! The resolver walks the caller's request tree by recursive descent,
//! processing siblings in order, and emits one [`PathSegment`] per physical
//! hop. Through relations are expanded transparently: the junction chain is
//! appended physically but stays invisible to the caller, and only the
//! expansion's terminal segment can carry a `logical_path`. Polymorphic
//! hops are emitted with their sub-request deferred, since the target model
//! is unknown until the discriminator is read per row.
//!
//! Two branches producing the same physical path keep the first occurrence;
//! later duplicates are dropped, not errors. Parents always precede their
//! children in the emitted list, in topological order for join emission.

use std::collections::HashSet;

use super::errors::QueryPlannerError;
use super::request::RelationRequest;
use super::types::{display_path, path_key, PathSegment};
use crate::relation_catalog::{CatalogError, RelationCatalog, RelationKind};

/// Explicit recursion bound. The relation graph may be cyclic (a model
/// reaching itself through its own relations is legal), so expansion depth
/// has to be capped rather than detected structurally.
pub const MAX_RESOLVE_DEPTH: usize = 32;

/// Expand a relation request against `root_model` into an ordered,
/// de-duplicated segment list.
pub fn resolve_request(
    catalog: &RelationCatalog,
    root_model: &str,
    request: &RelationRequest,
) -> Result<Vec<PathSegment>, QueryPlannerError> {
    catalog.model(root_model)?;
    let mut resolver = PathResolver::new(catalog);
    resolver.resolve_tree(root_model, &[], request, 0)?;
    Ok(resolver.into_segments())
}

pub(crate) struct PathResolver<'a> {
    catalog: &'a RelationCatalog,
    segments: Vec<PathSegment>,
    seen: HashSet<String>,
}

impl<'a> PathResolver<'a> {
    pub(crate) fn new(catalog: &'a RelationCatalog) -> Self {
        PathResolver {
            catalog,
            segments: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub(crate) fn into_segments(self) -> Vec<PathSegment> {
        self.segments
    }

    pub(crate) fn resolve_tree(
        &mut self,
        model: &str,
        parent: &[String],
        request: &RelationRequest,
        depth: usize,
    ) -> Result<(), QueryPlannerError> {
        match request {
            RelationRequest::Name(name) => {
                let label = child_label(parent, name);
                self.resolve_relation(model, parent, name, None, Some(label), depth)?;
            }
            RelationRequest::Seq(items) => {
                for item in items {
                    self.resolve_tree(model, parent, item, depth)?;
                }
            }
            RelationRequest::Tree(entries) => {
                for (name, sub) in entries {
                    let label = child_label(parent, name);
                    self.resolve_relation(model, parent, name, Some(sub), Some(label), depth)?;
                }
            }
        }
        Ok(())
    }

    /// Resolve one named step. `label` is the caller-visible alias path for
    /// the step's terminal segment; junction hops pass `None` so that
    /// nothing produced by a junction expansion is ever tagged. Returns the
    /// terminal physical path and, when concrete, the terminal target model.
    pub(crate) fn resolve_relation(
        &mut self,
        model: &str,
        parent: &[String],
        name: &str,
        sub: Option<&RelationRequest>,
        label: Option<Vec<String>>,
        depth: usize,
    ) -> Result<(Vec<String>, Option<String>), QueryPlannerError> {
        if depth >= MAX_RESOLVE_DEPTH {
            return Err(QueryPlannerError::MaxDepthExceeded {
                max: MAX_RESOLVE_DEPTH,
                at: display_path(&child_label(parent, name)),
            });
        }
        let relation =
            self.catalog
                .relation(model, name)
                .map_err(|_| QueryPlannerError::UnknownRelation {
                    model: model.to_string(),
                    relation: name.to_string(),
                    at: display_path(&child_label(parent, name)),
                })?;

        match relation.kind {
            RelationKind::ToOne | RelationKind::ToMany => {
                let physical = child_label(parent, &relation.name);
                let logical = label.filter(|candidate| *candidate != physical);
                self.push_segment(PathSegment {
                    physical_path: physical.clone(),
                    logical_path: logical,
                    relation: relation.clone(),
                    parent_path: parent.to_vec(),
                    deferred_sub_request: None,
                });
                let target = self.catalog.target_model(&relation)?.name.clone();
                if let Some(sub) = sub {
                    self.resolve_tree(&target, &physical, sub, depth + 1)?;
                }
                Ok((physical, Some(target)))
            }
            RelationKind::Polymorphic => {
                let physical = child_label(parent, &relation.name);
                let logical = label.filter(|candidate| *candidate != physical);
                log::debug!(
                    "deferring polymorphic hop `{}` for per-row resolution",
                    path_key(&physical)
                );
                self.push_segment(PathSegment {
                    physical_path: physical.clone(),
                    logical_path: logical,
                    relation: relation.clone(),
                    parent_path: parent.to_vec(),
                    deferred_sub_request: sub.cloned(),
                });
                Ok((physical, None))
            }
            RelationKind::Through => {
                let junction = relation.through_junction.clone().ok_or_else(|| {
                    CatalogError::malformed_through(model, name, "missing junction relation")
                })?;
                let continuation = relation.through_continuation.clone().ok_or_else(|| {
                    CatalogError::malformed_through(model, name, "missing continuation relation")
                })?;
                log::trace!(
                    "expanding through `{model}.{name}` via junction `{junction}` at `{}`",
                    display_path(parent)
                );
                let (junction_path, junction_model) =
                    self.resolve_relation(model, parent, &junction, None, None, depth + 1)?;
                let junction_model = junction_model.ok_or_else(|| {
                    QueryPlannerError::from(CatalogError::malformed_through(
                        model,
                        name,
                        format!("junction `{junction}` ends in a polymorphic relation"),
                    ))
                })?;
                // The caller's sub-tree and label travel with the
                // continuation; the junction stays invisible.
                self.resolve_relation(
                    &junction_model,
                    &junction_path,
                    &continuation,
                    sub,
                    label,
                    depth + 1,
                )
            }
        }
    }

    fn push_segment(&mut self, segment: PathSegment) {
        let key = path_key(&segment.physical_path);
        if self.seen.insert(key) {
            self.segments.push(segment);
        } else {
            log::trace!(
                "dropping duplicate path `{}`",
                path_key(&segment.physical_path)
            );
        }
    }
}

fn child_label(parent: &[String], name: &str) -> Vec<String> {
    let mut label = parent.to_vec();
    label.push(name.to_string());
    label
}
