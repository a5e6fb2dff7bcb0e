//! Two-phase relation catalog.
//!
//! Registration happens through [`CatalogBuilder`], which accepts models and
//! relation descriptors in any order — forward references to not-yet-added
//! models are legal. [`CatalogBuilder::freeze`] validates the whole graph
//! and returns an immutable [`RelationCatalog`]:
//!
//! - every referenced target model must be registered by then
//! - every through chain must be well formed and terminate
//!
//! The frozen catalog is never mutated and is safe for unsynchronized
//! concurrent reads by any number of in-flight planning calls.

use std::collections::HashMap;
use std::sync::Arc;

use super::errors::CatalogError;
use super::model_schema::ModelSchema;
use super::relation::{RelationDescriptor, RelationKind};

/// Hard bound on through-chain expansion during validation. A chain this
/// deep is always a cycle in practice.
const MAX_THROUGH_DEPTH: usize = 16;

#[derive(Debug, Default)]
pub struct CatalogBuilder {
    models: HashMap<String, ModelSchema>,
    // owner model -> name -> descriptor, insertion order irrelevant for lookup
    relations: HashMap<String, HashMap<String, Arc<RelationDescriptor>>>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: ModelSchema) -> Result<(), CatalogError> {
        if self.models.contains_key(&model.name) {
            return Err(CatalogError::DuplicateModel { model: model.name });
        }
        self.models.insert(model.name.clone(), model);
        Ok(())
    }

    /// Register a relation on its owner model. The owner and target models
    /// do not need to exist yet; dangling references are caught by
    /// [`freeze`](Self::freeze). A name collision on the owner fails
    /// immediately.
    pub fn define_relation(&mut self, descriptor: RelationDescriptor) -> Result<(), CatalogError> {
        let owned = self
            .relations
            .entry(descriptor.owner_model.clone())
            .or_default();
        if owned.contains_key(&descriptor.name) {
            return Err(CatalogError::DuplicateRelation {
                model: descriptor.owner_model,
                relation: descriptor.name,
            });
        }
        owned.insert(descriptor.name.clone(), Arc::new(descriptor));
        Ok(())
    }

    /// Validate the registered graph and freeze it. Fails loudly on any
    /// still-dangling model reference and on malformed through chains, so
    /// that no query plan can ever be built against a broken graph.
    pub fn freeze(self) -> Result<RelationCatalog, CatalogError> {
        for (owner, relations) in &self.relations {
            if !self.models.contains_key(owner) {
                return Err(CatalogError::UnresolvedModel {
                    model: owner.clone(),
                });
            }
            for descriptor in relations.values() {
                self.validate_descriptor(descriptor)?;
            }
        }
        log::debug!(
            "catalog frozen: {} models, {} relations",
            self.models.len(),
            self.relations.values().map(|r| r.len()).sum::<usize>()
        );
        Ok(RelationCatalog {
            models: self.models,
            relations: self.relations,
        })
    }

    fn validate_descriptor(&self, descriptor: &RelationDescriptor) -> Result<(), CatalogError> {
        match descriptor.kind {
            RelationKind::ToOne | RelationKind::ToMany => {
                let target = descriptor.target_model.as_deref().ok_or_else(|| {
                    CatalogError::UnresolvedTarget {
                        model: descriptor.owner_model.clone(),
                        relation: descriptor.name.clone(),
                    }
                })?;
                if !self.models.contains_key(target) {
                    return Err(CatalogError::UnresolvedModel {
                        model: target.to_string(),
                    });
                }
                Ok(())
            }
            RelationKind::Polymorphic => Ok(()),
            RelationKind::Through => {
                self.terminal_target(&descriptor.owner_model, descriptor, 0)
                    .map(|_| ())
            }
        }
    }

    /// Walk a through chain to its terminal relation, validating every hop.
    /// Returns the terminal target model, or `None` when the chain ends in
    /// a polymorphic relation.
    fn terminal_target(
        &self,
        owner: &str,
        descriptor: &RelationDescriptor,
        depth: usize,
    ) -> Result<Option<String>, CatalogError> {
        if depth >= MAX_THROUGH_DEPTH {
            return Err(CatalogError::malformed_through(
                owner,
                &descriptor.name,
                "through chain does not terminate",
            ));
        }
        let junction_name = descriptor.through_junction.as_deref().ok_or_else(|| {
            CatalogError::malformed_through(owner, &descriptor.name, "missing junction relation")
        })?;
        let continuation_name = descriptor.through_continuation.as_deref().ok_or_else(|| {
            CatalogError::malformed_through(owner, &descriptor.name, "missing continuation relation")
        })?;

        let junction = self.lookup(owner, junction_name).ok_or_else(|| {
            CatalogError::malformed_through(
                owner,
                &descriptor.name,
                format!("junction `{junction_name}` is not a relation on `{owner}`"),
            )
        })?;
        let junction_target = match junction.kind {
            RelationKind::Polymorphic => {
                return Err(CatalogError::malformed_through(
                    owner,
                    &descriptor.name,
                    format!("junction `{junction_name}` is polymorphic"),
                ));
            }
            RelationKind::Through => self
                .terminal_target(owner, &junction, depth + 1)?
                .ok_or_else(|| {
                    CatalogError::malformed_through(
                        owner,
                        &descriptor.name,
                        format!("junction `{junction_name}` ends in a polymorphic relation"),
                    )
                })?,
            RelationKind::ToOne | RelationKind::ToMany => junction
                .target_model
                .clone()
                .filter(|m| self.models.contains_key(m))
                .ok_or_else(|| CatalogError::UnresolvedModel {
                    model: junction.target_model.clone().unwrap_or_default(),
                })?,
        };

        let continuation = self.lookup(&junction_target, continuation_name).ok_or_else(|| {
            CatalogError::malformed_through(
                owner,
                &descriptor.name,
                format!(
                    "continuation `{continuation_name}` is not a relation on `{junction_target}`"
                ),
            )
        })?;
        match continuation.kind {
            RelationKind::Through => {
                self.terminal_target(&junction_target, &continuation, depth + 1)
            }
            RelationKind::Polymorphic => Ok(None),
            RelationKind::ToOne | RelationKind::ToMany => {
                let target = continuation
                    .target_model
                    .clone()
                    .filter(|m| self.models.contains_key(m))
                    .ok_or_else(|| CatalogError::UnresolvedModel {
                        model: continuation.target_model.clone().unwrap_or_default(),
                    })?;
                Ok(Some(target))
            }
        }
    }

    fn lookup(&self, model: &str, relation: &str) -> Option<Arc<RelationDescriptor>> {
        self.relations.get(model)?.get(relation).cloned()
    }
}

/// Frozen, read-only relation graph. `Send + Sync`; share via `Arc` across
/// planning threads.
#[derive(Debug, Clone)]
pub struct RelationCatalog {
    models: HashMap<String, ModelSchema>,
    relations: HashMap<String, HashMap<String, Arc<RelationDescriptor>>>,
}

impl RelationCatalog {
    pub fn model(&self, name: &str) -> Result<&ModelSchema, CatalogError> {
        self.models.get(name).ok_or_else(|| CatalogError::UnresolvedModel {
            model: name.to_string(),
        })
    }

    pub fn relation(&self, model: &str, name: &str) -> Result<Arc<RelationDescriptor>, CatalogError> {
        self.relations
            .get(model)
            .and_then(|relations| relations.get(name))
            .cloned()
            .ok_or_else(|| CatalogError::UnknownRelation {
                model: model.to_string(),
                relation: name.to_string(),
            })
    }

    /// The target model schema of a concrete (non-through, non-polymorphic)
    /// relation.
    pub fn target_model(&self, relation: &RelationDescriptor) -> Result<&ModelSchema, CatalogError> {
        match relation.target_model.as_deref() {
            Some(target) => self.model(target),
            None => Err(CatalogError::UnresolvedTarget {
                model: relation.owner_model.clone(),
                relation: relation.name.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_model() -> ModelSchema {
        ModelSchema::new("User", "users")
    }

    fn post_model() -> ModelSchema {
        ModelSchema::new("Post", "posts")
    }

    #[test]
    fn duplicate_relation_fails_at_definition_time() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap();
        let err = builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::DuplicateRelation {
                model: "User".into(),
                relation: "posts".into()
            }
        );
    }

    #[test]
    fn forward_references_are_legal_until_freeze() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        // Post is not registered yet at definition time
        builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap();
        builder.add_model(post_model()).unwrap();
        assert!(builder.freeze().is_ok());
    }

    #[test]
    fn freeze_fails_loudly_on_dangling_target() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap();
        let err = builder.freeze().unwrap_err();
        assert_eq!(err, CatalogError::UnresolvedModel { model: "Post".into() });
    }

    #[test]
    fn through_with_unknown_continuation_fails_at_freeze() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        builder.add_model(post_model()).unwrap();
        builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap();
        builder
            .define_relation(RelationDescriptor::through("User", "threads", "posts", Some("thread")))
            .unwrap();
        let err = builder.freeze().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedThroughChain { .. }));
    }

    #[test]
    fn cyclic_through_chain_fails_at_freeze() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        // `loop_rel` names itself as its own junction
        builder
            .define_relation(RelationDescriptor::through("User", "loop_rel", "loop_rel", None))
            .unwrap();
        let err = builder.freeze().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedThroughChain { .. }));
    }

    #[test]
    fn polymorphic_junction_is_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        builder
            .define_relation(RelationDescriptor::polymorphic(
                "User",
                "subject",
                "subject_type",
                "subject_id",
                "id",
            ))
            .unwrap();
        builder
            .define_relation(RelationDescriptor::through("User", "subjects", "subject", Some("anything")))
            .unwrap();
        let err = builder.freeze().unwrap_err();
        assert!(matches!(err, CatalogError::MalformedThroughChain { .. }));
    }

    #[test]
    fn unknown_relation_lookup_after_freeze() {
        let mut builder = CatalogBuilder::new();
        builder.add_model(user_model()).unwrap();
        let catalog = builder.freeze().unwrap();
        let err = catalog.relation("User", "posts").unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownRelation {
                model: "User".into(),
                relation: "posts".into()
            }
        );
    }
}
