//! Relation descriptors.
//!
//! A [`RelationDescriptor`] is the immutable, registration-time record of a
//! single declared relation. The four kinds are a closed set, matched
//! exhaustively by the path resolver:
//!
//! - `ToOne` / `ToMany` — a direct join against a fixed target model
//! - `Through` — a logical relation realized by joining another declared
//!   relation first (the junction) and continuing from its target
//! - `Polymorphic` — the target model is read per-row from a discriminator
//!   column and is unknown until query time
//!
//! `Through` descriptors are never joined directly; the resolver always
//! expands them into their physical hops.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator carried by condition specs and static join conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    #[serde(rename = "ilike")]
    ILike,
    Between,
}

impl Operator {
    /// The operator's conventional SQL spelling. Rendering the full clause
    /// is the execution collaborator's job; this is only a hint.
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ILike => "ILIKE",
            Operator::Between => "BETWEEN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ToOne,
    ToMany,
    Through,
    Polymorphic,
}

/// A condition declared on the relation itself, restricting the join
/// independent of caller input. A `None` value binds a SQL NULL literal
/// instead of a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    pub name: String,
    pub kind: RelationKind,
    pub owner_model: String,
    /// Absent for `Through` (implied by the chain) and for `Polymorphic`
    /// (resolved per-row via the discriminator).
    pub target_model: Option<String>,
    /// Key column on the parent side of the join.
    pub primary_key_field: String,
    /// Key column on the target side of the join.
    pub foreign_key_field: String,
    /// Name of an owned relation used as the indirection hop. `Through` only.
    pub through_junction: Option<String>,
    /// Name of the relation resolved on the junction's target. `Through` only.
    pub through_continuation: Option<String>,
    #[serde(default)]
    pub static_conditions: Vec<StaticCondition>,
    /// Column holding the concrete target-type tag. `Polymorphic` only.
    pub discriminator_field: Option<String>,
}

impl RelationDescriptor {
    pub fn to_one(
        owner: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::direct(RelationKind::ToOne, owner, name, target, primary_key, foreign_key)
    }

    pub fn to_many(
        owner: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::direct(RelationKind::ToMany, owner, name, target, primary_key, foreign_key)
    }

    /// A through relation joining `junction` first and then resolving
    /// `continuation` on the junction's target. When `continuation` is
    /// `None` it defaults to the relation's own name.
    pub fn through(
        owner: impl Into<String>,
        name: impl Into<String>,
        junction: impl Into<String>,
        continuation: Option<&str>,
    ) -> Self {
        let name = name.into();
        let continuation = continuation.unwrap_or(&name).to_string();
        RelationDescriptor {
            kind: RelationKind::Through,
            owner_model: owner.into(),
            target_model: None,
            primary_key_field: String::new(),
            foreign_key_field: String::new(),
            through_junction: Some(junction.into()),
            through_continuation: Some(continuation),
            static_conditions: Vec::new(),
            discriminator_field: None,
            name,
        }
    }

    pub fn polymorphic(
        owner: impl Into<String>,
        name: impl Into<String>,
        discriminator: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        RelationDescriptor {
            name: name.into(),
            kind: RelationKind::Polymorphic,
            owner_model: owner.into(),
            target_model: None,
            primary_key_field: primary_key.into(),
            foreign_key_field: foreign_key.into(),
            through_junction: None,
            through_continuation: None,
            static_conditions: Vec::new(),
            discriminator_field: Some(discriminator.into()),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<StaticCondition>) -> Self {
        self.static_conditions = conditions;
        self
    }

    fn direct(
        kind: RelationKind,
        owner: impl Into<String>,
        name: impl Into<String>,
        target: impl Into<String>,
        primary_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        RelationDescriptor {
            name: name.into(),
            kind,
            owner_model: owner.into(),
            target_model: Some(target.into()),
            primary_key_field: primary_key.into(),
            foreign_key_field: foreign_key.into(),
            through_junction: None,
            through_continuation: None,
            static_conditions: Vec::new(),
            discriminator_field: None,
        }
    }
}
