//! Declarative catalog definitions.
//!
//! Relation graphs can be described in YAML and lowered into a
//! [`CatalogBuilder`]. The caller freezes the builder afterwards, so
//! definitions may be split across several documents loaded in any order.
//!
//! ```yaml
//! name: forum
//! models:
//!   - name: User
//!     table: users
//!     primary_keys: [id]
//!     attributes:
//!       id: integer
//!       login: string
//!     relations:
//!       - name: posts
//!         kind: to_many
//!         target: Post
//!         foreign_key: user_id
//!       - name: unread
//!         kind: through
//!         through: unread_posts
//!       - name: unread_threads
//!         kind: through
//!         through: unread
//!         relation: thread
//!       - name: subject
//!         kind: polymorphic
//!         discriminator: subject_type
//!         foreign_key: id
//!         primary_key: subject_id
//! ```
//!
//! `primary_key` defaults to `id`, the table name defaults to the
//! lower-cased model name, and `to_one`/`to_many`/`polymorphic` require an
//! explicit `foreign_key`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::CatalogBuilder;
use super::errors::CatalogError;
use super::model_schema::{AttributeType, ModelSchema};
use super::relation::{Operator, RelationDescriptor, StaticCondition};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default = "default_primary_keys")]
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeType>,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
}

fn default_primary_keys() -> Vec<String> {
    vec!["id".to_string()]
}

fn default_primary_key() -> String {
    "id".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RelationConfig {
    ToOne {
        name: String,
        target: String,
        #[serde(default = "default_primary_key")]
        primary_key: String,
        foreign_key: String,
        #[serde(default)]
        conditions: Vec<ConditionConfig>,
    },
    ToMany {
        name: String,
        target: String,
        #[serde(default = "default_primary_key")]
        primary_key: String,
        foreign_key: String,
        #[serde(default)]
        conditions: Vec<ConditionConfig>,
    },
    Through {
        name: String,
        through: String,
        /// Relation to resolve on the junction's target; defaults to the
        /// relation's own name.
        #[serde(default)]
        relation: Option<String>,
    },
    Polymorphic {
        name: String,
        discriminator: String,
        #[serde(default = "default_primary_key")]
        primary_key: String,
        foreign_key: String,
        #[serde(default)]
        conditions: Vec<ConditionConfig>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: Operator,
    #[serde(default)]
    pub value: Option<Value>,
}

fn default_operator() -> Operator {
    Operator::Eq
}

impl CatalogConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, CatalogError> {
        serde_yaml::from_str(input).map_err(|e| CatalogError::ConfigParse {
            error: e.to_string(),
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| CatalogError::ConfigRead {
            error: e.to_string(),
        })?;
        Self::from_yaml_str(&text)
    }

    /// Lower the definition into a builder. The caller calls `freeze`.
    pub fn apply(&self, builder: &mut CatalogBuilder) -> Result<(), CatalogError> {
        for model in &self.models {
            let table = model
                .table
                .clone()
                .unwrap_or_else(|| model.name.to_lowercase());
            let mut schema = ModelSchema::new(&model.name, table)
                .with_primary_keys(model.primary_keys.clone());
            schema.attributes = model.attributes.clone();
            builder.add_model(schema)?;
            for relation in &model.relations {
                builder.define_relation(relation.to_descriptor(&model.name))?;
            }
        }
        Ok(())
    }

    pub fn into_builder(self) -> Result<CatalogBuilder, CatalogError> {
        let mut builder = CatalogBuilder::new();
        self.apply(&mut builder)?;
        Ok(builder)
    }
}

impl RelationConfig {
    fn to_descriptor(&self, owner: &str) -> RelationDescriptor {
        match self {
            RelationConfig::ToOne {
                name,
                target,
                primary_key,
                foreign_key,
                conditions,
            } => RelationDescriptor::to_one(owner, name, target, primary_key, foreign_key)
                .with_conditions(lower_conditions(conditions)),
            RelationConfig::ToMany {
                name,
                target,
                primary_key,
                foreign_key,
                conditions,
            } => RelationDescriptor::to_many(owner, name, target, primary_key, foreign_key)
                .with_conditions(lower_conditions(conditions)),
            RelationConfig::Through {
                name,
                through,
                relation,
            } => RelationDescriptor::through(owner, name, through, relation.as_deref()),
            RelationConfig::Polymorphic {
                name,
                discriminator,
                primary_key,
                foreign_key,
                conditions,
            } => RelationDescriptor::polymorphic(owner, name, discriminator, primary_key, foreign_key)
                .with_conditions(lower_conditions(conditions)),
        }
    }
}

fn lower_conditions(conditions: &[ConditionConfig]) -> Vec<StaticCondition> {
    conditions
        .iter()
        .map(|c| StaticCondition {
            field: c.field.clone(),
            operator: c.operator,
            value: c.value.clone(),
        })
        .collect()
}
