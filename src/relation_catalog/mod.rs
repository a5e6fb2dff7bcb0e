pub mod catalog;
pub mod config;
pub mod errors;
pub mod model_schema;
pub mod relation;

pub use catalog::{CatalogBuilder, RelationCatalog};
pub use config::CatalogConfig;
pub use errors::CatalogError;
pub use model_schema::{AttributeType, ModelSchema};
pub use relation::{Operator, RelationDescriptor, RelationKind, StaticCondition};
