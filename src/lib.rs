//! relquery - relation-graph query planning core
//!
//! This crate resolves declarative, possibly-nested relation requests
//! against a statically declared relation graph and turns them into flat,
//! ordered join plans plus condition specs, then reassembles the flat rows
//! a query engine returns into nested record trees:
//!
//! - Relation catalog with one-to-many, many-to-one, through-indirection
//!   and polymorphic associations, frozen before any query is planned
//! - Transparent expansion of through chains into their hidden physical
//!   hops, with caller-visible logical aliases preserved
//! - Condition translation with operator suffixes, raw templates and
//!   attribute-type casting
//! - Deterministic join aliasing and static join conditions
//! - Fan-out de-duplication when folding flat rows back into records
//!
//! SQL rendering, execution and connection management live behind the
//! execution collaborator; this crate produces abstract plans only.

pub mod query_planner;
pub mod relation_catalog;
pub mod render_plan;
pub mod result_assembler;
pub mod utils;
