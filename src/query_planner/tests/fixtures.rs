//! Forum relation graph used across the planner suites.
//!
//! `unread_posts` is a junction table marking posts a user has not read
//! yet. `unread` exposes the marked posts through it, and `unread_threads`
//! chains further to the threads those posts belong to, so a single
//! caller-visible step hides up to two junction hops.

use crate::relation_catalog::{
    AttributeType, CatalogBuilder, ModelSchema, RelationCatalog, RelationDescriptor,
};

pub fn forum_catalog() -> RelationCatalog {
    let mut builder = CatalogBuilder::new();
    builder
        .add_model(
            ModelSchema::new("User", "users")
                .with_attribute("id", AttributeType::Integer)
                .with_attribute("login", AttributeType::String),
        )
        .unwrap();
    builder
        .add_model(
            ModelSchema::new("Post", "posts")
                .with_attribute("id", AttributeType::Integer)
                .with_attribute("message", AttributeType::String)
                .with_attribute("thread_id", AttributeType::Integer),
        )
        .unwrap();
    builder
        .add_model(
            ModelSchema::new("Thread", "threads")
                .with_attribute("id", AttributeType::Integer)
                .with_attribute("title", AttributeType::String),
        )
        .unwrap();
    builder
        .add_model(ModelSchema::new("UnreadPost", "unread_posts"))
        .unwrap();

    builder
        .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::to_many(
            "User",
            "unread_posts",
            "UnreadPost",
            "id",
            "user_id",
        ))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::through("User", "unread", "unread_posts", None))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::through(
            "User",
            "unread_threads",
            "unread",
            Some("thread"),
        ))
        .unwrap();

    builder
        .define_relation(RelationDescriptor::to_one(
            "UnreadPost",
            "unread",
            "Post",
            "post_id",
            "id",
        ))
        .unwrap();

    builder
        .define_relation(RelationDescriptor::to_one("Post", "thread", "Thread", "thread_id", "id"))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::to_one("Post", "user", "User", "user_id", "id"))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::polymorphic(
            "Post",
            "subject",
            "subject_type",
            "subject_id",
            "id",
        ))
        .unwrap();

    builder
        .define_relation(RelationDescriptor::to_one("Thread", "user", "User", "user_id", "id"))
        .unwrap();
    builder
        .define_relation(RelationDescriptor::to_many("Thread", "posts", "Post", "id", "thread_id"))
        .unwrap();

    builder.freeze().unwrap()
}

pub fn paths(segments: &[crate::query_planner::types::PathSegment]) -> Vec<String> {
    segments
        .iter()
        .map(|segment| segment.physical_path.join("."))
        .collect()
}
