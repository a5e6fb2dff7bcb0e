use serde_json::json;

use super::fixtures::forum_catalog;
use crate::query_planner::conditions::{ConditionInput, ConditionSpec};
use crate::query_planner::request::RelationRequest;
use crate::query_planner::{plan, OrderSpec, QueryPlannerError};
use crate::relation_catalog::Operator;
use crate::render_plan::errors::RenderBuildError;
use crate::render_plan::{JoinPlannerOptions, JoinType};

#[test]
fn through_request_emits_every_hidden_join_in_order() {
    let catalog = forum_catalog();
    let query = plan(
        &catalog,
        "User",
        Some(&RelationRequest::from("unread_threads")),
        &[],
        &[],
        &JoinPlannerOptions::default(),
    )
    .unwrap();

    let joins = &query.joins.joins;
    assert_eq!(joins.len(), 3);

    assert_eq!(joins[0].table, "unread_posts");
    assert_eq!(joins[0].alias, "unread_posts");
    assert_eq!(joins[0].parent_alias, "users");
    assert_eq!(joins[0].parent_key, "id");
    assert_eq!(joins[0].child_key, "user_id");

    assert_eq!(joins[1].table, "posts");
    assert_eq!(joins[1].alias, "posts");
    assert_eq!(joins[1].parent_alias, "unread_posts");
    assert_eq!(joins[1].parent_key, "post_id");
    assert_eq!(joins[1].child_key, "id");

    assert_eq!(joins[2].table, "threads");
    assert_eq!(joins[2].alias, "threads");
    assert_eq!(joins[2].parent_alias, "posts");
    assert_eq!(joins[2].parent_key, "thread_id");
    assert_eq!(joins[2].child_key, "id");

    assert_eq!(
        query.joins.alias_map.get("unread_posts.unread.thread"),
        Some(&"threads".to_string())
    );
}

#[test]
fn alias_collision_with_the_root_table_keeps_the_path_alias() {
    let catalog = forum_catalog();
    let request = RelationRequest::nested("unread_threads", RelationRequest::name("user"));
    let query = plan(
        &catalog,
        "User",
        Some(&request),
        &[],
        &[],
        &JoinPlannerOptions::default(),
    )
    .unwrap();
    let joins = &query.joins.joins;
    assert_eq!(joins.len(), 4);
    // `user` targets the root table `users`
    assert_eq!(joins[3].table, "users");
    assert_eq!(joins[3].alias, "unread_posts.unread.thread.user");
    assert_eq!(joins[3].parent_alias, "threads");
}

#[test]
fn condition_through_a_collapsed_relation_lands_on_the_physical_path() {
    let catalog = forum_catalog();
    let query = plan(
        &catalog,
        "User",
        None,
        &[ConditionInput::Nested(
            json!({"unread_threads": {"title_like": "first"}}),
        )],
        &[],
        &JoinPlannerOptions {
            auto_join: true,
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(
        query.conditions,
        vec![ConditionSpec::Field {
            physical_path: vec![
                "unread_posts".to_string(),
                "unread".to_string(),
                "thread".to_string(),
            ],
            field: "title".into(),
            operator: Operator::Like,
            value: json!("first"),
        }]
    );
    // auto-join pulled in the whole hidden chain, LEFT by default
    let joins = &query.joins.joins;
    assert_eq!(joins.len(), 3);
    assert!(joins.iter().all(|j| j.join_type == JoinType::Left));
}

#[test]
fn auto_join_allow_list_matches_the_caller_visible_name() {
    let catalog = forum_catalog();
    let conditions = [ConditionInput::Nested(
        json!({"unread_threads": {"title_like": "first"}}),
    )];

    let admitted = plan(
        &catalog,
        "User",
        None,
        &conditions,
        &[],
        &JoinPlannerOptions {
            auto_join: true,
            auto_join_relations: vec!["unread_threads".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(admitted.joins.joins.len(), 3);

    // the physical terminal is named `thread`, but the caller never wrote
    // that name, so it does not match
    let refused = plan(
        &catalog,
        "User",
        None,
        &conditions,
        &[],
        &JoinPlannerOptions {
            auto_join: true,
            auto_join_relations: vec!["posts".into()],
            ..Default::default()
        },
    )
    .unwrap();
    assert!(refused.joins.joins.is_empty());
    // the condition itself is untouched by the allow-list
    assert_eq!(refused.conditions.len(), 1);
}

#[test]
fn polymorphic_join_requests_fail_the_whole_plan() {
    let catalog = forum_catalog();
    let request = RelationRequest::nested("posts", RelationRequest::name("subject"));
    let err = plan(
        &catalog,
        "User",
        Some(&request),
        &[],
        &[],
        &JoinPlannerOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        QueryPlannerError::Join(RenderBuildError::PolymorphicJoin {
            path: "posts.subject".into()
        })
    );
}

#[test]
fn order_entries_pass_through_in_caller_order() {
    let catalog = forum_catalog();
    let query = plan(
        &catalog,
        "User",
        None,
        &[],
        &[OrderSpec::desc("created_at"), OrderSpec::asc("login")],
        &JoinPlannerOptions::default(),
    )
    .unwrap();
    assert_eq!(query.order.len(), 2);
    assert_eq!(query.order[0], OrderSpec::desc("created_at"));
    assert_eq!(query.order[1], OrderSpec::asc("login"));
}

#[test]
fn explicit_join_type_applies_to_requested_joins() {
    let catalog = forum_catalog();
    let query = plan(
        &catalog,
        "User",
        Some(&RelationRequest::from("posts")),
        &[],
        &[],
        &JoinPlannerOptions {
            join_type: JoinType::Inner,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(query.joins.joins[0].join_type, JoinType::Inner);
}
