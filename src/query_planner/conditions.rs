//! Condition translation.
//!
//! Turns nested condition objects (or raw expression templates) into
//! field-level [`ConditionSpec`]s. Keys that name a relation recurse using
//! the path resolver's expansion rule, so a condition on
//! `{unread_threads: {title_like: ..}}` lands on the same physical path a
//! join of `unread_threads` would produce. Flat keys are parsed against the
//! fixed operator-suffix table; an unrecognized or absent suffix means
//! equality on the full key.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::QueryPlannerError;
use super::path_resolver::PathResolver;
use super::request::json_type_name;
use super::types::{path_key, PathSegment};
use crate::relation_catalog::{Operator, RelationCatalog};

lazy_static! {
    // Longest suffix first, so `_not_like` is never parsed as `_like` and
    // `_gte` is never parsed as `_gt`.
    static ref OPERATOR_SUFFIXES: Vec<(&'static str, Operator)> = vec![
        ("_not_like", Operator::NotLike),
        ("_between", Operator::Between),
        ("_ilike", Operator::ILike),
        ("_like", Operator::Like),
        ("_not", Operator::Ne),
        ("_gte", Operator::Gte),
        ("_lte", Operator::Lte),
        ("_gt", Operator::Gt),
        ("_lt", Operator::Lt),
    ];
    static ref NAMED_PLACEHOLDER: Regex =
        Regex::new(r":(\w+)").expect("named placeholder pattern is valid");
}

/// One translated condition, addressed to the table owning
/// `physical_path` (empty path = query root).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ConditionSpec {
    Field {
        physical_path: Vec<String>,
        field: String,
        operator: Operator,
        value: Value,
    },
    Raw {
        template: String,
        args: Vec<Value>,
    },
}

/// How the execution collaborator should render a field condition,
/// applying the value-shape rules: lists become IN / NOT IN sets for
/// equality operators and OR-chains otherwise; null always means IS NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderShape {
    IsNull,
    InSet,
    NotInSet,
    OrChain,
    Comparison,
}

impl ConditionSpec {
    pub fn render_shape(&self) -> Option<RenderShape> {
        match self {
            ConditionSpec::Raw { .. } => None,
            ConditionSpec::Field { operator, value, .. } => Some(match value {
                Value::Null => RenderShape::IsNull,
                Value::Array(_) => match operator {
                    Operator::Eq => RenderShape::InSet,
                    Operator::Ne => RenderShape::NotInSet,
                    _ => RenderShape::OrChain,
                },
                _ => RenderShape::Comparison,
            }),
        }
    }
}

/// Raw-template argument source: already-positional values, or a single
/// mapping consumed by `:name` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawArgs {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionInput {
    Raw { template: String, args: RawArgs },
    Nested(Value),
}

/// Translation output: the specs plus every segment the relation-keyed
/// recursion resolved, in resolution order, for the auto-join pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslatedConditions {
    pub specs: Vec<ConditionSpec>,
    pub segments: Vec<PathSegment>,
}

pub fn translate_conditions(
    catalog: &RelationCatalog,
    root_model: &str,
    inputs: &[ConditionInput],
) -> Result<TranslatedConditions, QueryPlannerError> {
    catalog.model(root_model)?;
    let mut translator = Translator {
        catalog,
        resolver: PathResolver::new(catalog),
        specs: Vec::new(),
    };
    for input in inputs {
        match input {
            ConditionInput::Raw { template, args } => translator.translate_raw(template, args),
            ConditionInput::Nested(value) => match value {
                Value::Object(entries) => {
                    translator.translate_nested(Some(root_model), &[], entries)?
                }
                other => {
                    return Err(QueryPlannerError::InvalidConditionShape {
                        got: json_type_name(other).to_string(),
                    });
                }
            },
        }
    }
    Ok(TranslatedConditions {
        specs: translator.specs,
        segments: translator.resolver.into_segments(),
    })
}

struct Translator<'a> {
    catalog: &'a RelationCatalog,
    resolver: PathResolver<'a>,
    specs: Vec<ConditionSpec>,
}

impl Translator<'_> {
    /// `model` is `None` below a polymorphic hop, where the owning model is
    /// unknown until query time: leaf conditions still translate (uncast),
    /// but deeper relation keys cannot resolve.
    fn translate_nested(
        &mut self,
        model: Option<&str>,
        path: &[String],
        entries: &Map<String, Value>,
    ) -> Result<(), QueryPlannerError> {
        for (key, value) in entries {
            if let Value::Object(sub) = value {
                let model = model.ok_or_else(|| QueryPlannerError::UnknownRelation {
                    model: "(polymorphic target)".to_string(),
                    relation: key.clone(),
                    at: path_key(path),
                })?;
                let mut label = path.to_vec();
                label.push(key.clone());
                let (terminal_path, terminal_model) = self.resolver.resolve_relation(
                    model,
                    path,
                    key,
                    None,
                    Some(label),
                    path.len(),
                )?;
                self.translate_nested(terminal_model.as_deref(), &terminal_path, sub)?;
            } else {
                let (field, operator) = parse_operator_suffix(key);
                let cast_value = match model {
                    Some(model) => self.catalog.model(model)?.cast(&field, value),
                    None => value.clone(),
                };
                self.specs.push(ConditionSpec::Field {
                    physical_path: path.to_vec(),
                    field,
                    operator,
                    value: cast_value,
                });
            }
        }
        Ok(())
    }

    fn translate_raw(&mut self, template: &str, args: &RawArgs) {
        match args {
            RawArgs::Positional(values) => self.specs.push(ConditionSpec::Raw {
                template: template.to_string(),
                args: values.clone(),
            }),
            RawArgs::Named(values) => {
                // Each placeholder occurrence binds one positional argument,
                // in order of appearance. A name missing from the mapping
                // binds null.
                let mut positional = Vec::new();
                let rewritten = NAMED_PLACEHOLDER.replace_all(template, |caps: &regex::Captures| {
                    positional.push(values.get(&caps[1]).cloned().unwrap_or(Value::Null));
                    "?".to_string()
                });
                self.specs.push(ConditionSpec::Raw {
                    template: rewritten.into_owned(),
                    args: positional,
                });
            }
        }
    }
}

/// Split an optional operator suffix off a condition key. Suffix matching
/// is case-insensitive; a match that would leave an empty field name does
/// not count, and anything unrecognized is equality on the full key.
fn parse_operator_suffix(key: &str) -> (String, Operator) {
    let lowered = key.to_lowercase();
    for (suffix, operator) in OPERATOR_SUFFIXES.iter() {
        if lowered.ends_with(suffix)
            && key.len() > suffix.len()
            && key.is_char_boundary(key.len() - suffix.len())
        {
            return (key[..key.len() - suffix.len()].to_string(), *operator);
        }
    }
    (key.to_string(), Operator::Eq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relation_catalog::{
        AttributeType, CatalogBuilder, ModelSchema, RelationDescriptor,
    };
    use serde_json::json;

    fn catalog() -> RelationCatalog {
        let mut builder = CatalogBuilder::new();
        builder
            .add_model(
                ModelSchema::new("User", "users")
                    .with_attribute("id", AttributeType::Integer)
                    .with_attribute("login", AttributeType::String),
            )
            .unwrap();
        builder
            .add_model(ModelSchema::new("Post", "posts").with_attribute("id", AttributeType::Integer))
            .unwrap();
        builder
            .define_relation(RelationDescriptor::to_many("User", "posts", "Post", "id", "user_id"))
            .unwrap();
        builder.freeze().unwrap()
    }

    fn translate_one(input: Value) -> Vec<ConditionSpec> {
        translate_conditions(&catalog(), "User", &[ConditionInput::Nested(input)])
            .unwrap()
            .specs
    }

    #[test]
    fn not_suffix_with_list_renders_as_not_in() {
        let specs = translate_one(json!({"login_not": ["michl", "admin"]}));
        assert_eq!(
            specs,
            vec![ConditionSpec::Field {
                physical_path: vec![],
                field: "login".into(),
                operator: Operator::Ne,
                value: json!(["michl", "admin"]),
            }]
        );
        assert_eq!(specs[0].render_shape(), Some(RenderShape::NotInSet));
    }

    #[test]
    fn absent_suffix_is_equality_on_the_full_key() {
        let specs = translate_one(json!({"login": "phil"}));
        assert!(matches!(
            &specs[0],
            ConditionSpec::Field { field, operator: Operator::Eq, .. } if field == "login"
        ));
    }

    #[test]
    fn unrecognized_suffix_falls_back_to_equality() {
        let specs = translate_one(json!({"login_near": "phil"}));
        assert!(matches!(
            &specs[0],
            ConditionSpec::Field { field, operator: Operator::Eq, .. } if field == "login_near"
        ));
    }

    #[test]
    fn suffix_matching_is_case_insensitive() {
        let specs = translate_one(json!({"login_NOT": "phil"}));
        assert!(matches!(
            &specs[0],
            ConditionSpec::Field { field, operator: Operator::Ne, .. } if field == "login"
        ));
    }

    #[test]
    fn longest_suffix_wins() {
        let specs = translate_one(json!({"title_not_like": "draft%"}));
        assert!(matches!(
            &specs[0],
            ConditionSpec::Field { field, operator: Operator::NotLike, .. } if field == "title"
        ));
    }

    #[test]
    fn null_value_means_is_null_regardless_of_operator() {
        let specs = translate_one(json!({"login_gt": null}));
        assert_eq!(specs[0].render_shape(), Some(RenderShape::IsNull));
    }

    #[test]
    fn list_with_non_equality_operator_is_an_or_chain() {
        let specs = translate_one(json!({"login_like": ["mich", "adm"]}));
        assert_eq!(specs[0].render_shape(), Some(RenderShape::OrChain));
    }

    #[test]
    fn values_are_cast_through_declared_attribute_types() {
        let specs = translate_one(json!({"id": "5"}));
        assert!(matches!(
            &specs[0],
            ConditionSpec::Field { value, .. } if *value == json!(5)
        ));
    }

    #[test]
    fn relation_key_resolves_to_a_physical_path() {
        let out = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Nested(json!({"posts": {"id_gt": 10}}))],
        )
        .unwrap();
        assert_eq!(
            out.specs,
            vec![ConditionSpec::Field {
                physical_path: vec!["posts".into()],
                field: "id".into(),
                operator: Operator::Gt,
                value: json!(10),
            }]
        );
        // the resolved hop is reported for the auto-join pass
        assert_eq!(out.segments.len(), 1);
        assert_eq!(out.segments[0].physical_path, vec!["posts".to_string()]);
    }

    #[test]
    fn unknown_relation_key_fails_with_the_full_path() {
        let err = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Nested(json!({"comments": {"id": 1}}))],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            QueryPlannerError::UnknownRelation { relation, .. } if relation == "comments"
        ));
    }

    #[test]
    fn named_placeholders_rewrite_to_positional() {
        let out = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Raw {
                template: "login = :login OR alias = :login AND age > :age".to_string(),
                args: RawArgs::Named(
                    json!({"login": "phil", "age": 21}).as_object().unwrap().clone(),
                ),
            }],
        )
        .unwrap();
        assert_eq!(
            out.specs,
            vec![ConditionSpec::Raw {
                template: "login = ? OR alias = ? AND age > ?".to_string(),
                args: vec![json!("phil"), json!("phil"), json!(21)],
            }]
        );
    }

    #[test]
    fn missing_placeholder_name_binds_null() {
        let out = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Raw {
                template: "login = :nope".to_string(),
                args: RawArgs::Named(Map::new()),
            }],
        )
        .unwrap();
        assert_eq!(
            out.specs,
            vec![ConditionSpec::Raw {
                template: "login = ?".to_string(),
                args: vec![Value::Null],
            }]
        );
    }

    #[test]
    fn positional_raw_input_passes_through() {
        let out = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Raw {
                template: "login = ?".to_string(),
                args: RawArgs::Positional(vec![json!("phil")]),
            }],
        )
        .unwrap();
        assert_eq!(
            out.specs,
            vec![ConditionSpec::Raw {
                template: "login = ?".to_string(),
                args: vec![json!("phil")],
            }]
        );
    }

    #[test]
    fn non_mapping_condition_input_is_rejected() {
        let err = translate_conditions(
            &catalog(),
            "User",
            &[ConditionInput::Nested(json!(["login", "phil"]))],
        )
        .unwrap_err();
        assert!(matches!(err, QueryPlannerError::InvalidConditionShape { .. }));
    }
}
