//! Caller-facing relation request trees.
//!
//! A request is built from three freely nestable shapes: a bare relation
//! name, an ordered list of requests, or a mapping from a name to a nested
//! sub-request ("load this relation, then within it load these"). Sibling
//! order is preserved and meaningful — the resolver processes siblings in
//! the order given.

use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::QueryPlannerError;

#[derive(Debug, Clone, PartialEq)]
pub enum RelationRequest {
    Name(String),
    Seq(Vec<RelationRequest>),
    Tree(Vec<(String, RelationRequest)>),
}

impl RelationRequest {
    pub fn name(name: impl Into<String>) -> Self {
        RelationRequest::Name(name.into())
    }

    pub fn seq(items: impl IntoIterator<Item = RelationRequest>) -> Self {
        RelationRequest::Seq(items.into_iter().collect())
    }

    pub fn tree(entries: Vec<(impl Into<String>, RelationRequest)>) -> Self {
        RelationRequest::Tree(
            entries
                .into_iter()
                .map(|(name, sub)| (name.into(), sub))
                .collect(),
        )
    }

    /// A single-entry mapping: load `name`, then `sub` within it.
    pub fn nested(name: impl Into<String>, sub: RelationRequest) -> Self {
        RelationRequest::Tree(vec![(name.into(), sub)])
    }
}

impl From<&str> for RelationRequest {
    fn from(name: &str) -> Self {
        RelationRequest::Name(name.to_string())
    }
}

impl From<Vec<&str>> for RelationRequest {
    fn from(names: Vec<&str>) -> Self {
        RelationRequest::Seq(names.into_iter().map(RelationRequest::from).collect())
    }
}

impl TryFrom<&Value> for RelationRequest {
    type Error = QueryPlannerError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(RelationRequest::Name(name.clone())),
            Value::Array(items) => items
                .iter()
                .map(RelationRequest::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(RelationRequest::Seq),
            Value::Object(entries) => entries
                .iter()
                .map(|(name, sub)| RelationRequest::try_from(sub).map(|s| (name.clone(), s)))
                .collect::<Result<Vec<_>, _>>()
                .map(RelationRequest::Tree),
            other => Err(QueryPlannerError::InvalidRequestShape {
                got: json_type_name(other).to_string(),
            }),
        }
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

impl Serialize for RelationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RelationRequest::Name(name) => serializer.serialize_str(name),
            RelationRequest::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            RelationRequest::Tree(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, sub) in entries {
                    map.serialize_entry(name, sub)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for RelationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = RelationRequest;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a relation name, a list of requests, or a name-to-request mapping")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(RelationRequest::Name(v.to_string()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(RelationRequest::Seq(items))
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry()? {
                    entries.push(entry);
                }
                Ok(RelationRequest::Tree(entries))
            }
        }

        deserializer.deserialize_any(RequestVisitor)
    }
}
