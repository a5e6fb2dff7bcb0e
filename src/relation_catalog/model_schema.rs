//! Model metadata consumed from the registration collaborator.
//!
//! A [`ModelSchema`] carries the table name, the primary-key field list used
//! by the result assembler's de-duplication, and the declared attribute
//! types used by the condition translator's input cast.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared value type of a model attribute.
///
/// The cast is intentionally lenient: values that cannot be coerced are
/// passed through unchanged, null is never cast, and lists cast
/// element-wise. The condition translator stores whatever comes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    Float,
    Boolean,
    String,
    DateTime,
    Json,
}

impl AttributeType {
    pub fn cast_input(&self, value: &Value) -> Value {
        match value {
            Value::Null => Value::Null,
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.cast_input(v)).collect())
            }
            _ => self.cast_scalar(value),
        }
    }

    fn cast_scalar(&self, value: &Value) -> Value {
        match self {
            AttributeType::Integer => match value {
                Value::Number(n) if n.is_i64() || n.is_u64() => value.clone(),
                Value::Number(n) => n
                    .as_f64()
                    .map(|f| Value::from(f as i64))
                    .unwrap_or_else(|| value.clone()),
                Value::String(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| value.clone()),
                Value::Bool(b) => Value::from(*b as i64),
                _ => value.clone(),
            },
            AttributeType::Float => match value {
                Value::Number(_) => value.clone(),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(|f| serde_json::Number::from_f64(f).map(Value::Number))
                    .unwrap_or_else(|| value.clone()),
                _ => value.clone(),
            },
            AttributeType::Boolean => match value {
                Value::Bool(_) => value.clone(),
                Value::Number(n) => Value::from(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Value::from(true),
                    "false" | "f" | "0" => Value::from(false),
                    _ => value.clone(),
                },
                _ => value.clone(),
            },
            AttributeType::String => match value {
                Value::String(_) => value.clone(),
                Value::Number(n) => Value::from(n.to_string()),
                Value::Bool(b) => Value::from(b.to_string()),
                _ => value.clone(),
            },
            AttributeType::DateTime => match value {
                Value::String(s) => parse_datetime(s)
                    .map(|dt| Value::from(dt.to_rfc3339()))
                    .unwrap_or_else(|| value.clone()),
                Value::Number(n) => n
                    .as_i64()
                    .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                    .map(|dt| Value::from(dt.to_rfc3339()))
                    .unwrap_or_else(|| value.clone()),
                _ => value.clone(),
            },
            AttributeType::Json => value.clone(),
        }
    }
}

fn parse_datetime(input: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    // Bare timestamps without an offset are taken as UTC.
    chrono::NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    pub name: String,
    pub table_name: String,
    pub primary_keys: Vec<String>,
    #[serde(default)]
    pub attributes: HashMap<String, AttributeType>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        ModelSchema {
            name: name.into(),
            table_name: table_name.into(),
            primary_keys: vec!["id".to_string()],
            attributes: HashMap::new(),
        }
    }

    pub fn with_primary_keys(mut self, keys: Vec<String>) -> Self {
        self.primary_keys = keys;
        self
    }

    pub fn with_attribute(mut self, field: impl Into<String>, ty: AttributeType) -> Self {
        self.attributes.insert(field.into(), ty);
        self
    }

    pub fn attribute_type(&self, field: &str) -> Option<AttributeType> {
        self.attributes.get(field).copied()
    }

    /// Coerce a condition literal through the field's declared type.
    /// Fields without a declared type pass through unchanged.
    pub fn cast(&self, field: &str, value: &Value) -> Value {
        match self.attribute_type(field) {
            Some(ty) => ty.cast_input(value),
            None => value.clone(),
        }
    }
}
