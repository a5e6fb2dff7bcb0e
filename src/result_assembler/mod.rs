//! Flat-row reassembly.
//!
//! A joined query returns the root record multiplied by every to-many
//! fan-out. This module folds that flat multiset back into nested record
//! trees: rows are grouped per depth by the primary-key tuple of the model
//! owning that depth, sub-records of to-many hops are collected into lists
//! (a single prior value becomes a one-element list on first collision and
//! every to-many field is a list in the final output), and to-one
//! sub-records are inlined — their parent's key already de-duplicates them.
//! A model without primary keys falls back to the row ordinal, which
//! disables de-duplication for that scope.
//!
//! Reassembly is a pure pass over the same segment list that planned the
//! joins; it allocates per invocation and shares nothing.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::query_planner::types::PathSegment;
use crate::relation_catalog::{CatalogError, RelationCatalog};

/// Assembled record: a mapping keyed by field name and by relation name.
/// To-many relation values hold an ordered list of records, to-one values
/// a single record.
pub type NestedRecord = Map<String, Value>;

/// One flat result row, with column values keyed by `(physical path,
/// field)`. The empty path addresses the query root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    scopes: Vec<FlatScope>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FlatScope {
    path: Vec<String>,
    values: Map<String, Value>,
}

impl FlatRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, path: &[&str], field: &str, value: Value) -> &mut Self {
        let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        match self.scopes.iter_mut().find(|scope| scope.path == path) {
            Some(scope) => {
                scope.values.insert(field.to_string(), value);
            }
            None => {
                let mut values = Map::new();
                values.insert(field.to_string(), value);
                self.scopes.push(FlatScope { path, values });
            }
        }
        self
    }

    fn values_at(&self, path: &[String]) -> Option<&Map<String, Value>> {
        self.scopes
            .iter()
            .find(|scope| scope.path == path)
            .map(|scope| &scope.values)
    }
}

/// Reassemble `rows` into the de-duplicated top-level record list, using
/// the same segment list that planned the joins.
pub fn assemble(
    catalog: &RelationCatalog,
    root_model: &str,
    segments: &[PathSegment],
    rows: &[FlatRow],
) -> Result<Vec<NestedRecord>, CatalogError> {
    let root = build_scope_tree(catalog, root_model, segments)?;
    let records: Vec<NestedRecord> = rows
        .iter()
        .filter_map(|row| materialize(&root, row))
        .collect();
    let mut deduped = dedupe(records, &root);
    for record in &mut deduped {
        normalize(record, &root);
    }
    Ok(deduped)
}

/// Nesting structure derived from the segment list. Polymorphic hops are
/// deferred: they contribute no joined columns and stay absent until the
/// polymorphic-resolution collaborator splices them in.
#[derive(Debug)]
struct Scope {
    name: String,
    path: Vec<String>,
    to_many: bool,
    deferred: bool,
    primary_keys: Vec<String>,
    children: Vec<Scope>,
}

fn build_scope_tree(
    catalog: &RelationCatalog,
    root_model: &str,
    segments: &[PathSegment],
) -> Result<Scope, CatalogError> {
    let mut root = Scope {
        name: String::new(),
        path: Vec::new(),
        to_many: true,
        deferred: false,
        primary_keys: catalog.model(root_model)?.primary_keys.clone(),
        children: Vec::new(),
    };
    for segment in segments {
        let (deferred, primary_keys) = if segment.is_polymorphic() {
            (true, Vec::new())
        } else {
            (
                false,
                catalog.target_model(&segment.relation)?.primary_keys.clone(),
            )
        };
        let child = Scope {
            name: segment.name().to_string(),
            path: segment.physical_path.clone(),
            to_many: segment.is_to_many(),
            deferred,
            primary_keys,
            children: Vec::new(),
        };
        match find_scope_mut(&mut root, &segment.parent_path) {
            Some(parent) => parent.children.push(child),
            // Parents precede children in plan order, so this only fires on
            // a hand-assembled segment list with a hole in it.
            None => log::debug!(
                "no parent scope for `{}`, skipping",
                segment.physical_path.join(".")
            ),
        }
    }
    Ok(root)
}

fn find_scope_mut<'s>(scope: &'s mut Scope, path: &[String]) -> Option<&'s mut Scope> {
    if scope.path == path {
        return Some(scope);
    }
    for child in &mut scope.children {
        if let Some(found) = find_scope_mut(child, path) {
            return Some(found);
        }
    }
    None
}

/// One row, one single-branch record tree. A scope whose columns are all
/// NULL and whose children are absent is a LEFT JOIN miss and yields no
/// record.
fn materialize(scope: &Scope, row: &FlatRow) -> Option<NestedRecord> {
    let values = row.values_at(&scope.path);
    let mut record: NestedRecord = values.cloned().unwrap_or_default();
    let own_data = values
        .map(|v| v.values().any(|value| !value.is_null()))
        .unwrap_or(false);
    let mut child_data = false;
    for child in &scope.children {
        if child.deferred {
            continue;
        }
        if let Some(sub) = materialize(child, row) {
            child_data = true;
            record.insert(child.name.clone(), Value::Object(sub));
        }
    }
    (own_data || child_data).then_some(record)
}

fn dedupe(records: Vec<NestedRecord>, scope: &Scope) -> Vec<NestedRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<NestedRecord> = Vec::new();
    for (ordinal, record) in records.into_iter().enumerate() {
        let key = group_key(&record, &scope.primary_keys, ordinal);
        match index.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(out.len());
                out.push(record);
            }
            Entry::Occupied(slot) => {
                let position = *slot.get();
                merge_into(&mut out[position], record, scope);
            }
        }
    }
    out
}

fn group_key(record: &NestedRecord, primary_keys: &[String], ordinal: usize) -> String {
    if primary_keys.is_empty() {
        return format!("#{ordinal}");
    }
    primary_keys
        .iter()
        .map(|key| {
            record
                .get(key)
                .map(|value| value.to_string())
                .unwrap_or_else(|| "null".to_string())
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Fold a same-key record into `base`. To-many sub-records are appended
/// and recursively de-duplicated one depth deeper; to-one sub-records are
/// merged in place so fan-out below them still collapses.
fn merge_into(base: &mut NestedRecord, mut incoming: NestedRecord, scope: &Scope) {
    for child in &scope.children {
        if child.deferred {
            continue;
        }
        let Some(sub) = incoming.remove(&child.name) else {
            continue;
        };
        if child.to_many {
            match base.get_mut(&child.name) {
                None => {
                    base.insert(child.name.clone(), sub);
                }
                Some(existing) => {
                    let mut list = match existing.take() {
                        Value::Array(items) => items,
                        single => vec![single],
                    };
                    list.push(sub);
                    let members: Vec<NestedRecord> = list
                        .into_iter()
                        .filter_map(|value| match value {
                            Value::Object(record) => Some(record),
                            _ => None,
                        })
                        .collect();
                    let deduped = dedupe(members, child);
                    *existing = Value::Array(deduped.into_iter().map(Value::Object).collect());
                }
            }
        } else {
            match base.get_mut(&child.name) {
                Some(Value::Object(existing)) => {
                    if let Value::Object(sub) = sub {
                        merge_into(existing, sub, child);
                    }
                }
                Some(_) => {}
                None => {
                    base.insert(child.name.clone(), sub);
                }
            }
        }
    }
}

/// Final shape pass: every to-many field holds a list, even when only one
/// sub-record was collected.
fn normalize(record: &mut NestedRecord, scope: &Scope) {
    for child in &scope.children {
        if child.deferred {
            continue;
        }
        let Some(value) = record.get_mut(&child.name) else {
            continue;
        };
        if child.to_many {
            if !value.is_array() {
                let single = value.take();
                *value = Value::Array(vec![single]);
            }
            if let Value::Array(items) = value {
                for item in items {
                    if let Value::Object(sub) = item {
                        normalize(sub, child);
                    }
                }
            }
        } else if let Value::Object(sub) = value {
            normalize(sub, child);
        }
    }
}
