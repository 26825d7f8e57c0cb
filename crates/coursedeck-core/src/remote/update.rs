//! Partial document updates
//!
//! A `DocumentUpdate` is a list of per-field operations applied by the store
//! as one atomic write. The set and counter operations never need a prior
//! read, so concurrent writers cannot lose each other's changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StoreError;

/// Operation on a single document field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum FieldOp {
    /// Overwrite the field
    Set { value: Value },
    /// Add `delta` to a numeric field (missing counts as 0)
    Increment { delta: i64 },
    /// Append each value not already present
    ArrayUnion { values: Vec<Value> },
    /// Remove every element equal to one of the values
    ArrayRemove { values: Vec<Value> },
    /// Append `value` unless an element with the same `key` field exists
    ArrayUnionByKey { key: String, value: Value },
}

/// One field and the operation applied to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field: String,
    pub op: FieldOp,
}

/// A set of field operations applied together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentUpdate {
    pub fields: Vec<FieldUpdate>,
}

impl DocumentUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite every field of `partial`
    pub fn from_fields(partial: Map<String, Value>) -> Self {
        partial
            .into_iter()
            .fold(Self::new(), |update, (field, value)| update.set(field, value))
    }

    pub fn set(self, field: impl Into<String>, value: Value) -> Self {
        self.push(field, FieldOp::Set { value })
    }

    pub fn increment(self, field: impl Into<String>, delta: i64) -> Self {
        self.push(field, FieldOp::Increment { delta })
    }

    pub fn array_union(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.push(field, FieldOp::ArrayUnion { values })
    }

    pub fn array_remove(self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.push(field, FieldOp::ArrayRemove { values })
    }

    pub fn array_union_by_key(
        self,
        field: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.push(
            field,
            FieldOp::ArrayUnionByKey {
                key: key.into(),
                value,
            },
        )
    }

    fn push(mut self, field: impl Into<String>, op: FieldOp) -> Self {
        self.fields.push(FieldUpdate {
            field: field.into(),
            op,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Apply every operation to `doc`
    ///
    /// Either all operations apply or `doc` is left untouched.
    pub fn apply(&self, doc: &mut Map<String, Value>) -> Result<(), StoreError> {
        let mut next = doc.clone();
        for update in &self.fields {
            if update.field == "id" {
                return Err(StoreError::Rejected("field 'id' is immutable".to_string()));
            }
            apply_op(&mut next, &update.field, &update.op)?;
        }
        *doc = next;
        Ok(())
    }
}

fn apply_op(doc: &mut Map<String, Value>, field: &str, op: &FieldOp) -> Result<(), StoreError> {
    match op {
        FieldOp::Set { value } => {
            doc.insert(field.to_string(), value.clone());
        }
        FieldOp::Increment { delta } => {
            let current = doc.get(field).and_then(Value::as_i64).unwrap_or(0);
            let next = current.checked_add(*delta).ok_or_else(|| {
                StoreError::Rejected(format!("increment of '{}' overflows", field))
            })?;
            doc.insert(field.to_string(), Value::from(next));
        }
        FieldOp::ArrayUnion { values } => {
            let mut items = take_array(doc, field);
            for value in values {
                if !items.contains(value) {
                    items.push(value.clone());
                }
            }
            doc.insert(field.to_string(), Value::Array(items));
        }
        FieldOp::ArrayRemove { values } => {
            let mut items = take_array(doc, field);
            items.retain(|item| !values.contains(item));
            doc.insert(field.to_string(), Value::Array(items));
        }
        FieldOp::ArrayUnionByKey { key, value } => {
            let Some(wanted) = value.get(key) else {
                return Err(StoreError::Rejected(format!(
                    "value for '{}' has no '{}' key",
                    field, key
                )));
            };
            let mut items = take_array(doc, field);
            if !items.iter().any(|item| item.get(key) == Some(wanted)) {
                items.push(value.clone());
            }
            doc.insert(field.to_string(), Value::Array(items));
        }
    }
    Ok(())
}

/// Remove the array stored at `field`; a missing or non-array value is empty
fn take_array(doc: &mut Map<String, Value>, field: &str) -> Vec<Value> {
    match doc.remove(field) {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}
