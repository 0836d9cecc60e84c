//! Shape Classifier
//!
//! A chartable result must have exactly one record shape. Several shapes cannot
//! be merged into one column set and are rejected. A single shape that is not a
//! record (after named wrappers) has no columns and is a fatal error. No shapes at all is
//! ambiguous: either the range is empty, or the time field is not time-typed
//! and the range filter matched nothing. A diagnostic query over the time
//! field's types tells the two apart.

use crate::error::{DatasourceError, Result};
use crate::lake::types::{Field, LakeType};
use serde_json::Value;
use tracing::debug;

pub const TIME_TYPE: &str = "time";

/// Outcome of inspecting a response's shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeVerdict<'a> {
    /// Exactly one record shape; its fields are ready for projection
    Single(&'a [Field]),
    /// No shapes; the time field must be checked before reporting
    Empty,
}

pub fn classify(shapes: &[LakeType]) -> Result<ShapeVerdict<'_>> {
    match shapes {
        [] => Ok(ShapeVerdict::Empty),
        [shape] => match shape.underlying() {
            LakeType::Record { fields } => Ok(ShapeVerdict::Single(fields)),
            other => {
                debug!("Single shape is not a record: {}", other);
                Err(DatasourceError::MalformedResponse(
                    "Unknown problem with data shape".to_string(),
                ))
            }
        },
        [_, _, ..] => Err(DatasourceError::MultipleShapes),
    }
}

/// Type names per diagnostic row
pub fn diagnostic_types(records: &[Value]) -> Vec<Vec<String>> {
    records.iter().map(row_types).collect()
}

fn row_types(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) => vec![s.clone()],
        // aggregations may come back wrapped as {union: [...]}
        Value::Object(fields) => fields.values().next().map(row_types).unwrap_or_default(),
        Value::Null => Vec::new(),
        other => vec![other.to_string()],
    }
}

/// Decide whether an empty result is benign.
///
/// Ok means the time field is uniformly time-typed and the range simply holds
/// no data; otherwise the error carries the types actually found.
pub fn diagnose_empty(time_field: &str, types: &[Vec<String>]) -> Result<()> {
    match types {
        [only] if only.len() == 1 && only[0] == TIME_TYPE => Ok(()),
        _ => Err(DatasourceError::TimeFieldType {
            time_field: time_field.to_string(),
            detected: types.first().cloned().unwrap_or_default(),
        }),
    }
}
